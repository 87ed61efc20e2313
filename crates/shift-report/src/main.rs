mod bootstrap;
mod render;

use anyhow::{anyhow, Result};
use clap::Parser;

use report_core::calendar::ShiftCalendar;
use report_core::settings::Settings;
use report_core::time_utils::{now_in, resolve_timezone};
use report_data::report::{build_report, ReportRequest};
use report_data::store::JsonlEventStore;
use report_data::summary::TileConfig;
use report_runtime::monitor::ReportMonitor;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("Shift Report v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Axis: {}, Timezone: {}, Format: {}",
        settings.axis,
        settings.timezone,
        settings.format
    );

    let axis = settings.report_axis()?;
    let filter = settings.group_filter()?;
    let timezone = resolve_timezone(&settings.timezone);

    let data_path = settings
        .data_path
        .clone()
        .or_else(bootstrap::discover_data_path)
        .ok_or_else(|| anyhow!("no event data directory found; pass --data-path"))?;

    if settings.watch {
        tracing::info!("Watching today's report every {}s...", settings.interval);

        let monitor = ReportMonitor::new(
            u64::from(settings.interval),
            data_path,
            axis,
            filter,
            timezone,
        );
        let (mut rx, handle) = monitor.start();

        loop {
            tokio::select! {
                snapshot = rx.recv() => {
                    match snapshot {
                        Some(snapshot) => {
                            print_report(&snapshot.report, &settings.format, axis)?;
                        }
                        None => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received; stopping watch");
                    handle.abort();
                    break;
                }
            }
        }
    } else {
        let store = JsonlEventStore::load(&data_path)?;
        tracing::debug!("loaded {} events from {}", store.len(), data_path.display());

        let request = ReportRequest {
            axis,
            dates: settings.date_selection()?,
            filter,
        };

        let report = build_report(
            &store,
            &request,
            &ShiftCalendar::default(),
            &TileConfig::default(),
            now_in(timezone),
        )?;

        print_report(&report, &settings.format, axis)?;
    }

    Ok(())
}

fn print_report(
    report: &report_data::report::Report,
    format: &str,
    axis: report_core::models::ReportAxis,
) -> Result<()> {
    if format == "json" {
        println!("{}", render::render_json(report)?);
    } else {
        println!("{}", render::render_table(report, axis));
    }
    Ok(())
}
