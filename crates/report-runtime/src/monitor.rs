//! Live report monitor.
//!
//! Re-aggregates the in-progress day on a fixed interval in a tokio task,
//! sending [`ReportSnapshot`]s through an `mpsc` channel so the rendering
//! side can consume them without any shared mutable state.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time;

use report_core::calendar::ShiftCalendar;
use report_core::models::{DateSelection, GroupKey, ReportAxis};
use report_core::time_utils::now_in;
use report_data::report::{build_report, Report, ReportRequest};
use report_data::summary::TileConfig;

use crate::event_manager::EventManager;

// ── Public types ──────────────────────────────────────────────────────────────

/// One live report refresh forwarded to the rendering side.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    /// The factory-local date the report covers.
    pub date: NaiveDate,
    /// The freshly built report.
    pub report: Report,
}

// ── ReportMonitor ─────────────────────────────────────────────────────────────

/// Background coordinator for watch mode.
///
/// Call [`ReportMonitor::start`] to spin up the refresh loop in a dedicated
/// tokio task and receive a channel endpoint for [`ReportSnapshot`] updates.
pub struct ReportMonitor {
    /// How often to rebuild the report.
    update_interval: Duration,
    /// Directory holding the JSONL event files.
    data_path: PathBuf,
    /// Grouping dimension for the live report.
    axis: ReportAxis,
    /// Optional single-group restriction.
    filter: Option<GroupKey>,
    /// Shift shape used for apportionment.
    calendar: ShiftCalendar,
    /// Fleet tile tunables.
    tile_config: TileConfig,
    /// Factory timezone; decides what "today" is.
    timezone: Tz,
}

impl ReportMonitor {
    /// Create a new monitor with the default calendar and tile config.
    pub fn new(
        update_interval_secs: u64,
        data_path: PathBuf,
        axis: ReportAxis,
        filter: Option<GroupKey>,
        timezone: Tz,
    ) -> Self {
        ReportMonitor {
            update_interval: Duration::from_secs(update_interval_secs),
            data_path,
            axis,
            filter,
            calendar: ShiftCalendar::default(),
            tile_config: TileConfig::default(),
            timezone,
        }
    }

    /// Start the refresh loop.
    ///
    /// Spawns a tokio task running the loop. Returns:
    /// - An `mpsc::Receiver<ReportSnapshot>` for the caller to poll.
    /// - A [`MonitorHandle`] that can be used to abort the loop.
    pub fn start(self) -> (mpsc::Receiver<ReportSnapshot>, MonitorHandle) {
        // Buffer a few snapshots so a slow consumer doesn't stall the loop.
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(async move {
            self.refresh_loop(tx).await;
        });

        (rx, MonitorHandle { handle })
    }

    // ── Private implementation ────────────────────────────────────────────

    /// The refresh loop: an immediate build on startup, then one per tick.
    /// Exits when the receiver side of the channel is closed.
    async fn refresh_loop(self, tx: mpsc::Sender<ReportSnapshot>) {
        let ttl = self.update_interval.as_secs().max(1);
        let mut event_manager = EventManager::new(ttl, self.data_path.clone());

        self.build_and_send(&mut event_manager, &tx, true).await;

        let mut interval = time::interval(self.update_interval);
        // Consume the first tick which fires immediately; we already built.
        interval.tick().await;

        loop {
            interval.tick().await;

            if tx.is_closed() {
                tracing::debug!("snapshot channel closed; exiting refresh loop");
                break;
            }

            self.build_and_send(&mut event_manager, &tx, false).await;
        }
    }

    /// Build today's report and send a snapshot to the channel.
    async fn build_and_send(
        &self,
        event_manager: &mut EventManager,
        tx: &mpsc::Sender<ReportSnapshot>,
        force: bool,
    ) {
        let now = now_in(self.timezone);
        let today = now.date();

        let Some(store) = event_manager.get_store(force) else {
            tracing::warn!(
                "no event data available ({}); skipping refresh",
                event_manager.last_error().unwrap_or("unknown error")
            );
            return;
        };

        let request = ReportRequest {
            axis: self.axis,
            dates: DateSelection::Single(today),
            filter: self.filter.clone(),
        };

        let report = match build_report(store, &request, &self.calendar, &self.tile_config, now) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "report build failed; skipping refresh");
                return;
            }
        };

        let snapshot = ReportSnapshot {
            date: today,
            report,
        };

        if let Err(e) = tx.send(snapshot).await {
            tracing::warn!(error = %e, "failed to send report snapshot; receiver dropped");
        }
    }
}

// ── MonitorHandle ─────────────────────────────────────────────────────────────

/// A handle to the background refresh task.
///
/// Drop or call [`MonitorHandle::abort`] to stop the loop.
pub struct MonitorHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl MonitorHandle {
    /// Immediately abort the refresh loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
