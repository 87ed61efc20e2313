//! Plain-text and JSON rendering of a built report.

use report_core::formatting::{hours_to_hhmm, secs_to_hhmm};
use report_core::models::ReportAxis;
use report_data::report::Report;

/// Serialise the whole report (rows, exclusions, tiles, metadata) as
/// pretty-printed JSON.
pub fn render_json(report: &Report) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render the report as aligned text tables for the terminal.
pub fn render_table(report: &Report, axis: ReportAxis) -> String {
    let mut out = String::new();

    out.push_str(&render_summary_table(report, axis));
    out.push('\n');
    out.push_str(&render_tiles(report));

    if !report.excluded_logs.is_empty() {
        out.push('\n');
        out.push_str(&render_exclusions(report));
    }

    out.push_str(&format!(
        "\n{} events retained, {} discarded, {} skipped across {} date(s)\n",
        report.metadata.events_retained,
        report.metadata.events_discarded,
        report.metadata.events_skipped,
        report.metadata.dates_covered
    ));

    out
}

// ── Sections ──────────────────────────────────────────────────────────────────

fn render_summary_table(report: &Report, axis: ReportAxis) -> String {
    let group_header = match axis {
        ReportAxis::Machine => "Machine",
        ReportAxis::Line => "Line",
        ReportAxis::Operator => "Operator",
    };

    let header: Vec<String> = [
        "S.no", "Date", group_header, "Sewing", "Idle", "NoFeed", "Meeting", "Maint", "Rework",
        "NdlBrk", "Total", "PT %", "NPT %", "Needle %", "SPM", "Stitches",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut rows: Vec<Vec<String>> = vec![header];
    for row in &report.summary {
        rows.push(vec![
            row.serial.to_string(),
            row.date.format("%Y-%m-%d").to_string(),
            row.label.clone(),
            hours_to_hhmm(row.sewing_hours),
            hours_to_hhmm(row.idle_hours),
            hours_to_hhmm(row.no_feeding_hours),
            hours_to_hhmm(row.meeting_hours),
            hours_to_hhmm(row.maintenance_hours),
            hours_to_hhmm(row.rework_hours),
            hours_to_hhmm(row.needle_break_hours),
            hours_to_hhmm(row.total_hours),
            format!("{:.2}", row.pt_pct),
            format!("{:.2}", row.npt_pct),
            format!("{:.2}", row.needle_time_pct),
            format!("{:.0}", row.avg_speed),
            row.stitch_count.to_string(),
        ]);
    }

    align(&rows)
}

fn render_tiles(report: &Report) -> String {
    let tiles = &report.tiles;
    format!(
        "Productive hours: {} total / {} avg across {} group(s) ({:.2}% of target)\n\
         Needle time:      {:.2}% avg ({} included, {} below {:.0}% floor)\n\
         Sewing speed:     {:.2} SPM fleet average\n\
         Total hours:      {}\n",
        tiles.productivity.total_display,
        tiles.productivity.average_display,
        tiles.productivity.unique_groups,
        tiles.productivity.pct_of_target_total,
        tiles.needle_time.average_pct,
        tiles.needle_time.included_instances,
        tiles.needle_time.excluded_instances,
        tiles.needle_time.floor_pct,
        tiles.speed.average_speed,
        tiles.total_hours.total_display,
    )
}

fn render_exclusions(report: &Report) -> String {
    let header: Vec<String> = ["Date", "Group", "Machine", "From", "To", "Excluded", "Remaining", "Reason"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows: Vec<Vec<String>> = vec![header];
    for record in &report.excluded_logs {
        rows.push(vec![
            record.date.format("%Y-%m-%d").to_string(),
            record.group.to_string(),
            record.machine_id.to_string(),
            record.start_time.format("%H:%M").to_string(),
            record.end_time.format("%H:%M").to_string(),
            secs_to_hhmm(record.excluded_secs),
            secs_to_hhmm(record.remaining_secs),
            record.reason.to_string(),
        ]);
    }

    align(&rows)
}

// ── Alignment helper ──────────────────────────────────────────────────────────

/// Pad every column to its widest cell, two spaces between columns.
fn align(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
