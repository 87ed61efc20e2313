//! The report pipeline.
//!
//! Pulls qualifying events from the store, folds them through the
//! aggregation engine, fills in operator idle estimates and shapes the
//! result into summary rows, the exclusion audit log and the fleet tiles.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use report_core::calendar::ShiftCalendar;
use report_core::error::Result;
use report_core::models::{DateSelection, ExclusionRecord, GroupKey, ReportAxis};

use crate::engine::{aggregate, Aggregation};
use crate::idle::IdleEstimator;
use crate::store::EventStore;
use crate::summary::{build_tiles, summary_rows, SummaryRow, TileConfig, Tiles};

// ── Request / response types ──────────────────────────────────────────────────

/// One report request from the serving layer.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// Grouping dimension.
    pub axis: ReportAxis,
    /// Which dates to cover.
    pub dates: DateSelection,
    /// Optional single-group restriction.
    pub filter: Option<GroupKey>,
}

/// Bookkeeping figures attached to every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Wall-clock timestamp the report was generated at (factory time).
    pub generated_at: NaiveDateTime,
    pub axis: ReportAxis,
    pub dates_covered: usize,
    pub events_processed: usize,
    pub events_retained: usize,
    pub events_skipped: usize,
    pub events_discarded: usize,
}

/// A complete report: rows, audit trail and tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Vec<SummaryRow>,
    pub excluded_logs: Vec<ExclusionRecord>,
    pub tiles: Tiles,
    pub metadata: ReportMetadata,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Build a report from `store` for one request.
///
/// `now` is the current wall clock in the factory timezone; it anchors the
/// idle estimator's today-vs-past branch and is stamped into the metadata.
/// An empty selection produces an empty (not failed) report.
pub fn build_report(
    store: &dyn EventStore,
    request: &ReportRequest,
    calendar: &ShiftCalendar,
    tile_config: &TileConfig,
    now: NaiveDateTime,
) -> Result<Report> {
    calendar.validate()?;

    let dates: Vec<NaiveDate> = store
        .dates()
        .into_iter()
        .filter(|d| request.dates.contains(*d))
        .collect();

    let mut aggregation = Aggregation::default();
    for date in &dates {
        let events = store.events_for(*date);
        aggregation.merge(aggregate(
            &events,
            request.axis,
            calendar,
            request.filter.as_ref(),
        ));
    }

    let idle_estimates = match request.axis {
        ReportAxis::Operator => Some(estimate_idle(&aggregation, calendar, now)),
        _ => None,
    };

    let summary = summary_rows(&aggregation, request.axis, idle_estimates.as_ref());
    let tiles = build_tiles(&summary, tile_config);

    Ok(Report {
        summary,
        excluded_logs: aggregation.exclusions,
        tiles,
        metadata: ReportMetadata {
            generated_at: now,
            axis: request.axis,
            dates_covered: dates.len(),
            events_processed: aggregation.events_processed,
            events_retained: aggregation.events_retained,
            events_skipped: aggregation.events_skipped,
            events_discarded: aggregation.events_discarded,
        },
    })
}

/// Run the idle estimator over every operator group in the aggregation.
fn estimate_idle(
    aggregation: &Aggregation,
    calendar: &ShiftCalendar,
    now: NaiveDateTime,
) -> BTreeMap<(NaiveDate, GroupKey), f64> {
    let estimator = IdleEstimator::new(calendar.clone());
    aggregation
        .groups
        .iter()
        .map(|((date, group), acc)| {
            let idle = estimator.estimate(*date, now, acc.work_hours());
            ((*date, group.clone()), idle)
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use report_core::models::MachineEvent;

    use crate::store::JsonlEventStore;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn event(
        machine: u32,
        day: u32,
        start: NaiveTime,
        end: NaiveTime,
        mode_code: u8,
    ) -> MachineEvent {
        MachineEvent {
            machine_id: machine,
            line_number: Some(1),
            operator_id: Some(format!("{machine}001")),
            date: d(day),
            start_time: start,
            end_time: end,
            mode_code,
            stitch_count: 250,
            needle_runtime: 600.0,
            speed: 380.0,
        }
    }

    fn request(axis: ReportAxis, dates: DateSelection) -> ReportRequest {
        ReportRequest {
            axis,
            dates,
            filter: None,
        }
    }

    fn run(store: &JsonlEventStore, req: &ReportRequest, now: NaiveDateTime) -> Report {
        build_report(
            store,
            req,
            &ShiftCalendar::default(),
            &TileConfig::default(),
            now,
        )
        .expect("report builds")
    }

    #[test]
    fn test_machine_report_end_to_end() {
        let store = JsonlEventStore::from_events(vec![
            event(1, 14, t(8, 50), t(9, 0), 1),
            event(1, 14, t(16, 15), t(16, 40), 3),
            event(2, 14, t(9, 0), t(10, 0), 1),
        ]);
        let report = run(
            &store,
            &request(ReportAxis::Machine, DateSelection::Single(d(14))),
            d(20).and_time(t(12, 0)),
        );

        assert_eq!(report.summary.len(), 2);
        assert_eq!(report.excluded_logs.len(), 1);
        assert_eq!(report.metadata.events_retained, 3);
        assert_eq!(report.metadata.dates_covered, 1);

        let m1 = &report.summary[0];
        assert!((m1.sewing_hours - 10.0 / 60.0).abs() < 1e-6);
        assert!((m1.no_feeding_hours - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_date_range_filters_store_dates() {
        let store = JsonlEventStore::from_events(vec![
            event(1, 10, t(9, 0), t(10, 0), 1),
            event(1, 14, t(9, 0), t(10, 0), 1),
            event(1, 20, t(9, 0), t(10, 0), 1),
        ]);
        let report = run(
            &store,
            &request(
                ReportAxis::Machine,
                DateSelection::Range(d(12), d(18)),
            ),
            d(25).and_time(t(12, 0)),
        );

        assert_eq!(report.metadata.dates_covered, 1);
        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.summary[0].date, d(14));
    }

    #[test]
    fn test_empty_selection_is_empty_report_not_error() {
        let store = JsonlEventStore::from_events(vec![]);
        let report = run(
            &store,
            &request(ReportAxis::Machine, DateSelection::All),
            d(20).and_time(t(12, 0)),
        );

        assert!(report.summary.is_empty());
        assert!(report.excluded_logs.is_empty());
        assert_eq!(report.tiles.total_hours.instances, 0);
    }

    #[test]
    fn test_operator_past_date_idle_baseline() {
        // Operator "1001" works 09:00–12:00 (3 h, no breaks crossed other
        // than the 10:30 one: 3 h − 10 min = 2h50m). Past date → idle is
        // 10 − 2.8333 = 7.1667 h.
        let store = JsonlEventStore::from_events(vec![event(1, 14, t(9, 0), t(12, 0), 1)]);
        let report = run(
            &store,
            &request(ReportAxis::Operator, DateSelection::Single(d(14))),
            d(20).and_time(t(12, 0)),
        );

        let row = &report.summary[0];
        let work = 3.0 - 10.0 / 60.0;
        assert!((row.idle_hours - (10.0 - work)).abs() < 1e-6);
        assert!((row.total_hours - 10.0).abs() < 1e-6);
        assert_eq!(row.label, "Operator-1001");
    }

    #[test]
    fn test_operator_current_date_idle_uses_clock() {
        // Report for today at 11:00: consumed = 2.5 h − 10 min break.
        let store = JsonlEventStore::from_events(vec![event(1, 14, t(9, 0), t(10, 0), 1)]);
        let report = run(
            &store,
            &request(ReportAxis::Operator, DateSelection::Single(d(14))),
            d(14).and_time(t(11, 0)),
        );

        let row = &report.summary[0];
        let consumed = 2.5 - 10.0 / 60.0;
        let expected_idle = consumed - 1.0;
        assert!(
            (row.idle_hours - expected_idle).abs() < 1e-6,
            "idle = {}",
            row.idle_hours
        );
    }

    #[test]
    fn test_operator_mode2_not_double_counted() {
        // A mode-2 span must influence neither work hours nor idle directly.
        let store = JsonlEventStore::from_events(vec![
            event(1, 14, t(9, 0), t(10, 0), 1),
            event(1, 14, t(14, 30), t(16, 0), 2),
        ]);
        let report = run(
            &store,
            &request(ReportAxis::Operator, DateSelection::Single(d(14))),
            d(20).and_time(t(12, 0)),
        );

        let row = &report.summary[0];
        // Work hours = 1 h sewing; idle = 10 − 1 = 9 regardless of the
        // 1.5 h mode-2 span.
        assert!((row.idle_hours - 9.0).abs() < 1e-6);
        assert!((row.total_hours - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_group_filter_restricts_report() {
        let store = JsonlEventStore::from_events(vec![
            event(1, 14, t(9, 0), t(10, 0), 1),
            event(2, 14, t(9, 0), t(10, 0), 1),
        ]);
        let req = ReportRequest {
            axis: ReportAxis::Machine,
            dates: DateSelection::All,
            filter: Some(GroupKey::Machine(2)),
        };
        let report = run(&store, &req, d(20).and_time(t(12, 0)));

        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.summary[0].group, GroupKey::Machine(2));
    }

    #[test]
    fn test_invalid_calendar_fails_request() {
        let store = JsonlEventStore::from_events(vec![]);
        let mut calendar = ShiftCalendar::default();
        calendar.window_end = calendar.window_start;

        let result = build_report(
            &store,
            &request(ReportAxis::Machine, DateSelection::All),
            &calendar,
            &TileConfig::default(),
            d(20).and_time(t(12, 0)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_tiles_cover_all_rows() {
        let store = JsonlEventStore::from_events(vec![
            event(1, 14, t(9, 0), t(10, 0), 1),
            event(2, 14, t(9, 0), t(11, 0), 1),
        ]);
        let report = run(
            &store,
            &request(ReportAxis::Machine, DateSelection::All),
            d(20).and_time(t(12, 0)),
        );

        assert_eq!(report.tiles.productivity.unique_groups, 2);
        let expected_total = 1.0 + (2.0 - 10.0 / 60.0);
        assert!((report.tiles.total_hours.total_hours - expected_total).abs() < 1e-2);
    }
}
