//! The aggregation engine.
//!
//! Folds a batch of machine-state events into per-`(date, group)`
//! accumulators along one report axis, driving the clipping / break
//! subtraction math per event and collecting the exclusion audit trail.
//!
//! The fold is order-independent and partitions merge losslessly, so a
//! caller may split a batch by group and aggregate the parts in parallel.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use report_core::accumulator::GroupAccumulator;
use report_core::calendar::ShiftCalendar;
use report_core::clipping::apportion;
use report_core::models::{ExclusionRecord, GroupKey, MachineEvent, Mode, ReportAxis};

// ── Aggregation ───────────────────────────────────────────────────────────────

/// The result of folding one event batch along one axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// One accumulator per `(date, group)` seen, ordered.
    pub groups: BTreeMap<(NaiveDate, GroupKey), GroupAccumulator>,
    /// Audit trail of every excluded sub-interval, in processing order.
    pub exclusions: Vec<ExclusionRecord>,
    /// Events examined (after any group filter).
    pub events_processed: usize,
    /// Events that contributed a positive net duration.
    pub events_retained: usize,
    /// Events dropped for a missing group key or unknown mode code.
    pub events_skipped: usize,
    /// Events whose net duration was zero or negative after apportionment.
    pub events_discarded: usize,
}

impl Aggregation {
    /// Fold another aggregation into this one.
    ///
    /// Group accumulators merge field-wise; exclusion logs concatenate.
    /// Combined with the accumulator's commutativity this makes a
    /// partition-then-merge split equivalent to a single pass.
    pub fn merge(&mut self, other: Aggregation) {
        for (key, acc) in other.groups {
            self.groups
                .entry(key)
                .or_default()
                .merge(&acc);
        }
        self.exclusions.extend(other.exclusions);
        self.events_processed += other.events_processed;
        self.events_retained += other.events_retained;
        self.events_skipped += other.events_skipped;
        self.events_discarded += other.events_discarded;
    }
}

// ── aggregate ─────────────────────────────────────────────────────────────────

/// Fold `events` into per-group accumulators along `axis`.
///
/// Events not matching `filter` are ignored entirely. Events missing the
/// axis identifier or carrying an out-of-range mode code are skipped with a
/// warning; the batch always completes. Discarded events (net duration
/// ≤ 0) keep their exclusion records in the audit trail.
pub fn aggregate(
    events: &[MachineEvent],
    axis: ReportAxis,
    calendar: &ShiftCalendar,
    filter: Option<&GroupKey>,
) -> Aggregation {
    let mut result = Aggregation::default();

    for event in events {
        let Some(group) = event.group_key(axis) else {
            warn!(
                "event skipped: machine={} date={} missing {} identifier",
                event.machine_id, event.date, axis
            );
            result.events_skipped += 1;
            continue;
        };

        if let Some(wanted) = filter {
            if &group != wanted {
                continue;
            }
        }
        result.events_processed += 1;

        let Some(mode) = Mode::from_code(event.mode_code) else {
            warn!(
                "event skipped: machine={} date={} unknown mode code {}",
                event.machine_id, event.date, event.mode_code
            );
            result.events_skipped += 1;
            continue;
        };

        let key = (event.date, group.clone());
        let accumulator = result.groups.entry(key).or_default();
        accumulator.observe_span(event.start_time, event.end_time);

        let outcome = apportion(event.start_time, event.end_time, calendar);
        for segment in &outcome.segments {
            result.exclusions.push(ExclusionRecord {
                date: event.date,
                group: group.clone(),
                machine_id: event.machine_id,
                start_time: segment.start,
                end_time: segment.end,
                reason: segment.reason.clone(),
                excluded_secs: segment.excluded_secs,
                remaining_secs: segment.remaining_secs,
            });
        }

        if !outcome.is_retained() {
            debug!(
                "event discarded: machine={} date={} {}-{} net {:.4}h",
                event.machine_id, event.date, event.start_time, event.end_time, outcome.net_hours
            );
            result.events_discarded += 1;
            continue;
        }

        accumulator.record(mode, outcome.net_hours, event);
        result.events_retained += 1;
    }

    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

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
            line_number: Some(2),
            operator_id: Some(format!("op-{machine}")),
            date: d(day),
            start_time: start,
            end_time: end,
            mode_code,
            stitch_count: 100,
            needle_runtime: 300.0,
            speed: 400.0,
        }
    }

    fn cal() -> ShiftCalendar {
        ShiftCalendar::default()
    }

    fn hours(agg: &Aggregation, day: u32, key: GroupKey, mode: Mode) -> f64 {
        agg.groups[&(d(day), key)].hours(mode)
    }

    // ── end-to-end scenarios ─────────────────────────────────────────────

    #[test]
    fn test_scenario_clean_sewing_event() {
        // 08:50–09:00, mode 1: 10 minutes of sewing, no exclusions.
        let events = vec![event(1, 14, t(8, 50), t(9, 0), 1)];
        let agg = aggregate(&events, ReportAxis::Machine, &cal(), None);

        assert_eq!(agg.events_retained, 1);
        assert!(agg.exclusions.is_empty());
        let sewing = hours(&agg, 14, GroupKey::Machine(1), Mode::Sewing);
        assert!((sewing - 10.0 / 60.0).abs() < 1e-6, "sewing = {sewing}");
    }

    #[test]
    fn test_scenario_before_window_idle() {
        // 08:15–08:45, mode 2: 15 min excluded before the window,
        // 15 min retained as idle.
        let events = vec![event(1, 14, t(8, 15), t(8, 45), 2)];
        let agg = aggregate(&events, ReportAxis::Machine, &cal(), None);

        assert_eq!(agg.exclusions.len(), 1);
        assert_eq!(agg.exclusions[0].excluded_secs, 15 * 60);
        let idle = hours(&agg, 14, GroupKey::Machine(1), Mode::Idle);
        assert!((idle - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_break_overlap_no_feeding() {
        // 16:15–16:40, mode 3, crossing the 16:20–16:30 break:
        // 10 min excluded, 15 min retained.
        let events = vec![event(1, 14, t(16, 15), t(16, 40), 3)];
        let agg = aggregate(&events, ReportAxis::Machine, &cal(), None);

        assert_eq!(agg.exclusions.len(), 1);
        let no_feeding = hours(&agg, 14, GroupKey::Machine(1), Mode::NoFeeding);
        assert!((no_feeding - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_event_inside_break_discarded() {
        // 10:32–10:38 sits inside the morning break: discarded, but the
        // BreakOverlap record stays in the audit trail.
        let events = vec![event(1, 14, t(10, 32), t(10, 38), 1)];
        let agg = aggregate(&events, ReportAxis::Machine, &cal(), None);

        assert_eq!(agg.events_discarded, 1);
        assert_eq!(agg.events_retained, 0);
        assert_eq!(agg.exclusions.len(), 1);
        let acc = &agg.groups[&(d(14), GroupKey::Machine(1))];
        assert_eq!(acc.total_hours(), 0.0);
        assert_eq!(acc.speed_samples(), 0);
    }

    // ── grouping ─────────────────────────────────────────────────────────

    #[test]
    fn test_groups_split_by_date_and_machine() {
        let events = vec![
            event(1, 14, t(9, 0), t(10, 0), 1),
            event(1, 15, t(9, 0), t(10, 0), 1),
            event(2, 14, t(9, 0), t(10, 0), 1),
        ];
        let agg = aggregate(&events, ReportAxis::Machine, &cal(), None);
        assert_eq!(agg.groups.len(), 3);
    }

    #[test]
    fn test_line_axis_groups_by_line() {
        let mut a = event(1, 14, t(9, 0), t(10, 0), 1);
        a.line_number = Some(4);
        let mut b = event(2, 14, t(10, 0), t(11, 0), 1);
        b.line_number = Some(4);

        let agg = aggregate(&[a, b], ReportAxis::Line, &cal(), None);
        assert_eq!(agg.groups.len(), 1);
        let acc = &agg.groups[&(d(14), GroupKey::Line(4))];
        // 09:00–11:00 minus the 10-minute morning break.
        assert!((acc.total_hours() - (2.0 - 10.0 / 60.0)).abs() < 1e-9);
        assert_eq!(acc.machines().len(), 2);
    }

    #[test]
    fn test_operator_axis_skips_missing_operator() {
        let mut anonymous = event(1, 14, t(9, 0), t(10, 0), 1);
        anonymous.operator_id = None;
        let events = vec![anonymous, event(2, 14, t(9, 0), t(10, 0), 1)];

        let agg = aggregate(&events, ReportAxis::Operator, &cal(), None);
        assert_eq!(agg.events_skipped, 1);
        assert_eq!(agg.groups.len(), 1);
        assert!(agg
            .groups
            .contains_key(&(d(14), GroupKey::Operator("op-2".to_string()))));
    }

    #[test]
    fn test_unknown_mode_skipped_not_fatal() {
        let events = vec![
            event(1, 14, t(9, 0), t(10, 0), 9),
            event(1, 14, t(10, 0), t(10, 30), 1),
        ];
        let agg = aggregate(&events, ReportAxis::Machine, &cal(), None);

        assert_eq!(agg.events_skipped, 1);
        assert_eq!(agg.events_retained, 1);
        let sewing = hours(&agg, 14, GroupKey::Machine(1), Mode::Sewing);
        assert!((sewing - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_group_filter() {
        let events = vec![
            event(1, 14, t(9, 0), t(10, 0), 1),
            event(2, 14, t(9, 0), t(10, 0), 1),
        ];
        let filter = GroupKey::Machine(2);
        let agg = aggregate(&events, ReportAxis::Machine, &cal(), Some(&filter));

        assert_eq!(agg.groups.len(), 1);
        assert_eq!(agg.events_processed, 1);
        assert!(agg.groups.contains_key(&(d(14), GroupKey::Machine(2))));
    }

    // ── order independence & merge ───────────────────────────────────────

    #[test]
    fn test_fold_is_order_independent() {
        let events = vec![
            event(1, 14, t(8, 50), t(9, 0), 1),
            event(1, 14, t(16, 15), t(16, 40), 3),
            event(2, 14, t(8, 15), t(8, 45), 2),
        ];
        let mut reversed = events.clone();
        reversed.reverse();

        let forward = aggregate(&events, ReportAxis::Machine, &cal(), None);
        let backward = aggregate(&reversed, ReportAxis::Machine, &cal(), None);

        assert_eq!(forward.groups, backward.groups);
        assert_eq!(forward.events_retained, backward.events_retained);
    }

    #[test]
    fn test_partition_merge_equals_single_pass() {
        let events = vec![
            event(1, 14, t(8, 50), t(9, 0), 1),
            event(1, 14, t(9, 0), t(10, 0), 4),
            event(2, 14, t(16, 15), t(16, 40), 3),
            event(2, 15, t(9, 0), t(11, 0), 1),
        ];

        let single = aggregate(&events, ReportAxis::Machine, &cal(), None);

        let (left, right): (Vec<_>, Vec<_>) =
            events.into_iter().partition(|e| e.machine_id == 1);
        let mut merged = aggregate(&left, ReportAxis::Machine, &cal(), None);
        merged.merge(aggregate(&right, ReportAxis::Machine, &cal(), None));

        assert_eq!(merged.groups, single.groups);
        assert_eq!(merged.events_retained, single.events_retained);
        assert_eq!(merged.exclusions.len(), single.exclusions.len());
    }

    #[test]
    fn test_empty_batch() {
        let agg = aggregate(&[], ReportAxis::Machine, &cal(), None);
        assert!(agg.groups.is_empty());
        assert!(agg.exclusions.is_empty());
        assert_eq!(agg.events_processed, 0);
    }

    #[test]
    fn test_exclusion_record_carries_group_and_machine() {
        let events = vec![event(3, 14, t(8, 0), t(9, 0), 1)];
        let agg = aggregate(&events, ReportAxis::Operator, &cal(), None);

        assert_eq!(agg.exclusions.len(), 1);
        let record = &agg.exclusions[0];
        assert_eq!(record.machine_id, 3);
        assert_eq!(record.group, GroupKey::Operator("op-3".to_string()));
        assert_eq!(record.date, d(14));
    }
}
