//! Interval clipping and break subtraction.
//!
//! Takes one raw `[start, end)` wall-clock span and apportions it against
//! the shift calendar: the parts outside the work window and the parts
//! overlapping scheduled breaks are excluded (and reported for the audit
//! trail), the rest is the event's net worked duration.

use chrono::NaiveTime;

use crate::calendar::ShiftCalendar;
use crate::models::ExclusionReason;

// ── ClippedSegment ────────────────────────────────────────────────────────────

/// One excluded sub-interval of an event, before it is attributed to a group.
///
/// `remaining_secs` is the presentational "work time remaining" figure: the
/// event's duration at the time of this single exclusion minus this exclusion
/// alone. It is deliberately not cumulative across records.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedSegment {
    /// Start of the excluded sub-interval.
    pub start: NaiveTime,
    /// End of the excluded sub-interval.
    pub end: NaiveTime,
    /// Why the sub-interval was excluded.
    pub reason: ExclusionReason,
    /// Seconds excluded.
    pub excluded_secs: i64,
    /// Event work seconds remaining after this single exclusion.
    pub remaining_secs: i64,
}

// ── Apportioned ───────────────────────────────────────────────────────────────

/// The outcome of clipping one event against the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Apportioned {
    /// The span clipped to the work window, or `None` when nothing remains.
    pub clipped: Option<(NaiveTime, NaiveTime)>,
    /// Total seconds of the clipped span consumed by breaks.
    pub break_overlap_secs: i64,
    /// Excluded sub-intervals, in the order they were produced
    /// (window-before, window-after, then breaks chronologically).
    pub segments: Vec<ClippedSegment>,
    /// Net worked duration in hours. `<= 0.0` means the event contributes
    /// nothing and must be discarded (its exclusion records still stand).
    pub net_hours: f64,
}

impl Apportioned {
    /// Whether the event survives apportionment with a positive duration.
    pub fn is_retained(&self) -> bool {
        self.net_hours > 0.0
    }
}

// ── Clipping ──────────────────────────────────────────────────────────────────

fn secs_between(start: NaiveTime, end: NaiveTime) -> i64 {
    (end - start).num_seconds()
}

/// Clip `[start, end)` to the calendar's work window.
///
/// Returns the clipped span (or `None` when start ≥ end afterwards) plus up
/// to two exclusion segments for the parts cut off before and after the
/// window. Clipping a span already fully inside the window is a no-op.
pub fn clip_to_window(
    start: NaiveTime,
    end: NaiveTime,
    calendar: &ShiftCalendar,
) -> (Option<(NaiveTime, NaiveTime)>, Vec<ClippedSegment>) {
    let original_secs = secs_between(start, end);
    let mut segments = Vec::new();
    let mut st = start;
    let mut et = end;

    if st < calendar.window_start {
        let outside_end = et.min(calendar.window_start);
        if st < outside_end {
            let excluded = secs_between(st, outside_end);
            segments.push(ClippedSegment {
                start: st,
                end: outside_end,
                reason: ExclusionReason::OutsideWindowBefore,
                excluded_secs: excluded,
                remaining_secs: original_secs - excluded,
            });
        }
        st = st.max(calendar.window_start);
    }

    if et > calendar.window_end {
        let outside_start = st.max(calendar.window_end);
        if outside_start < et {
            let excluded = secs_between(outside_start, et);
            segments.push(ClippedSegment {
                start: outside_start,
                end: et,
                reason: ExclusionReason::OutsideWindowAfter,
                excluded_secs: excluded,
                remaining_secs: original_secs - excluded,
            });
        }
        et = et.min(calendar.window_end);
    }

    if st < et {
        (Some((st, et)), segments)
    } else {
        (None, segments)
    }
}

/// Compute the total overlap between a clipped span and the calendar's
/// breaks, with one exclusion segment per touched break.
///
/// Breaks are disjoint, so no wall-clock second is counted twice, but one
/// span may overlap several breaks; all overlaps sum into the total.
pub fn subtract_breaks(
    start: NaiveTime,
    end: NaiveTime,
    calendar: &ShiftCalendar,
) -> (i64, Vec<ClippedSegment>) {
    let span_secs = secs_between(start, end);
    let mut total_overlap = 0i64;
    let mut segments = Vec::new();

    for brk in &calendar.breaks {
        let overlap_start = start.max(brk.start);
        let overlap_end = end.min(brk.end);
        if overlap_start < overlap_end {
            let overlap = secs_between(overlap_start, overlap_end);
            total_overlap += overlap;
            segments.push(ClippedSegment {
                start: overlap_start,
                end: overlap_end,
                reason: ExclusionReason::BreakOverlap {
                    break_start: brk.start,
                    break_end: brk.end,
                },
                excluded_secs: overlap,
                remaining_secs: span_secs - overlap,
            });
        }
    }

    (total_overlap, segments)
}

/// Run the full apportionment for one event span: clip to the window,
/// subtract break overlaps, and convert the residue to net hours.
pub fn apportion(start: NaiveTime, end: NaiveTime, calendar: &ShiftCalendar) -> Apportioned {
    let (clipped, mut segments) = clip_to_window(start, end, calendar);

    let Some((st, et)) = clipped else {
        return Apportioned {
            clipped: None,
            break_overlap_secs: 0,
            segments,
            net_hours: 0.0,
        };
    };

    let (break_overlap_secs, break_segments) = subtract_breaks(st, et, calendar);
    segments.extend(break_segments);

    let net_secs = secs_between(st, et) - break_overlap_secs;
    Apportioned {
        clipped: Some((st, et)),
        break_overlap_secs,
        segments,
        net_hours: net_secs as f64 / 3600.0,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
