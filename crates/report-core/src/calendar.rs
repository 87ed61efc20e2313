use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

// ── BreakSpan ─────────────────────────────────────────────────────────────────

/// One scheduled break interval within the work window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakSpan {
    /// Inclusive start of the break.
    pub start: NaiveTime,
    /// Exclusive end of the break.
    pub end: NaiveTime,
}

impl BreakSpan {
    /// Construct a break from `(h, m)` pairs. Panics only on out-of-range
    /// literals, so it is reserved for constants and tests.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> BreakSpan {
        BreakSpan {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).expect("valid break start"),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).expect("valid break end"),
        }
    }

    /// Break length in seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

// ── ShiftCalendar ─────────────────────────────────────────────────────────────

/// The fixed daily shift shape: one work window and an ordered set of
/// non-overlapping breaks fully contained in it.
///
/// The plant's current schedule is the `Default`; the type is constructible
/// so tests and future configuration can swap the literals without touching
/// the aggregation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftCalendar {
    /// Start of counted time (inclusive).
    pub window_start: NaiveTime,
    /// End of counted time (exclusive).
    pub window_end: NaiveTime,
    /// Breaks in chronological order.
    pub breaks: Vec<BreakSpan>,
}

impl Default for ShiftCalendar {
    fn default() -> Self {
        ShiftCalendar {
            window_start: NaiveTime::from_hms_opt(8, 30, 0).expect("valid window start"),
            window_end: NaiveTime::from_hms_opt(19, 30, 0).expect("valid window end"),
            breaks: vec![
                BreakSpan::from_hm((10, 30), (10, 40)),
                BreakSpan::from_hm((13, 20), (14, 0)),
                BreakSpan::from_hm((16, 20), (16, 30)),
            ],
        }
    }
}

impl ShiftCalendar {
    /// Validate the calendar invariants: a non-empty window, and breaks that
    /// are well-formed, chronologically ordered, mutually disjoint and fully
    /// inside the window.
    pub fn validate(&self) -> Result<()> {
        if self.window_start >= self.window_end {
            return Err(ReportError::InvalidCalendar(format!(
                "window start {} is not before window end {}",
                self.window_start, self.window_end
            )));
        }

        let mut previous_end: Option<NaiveTime> = None;
        for brk in &self.breaks {
            if brk.start >= brk.end {
                return Err(ReportError::InvalidCalendar(format!(
                    "break start {} is not before break end {}",
                    brk.start, brk.end
                )));
            }
            if brk.start < self.window_start || brk.end > self.window_end {
                return Err(ReportError::InvalidCalendar(format!(
                    "break {}-{} lies outside the work window",
                    brk.start, brk.end
                )));
            }
            if let Some(prev) = previous_end {
                if brk.start < prev {
                    return Err(ReportError::InvalidCalendar(format!(
                        "break starting {} overlaps or precedes the previous break",
                        brk.start
                    )));
                }
            }
            previous_end = Some(brk.end);
        }
        Ok(())
    }

    /// Full window length in seconds.
    pub fn window_secs(&self) -> i64 {
        (self.window_end - self.window_start).num_seconds()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
