//! Operator idle-time estimation.
//!
//! Operators have no machine-bound idle state: their mode-2 log spans are
//! not summed the way the machine and line axes sum them. Instead idle time
//! is derived from how much of the shift has elapsed versus how much of it
//! the operator spent in any working mode.
//!
//! Two branches, selected by whether the report date is the in-progress
//! day:
//! * **past date**: the shift is assumed to have offered a fixed number of
//!   hours; idle is whatever the operator's work hours fall short of that.
//! * **current date**: idle is measured against the wall clock: time
//!   elapsed since the window opened, minus the break time consumed so far.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use report_core::calendar::ShiftCalendar;

/// Hours a completed shift is assumed to have offered an operator.
pub const DEFAULT_ASSUMED_SHIFT_HOURS: f64 = 10.0;

// ── IdleEstimator ─────────────────────────────────────────────────────────────

/// Best-effort idle-hours estimate for the operator axis.
#[derive(Debug, Clone)]
pub struct IdleEstimator {
    calendar: ShiftCalendar,
    /// Baseline used for closed days.
    pub assumed_shift_hours: f64,
}

impl IdleEstimator {
    /// Estimator over `calendar` with the default closed-day baseline.
    pub fn new(calendar: ShiftCalendar) -> IdleEstimator {
        IdleEstimator {
            calendar,
            assumed_shift_hours: DEFAULT_ASSUMED_SHIFT_HOURS,
        }
    }

    /// Estimate idle hours for one operator on `report_date`.
    ///
    /// `now` is the current wall clock in the factory timezone; it selects
    /// the branch (its date half) and anchors the elapsed-time math (its
    /// time half). `work_hours` is the operator's accumulated non-idle
    /// total for the date. Never returns a negative value.
    pub fn estimate(&self, report_date: NaiveDate, now: NaiveDateTime, work_hours: f64) -> f64 {
        let consumed_hours = if report_date == now.date() {
            self.consumed_hours(now.time())
        } else {
            self.assumed_shift_hours
        };
        (consumed_hours - work_hours).max(0.0)
    }

    /// Shift hours consumed so far today: elapsed time since the window
    /// opened minus the break time already taken.
    ///
    /// Each break contributes its full length once the clock has passed its
    /// end, the elapsed part while the clock is inside it, and nothing
    /// before it starts.
    fn consumed_hours(&self, now: NaiveTime) -> f64 {
        let elapsed_secs = (now - self.calendar.window_start).num_seconds();
        let mut break_secs = 0i64;
        for brk in &self.calendar.breaks {
            if now >= brk.end {
                break_secs += brk.duration_secs();
            } else if now > brk.start {
                break_secs += (now - brk.start).num_seconds();
            }
        }
        (elapsed_secs - break_secs) as f64 / 3600.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
