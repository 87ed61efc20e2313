//! Per-group category accumulation.
//!
//! One [`GroupAccumulator`] collects everything a summary row needs for one
//! `(date, group)` pair. Accumulation is associative and commutative:
//! folding events in any order, or folding partitions and merging, produces
//! identical totals, which keeps re-aggregation idempotent and makes a
//! map-reduce split safe.

use std::collections::BTreeSet;

use chrono::NaiveTime;

use crate::models::{MachineEvent, Mode};

// ── GroupAccumulator ──────────────────────────────────────────────────────────

/// Running totals for one group on one date.
///
/// All duration and speed fields only ever grow during a pass; after the
/// pass the accumulator is a read-only input to the summary formatter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAccumulator {
    /// Net worked hours per mode, indexed by [`Mode::index`].
    mode_hours: [f64; 7],
    /// Needle runtime in seconds, sewing events only.
    needle_runtime_secs: f64,
    /// Sum of raw speed samples across all retained events.
    total_speed: f64,
    /// Number of speed samples taken (one per retained event).
    speed_samples: u32,
    /// Stitches counted, sewing events only.
    stitch_count: u64,
    /// Distinct machines seen for this group (operator axis context).
    machines: BTreeSet<u32>,
    /// Distinct lines seen for this group (operator axis context).
    lines: BTreeSet<u32>,
    /// Earliest raw start time observed, including discarded events.
    first_start: Option<NaiveTime>,
    /// Latest raw end time observed, including discarded events.
    last_end: Option<NaiveTime>,
}

impl GroupAccumulator {
    /// Fold one retained event into the totals.
    ///
    /// `net_hours` must be the positive post-apportionment duration. Sewing
    /// carries the needle-runtime and stitch metrics; every retained event,
    /// whatever its mode, contributes exactly one speed sample.
    pub fn record(&mut self, mode: Mode, net_hours: f64, event: &MachineEvent) {
        self.mode_hours[mode.index()] += net_hours;

        if mode == Mode::Sewing {
            self.needle_runtime_secs += event.needle_runtime;
            self.stitch_count += u64::from(event.stitch_count);
        }

        self.total_speed += event.speed;
        self.speed_samples += 1;

        self.machines.insert(event.machine_id);
        if let Some(line) = event.line_number {
            self.lines.insert(line);
        }
    }

    /// Note an event's raw span for the first/last-activity columns.
    ///
    /// Called for every event with a valid group key, retained or not; the
    /// figures are presentational and never feed the duration totals.
    pub fn observe_span(&mut self, start: NaiveTime, end: NaiveTime) {
        self.first_start = Some(match self.first_start {
            Some(existing) => existing.min(start),
            None => start,
        });
        self.last_end = Some(match self.last_end {
            Some(existing) => existing.max(end),
            None => end,
        });
    }

    /// Fold another accumulator into this one (associative, commutative).
    pub fn merge(&mut self, other: &GroupAccumulator) {
        for (slot, value) in self.mode_hours.iter_mut().zip(other.mode_hours) {
            *slot += value;
        }
        self.needle_runtime_secs += other.needle_runtime_secs;
        self.total_speed += other.total_speed;
        self.speed_samples += other.speed_samples;
        self.stitch_count += other.stitch_count;
        self.machines.extend(other.machines.iter().copied());
        self.lines.extend(other.lines.iter().copied());
        self.first_start = match (self.first_start, other.first_start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_end = match (self.last_end, other.last_end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// Net hours accumulated under `mode`.
    pub fn hours(&self, mode: Mode) -> f64 {
        self.mode_hours[mode.index()]
    }

    /// Productive time: sewing hours only.
    pub fn productive_hours(&self) -> f64 {
        self.hours(Mode::Sewing)
    }

    /// Non-productive time: every mode except sewing.
    pub fn non_productive_hours(&self) -> f64 {
        Mode::ALL
            .into_iter()
            .filter(|m| !m.is_productive())
            .map(|m| self.hours(m))
            .sum()
    }

    /// Sum across all seven modes.
    pub fn total_hours(&self) -> f64 {
        self.mode_hours.iter().sum()
    }

    /// Hours in any non-idle mode; the "work hours" input to the operator
    /// idle estimate.
    pub fn work_hours(&self) -> f64 {
        self.total_hours() - self.hours(Mode::Idle)
    }

    /// Needle runtime in seconds (sewing events only).
    pub fn needle_runtime_secs(&self) -> f64 {
        self.needle_runtime_secs
    }

    /// Mean of the recorded speed samples, `0.0` when none were taken.
    pub fn avg_speed(&self) -> f64 {
        if self.speed_samples == 0 {
            0.0
        } else {
            self.total_speed / f64::from(self.speed_samples)
        }
    }

    /// Number of speed samples recorded.
    pub fn speed_samples(&self) -> u32 {
        self.speed_samples
    }

    /// Total stitches (sewing events only).
    pub fn stitch_count(&self) -> u64 {
        self.stitch_count
    }

    /// Distinct machines this group's events ran on, sorted.
    pub fn machines(&self) -> &BTreeSet<u32> {
        &self.machines
    }

    /// Distinct lines this group's events ran on, sorted.
    pub fn lines(&self) -> &BTreeSet<u32> {
        &self.lines
    }

    /// Earliest raw start observed, if any event was seen.
    pub fn first_start(&self) -> Option<NaiveTime> {
        self.first_start
    }

    /// Latest raw end observed, if any event was seen.
    pub fn last_end(&self) -> Option<NaiveTime> {
        self.last_end
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
