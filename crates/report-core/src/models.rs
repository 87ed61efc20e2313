use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ── Mode ──────────────────────────────────────────────────────────────────────

/// Machine / operator state reported by the device for one log span.
///
/// The wire protocol encodes the state as an integer 1–7; anything outside
/// that range is rejected at the edge (logged and skipped) rather than
/// silently falling through an `if/else` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Mode 1 – the needle is running; the only productive state.
    Sewing,
    /// Mode 2 – machine powered but unused.
    Idle,
    /// Mode 3 – operator present, no material fed.
    NoFeeding,
    /// Mode 4 – operator pulled into a meeting.
    Meeting,
    /// Mode 5 – machine under maintenance.
    Maintenance,
    /// Mode 6 – re-stitching rejected pieces.
    Rework,
    /// Mode 7 – stopped on a broken needle.
    NeedleBreak,
}

impl Mode {
    /// All modes in wire-code order.
    pub const ALL: [Mode; 7] = [
        Mode::Sewing,
        Mode::Idle,
        Mode::NoFeeding,
        Mode::Meeting,
        Mode::Maintenance,
        Mode::Rework,
        Mode::NeedleBreak,
    ];

    /// Decode a wire mode code. Returns `None` for anything outside 1–7.
    pub fn from_code(code: u8) -> Option<Mode> {
        match code {
            1 => Some(Mode::Sewing),
            2 => Some(Mode::Idle),
            3 => Some(Mode::NoFeeding),
            4 => Some(Mode::Meeting),
            5 => Some(Mode::Maintenance),
            6 => Some(Mode::Rework),
            7 => Some(Mode::NeedleBreak),
            _ => None,
        }
    }

    /// The wire code for this mode.
    pub fn code(self) -> u8 {
        match self {
            Mode::Sewing => 1,
            Mode::Idle => 2,
            Mode::NoFeeding => 3,
            Mode::Meeting => 4,
            Mode::Maintenance => 5,
            Mode::Rework => 6,
            Mode::NeedleBreak => 7,
        }
    }

    /// Zero-based index, used to address per-mode accumulator slots.
    pub fn index(self) -> usize {
        self.code() as usize - 1
    }

    /// Human-readable label matching the dashboard vocabulary.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Sewing => "Sewing",
            Mode::Idle => "Idle",
            Mode::NoFeeding => "No feeding",
            Mode::Meeting => "Meeting",
            Mode::Maintenance => "Maintenance",
            Mode::Rework => "Rework",
            Mode::NeedleBreak => "Needle break",
        }
    }

    /// Only sewing counts toward productive time.
    pub fn is_productive(self) -> bool {
        matches!(self, Mode::Sewing)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Report axis & group keys ──────────────────────────────────────────────────

/// Which dimension a report is grouped along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAxis {
    /// One row per machine per date.
    Machine,
    /// One row per production line per date.
    Line,
    /// One row per operator per date (idle hours are estimated, not summed).
    Operator,
}

impl ReportAxis {
    /// Parse a CLI axis name. Case-insensitive.
    pub fn from_name(name: &str) -> Option<ReportAxis> {
        match name.to_lowercase().as_str() {
            "machine" => Some(ReportAxis::Machine),
            "line" => Some(ReportAxis::Line),
            "operator" => Some(ReportAxis::Operator),
            _ => None,
        }
    }
}

impl fmt::Display for ReportAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportAxis::Machine => f.write_str("machine"),
            ReportAxis::Line => f.write_str("line"),
            ReportAxis::Operator => f.write_str("operator"),
        }
    }
}

/// A typed grouping key along one report axis.
///
/// Used together with the date as a `(NaiveDate, GroupKey)` map key, so
/// group ids never need to be embedded in (and parsed back out of) a
/// synthetic string key, even when an operator id contains separators.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    Machine(u32),
    Line(u32),
    Operator(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Machine(id) => write!(f, "{}", id),
            GroupKey::Line(id) => write!(f, "{}", id),
            GroupKey::Operator(id) => f.write_str(id),
        }
    }
}

/// Display name for an operator RFID id.
///
/// The operator master table is an external collaborator; without it the
/// report falls back to the formatted placeholder the dashboard expects.
pub fn operator_display_name(operator_id: &str) -> String {
    if operator_id.is_empty() {
        "Unknown".to_string()
    } else {
        format!("Operator-{}", operator_id)
    }
}

// ── MachineEvent ──────────────────────────────────────────────────────────────

/// A single validated machine-state event for one calendar day.
///
/// Produced by the event store from raw device records; times are
/// second-precision wall-clock values within `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineEvent {
    /// Machine that produced the log span.
    pub machine_id: u32,
    /// Production line the machine sits on, when reported.
    pub line_number: Option<u32>,
    /// RFID card id of the operator, when badged in.
    pub operator_id: Option<String>,
    /// Calendar day the span belongs to.
    pub date: NaiveDate,
    /// Wall-clock start of the span.
    pub start_time: NaiveTime,
    /// Wall-clock end of the span.
    pub end_time: NaiveTime,
    /// Wire mode code (1–7; validated via [`Mode::from_code`] at use sites).
    pub mode_code: u8,
    /// Stitches counted over the span.
    pub stitch_count: u32,
    /// Needle runtime in seconds over the span.
    pub needle_runtime: f64,
    /// Raw speed sample (stitches per minute) reported in the reserve field.
    pub speed: f64,
}

impl MachineEvent {
    /// Decoded mode, or `None` for an out-of-range code.
    pub fn mode(&self) -> Option<Mode> {
        Mode::from_code(self.mode_code)
    }

    /// The grouping key for `axis`, or `None` when the event is missing the
    /// identifier that axis groups by.
    pub fn group_key(&self, axis: ReportAxis) -> Option<GroupKey> {
        match axis {
            ReportAxis::Machine => Some(GroupKey::Machine(self.machine_id)),
            ReportAxis::Line => self.line_number.map(GroupKey::Line),
            ReportAxis::Operator => self
                .operator_id
                .as_ref()
                .filter(|id| !id.is_empty())
                .map(|id| GroupKey::Operator(id.clone())),
        }
    }
}

// ── Exclusion audit records ───────────────────────────────────────────────────

/// Why a sub-interval of an event was excluded from worked time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The span started before the work window opened.
    OutsideWindowBefore,
    /// The span ran past the end of the work window.
    OutsideWindowAfter,
    /// The span overlapped a scheduled break.
    BreakOverlap {
        break_start: NaiveTime,
        break_end: NaiveTime,
    },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::OutsideWindowBefore => f.write_str("Outside main window (before)"),
            ExclusionReason::OutsideWindowAfter => f.write_str("Outside main window (after)"),
            ExclusionReason::BreakOverlap {
                break_start,
                break_end,
            } => write!(
                f,
                "Break overlap with {} - {}",
                break_start.format("%H:%M"),
                break_end.format("%H:%M")
            ),
        }
    }
}

/// One excluded sub-interval of one event, kept for the audit trail.
///
/// Records are created during clipping / break subtraction, appended to the
/// report's exclusion log and never mutated. `remaining_secs` is the
/// presentational "work time remaining" figure: the event's duration at the
/// time of this single exclusion minus this exclusion alone. It is never fed
/// back into any accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionRecord {
    /// Day the event belongs to.
    pub date: NaiveDate,
    /// Group the event was being aggregated under.
    pub group: GroupKey,
    /// Machine that produced the event (always known, any axis).
    pub machine_id: u32,
    /// Start of the excluded sub-interval.
    pub start_time: NaiveTime,
    /// End of the excluded sub-interval.
    pub end_time: NaiveTime,
    /// Why the sub-interval was excluded.
    pub reason: ExclusionReason,
    /// Seconds excluded by this record.
    pub excluded_secs: i64,
    /// Presentational: event work seconds remaining after this exclusion.
    pub remaining_secs: i64,
}

// ── Date selection ────────────────────────────────────────────────────────────

/// Which report dates a request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelection {
    /// Every date present in the event store.
    All,
    /// A single calendar day.
    Single(NaiveDate),
    /// An inclusive date range.
    Range(NaiveDate, NaiveDate),
}

impl DateSelection {
    /// Whether `date` falls inside this selection.
    pub fn contains(&self, date: NaiveDate) -> bool {
        match self {
            DateSelection::All => true,
            DateSelection::Single(d) => *d == date,
            DateSelection::Range(from, to) => *from <= date && date <= *to,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
