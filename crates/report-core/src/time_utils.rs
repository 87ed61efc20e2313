use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::warn;

use crate::error::{ReportError, Result};

// ── Device format parsing ─────────────────────────────────────────────────────

/// Parse a wall-clock time string from a device record.
///
/// Accepts the full `HH:MM:SS` form and the abbreviated `HH:MM` some
/// firmware revisions send. Anything else is an error the caller should
/// treat as "skip this event".
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let trimmed = s.trim();
    for fmt in ["%H:%M:%S", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(trimmed, fmt) {
            return Ok(t);
        }
    }
    Err(ReportError::TimeParse(s.to_string()))
}

/// Parse a calendar date string from a device record.
///
/// Accepts ISO `YYYY-MM-DD` and the device's colon-separated `YYYY:M:D`
/// form (single-digit month/day allowed), which is normalised before use.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(d);
    }

    // Device form: 2025:7:4 or 2025:07:04.
    let re = Regex::new(r"^(\d{4}):(\d{1,2}):(\d{1,2})$").expect("valid date regex");
    if let Some(caps) = re.captures(trimmed) {
        let year: i32 = caps[1].parse().map_err(|_| date_err(s))?;
        let month: u32 = caps[2].parse().map_err(|_| date_err(s))?;
        let day: u32 = caps[3].parse().map_err(|_| date_err(s))?;
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return Ok(d);
        }
    }

    Err(date_err(s))
}

fn date_err(s: &str) -> ReportError {
    ReportError::DateParse(s.to_string())
}

// ── Timezone resolution ───────────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly; falls back to `"UTC"` if
/// detection fails.
pub fn system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone setting to a concrete [`Tz`].
///
/// `"auto"` (or empty) resolves to the system timezone. Unrecognised names
/// fall back to UTC and log a warning rather than failing the report.
pub fn resolve_timezone(name: &str) -> Tz {
    let effective = if name.is_empty() || name.eq_ignore_ascii_case("auto") {
        system_timezone()
    } else {
        name.to_string()
    };

    effective.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", effective);
        Tz::UTC
    })
}

/// The current local date and time in `tz`, as naive wall-clock values.
///
/// The factory's "today" drives the idle estimator's branch selection, so
/// it must come from the plant timezone, not UTC.
pub fn now_in(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
