/// Format a decimal hour count as `HH:MM`.
///
/// Minutes are `round((hours − floor(hours)) * 60)`, which can land on 60 at
/// the boundary; the carry is folded into the hour so `1.9999` renders as
/// `"02:00"`, never `"01:60"`.
///
/// # Examples
///
/// ```
/// use report_core::formatting::hours_to_hhmm;
///
/// assert_eq!(hours_to_hhmm(2.5), "02:30");
/// assert_eq!(hours_to_hhmm(1.9999), "02:00");
/// assert_eq!(hours_to_hhmm(0.0), "00:00");
/// ```
pub fn hours_to_hhmm(hours: f64) -> String {
    let clamped = hours.max(0.0);
    let mut whole = clamped.trunc() as u64;
    let mut minutes = ((clamped - clamped.trunc()) * 60.0).round() as u64;
    if minutes == 60 {
        whole += 1;
        minutes = 0;
    }
    format!("{:02}:{:02}", whole, minutes)
}

/// Format a second count as `HH:MM`, truncating sub-minute remainders the
/// way the audit log does.
///
/// # Examples
///
/// ```
/// use report_core::formatting::secs_to_hhmm;
///
/// assert_eq!(secs_to_hhmm(900), "00:15");
/// assert_eq!(secs_to_hhmm(5_400), "01:30");
/// ```
pub fn secs_to_hhmm(secs: i64) -> String {
    let total_minutes = secs.max(0) / 60;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use report_core::formatting::percentage;
///
/// assert!((percentage(2.0, 8.0, 2) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(1.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    round_to(raw, decimal_places)
}

/// Round `value` to `decimal_places` decimal digits.
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let factor = 10_f64.powi(decimal_places as i32);
    (value * factor).round() / factor
}

// ── Tests ──────────────────────────────────────────────────────────────────────
