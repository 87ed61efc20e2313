use clap::Parser;
use std::path::PathBuf;

use crate::error::{ReportError, Result};
use crate::models::{DateSelection, GroupKey, ReportAxis};
use crate::time_utils::parse_date;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Shift productivity reports for industrial sewing machine logs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shift-report",
    about = "Shift productivity reports for industrial sewing machine logs",
    version
)]
pub struct Settings {
    /// Report axis
    #[arg(long, default_value = "machine", value_parser = ["machine", "line", "operator"])]
    pub axis: String,

    /// Single report date (YYYY-MM-DD); all stored dates when omitted
    #[arg(long)]
    pub date: Option<String>,

    /// Start of an inclusive date range (requires --to)
    #[arg(long)]
    pub from: Option<String>,

    /// End of an inclusive date range (requires --from)
    #[arg(long)]
    pub to: Option<String>,

    /// Restrict the report to one machine id
    #[arg(long)]
    pub machine_id: Option<u32>,

    /// Restrict the report to one production line
    #[arg(long)]
    pub line: Option<u32>,

    /// Restrict the report to one operator RFID id
    #[arg(long)]
    pub operator_id: Option<String>,

    /// Directory holding JSONL event files (auto-discovered if not set)
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Factory timezone (IANA name, or "auto" for the system zone)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Keep re-running today's report on an interval
    #[arg(long)]
    pub watch: bool,

    /// Watch refresh interval in seconds (5-600)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(5..=600))]
    pub interval: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,
}

impl Settings {
    /// The typed report axis.
    pub fn report_axis(&self) -> Result<ReportAxis> {
        ReportAxis::from_name(&self.axis)
            .ok_or_else(|| ReportError::Config(format!("unknown axis \"{}\"", self.axis)))
    }

    /// Resolve `--date` / `--from` / `--to` into a [`DateSelection`].
    ///
    /// A complete range takes precedence over `--date`; half a range is a
    /// configuration error.
    pub fn date_selection(&self) -> Result<DateSelection> {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => {
                let from = parse_date(from)?;
                let to = parse_date(to)?;
                if from > to {
                    return Err(ReportError::Config(format!(
                        "--from {} is after --to {}",
                        from, to
                    )));
                }
                Ok(DateSelection::Range(from, to))
            }
            (None, None) => match &self.date {
                Some(date) => Ok(DateSelection::Single(parse_date(date)?)),
                None => Ok(DateSelection::All),
            },
            _ => Err(ReportError::Config(
                "--from and --to must be given together".to_string(),
            )),
        }
    }

    /// The group filter matching the selected axis, if any.
    ///
    /// A filter flag belonging to a different axis is rejected rather than
    /// silently ignored.
    pub fn group_filter(&self) -> Result<Option<GroupKey>> {
        let axis = self.report_axis()?;

        let foreign = match axis {
            ReportAxis::Machine => self.line.is_some() || self.operator_id.is_some(),
            ReportAxis::Line => self.machine_id.is_some() || self.operator_id.is_some(),
            ReportAxis::Operator => self.machine_id.is_some() || self.line.is_some(),
        };
        if foreign {
            return Err(ReportError::Config(format!(
                "group filter does not match the \"{}\" axis",
                axis
            )));
        }

        Ok(match axis {
            ReportAxis::Machine => self.machine_id.map(GroupKey::Machine),
            ReportAxis::Line => self.line.map(GroupKey::Line),
            ReportAxis::Operator => self.operator_id.clone().map(GroupKey::Operator),
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parse(args: &[&str]) -> Settings {
        let mut full = vec!["shift-report"];
        full.extend_from_slice(args);
        Settings::parse_from(full)
    }

    #[test]
    fn test_defaults() {
        let s = parse(&[]);
        assert_eq!(s.axis, "machine");
        assert_eq!(s.timezone, "auto");
        assert_eq!(s.format, "table");
        assert_eq!(s.interval, 30);
        assert!(!s.watch);
        assert_eq!(s.report_axis().unwrap(), ReportAxis::Machine);
        assert_eq!(s.date_selection().unwrap(), DateSelection::All);
        assert_eq!(s.group_filter().unwrap(), None);
    }

    #[test]
    fn test_single_date_selection() {
        let s = parse(&["--date", "2025-07-14"]);
        assert_eq!(
            s.date_selection().unwrap(),
            DateSelection::Single(NaiveDate::from_ymd_opt(2025, 7, 14).unwrap())
        );
    }

    #[test]
    fn test_range_selection_wins_over_date() {
        let s = parse(&[
            "--date",
            "2025-07-01",
            "--from",
            "2025-07-10",
            "--to",
            "2025-07-12",
        ]);
        assert_eq!(
            s.date_selection().unwrap(),
            DateSelection::Range(
                NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 7, 12).unwrap()
            )
        );
    }

    #[test]
    fn test_half_range_is_error() {
        let s = parse(&["--from", "2025-07-10"]);
        assert!(s.date_selection().is_err());
    }

    #[test]
    fn test_inverted_range_is_error() {
        let s = parse(&["--from", "2025-07-12", "--to", "2025-07-10"]);
        assert!(s.date_selection().is_err());
    }

    #[test]
    fn test_bad_date_is_error() {
        let s = parse(&["--date", "July 14th"]);
        assert!(s.date_selection().is_err());
    }

    #[test]
    fn test_machine_filter() {
        let s = parse(&["--machine-id", "12"]);
        assert_eq!(s.group_filter().unwrap(), Some(GroupKey::Machine(12)));
    }

    #[test]
    fn test_operator_filter_on_operator_axis() {
        let s = parse(&["--axis", "operator", "--operator-id", "3658143475"]);
        assert_eq!(
            s.group_filter().unwrap(),
            Some(GroupKey::Operator("3658143475".to_string()))
        );
    }

    #[test]
    fn test_foreign_filter_rejected() {
        // Line filter against the machine axis is a config error.
        let s = parse(&["--line", "4"]);
        assert!(s.group_filter().is_err());

        let s = parse(&["--axis", "operator", "--machine-id", "1"]);
        assert!(s.group_filter().is_err());
    }

    #[test]
    fn test_line_axis_filter() {
        let s = parse(&["--axis", "line", "--line", "4"]);
        assert_eq!(s.group_filter().unwrap(), Some(GroupKey::Line(4)));
    }
}
