//! Summary rows and fleet tiles.
//!
//! Converts the engine's accumulators into the per-group figures the
//! dashboard shows, then rolls those figures up into the four fleet-level
//! tiles. Everything here is a pure function of the aggregation (plus, for
//! the operator axis, the idle estimates).

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use report_core::formatting::{hours_to_hhmm, percentage, round_to};
use report_core::models::{operator_display_name, GroupKey, Mode, ReportAxis};

use crate::engine::Aggregation;

// ── SummaryRow ────────────────────────────────────────────────────────────────

/// One report line: one group on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// 1-based position in the report.
    pub serial: usize,
    pub date: NaiveDate,
    pub group: GroupKey,
    /// Display name for the group (machine/line id, or operator name).
    pub label: String,
    pub sewing_hours: f64,
    /// Direct mode-2 sums on the machine/line axes; the estimator's figure
    /// on the operator axis.
    pub idle_hours: f64,
    pub no_feeding_hours: f64,
    pub meeting_hours: f64,
    pub maintenance_hours: f64,
    pub rework_hours: f64,
    pub needle_break_hours: f64,
    pub productive_hours: f64,
    pub non_productive_hours: f64,
    pub total_hours: f64,
    pub pt_pct: f64,
    pub npt_pct: f64,
    pub needle_time_pct: f64,
    pub avg_speed: f64,
    pub stitch_count: u64,
    /// Distinct machines behind this row (informative on the operator axis).
    pub machines_worked: Vec<u32>,
    /// Distinct lines behind this row.
    pub lines_worked: Vec<u32>,
    /// Earliest raw event start seen for the group that day.
    pub first_start: Option<NaiveTime>,
    /// Latest raw event end seen for the group that day.
    pub last_end: Option<NaiveTime>,
}

impl SummaryRow {
    /// Total hours rendered as `HH:MM`.
    pub fn total_display(&self) -> String {
        hours_to_hhmm(self.total_hours)
    }
}

/// Build the ordered summary rows for an aggregation.
///
/// `idle_estimates` must be given for the operator axis (keyed like the
/// aggregation's groups); the estimator's value then replaces any directly
/// accumulated mode-2 hours, which are intentionally left out of the
/// operator totals. Machine and line axes pass `None` and keep the direct
/// sums.
pub fn summary_rows(
    aggregation: &Aggregation,
    axis: ReportAxis,
    idle_estimates: Option<&BTreeMap<(NaiveDate, GroupKey), f64>>,
) -> Vec<SummaryRow> {
    let mut rows = Vec::with_capacity(aggregation.groups.len());

    for (serial, ((date, group), acc)) in aggregation.groups.iter().enumerate() {
        let idle_hours = match (axis, idle_estimates) {
            (ReportAxis::Operator, Some(estimates)) => estimates
                .get(&(*date, group.clone()))
                .copied()
                .unwrap_or(0.0),
            (ReportAxis::Operator, None) => 0.0,
            _ => acc.hours(Mode::Idle),
        };

        let productive = acc.productive_hours();
        let non_productive = idle_hours
            + acc.hours(Mode::NoFeeding)
            + acc.hours(Mode::Meeting)
            + acc.hours(Mode::Maintenance)
            + acc.hours(Mode::Rework)
            + acc.hours(Mode::NeedleBreak);
        let total = productive + non_productive;

        let label = match group {
            GroupKey::Machine(id) | GroupKey::Line(id) => id.to_string(),
            GroupKey::Operator(id) => operator_display_name(id),
        };

        rows.push(SummaryRow {
            serial: serial + 1,
            date: *date,
            group: group.clone(),
            label,
            sewing_hours: productive,
            idle_hours,
            no_feeding_hours: acc.hours(Mode::NoFeeding),
            meeting_hours: acc.hours(Mode::Meeting),
            maintenance_hours: acc.hours(Mode::Maintenance),
            rework_hours: acc.hours(Mode::Rework),
            needle_break_hours: acc.hours(Mode::NeedleBreak),
            productive_hours: productive,
            non_productive_hours: non_productive,
            total_hours: total,
            pt_pct: percentage(productive, total, 2),
            npt_pct: percentage(non_productive, total, 2),
            needle_time_pct: percentage(acc.needle_runtime_secs(), productive * 3600.0, 2),
            avg_speed: round_to(acc.avg_speed(), 2),
            stitch_count: acc.stitch_count(),
            machines_worked: acc.machines().iter().copied().collect(),
            lines_worked: acc.lines().iter().copied().collect(),
            first_start: acc.first_start(),
            last_end: acc.last_end(),
        });
    }

    rows
}

// ── Tiles ─────────────────────────────────────────────────────────────────────

/// Tunables for the fleet rollups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileConfig {
    /// Hours one group is expected to be productive per day (the 100% mark).
    pub base_hours_per_group: f64,
    /// Needle-time percentages below this floor are left out of the
    /// needle-time average. Applies at tile granularity only.
    pub needle_floor_pct: f64,
}

impl Default for TileConfig {
    fn default() -> Self {
        TileConfig {
            base_hours_per_group: 10.0,
            needle_floor_pct: 2.0,
        }
    }
}

/// Fleet productive-hours rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductivityTile {
    pub total_hours: f64,
    pub total_display: String,
    pub average_hours: f64,
    pub average_display: String,
    pub unique_groups: usize,
    /// Total productive hours against `base × groups`.
    pub pct_of_target_total: f64,
    /// Average productive hours against the per-group base.
    pub pct_of_target_average: f64,
}

/// Fleet needle-time rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedleTimeTile {
    pub average_pct: f64,
    pub included_instances: usize,
    pub excluded_instances: usize,
    pub floor_pct: f64,
}

/// Fleet speed rollup: the mean of per-group averages, not a flat sample
/// mean, so a chatty machine cannot dominate the fleet figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedTile {
    pub average_speed: f64,
    pub unique_groups: usize,
}

/// Flat sum of all hours in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalHoursTile {
    pub total_hours: f64,
    pub total_display: String,
    pub instances: usize,
}

/// The four dashboard tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tiles {
    pub productivity: ProductivityTile,
    pub needle_time: NeedleTimeTile,
    pub speed: SpeedTile,
    pub total_hours: TotalHoursTile,
}

/// Roll the summary rows up into the fleet tiles.
pub fn build_tiles(rows: &[SummaryRow], config: &TileConfig) -> Tiles {
    // Productive hours per unique group, across all dates in the report.
    let mut productive_by_group: BTreeMap<&GroupKey, f64> = BTreeMap::new();
    // Speed is averaged in two levels: instance → group → fleet.
    let mut speed_by_group: BTreeMap<&GroupKey, (f64, usize)> = BTreeMap::new();

    let mut needle_sum = 0.0;
    let mut needle_included = 0usize;
    let mut needle_excluded = 0usize;
    let mut total_hours_sum = 0.0;

    for row in rows {
        *productive_by_group.entry(&row.group).or_insert(0.0) += row.productive_hours;

        let speed_slot = speed_by_group.entry(&row.group).or_insert((0.0, 0));
        speed_slot.0 += row.avg_speed;
        speed_slot.1 += 1;

        if row.needle_time_pct >= config.needle_floor_pct {
            needle_sum += row.needle_time_pct;
            needle_included += 1;
        } else {
            needle_excluded += 1;
        }

        total_hours_sum += row.total_hours;
    }

    let unique_groups = productive_by_group.len();
    let total_productive: f64 = productive_by_group.values().sum();
    let average_productive = if unique_groups > 0 {
        total_productive / unique_groups as f64
    } else {
        0.0
    };
    let target_total = config.base_hours_per_group * unique_groups as f64;

    let fleet_speed = if speed_by_group.is_empty() {
        0.0
    } else {
        let group_average_sum: f64 = speed_by_group
            .values()
            .map(|(sum, count)| sum / *count as f64)
            .sum();
        group_average_sum / speed_by_group.len() as f64
    };

    Tiles {
        productivity: ProductivityTile {
            total_hours: round_to(total_productive, 2),
            total_display: hours_to_hhmm(total_productive),
            average_hours: round_to(average_productive, 2),
            average_display: hours_to_hhmm(average_productive),
            unique_groups,
            pct_of_target_total: percentage(total_productive, target_total, 2),
            pct_of_target_average: percentage(average_productive, config.base_hours_per_group, 2),
        },
        needle_time: NeedleTimeTile {
            average_pct: if needle_included > 0 {
                round_to(needle_sum / needle_included as f64, 2)
            } else {
                0.0
            },
            included_instances: needle_included,
            excluded_instances: needle_excluded,
            floor_pct: config.needle_floor_pct,
        },
        speed: SpeedTile {
            average_speed: round_to(fleet_speed, 2),
            unique_groups: speed_by_group.len(),
        },
        total_hours: TotalHoursTile {
            total_hours: round_to(total_hours_sum, 2),
            total_display: hours_to_hhmm(total_hours_sum),
            instances: rows.len(),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
