use serde::{Deserialize, Serialize};

use crate::category::DamageCategory;
use crate::damage::DamageSummary;

/// One wedge of the damage distribution chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub category: DamageCategory,
    pub count: u64,
    /// Share of `total_buildings`, rounded to one decimal place.
    pub percentage: f64,
}

/// Slices in ascending category order, regardless of count.
///
/// A summary with `total_buildings == 0` yields 0.0% for every slice.
pub fn pie_slices(summary: &DamageSummary) -> Vec<PieSlice> {
    summary
        .building_count
        .iter()
        .map(|(&category, &count)| PieSlice {
            category,
            count,
            percentage: percentage_of(count, summary.total_buildings),
        })
        .collect()
}

fn percentage_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

pub fn format_percentage(percentage: f64) -> String {
    format!("{percentage:.1}%")
}
