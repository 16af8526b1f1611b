use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::category::DamageCategory;

pub type CategoryCounts = BTreeMap<DamageCategory, u64>;

/// Island-wide building counts per damage category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageSummary {
    pub total_buildings: u64,
    #[serde(default)]
    pub building_count: CategoryCounts,
    #[serde(default)]
    pub categories_found: Vec<DamageCategory>,
}

impl DamageSummary {
    pub fn from_categories(categories: impl IntoIterator<Item = DamageCategory>) -> Self {
        let building_count = tally(categories);
        Self {
            total_buildings: building_count.values().sum(),
            categories_found: building_count.keys().copied().collect(),
            building_count,
        }
    }

    /// Sum of the per-category counts. Should equal `total_buildings`; the
    /// API does not guarantee it.
    pub fn counted_total(&self) -> u64 {
        self.building_count.values().sum()
    }

    pub fn has_discrepancy(&self) -> bool {
        self.counted_total() != self.total_buildings
    }
}

/// Damage statistics for the buildings inside one hexagon cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HexagonStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hexagon_id: Option<String>,
    #[serde(default)]
    pub total_buildings: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_breakdown: Option<CategoryCounts>,
    #[serde(default)]
    pub damage_categories_present: Vec<DamageCategory>,
}

impl HexagonStats {
    pub fn from_categories(
        hexagon_id: impl Into<String>,
        categories: impl IntoIterator<Item = DamageCategory>,
    ) -> Self {
        let breakdown = tally(categories);
        Self {
            hexagon_id: Some(hexagon_id.into()),
            total_buildings: breakdown.values().sum(),
            damage_categories_present: breakdown.keys().copied().collect(),
            damage_breakdown: Some(breakdown),
        }
    }
}

/// Properties carried by a building point feature.
///
/// Feature properties come from hand-edited GeoJSON, so numbers may arrive as
/// floats or strings. Values that cannot be read as a number become `None`
/// instead of rejecting the whole feature.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BuildingProperties {
    #[serde(rename = "Category_i", default, deserialize_with = "lenient_category")]
    pub category: Option<DamageCategory>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub area: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: Option<f64>,
}

impl BuildingProperties {
    /// Category used for colouring and tallying; missing means "no data".
    pub fn category_or_no_data(&self) -> DamageCategory {
        self.category.unwrap_or(DamageCategory::NO_DATA)
    }
}

/// Error payload returned by the damage API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

fn tally(categories: impl IntoIterator<Item = DamageCategory>) -> CategoryCounts {
    let mut counts = CategoryCounts::new();
    for category in categories {
        *counts.entry(category).or_insert(0) += 1;
    }
    counts
}

fn number_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn lenient_category<'de, D>(deserializer: D) -> Result<Option<DamageCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = lenient_number(deserializer)?;
    Ok(number
        .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u8::MAX))
        .map(|v| DamageCategory(v as u8)))
}
