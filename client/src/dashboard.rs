use dominica_shared::{DamageCategory, DamageSummary, format_count};
use leptos::prelude::*;

use crate::chart::DamagePieChart;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub category: DamageCategory,
    pub count_text: String,
}

/// Legend rows in ascending category order.
pub fn category_rows(summary: &DamageSummary) -> Vec<CategoryRow> {
    summary
        .building_count
        .iter()
        .map(|(&category, &count)| CategoryRow {
            category,
            count_text: format!("{} buildings", format_count(count)),
        })
        .collect()
}

#[component]
pub fn DamageDashboard(summary: DamageSummary) -> impl IntoView {
    let rows = category_rows(&summary)
        .into_iter()
        .map(|row| {
            let category = row.category;
            view! {
                <div class="category-item" data-category=category.to_string()>
                    <span
                        class=format!("category-color color-{category}")
                        style=format!("background: {};", category.color_hex())
                    ></span>
                    <strong>{format!("{}:", category.label())}</strong>
                    " "
                    <span>{row.count_text}</span>
                </div>
            }
        })
        .collect_view();

    view! {
        <div id="damage-dashboard" class="dashboard-panel">
            <h3>"Dominica Damage Assessment"</h3>
            <div class="stats-grid">
                <div class="stat-item total">
                    <strong>"Total Buildings"</strong>
                    <div class="stat-value">{format_count(summary.total_buildings)}</div>
                </div>
            </div>
            <div class="chart-section">
                <h4>"Damage Distribution"</h4>
                <div id="damage-pie-chart">
                    <DamagePieChart summary=summary.clone() />
                </div>
            </div>
            <div class="damage-categories">
                <h4>"Damage Categories:"</h4>
                <div class="category-grid">{rows}</div>
            </div>
        </div>
    }
}
