//! Exclusive map popups.
//!
//! `PopupManager` owns every popup it opens. Opening a hexagon or building
//! popup first removes whatever is currently tracked, so at most one popup
//! set is ever on the map.

use std::fmt::Write as _;

use dominica_shared::{BuildingProperties, HexagonStats, format_count};
use serde::Serialize;

use crate::config::POPUP_MAX_WIDTH;
use crate::mapbox::LngLat;

/// Options every popup is created with. Not overridable per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupOptions {
    pub close_button: bool,
    pub close_on_click: bool,
    pub max_width: &'static str,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            close_button: true,
            close_on_click: true,
            max_width: POPUP_MAX_WIDTH,
        }
    }
}

/// Whatever can put an HTML annotation on the map and take it off again.
pub trait PopupHost {
    type Popup;

    fn open(&mut self, at: LngLat, html: &str, options: &PopupOptions) -> Self::Popup;
    fn close(&mut self, popup: Self::Popup);
}

pub struct PopupManager<H: PopupHost> {
    host: H,
    active: Vec<H::Popup>,
    options: PopupOptions,
}

impl<H: PopupHost> PopupManager<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            active: Vec::new(),
            options: PopupOptions::default(),
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn options(&self) -> &PopupOptions {
        &self.options
    }

    /// Replace any open popup with hexagon statistics anchored at `at`.
    /// `None` (stats unavailable) renders the "No building data" placeholder.
    pub fn show_hexagon_popup(&mut self, at: LngLat, stats: Option<&HexagonStats>) -> &H::Popup {
        let html = hexagon_popup_html(stats);
        self.show_exclusive(at, &html)
    }

    pub fn show_building_popup(&mut self, at: LngLat, building: &BuildingProperties) -> &H::Popup {
        let html = building_popup_html(building);
        self.show_exclusive(at, &html)
    }

    pub fn close_all_popups(&mut self) {
        for popup in self.active.drain(..) {
            self.host.close(popup);
        }
    }

    pub fn has_active_popups(&self) -> bool {
        !self.active.is_empty()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn popup_count(&self) -> usize {
        self.active.len()
    }

    fn show_exclusive(&mut self, at: LngLat, html: &str) -> &H::Popup {
        self.close_all_popups();
        let popup = self.host.open(at, html, &self.options);
        let index = self.active.len();
        self.active.push(popup);
        &self.active[index]
    }

    #[cfg(test)]
    fn host(&self) -> &H {
        &self.host
    }
}

pub fn hexagon_popup_html(stats: Option<&HexagonStats>) -> String {
    let total = stats
        .map(|s| format_count(s.total_buildings))
        .unwrap_or_else(|| "n/a".to_string());

    let breakdown = match stats.and_then(|s| s.damage_breakdown.as_ref()) {
        Some(breakdown) => {
            let mut rows = String::new();
            // BTreeMap keeps categories in ascending order.
            for (category, count) in breakdown {
                let _ = write!(
                    rows,
                    r#"<div class="damage-breakdown-item"><span class="category-color color-{category}"></span><span>Category {category}: {} buildings</span></div>"#,
                    format_count(*count)
                );
            }
            rows
        }
        None => "No building data".to_string(),
    };

    format!(
        r#"<div class="popup-content"><h4>Hexagon Analysis</h4><div class="popup-grid"><div class="popup-item"><strong>Total Buildings:</strong> <span class="stat-value">{total}</span></div></div><div class="damage-breakdown"><strong>Damage Breakdown:</strong>{breakdown}</div></div>"#
    )
}

/// Area and height lines appear whenever the value is present, zero included.
pub fn building_popup_html(building: &BuildingProperties) -> String {
    let (category_class, category_text) = match building.category {
        Some(category) => (category.to_string(), category.to_string()),
        None => ("none".to_string(), "No data".to_string()),
    };

    let mut items = format!(
        r#"<div class="popup-item"><strong>Damage Category:</strong> <span class="damage-category-{category_class}">{category_text}</span></div>"#
    );
    if let Some(area) = building.area {
        let _ = write!(
            items,
            r#"<div class="popup-item"><strong>Area:</strong> <span>{area} m²</span></div>"#
        );
    }
    if let Some(height) = building.height {
        let _ = write!(
            items,
            r#"<div class="popup-item"><strong>Height:</strong> <span>{height} m</span></div>"#
        );
    }

    format!(
        r#"<div class="popup-content"><h4>Building Details</h4><div class="popup-grid">{items}</div></div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dominica_shared::DamageCategory;

    /// In-memory map: popups are ids, "on the map" is the `shown` list.
    #[derive(Default)]
    struct FakeMap {
        next_id: u32,
        shown: Vec<(u32, String)>,
        closed: Vec<u32>,
    }

    impl PopupHost for FakeMap {
        type Popup = u32;

        fn open(&mut self, _at: LngLat, html: &str, _options: &PopupOptions) -> u32 {
            self.next_id += 1;
            self.shown.push((self.next_id, html.to_string()));
            self.next_id
        }

        fn close(&mut self, popup: u32) {
            self.shown.retain(|(id, _)| *id != popup);
            self.closed.push(popup);
        }
    }

    fn here() -> LngLat {
        LngLat {
            lng: -61.37,
            lat: 15.41,
        }
    }

    fn stats(total: u64, breakdown: &[(u8, u64)]) -> HexagonStats {
        HexagonStats {
            hexagon_id: Some("42".to_string()),
            total_buildings: total,
            damage_breakdown: Some(
                breakdown
                    .iter()
                    .map(|&(c, n)| (DamageCategory(c), n))
                    .collect(),
            ),
            damage_categories_present: Vec::new(),
        }
    }

    fn building(category: Option<u8>, area: Option<f64>, height: Option<f64>) -> BuildingProperties {
        BuildingProperties {
            category: category.map(DamageCategory),
            area,
            height,
        }
    }

    #[test]
    fn every_show_leaves_exactly_one_popup() {
        let mut manager = PopupManager::new(FakeMap::default());
        let hex = stats(3, &[(1, 3)]);
        let house = building(Some(2), None, None);

        for step in 0..10 {
            if step % 3 == 0 {
                manager.show_building_popup(here(), &house);
            } else {
                manager.show_hexagon_popup(here(), Some(&hex));
            }
            assert_eq!(manager.popup_count(), 1);
            assert!(manager.has_active_popups());
            assert_eq!(manager.host().shown.len(), 1);
        }
    }

    #[test]
    fn close_all_is_idempotent() {
        let mut manager = PopupManager::new(FakeMap::default());
        manager.close_all_popups();
        assert_eq!(manager.popup_count(), 0);
        assert!(!manager.has_active_popups());

        manager.show_hexagon_popup(here(), None);
        manager.close_all_popups();
        manager.close_all_popups();
        assert_eq!(manager.popup_count(), 0);
        assert!(manager.host().shown.is_empty());
        assert_eq!(manager.host().closed, vec![1]);
    }

    #[test]
    fn second_hexagon_popup_replaces_first() {
        let mut manager = PopupManager::new(FakeMap::default());
        manager.show_hexagon_popup(here(), Some(&stats(11, &[(1, 11)])));
        let handle = *manager.show_hexagon_popup(here(), Some(&stats(7, &[(3, 7)])));

        let shown = &manager.host().shown;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, handle);
        assert!(shown[0].1.contains(">7<"));
        assert!(shown[0].1.contains("Category 3: 7 buildings"));
        assert!(!shown[0].1.contains("Category 1"));
    }

    #[test]
    fn building_without_optional_fields_shows_only_category() {
        let html = building_popup_html(&building(Some(2), None, None));
        assert!(html.contains("Damage Category:"));
        assert!(html.contains(r#"<span class="damage-category-2">2</span>"#));
        assert!(!html.contains("Area:"));
        assert!(!html.contains("Height:"));
    }

    #[test]
    fn zero_area_and_height_are_rendered() {
        let html = building_popup_html(&building(Some(1), Some(0.0), Some(0.0)));
        assert!(html.contains("<span>0 m²</span>"));
        assert!(html.contains("<span>0 m</span>"));
    }

    #[test]
    fn building_with_measurements() {
        let html = building_popup_html(&building(Some(4), Some(120.5), Some(6.0)));
        assert!(html.contains("120.5 m²"));
        assert!(html.contains("6 m"));
    }

    #[test]
    fn building_without_category_says_no_data() {
        let html = building_popup_html(&building(None, None, None));
        assert!(html.contains("No data"));
        assert!(html.contains("damage-category-none"));
    }

    #[test]
    fn hexagon_breakdown_is_sorted_by_category() {
        let html = hexagon_popup_html(Some(&stats(60, &[(4, 10), (1, 20), (2, 30)])));
        let one = html.find("Category 1:").expect("category 1");
        let two = html.find("Category 2:").expect("category 2");
        let four = html.find("Category 4:").expect("category 4");
        assert!(one < two && two < four);
    }

    #[test]
    fn hexagon_without_breakdown_uses_placeholder() {
        let partial = HexagonStats {
            total_buildings: 5,
            ..HexagonStats::default()
        };
        let html = hexagon_popup_html(Some(&partial));
        assert!(html.contains("No building data"));
        assert!(html.contains(">5<"));

        let missing = hexagon_popup_html(None);
        assert!(missing.contains("No building data"));
        assert!(missing.contains("n/a"));
    }

    #[test]
    fn default_options_match_popup_policy() {
        let manager = PopupManager::new(FakeMap::default());
        assert_eq!(
            manager.options(),
            &PopupOptions {
                close_button: true,
                close_on_click: true,
                max_width: "300px",
            }
        );
        let json = serde_json::to_value(manager.options()).expect("serialize options");
        assert_eq!(json["closeOnClick"], true);
        assert_eq!(json["maxWidth"], "300px");
    }
}
