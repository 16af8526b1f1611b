use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dominica_shared::{BuildingProperties, DamageCategory, DamageSummary, HexagonStats};
use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use geojson::{Feature, GeoJson};
use tracing::{info, warn};

use crate::config::{BUILDINGS_FILE, HEXAGONS_FILE};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} is not valid GeoJSON: {source}")]
    Parse {
        name: &'static str,
        #[source]
        source: geojson::Error,
    },
    #[error("{name} must be a FeatureCollection")]
    NotFeatureCollection { name: &'static str },
}

/// Building damage aggregated once at startup: the island-wide summary and
/// per-hexagon stats.
#[derive(Debug, Clone, Default)]
pub struct DamageDataset {
    summary: DamageSummary,
    hexagons: Vec<HexagonStats>,
    index_by_id: HashMap<String, usize>,
}

struct Building {
    category: DamageCategory,
    location: Option<Point<f64>>,
}

struct HexagonCell {
    id: String,
    shape: Option<MultiPolygon<f64>>,
    bounds: Option<Rect<f64>>,
}

impl HexagonCell {
    fn contains(&self, point: &Point<f64>) -> bool {
        let (Some(shape), Some(bounds)) = (&self.shape, &self.bounds) else {
            return false;
        };
        let (min, max) = (bounds.min(), bounds.max());
        let in_bounds =
            (min.x..=max.x).contains(&point.x()) && (min.y..=max.y).contains(&point.y());
        in_bounds && shape.contains(point)
    }
}

impl DamageDataset {
    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        let buildings = read_file(&dir.join(BUILDINGS_FILE))?;
        let hexagons = read_file(&dir.join(HEXAGONS_FILE))?;
        let dataset = Self::from_geojson(&buildings, &hexagons)?;
        info!(
            buildings = dataset.summary.total_buildings,
            hexagons = dataset.hexagons.len(),
            dir = %dir.display(),
            "loaded damage dataset"
        );
        Ok(dataset)
    }

    pub fn from_geojson(buildings: &str, hexagons: &str) -> Result<Self, DatasetError> {
        let buildings: Vec<Building> = feature_collection(buildings, BUILDINGS_FILE)?
            .iter()
            .map(building_from_feature)
            .collect();
        let cells: Vec<HexagonCell> = feature_collection(hexagons, HEXAGONS_FILE)?
            .iter()
            .enumerate()
            .map(|(index, feature)| hexagon_from_feature(index, feature))
            .collect();

        let summary = DamageSummary::from_categories(buildings.iter().map(|b| b.category));

        let mut index_by_id = HashMap::with_capacity(cells.len());
        let mut stats = Vec::with_capacity(cells.len());
        for (index, cell) in cells.iter().enumerate() {
            if index_by_id.insert(cell.id.clone(), index).is_some() {
                warn!(hexagon_id = %cell.id, "duplicate hexagon id, keeping the last one");
            }
            let inside = buildings.iter().filter(|building| {
                building
                    .location
                    .as_ref()
                    .is_some_and(|point| cell.contains(point))
            });
            stats.push(HexagonStats::from_categories(
                cell.id.clone(),
                inside.map(|b| b.category),
            ));
        }

        Ok(Self {
            summary,
            hexagons: stats,
            index_by_id,
        })
    }

    pub fn summary(&self) -> &DamageSummary {
        &self.summary
    }

    pub fn hexagons(&self) -> &[HexagonStats] {
        &self.hexagons
    }

    /// Find a hexagon by its identifier, falling back to its position in the
    /// source collection (the id a map engine generates for unnamed features).
    pub fn hexagon_index(&self, hexagon_id: &str) -> Option<usize> {
        let hexagon_id = hexagon_id.trim();
        if let Some(&index) = self.index_by_id.get(hexagon_id) {
            return Some(index);
        }
        hexagon_id
            .parse::<usize>()
            .ok()
            .filter(|index| *index < self.hexagons.len())
    }

    pub fn hexagon(&self, hexagon_id: &str) -> Option<&HexagonStats> {
        self.hexagon_index(hexagon_id)
            .and_then(|index| self.hexagons.get(index))
    }
}

fn read_file(path: &Path) -> Result<String, DatasetError> {
    std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn feature_collection(raw: &str, name: &'static str) -> Result<Vec<Feature>, DatasetError> {
    match raw
        .parse::<GeoJson>()
        .map_err(|source| DatasetError::Parse { name, source })?
    {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        _ => Err(DatasetError::NotFeatureCollection { name }),
    }
}

fn building_from_feature(feature: &Feature) -> Building {
    let category = feature
        .properties
        .clone()
        .and_then(|props| {
            serde_json::from_value::<BuildingProperties>(serde_json::Value::Object(props)).ok()
        })
        .map(|props| props.category_or_no_data())
        .unwrap_or(DamageCategory::NO_DATA);

    let location = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(geojson::Value::Point(position)) => coord(position).map(Point::from),
        _ => None,
    };

    Building { category, location }
}

fn hexagon_from_feature(index: usize, feature: &Feature) -> HexagonCell {
    let id = feature
        .property("id")
        .and_then(|value| match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| index.to_string());

    let shape = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(geojson::Value::Polygon(rings)) => polygon(rings).map(|p| MultiPolygon::new(vec![p])),
        Some(geojson::Value::MultiPolygon(parts)) => parts
            .iter()
            .map(|rings| polygon(rings))
            .collect::<Option<Vec<_>>>()
            .map(MultiPolygon::new),
        _ => None,
    };
    if shape.is_none() {
        warn!(hexagon_id = %id, "hexagon has no usable polygon geometry");
    }
    let bounds = shape.as_ref().and_then(|shape| shape.bounding_rect());

    HexagonCell { id, shape, bounds }
}

fn coord(position: &[f64]) -> Option<Coord<f64>> {
    match position {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn ring(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Option<Vec<_>>>()
        .map(LineString::from)
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    let interiors = interiors
        .iter()
        .map(|r| ring(r))
        .collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(ring(exterior)?, interiors))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const BUILDINGS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"Category_i": 1}, "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}},
            {"type": "Feature", "properties": {"Category_i": 3}, "geometry": {"type": "Point", "coordinates": [0.2, 0.8]}},
            {"type": "Feature", "properties": {"Category_i": 3.0}, "geometry": {"type": "Point", "coordinates": [2.5, 0.5]}},
            {"type": "Feature", "properties": {"Category_i": null}, "geometry": {"type": "Point", "coordinates": [9.0, 9.0]}},
            {"type": "Feature", "properties": {"Category_i": 4}, "geometry": {"type": "Point", "coordinates": [1.0, 0.5]}}
        ]
    }"#;

    pub(crate) const HEXAGONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"id": "hex-a"}, "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {}, "geometry": {"type": "MultiPolygon", "coordinates": [[[[2,0],[3,0],[3,1],[2,1],[2,0]]]]}},
            {"type": "Feature", "id": 77, "properties": {}, "geometry": {"type": "Polygon", "coordinates": [[[5,5],[6,5],[6,6],[5,6],[5,5]]]}}
        ]
    }"#;

    fn dataset() -> DamageDataset {
        DamageDataset::from_geojson(BUILDINGS, HEXAGONS).expect("fixture dataset")
    }

    #[test]
    fn summary_counts_every_building() {
        let data = dataset();
        let summary = data.summary();
        assert_eq!(summary.total_buildings, 5);
        assert_eq!(summary.building_count[&DamageCategory(3)], 2);
        assert_eq!(summary.building_count[&DamageCategory::NO_DATA], 1);
        assert!(!summary.has_discrepancy());
    }

    #[test]
    fn hexagon_stats_count_points_strictly_inside() {
        let data = dataset();
        let first = data.hexagon("hex-a").expect("hex-a");
        // (1.0, 0.5) sits on the boundary and is not counted.
        assert_eq!(first.total_buildings, 2);
        let breakdown = first.damage_breakdown.as_ref().expect("breakdown");
        assert_eq!(breakdown[&DamageCategory(1)], 1);
        assert_eq!(breakdown[&DamageCategory(3)], 1);
    }

    #[test]
    fn unnamed_hexagons_are_keyed_by_position() {
        let data = dataset();
        assert_eq!(data.hexagon("1").and_then(|s| s.hexagon_id.as_deref()), Some("1"));
        assert_eq!(data.hexagon("1").map(|s| s.total_buildings), Some(1));
        assert_eq!(data.hexagon("2").and_then(|s| s.hexagon_id.as_deref()), Some("2"));
        assert!(data.hexagon("77").is_none());
    }

    #[test]
    fn top_level_feature_ids_do_not_shadow_positions() {
        let hexagons = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 5, "properties": {}, "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type": "Feature", "id": 2, "properties": {}, "geometry": {"type": "Polygon", "coordinates": [[[2,0],[3,0],[3,1],[2,1],[2,0]]]}},
                {"type": "Feature", "id": 9, "properties": {}, "geometry": {"type": "Polygon", "coordinates": [[[4,0],[5,0],[5,1],[4,1],[4,0]]]}}
            ]
        }"#;
        let buildings = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"Category_i": 2}, "geometry": {"type": "Point", "coordinates": [4.5, 0.5]}}
            ]
        }"#;

        let data = DamageDataset::from_geojson(buildings, hexagons).expect("dataset");
        assert_eq!(data.hexagon_index("2"), Some(2));
        assert_eq!(data.hexagon("2").map(|s| s.total_buildings), Some(1));
        assert_eq!(data.hexagon("1").map(|s| s.total_buildings), Some(0));
    }

    #[test]
    fn points_inside_bounds_but_outside_shape_are_not_counted() {
        // Right triangle: (0.9, 0.9) is inside its bounding box but not the shape.
        let hexagons = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"id": "tri"}, "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[0,1],[0,0]]]}}
            ]
        }"#;
        let buildings = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"Category_i": 1}, "geometry": {"type": "Point", "coordinates": [0.2, 0.2]}},
                {"type": "Feature", "properties": {"Category_i": 2}, "geometry": {"type": "Point", "coordinates": [0.9, 0.9]}},
                {"type": "Feature", "properties": {"Category_i": 3}, "geometry": {"type": "Point", "coordinates": [3.0, 3.0]}}
            ]
        }"#;

        let data = DamageDataset::from_geojson(buildings, hexagons).expect("dataset");
        let tri = data.hexagon("tri").expect("triangle");
        assert_eq!(tri.total_buildings, 1);
        assert_eq!(tri.damage_categories_present, vec![DamageCategory(1)]);
    }

    #[test]
    fn positional_lookup_reaches_named_hexagons() {
        let data = dataset();
        assert_eq!(data.hexagon_index("0"), Some(0));
        assert_eq!(data.hexagon_index(" hex-a "), Some(0));
        assert_eq!(data.hexagon_index("42"), None);
        assert!(data.hexagon("unknown").is_none());
    }

    #[test]
    fn rejects_non_collection_documents() {
        let point = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        let err = DamageDataset::from_geojson(point, HEXAGONS).expect_err("point is rejected");
        assert!(matches!(err, DatasetError::NotFeatureCollection { .. }));

        let err = DamageDataset::from_geojson("{not json", HEXAGONS).expect_err("garbage");
        assert!(matches!(err, DatasetError::Parse { .. }));
    }

    #[test]
    fn load_reads_both_files_from_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(BUILDINGS_FILE), BUILDINGS).expect("write buildings");
        std::fs::write(dir.path().join(HEXAGONS_FILE), HEXAGONS).expect("write hexagons");

        let data = DamageDataset::load(dir.path()).expect("load dataset");
        assert_eq!(data.hexagons().len(), 3);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = DamageDataset::load(dir.path()).expect_err("missing files");
        assert!(matches!(err, DatasetError::Io { .. }));
        assert!(err.to_string().contains(BUILDINGS_FILE));
    }
}
