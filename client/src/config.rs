/// Base URL of the damage API. Empty means same origin (the API server also
/// hosts the built client). Override at build time with `DAMAGE_API_BASE_URL`.
pub const API_BASE_URL: &str = match option_env!("DAMAGE_API_BASE_URL") {
    Some(url) => url,
    None => "",
};

/// Public Mapbox token. Override at build time with `MAPBOX_ACCESS_TOKEN`.
pub const MAPBOX_ACCESS_TOKEN: &str = match option_env!("MAPBOX_ACCESS_TOKEN") {
    Some(token) => token,
    None => "pk.eyJ1IjoiamV0LW1hcnRpbiIsImEiOiJjbWdxaHV6ZmowNnBiMmtxcXQxMDVpb2c0In0.wyLe7cifd7KztRsrARVSuQ",
};

pub const MAP_CONTAINER_ID: &str = "map";
pub const MAP_STYLE_URL: &str = "mapbox://styles/jet-martin/cmgtf928w000x01qxat7j9z5z";

pub const HEXAGON_SOURCE_ID: &str = "hexa";
pub const HEXAGON_DATA_URL: &str =
    "https://raw.githubusercontent.com/jetlo1976-crypto/dominica_hexa/refs/heads/main/hexagon_grid";
pub const BUILDING_SOURCE_ID: &str = "buildings";
pub const BUILDING_DATA_URL: &str =
    "https://raw.githubusercontent.com/jetlo1976-crypto/dominica_hexa/refs/heads/main/buildings";

pub const HEXAGON_FILL_LAYER: &str = "hexagons-fill";
pub const HEXAGON_OUTLINE_LAYER: &str = "hexagons-outline";
pub const BUILDING_LAYER: &str = "buildings-damage";

pub const HEXAGON_FILL_COLOR: &str = "#CD5C5C";
pub const HEXAGON_OUTLINE_COLOR: &str = "#c6afaf";

/// Zoom at which hexagons hand over to individual buildings.
pub const DETAIL_ZOOM: f64 = 14.0;
pub const RESET_VIEW_DURATION_MS: u32 = 1500;

pub const POPUP_MAX_WIDTH: &str = "300px";
