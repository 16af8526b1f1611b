use std::path::PathBuf;

pub const DEFAULT_SERVER_PORT: u16 = 8000;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";

pub const BUILDINGS_FILE: &str = "buildings.geojson";
pub const HEXAGONS_FILE: &str = "hexagons.geojson";

pub const SERVICE_NAME: &str = "Dominica API";

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "https://dominica-damage-assessment.netlify.app",
];

pub fn server_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn data_dir() -> PathBuf {
    std::env::var("DATA_DIR")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn static_dir() -> PathBuf {
    std::env::var("STATIC_DIR")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
}

/// Origins allowed to call the API cross-origin. `ALLOWED_ORIGINS` is a
/// comma-separated list; an unset or blank value keeps the defaults.
pub fn allowed_origins() -> Vec<String> {
    let configured = std::env::var("ALLOWED_ORIGINS")
        .map(|value| parse_origin_list(&value))
        .unwrap_or_default();

    if configured.is_empty() {
        DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|origin| (*origin).to_owned())
            .collect()
    } else {
        configured
    }
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}
