use dominica_shared::{ApiErrorBody, DamageSummary, HexagonStats};
use serde::de::DeserializeOwned;

use crate::config::API_BASE_URL;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("fetch error: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("parse error: {0}")]
    Parse(String),
    /// The API answered 200 but with an `{"error": ...}` body.
    #[error("api error: {0}")]
    Upstream(String),
}

pub fn damage_summary_url(base: &str) -> String {
    format!("{}/api/damage-summary", base.trim_end_matches('/'))
}

pub fn hexagon_stats_url(base: &str, hexagon_id: &str) -> String {
    format!(
        "{}/api/hexagon-stats/{}",
        base.trim_end_matches('/'),
        String::from(js_sys::encode_uri_component(hexagon_id))
    )
}

/// Turn a raw HTTP response into a typed payload.
///
/// Non-2xx statuses, bodies that do not parse as `T`, and 200 responses
/// carrying an error payload are all failures.
pub fn interpret_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        return Err(ApiError::Status(status));
    }
    if let Ok(ApiErrorBody { error }) = serde_json::from_str::<ApiErrorBody>(body) {
        return Err(ApiError::Upstream(error));
    }
    serde_json::from_str::<T>(body).map_err(|e| ApiError::Parse(e.to_string()))
}

async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T, ApiError> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    interpret_response(status, &body)
}

/// Fetch the island-wide damage summary.
pub async fn fetch_damage_summary() -> Result<DamageSummary, ApiError> {
    get_json(&damage_summary_url(API_BASE_URL)).await
}

/// Fetch stats for one hexagon. An `Err` is the "no data" outcome; an `Ok`
/// with zero buildings is a legitimate empty hexagon.
pub async fn fetch_hexagon_stats(hexagon_id: &str) -> Result<HexagonStats, ApiError> {
    get_json(&hexagon_stats_url(API_BASE_URL, hexagon_id)).await
}
