use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use dominica_shared::ApiErrorBody;
use tracing::{debug, info};

use crate::config::SERVICE_NAME;
use crate::state::AppState;

const MAX_HEXAGON_ID_LEN: usize = 128;

pub async fn api_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Dominica Damage Assessment API",
        "endpoints": {
            "damage_summary": "/api/damage-summary",
            "hexagon_stats": "/api/hexagon-stats/{hexagon_id}",
            "health": "/health",
            "test": "/api/test"
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "buildings": state.dataset.summary().total_buildings,
        "hexagons": state.dataset.hexagons().len(),
    }))
}

pub async fn api_test() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "API is working",
        "status": "success",
        "data": {"test": 123}
    }))
}

/// Serve the pre-serialized island summary.
pub async fn damage_summary(State(state): State<AppState>) -> Response {
    json_bytes_response(state.payloads.summary_json.clone(), "public, max-age=300")
}

pub async fn hexagon_stats(
    State(state): State<AppState>,
    Path(hexagon_id): Path<String>,
) -> Response {
    if let Err(status) = validate_hexagon_id(&hexagon_id) {
        return error_response(status, format!("Invalid hexagon id {hexagon_id:?}"));
    }

    let Some(index) = state.dataset.hexagon_index(&hexagon_id) else {
        info!(%hexagon_id, "hexagon not found");
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Hexagon {hexagon_id} not found"),
        );
    };

    let Some(json) = state.payloads.hexagon_json.get(index) else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Hexagon {hexagon_id} has no prepared stats"),
        );
    };

    debug!(%hexagon_id, index, "serving hexagon stats");
    json_bytes_response(json.clone(), "public, max-age=300")
}

fn validate_hexagon_id(hexagon_id: &str) -> Result<(), StatusCode> {
    let trimmed = hexagon_id.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_HEXAGON_ID_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    if trimmed.chars().any(char::is_control) {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

fn json_bytes_response(body: Bytes, cache_control: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    response
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ApiErrorBody { error })).into_response()
}
