use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tracing::warn;

use crate::config::{allowed_origins, static_dir};
use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let static_assets: Router = Router::new()
        .fallback_service(
            ServeDir::new(static_dir())
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let api = Router::new()
        .route("/api", get(routes::api::api_index))
        .route("/health", get(routes::api::health))
        .route("/api/test", get(routes::api::api_test))
        .route("/api/damage-summary", get(routes::api::damage_summary))
        .route(
            "/api/hexagon-stats/{hexagon_id}",
            get(routes::api::hexagon_stats),
        )
        .layer(cors_layer(&allowed_origins()));

    api.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if is_fingerprinted_asset(path) {
        return Some("public, max-age=31536000, immutable");
    }

    if path.ends_with(".geojson") || path.starts_with("/styles/") {
        return Some("public, max-age=3600");
    }

    None
}

/// Trunk emits `dominica-client-<16 hex>_bg.wasm` style names; those never
/// change content under the same name.
fn is_fingerprinted_asset(path: &str) -> bool {
    let file = Path::new(path);
    let Some(ext) = file.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    if !matches!(ext, "wasm" | "js" | "css") {
        return false;
    }
    let Some(stem) = file.file_stem().and_then(|stem| stem.to_str()) else {
        return false;
    };

    stem.split(['-', '_', '.'])
        .any(|part| part.len() >= 8 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::dataset::DamageDataset;

    #[test]
    fn fingerprinted_bundle_is_immutable() {
        assert_eq!(
            cache_control_for_path("/dominica-client-9f2c41d07ab3e512_bg.wasm"),
            Some("public, max-age=31536000, immutable")
        );
        assert_eq!(
            cache_control_for_path("/styles-5b7e0c1d2a3f4e6b.css"),
            Some("public, max-age=31536000, immutable")
        );
    }

    #[test]
    fn data_files_get_short_cache() {
        assert_eq!(
            cache_control_for_path("/data/hexagons.geojson"),
            Some("public, max-age=3600")
        );
    }

    #[test]
    fn html_and_plain_scripts_are_not_overridden() {
        assert_eq!(cache_control_for_path("/"), None);
        assert_eq!(cache_control_for_path("/index.html"), None);
        assert_eq!(cache_control_for_path("/mapbox-setup.js"), None);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let app = temp_env::with_var(
            "ALLOWED_ORIGINS",
            Some("https://dashboard.example"),
            || build_app(AppState::new(DamageDataset::default())),
        );

        let allowed = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/test")
                    .header(header::ORIGIN, "https://dashboard.example")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("route request");
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(
            allowed
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("https://dashboard.example")
        );

        let denied = app
            .oneshot(
                Request::builder()
                    .uri("/api/test")
                    .header(header::ORIGIN, "https://elsewhere.example")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("route request");
        assert!(
            denied
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }
}
