use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

use super::signature::SIGNATURE_HEADER;

const DEFAULT_ORIGINS: &str = "http://localhost:3000";

/// Build a CORS layer from the `BRIDGE_CORS_ORIGINS` env var.
///
/// - Origins: comma-separated list (default: `http://localhost:3000`)
/// - Methods: GET, POST, OPTIONS
/// - Headers: Content-Type, x-bridge-signature
/// - Max age: 3600s
pub fn build_cors_layer() -> CorsLayer {
    let origins =
        std::env::var("BRIDGE_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());
    cors_layer_for(&origins)
}

pub fn cors_layer_for(origins: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = parse_origins(origins)
        .into_iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static(SIGNATURE_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

fn parse_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_origins(" https://inbox.example.com , ,http://localhost:3000"),
            vec!["https://inbox.example.com", "http://localhost:3000"]
        );
    }

    #[tokio::test]
    async fn preflight_allows_configured_origin() {
        let app = Router::new()
            .route("/v1/events", post(|| async { StatusCode::OK }))
            .layer(cors_layer_for("https://inbox.example.com"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/v1/events")
                    .header("origin", "https://inbox.example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("https://inbox.example.com")
        );
    }
}
