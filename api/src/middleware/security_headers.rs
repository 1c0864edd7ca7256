use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

/// Header baseline for a JSON-only API. Panels are per-session, so nothing is cacheable.
pub async fn apply(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::{Router, middleware};
    use tower::ServiceExt;

    #[tokio::test]
    async fn responses_carry_the_baseline() {
        let app = Router::new()
            .route("/v1/events", post(|| async { StatusCode::OK }))
            .layer(middleware::from_fn(super::apply));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/events")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        let headers = response.headers();
        assert_eq!(headers.get("x-content-type-options").expect("header"), "nosniff");
        assert_eq!(headers.get("cache-control").expect("header"), "no-store");
        assert_eq!(
            headers.get("content-security-policy").expect("header"),
            "default-src 'none'; frame-ancestors 'none'"
        );
    }
}
