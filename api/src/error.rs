use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deskbridge_core::error::{self, ApiError};

/// Errors raised at the HTTP boundary. Interaction outcomes never end up here; they
/// are always rendered as panels.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request body (400)
    Validation {
        message: String,
        field: Option<String>,
        docs_hint: Option<String>,
    },
    /// Missing or invalid event signature (401)
    Unauthorized(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Unauthorized(message) => {
                tracing::warn!(%message, "rejected unsigned or mis-signed event");
                (
                    StatusCode::UNAUTHORIZED,
                    ApiError {
                        error: error::codes::UNAUTHORIZED.to_string(),
                        message,
                        field: None,
                        request_id,
                        docs_hint: Some(
                            "Sign the raw body with HMAC-SHA256 and send it as x-bridge-signature: sha256=<hex>."
                                .to_string(),
                        ),
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unauthorized_maps_to_401_with_code() {
        let response = AppError::Unauthorized("missing signature".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["message"], "missing signature");
    }

    #[tokio::test]
    async fn validation_carries_field_hint() {
        let response = AppError::Validation {
            message: "Invalid event body".to_string(),
            field: Some("actionId".to_string()),
            docs_hint: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["field"], "actionId");
    }
}
