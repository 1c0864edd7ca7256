use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-bridge-signature";

/// Largest event body accepted for signature checking.
const MAX_EVENT_BYTES: usize = 256 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// Constant-time check of a `sha256=<hex>` header value.
pub fn signature_matches(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(expected) = header
        .strip_prefix("sha256=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
    else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Reject inbound events whose signature does not match the raw body. A no-op when no
/// signing secret is configured.
pub async fn verify(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, AppError> {
    let Some(secret) = state.signing_secret.clone() else {
        return Ok(next.run(req).await);
    };

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_EVENT_BYTES)
        .await
        .map_err(|err| AppError::Validation {
            message: format!("Unreadable event body: {err}"),
            field: Some("body".to_string()),
            docs_hint: None,
        })?;

    let header = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {SIGNATURE_HEADER} header")))?;

    if !signature_matches(&secret, &bytes, header) {
        return Err(AppError::Unauthorized("Event signature does not match".to_string()));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
