use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router, middleware};
use deskbridge_core::events::{InboundEvent, PanelResponse};

use crate::extract::AppJson;
use crate::middleware::signature;
use crate::responder::ReplySource;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/events", post(handle_event))
        .route_layer(middleware::from_fn_with_state(state, signature::verify))
}

/// Handle one widget interaction and return the panel to render next
///
/// Always answers within the configured deadline. Slow work continues in the
/// background and reports back into the conversation.
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = InboundEvent,
    responses(
        (status = 200, description = "Panel to render", body = PanelResponse),
        (status = 400, description = "Malformed event body", body = deskbridge_core::error::ApiError),
        (status = 401, description = "Missing or invalid signature", body = deskbridge_core::error::ApiError),
        (status = 429, description = "Rate limited", body = deskbridge_core::error::ApiError)
    ),
    tag = "events"
)]
pub async fn handle_event(
    State(state): State<AppState>,
    AppJson(event): AppJson<InboundEvent>,
) -> Json<PanelResponse> {
    let reply = state.engine.handle_event(event).await;
    if reply.source == ReplySource::Deadline {
        tracing::info!("event answered with deadline fallback");
    }
    Json(PanelResponse { panel: reply.panel })
}
