//! Background halves of the deferred transitions.
//!
//! Each task resolves its in-flight marker and reports the outcome through the
//! completion notifier. Failures end here; nothing is propagated to the request.

use deskbridge_core::records::{Attachment, NewTicket};
use uuid::Uuid;

use super::InteractionEngine;
use crate::session::{MarkerStatus, SessionContext};
use crate::transcript;

/// Marker to resolve when the work finishes.
#[derive(Debug, Clone)]
pub(super) struct MarkerRef {
    pub key: String,
    pub id: Uuid,
}

/// Fetch the conversation and render it as an attachment. A missing thread id or a
/// failed fetch means no transcript, never a failed task.
async fn transcript_for(engine: &InteractionEngine, ctx: &SessionContext) -> Vec<Attachment> {
    let Some(thread_id) = ctx.thread_id.as_deref() else {
        return Vec::new();
    };
    match engine.messaging.fetch_thread(thread_id).await {
        Ok(thread) => vec![transcript::as_attachment(&thread)],
        Err(err) => {
            tracing::warn!(
                session_key = ctx.log_key(),
                thread_id,
                error = %err,
                "thread unavailable, continuing without transcript"
            );
            Vec::new()
        }
    }
}

async fn resolve(engine: &InteractionEngine, marker: Option<&MarkerRef>, status: MarkerStatus) {
    if let Some(marker) = marker {
        engine.markers.resolve(&marker.key, marker.id, status).await;
    }
}

pub(super) async fn create_ticket(
    engine: InteractionEngine,
    ctx: SessionContext,
    marker: Option<MarkerRef>,
    ticket: NewTicket,
) {
    let attachments = transcript_for(&engine, &ctx).await;
    let message = match engine.ticketing.create_ticket(&ticket, &attachments).await {
        Ok(created) => {
            tracing::info!(
                session_key = ctx.log_key(),
                ticket_id = created.id,
                "ticket created from conversation"
            );
            // The cached list predates the new ticket.
            if let Some(key) = ctx.key() {
                engine.cursors.clear(key).await;
            }
            resolve(
                &engine,
                marker.as_ref(),
                MarkerStatus::Done {
                    ticket_id: created.id,
                },
            )
            .await;
            format!("Ticket #{} created: {}", created.id, created.subject)
        }
        Err(err) => {
            tracing::error!(session_key = ctx.log_key(), error = %err, "ticket creation failed");
            resolve(
                &engine,
                marker.as_ref(),
                MarkerStatus::Failed {
                    error: err.to_string(),
                },
            )
            .await;
            format!("Could not create a ticket for this conversation: {err}")
        }
    };
    engine.notifier.notify(ctx.thread_id.as_deref(), &message).await;
}

pub(super) async fn link_ticket(
    engine: InteractionEngine,
    ctx: SessionContext,
    marker: Option<MarkerRef>,
    ticket_id: u64,
) {
    let attachments = transcript_for(&engine, &ctx).await;
    let body = match ctx.thread_id.as_deref() {
        Some(thread_id) => format!("Conversation {thread_id} linked from chat."),
        None => "Conversation linked from chat.".to_string(),
    };
    let message = match engine
        .ticketing
        .add_note(ticket_id, &body, &attachments)
        .await
    {
        Ok(()) => {
            tracing::info!(session_key = ctx.log_key(), ticket_id, "conversation linked");
            resolve(&engine, marker.as_ref(), MarkerStatus::Done { ticket_id }).await;
            format!("Conversation linked to ticket #{ticket_id}.")
        }
        Err(err) => {
            tracing::error!(
                session_key = ctx.log_key(),
                ticket_id,
                error = %err,
                "linking conversation failed"
            );
            resolve(
                &engine,
                marker.as_ref(),
                MarkerStatus::Failed {
                    error: err.to_string(),
                },
            )
            .await;
            format!("Could not link this conversation to ticket #{ticket_id}: {err}")
        }
    };
    engine.notifier.notify(ctx.thread_id.as_deref(), &message).await;
}
