//! The interaction state machine.
//!
//! Every inbound event is parsed into an [`Action`] and handled as a standalone command
//! against whatever session state currently exists. There is no stored "current state":
//! the cursor and marker stores are the only memory between events.

pub mod action;
pub mod panels;
pub mod schema;
mod tasks;
pub mod validate;

use std::collections::HashMap;
use std::sync::Arc;

use deskbridge_core::events::InboundEvent;
use deskbridge_core::panel::Panel;
use tokio::sync::RwLock;

pub use self::action::Action;
use self::schema::TicketSchema;
use self::tasks::MarkerRef;
use crate::notifier::CompletionNotifier;
use crate::responder::{BackgroundTask, DeadlineResponder, Reply};
use crate::session::{
    CursorStore, ListView, MarkerStore, Operation, PageWindow, SessionContext,
};
use crate::upstream::{MessagingApi, TicketingApi, UpstreamError};

/// Outcome of handling one action.
#[derive(Debug)]
pub enum Transition {
    Immediate(Panel),
    /// Reply with the panel now, run the task after the reply is sent.
    Deferred(Panel, BackgroundTask),
    /// A recoverable failure, rendered with a retry affordance.
    Error(Panel),
}

impl Transition {
    pub fn into_parts(self) -> (Panel, Option<BackgroundTask>) {
        match self {
            Transition::Immediate(panel) | Transition::Error(panel) => (panel, None),
            Transition::Deferred(panel, task) => (panel, Some(task)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("no list state for session {key}")]
    SessionLost { key: String },
}

impl InteractionError {
    fn panel(&self, retry_action: &str) -> Panel {
        match self {
            InteractionError::SessionLost { .. } => panels::session_expired(),
            InteractionError::Upstream(UpstreamError::Rejected { .. }) => panels::error(
                "The ticketing system rejected the request.",
                retry_action,
            ),
            InteractionError::Upstream(err) => panels::error(
                &format!("{err}. Please try again in a moment."),
                retry_action,
            ),
        }
    }
}

#[derive(Clone)]
pub struct InteractionEngine {
    ticketing: Arc<dyn TicketingApi>,
    messaging: Arc<dyn MessagingApi>,
    cursors: CursorStore,
    markers: MarkerStore,
    notifier: CompletionNotifier,
    responder: DeadlineResponder,
    /// Last schema fetched, used to re-render the create form without an upstream call.
    schema: Arc<RwLock<Option<TicketSchema>>>,
}

impl InteractionEngine {
    pub fn new(
        ticketing: Arc<dyn TicketingApi>,
        messaging: Arc<dyn MessagingApi>,
        cursors: CursorStore,
        markers: MarkerStore,
        responder: DeadlineResponder,
    ) -> Self {
        Self {
            notifier: CompletionNotifier::new(messaging.clone()),
            ticketing,
            messaging,
            cursors,
            markers,
            responder,
            schema: Arc::new(RwLock::new(None)),
        }
    }

    pub fn responder(&self) -> &DeadlineResponder {
        &self.responder
    }

    /// Parse, handle and reply to one inbound event. Always produces exactly one panel.
    pub async fn handle_event(&self, event: InboundEvent) -> Reply {
        let form = event.form_values.unwrap_or_default();
        let action = Action::parse(&event.action_id, &form);
        let ctx = SessionContext::from_fields(&event.session);
        tracing::info!(
            action_id = %event.action_id,
            action = action.name(),
            session_key = ctx.log_key(),
            "inbound event"
        );

        let fallback = self.deadline_fallback(&action, &form, &ctx);
        let engine = self.clone();
        let work = {
            let action = action.clone();
            let form = form.clone();
            let ctx = ctx.clone();
            async move { engine.handle(action, form, ctx).await }
        };
        self.responder.run(work, fallback).await
    }

    pub async fn handle(
        &self,
        action: Action,
        form: HashMap<String, String>,
        ctx: SessionContext,
    ) -> Transition {
        let outcome = match &action {
            Action::Home => self.fresh_home(&ctx).await.map(Transition::Immediate),
            Action::StartCreate => self.start_create(&ctx).await,
            Action::SubmitCreate => Ok(self.submit_create(&form, &ctx).await),
            Action::BrowseExisting => self.browse(&ctx).await,
            Action::SelectTarget { ticket_id } => Ok(self.select_target(*ticket_id, &ctx).await),
            Action::LoadMore => self.load_more(&ctx).await,
            Action::ConfirmCommit { ticket_id } => Ok(self.confirm_commit(*ticket_id, &ctx).await),
            Action::Back => self.cached_home(&ctx).await.map(Transition::Immediate),
            Action::Unknown(raw) => {
                tracing::debug!(action_id = %raw, session_key = ctx.log_key(), "unrecognized action");
                Ok(Transition::Immediate(panels::fallback()))
            }
        };

        outcome.unwrap_or_else(|err| {
            tracing::warn!(
                action = action.name(),
                session_key = ctx.log_key(),
                error = %err,
                "interaction failed"
            );
            Transition::Error(err.panel(&retry_action(&action)))
        })
    }

    /// Home view with a new upstream fetch. No email means an empty list.
    async fn fresh_home(&self, ctx: &SessionContext) -> Result<Panel, InteractionError> {
        let window = self.start_list(ctx, ListView::Home).await?;
        Ok(self.render_home(ctx, &window).await)
    }

    /// Home view from the cached cursor, fetching only when nothing is cached.
    async fn cached_home(&self, ctx: &SessionContext) -> Result<Panel, InteractionError> {
        if let Some(key) = ctx.key() {
            if let Some(window) = self.cursors.current(key).await {
                return Ok(self.render_home(ctx, &window).await);
            }
        }
        self.fresh_home(ctx).await
    }

    async fn render_home(&self, ctx: &SessionContext, window: &PageWindow) -> Panel {
        let marker = match ctx.key() {
            Some(key) => self.markers.current(key).await,
            None => None,
        };
        panels::home(ctx, window, marker.as_ref())
    }

    async fn start_list(
        &self,
        ctx: &SessionContext,
        view: ListView,
    ) -> Result<PageWindow, InteractionError> {
        let Some(key) = ctx.key() else {
            return Ok(PageWindow::empty(view));
        };
        let ticketing = self.ticketing.clone();
        let email = key.to_string();
        let window = self
            .cursors
            .start_list(key, view, move |cap| async move {
                ticketing.list_tickets(&email, cap).await
            })
            .await?;
        Ok(window)
    }

    async fn start_create(&self, ctx: &SessionContext) -> Result<Transition, InteractionError> {
        let schema = TicketSchema::load(self.ticketing.as_ref()).await?;
        *self.schema.write().await = Some(schema.clone());

        let mut values = HashMap::new();
        if let Some(email) = &ctx.email {
            values.insert(validate::EMAIL.to_string(), email.clone());
        }
        if let Some(name) = &ctx.name {
            values.insert(validate::NAME.to_string(), name.clone());
        }
        if let Some(subject) = self.thread_subject(ctx).await {
            values.insert(validate::SUBJECT.to_string(), subject);
        }

        Ok(Transition::Immediate(panels::create_form(
            Some(&schema),
            &values,
            &validate::FieldErrors::new(),
        )))
    }

    async fn thread_subject(&self, ctx: &SessionContext) -> Option<String> {
        let thread_id = ctx.thread_id.as_deref()?;
        match self.messaging.fetch_thread(thread_id).await {
            Ok(thread) => thread.subject,
            Err(err) => {
                tracing::debug!(thread_id, error = %err, "thread subject unavailable");
                None
            }
        }
    }

    async fn submit_create(
        &self,
        form: &HashMap<String, String>,
        ctx: &SessionContext,
    ) -> Transition {
        let ticket = match validate::new_ticket(form) {
            Ok(ticket) => ticket,
            Err(errors) => {
                tracing::debug!(
                    session_key = ctx.log_key(),
                    fields = ?errors.keys().collect::<Vec<_>>(),
                    "create form rejected"
                );
                let schema = self.schema.read().await.clone();
                return Transition::Immediate(panels::create_form(schema.as_ref(), form, &errors));
            }
        };

        let key = ctx.key().unwrap_or(ticket.email.as_str()).to_string();
        let marker = self.markers.mark_pending(&key, Operation::Create).await;
        let interim = self.interim_home(ctx).await;
        let task = tasks::create_ticket(
            self.clone(),
            ctx.clone(),
            Some(MarkerRef {
                key: key.clone(),
                id: marker.id,
            }),
            ticket,
        );
        Transition::Deferred(interim, BackgroundTask::new("create_ticket", key, task))
    }

    async fn browse(&self, ctx: &SessionContext) -> Result<Transition, InteractionError> {
        let window = self.start_list(ctx, ListView::Browse).await?;
        Ok(Transition::Immediate(panels::browse(&window)))
    }

    async fn select_target(&self, ticket_id: u64, ctx: &SessionContext) -> Transition {
        let ticket = match ctx.key() {
            Some(key) => self.cursors.peek(key).await.and_then(|cursor| {
                cursor.items.into_iter().find(|ticket| ticket.id == ticket_id)
            }),
            None => None,
        };
        Transition::Immediate(panels::confirm_link(ticket_id, ticket.as_ref()))
    }

    /// Without an email there is no list to extend, so the empty browse view is shown.
    async fn load_more(&self, ctx: &SessionContext) -> Result<Transition, InteractionError> {
        let Some(key) = ctx.key() else {
            return Ok(Transition::Immediate(panels::browse(&PageWindow::empty(
                ListView::Browse,
            ))));
        };
        let window =
            self.cursors
                .next_page(key)
                .await
                .ok_or_else(|| InteractionError::SessionLost {
                    key: key.to_string(),
                })?;
        tracing::debug!(
            session_key = key,
            added = window.added.len(),
            has_more = window.has_more,
            "list window advanced"
        );
        let panel = match window.view {
            ListView::Home => self.render_home(ctx, &window).await,
            ListView::Browse => panels::browse(&window),
        };
        Ok(Transition::Immediate(panel))
    }

    async fn confirm_commit(&self, ticket_id: u64, ctx: &SessionContext) -> Transition {
        let marker = match ctx.key() {
            Some(key) => {
                let marker = self
                    .markers
                    .mark_pending(key, Operation::Link { ticket_id })
                    .await;
                Some(MarkerRef {
                    key: key.to_string(),
                    id: marker.id,
                })
            }
            None => None,
        };
        let interim = self.interim_home(ctx).await;
        let task = tasks::link_ticket(self.clone(), ctx.clone(), marker, ticket_id);
        Transition::Deferred(
            interim,
            BackgroundTask::new("link_ticket", ctx.log_key(), task),
        )
    }

    /// Home panel for a deferred reply. An upstream failure here must not block the
    /// mutation, so it degrades to an empty list.
    async fn interim_home(&self, ctx: &SessionContext) -> Panel {
        match self.cached_home(ctx).await {
            Ok(panel) => panel,
            Err(err) => {
                tracing::warn!(session_key = ctx.log_key(), error = %err, "interim list unavailable");
                self.render_home(ctx, &PageWindow::empty(ListView::Home)).await
            }
        }
    }

    /// The panel sent when the deadline wins: home rebuilt from cached state only, with
    /// the initiating mutation marked pending so a refresh shows its progress.
    async fn deadline_fallback(
        &self,
        action: &Action,
        form: &HashMap<String, String>,
        ctx: &SessionContext,
    ) -> Panel {
        let Some(key) = ctx.key() else {
            return panels::home(ctx, &PageWindow::empty(ListView::Home), None);
        };

        let operation = match action {
            Action::SubmitCreate if validate::new_ticket(form).is_ok() => Some(Operation::Create),
            Action::ConfirmCommit { ticket_id } => Some(Operation::Link {
                ticket_id: *ticket_id,
            }),
            _ => None,
        };
        if let Some(operation) = operation {
            self.markers.ensure_pending(key, operation).await;
        }

        let window = self
            .cursors
            .current(key)
            .await
            .unwrap_or_else(|| PageWindow::empty(ListView::Home));
        self.render_home(ctx, &window).await
    }
}

fn retry_action(action: &Action) -> String {
    match action {
        Action::SelectTarget { ticket_id } => action::select_ticket(*ticket_id),
        Action::ConfirmCommit { ticket_id } => action::confirm_link(*ticket_id),
        // Load-more failures are session losses; reload the list instead.
        Action::LoadMore => action::REFRESH.to_string(),
        other => other.name().to_string(),
    }
}
