//! In-process fakes and a throwaway HTTP server for tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use deskbridge_core::records::{
    Attachment, FieldChoice, NewTicket, Thread, ThreadMessage, Ticket, TicketField,
};
use tokio::sync::Notify;

use crate::upstream::{MessagingApi, TicketingApi, UpstreamError};

/// Serve `app` on an ephemeral local port and return the base URL `http://addr{prefix}`.
pub async fn spawn_upstream(app: Router, prefix: &str) -> url::Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    url::Url::parse(&format!("http://{addr}{prefix}")).expect("valid test url")
}

pub fn ticket(id: u64, subject: &str) -> Ticket {
    Ticket {
        id,
        subject: subject.to_string(),
        status: Some("open".to_string()),
        created_at: None,
    }
}

pub fn tickets(n: u64) -> Vec<Ticket> {
    (1..=n).rev().map(|id| ticket(id, &format!("Ticket {id}"))).collect()
}

pub fn thread(id: &str, subject: &str) -> Thread {
    Thread {
        id: id.to_string(),
        subject: Some(subject.to_string()),
        messages: vec![ThreadMessage {
            author: "Ann".to_string(),
            body: "My order never arrived".to_string(),
            sent_at: None,
        }],
    }
}

#[derive(Default)]
struct MessagingState {
    thread: Option<Thread>,
    notes: Vec<(String, String)>,
    attempts: usize,
    note_failure: Option<UpstreamError>,
}

/// Messaging API double. Threads not configured answer 404.
#[derive(Default)]
pub struct FakeMessaging {
    state: Mutex<MessagingState>,
    posted: Notify,
}

impl FakeMessaging {
    pub fn with_thread(thread: Thread) -> Self {
        let fake = Self::default();
        fake.state.lock().expect("state").thread = Some(thread);
        fake
    }

    pub fn fail_notes_with(&self, err: UpstreamError) {
        self.state.lock().expect("state").note_failure = Some(err);
    }

    pub fn notes(&self) -> Vec<(String, String)> {
        self.state.lock().expect("state").notes.clone()
    }

    pub fn note_attempts(&self) -> usize {
        self.state.lock().expect("state").attempts
    }

    /// Wait until at least `count` notes have been attempted.
    pub async fn wait_for_notes(&self, count: usize) {
        loop {
            let notified = self.posted.notified();
            if self.note_attempts() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl MessagingApi for FakeMessaging {
    async fn fetch_thread(&self, thread_id: &str) -> Result<Thread, UpstreamError> {
        let state = self.state.lock().expect("state");
        match &state.thread {
            Some(thread) if thread.id == thread_id => Ok(thread.clone()),
            _ => Err(UpstreamError::from_status("messaging", 404, String::new())),
        }
    }

    async fn post_note(&self, thread_id: &str, body: &str) -> Result<(), UpstreamError> {
        let result = {
            let mut state = self.state.lock().expect("state");
            state.attempts += 1;
            match state.note_failure.clone() {
                Some(err) => Err(err),
                None => {
                    state.notes.push((thread_id.to_string(), body.to_string()));
                    Ok(())
                }
            }
        };
        self.posted.notify_waiters();
        result
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCreate {
    pub ticket: NewTicket,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNote {
    pub ticket_id: u64,
    pub body: String,
    pub attachments: Vec<String>,
}

struct TicketingState {
    tickets: Vec<Ticket>,
    fields: Vec<TicketField>,
    next_id: u64,
    list_calls: usize,
    list_failure: Option<UpstreamError>,
    schema_failure: Option<UpstreamError>,
    create_failure: Option<UpstreamError>,
    create_delay: Option<Duration>,
    list_delay: Option<Duration>,
    creates: Vec<RecordedCreate>,
    notes: Vec<RecordedNote>,
}

/// Ticketing API double with a small status/priority/mailbox schema.
pub struct FakeTicketing {
    state: Mutex<TicketingState>,
}

impl Default for FakeTicketing {
    fn default() -> Self {
        Self::with_tickets(Vec::new())
    }
}

fn choice_field(id: u64, name: &str, label: &str, choices: &[(&str, &str)]) -> TicketField {
    TicketField {
        id,
        name: name.to_string(),
        label: label.to_string(),
        kind: "choice".to_string(),
        choices: choices
            .iter()
            .map(|(value, label)| FieldChoice {
                value: value.to_string(),
                label: label.to_string(),
            })
            .collect(),
    }
}

impl FakeTicketing {
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        let fields = vec![
            choice_field(1, "status", "Status", &[("2", "Open"), ("3", "Pending")]),
            choice_field(2, "priority", "Priority", &[("1", "Low"), ("3", "High")]),
            choice_field(3, "mailbox", "Mailbox", &[("10", "Support"), ("11", "Billing")]),
        ];
        Self {
            state: Mutex::new(TicketingState {
                tickets,
                fields,
                next_id: 1000,
                list_calls: 0,
                list_failure: None,
                schema_failure: None,
                create_failure: None,
                create_delay: None,
                list_delay: None,
                creates: Vec::new(),
                notes: Vec::new(),
            }),
        }
    }

    pub fn fail_list_with(&self, err: UpstreamError) {
        self.state.lock().expect("state").list_failure = Some(err);
    }

    pub fn fail_schema_with(&self, err: UpstreamError) {
        self.state.lock().expect("state").schema_failure = Some(err);
    }

    pub fn fail_create_with(&self, err: UpstreamError) {
        self.state.lock().expect("state").create_failure = Some(err);
    }

    pub fn delay_create(&self, delay: Duration) {
        self.state.lock().expect("state").create_delay = Some(delay);
    }

    pub fn delay_list(&self, delay: Duration) {
        self.state.lock().expect("state").list_delay = Some(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().expect("state").list_calls
    }

    pub fn creates(&self) -> Vec<RecordedCreate> {
        self.state.lock().expect("state").creates.clone()
    }

    pub fn notes(&self) -> Vec<RecordedNote> {
        self.state.lock().expect("state").notes.clone()
    }
}

fn names(attachments: &[Attachment]) -> Vec<String> {
    attachments.iter().map(|a| a.file_name.clone()).collect()
}

#[async_trait]
impl TicketingApi for FakeTicketing {
    async fn list_tickets(&self, _email: &str, limit: usize) -> Result<Vec<Ticket>, UpstreamError> {
        let delay = self.state.lock().expect("state").list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().expect("state");
        state.list_calls += 1;
        if let Some(err) = state.list_failure.clone() {
            return Err(err);
        }
        Ok(state.tickets.iter().take(limit).cloned().collect())
    }

    async fn list_fields(&self) -> Result<Vec<TicketField>, UpstreamError> {
        let state = self.state.lock().expect("state");
        if let Some(err) = state.schema_failure.clone() {
            return Err(err);
        }
        Ok(state
            .fields
            .iter()
            .map(|field| TicketField {
                choices: Vec::new(),
                ..field.clone()
            })
            .collect())
    }

    async fn field(&self, field_id: u64) -> Result<TicketField, UpstreamError> {
        let state = self.state.lock().expect("state");
        state
            .fields
            .iter()
            .find(|field| field.id == field_id)
            .cloned()
            .ok_or_else(|| UpstreamError::from_status("ticketing", 404, String::new()))
    }

    async fn create_ticket(
        &self,
        ticket: &NewTicket,
        attachments: &[Attachment],
    ) -> Result<Ticket, UpstreamError> {
        let delay = self.state.lock().expect("state").create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().expect("state");
        if let Some(err) = state.create_failure.clone() {
            return Err(err);
        }
        state.next_id += 1;
        let created = Ticket {
            id: state.next_id,
            subject: ticket.subject.clone(),
            status: ticket.status.clone(),
            created_at: None,
        };
        state.creates.push(RecordedCreate {
            ticket: ticket.clone(),
            attachments: names(attachments),
        });
        state.tickets.insert(0, created.clone());
        Ok(created)
    }

    async fn add_note(
        &self,
        ticket_id: u64,
        body: &str,
        attachments: &[Attachment],
    ) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().expect("state");
        if !state.tickets.iter().any(|ticket| ticket.id == ticket_id) {
            return Err(UpstreamError::from_status("ticketing", 404, String::new()));
        }
        state.notes.push(RecordedNote {
            ticket_id,
            body: body.to_string(),
            attachments: names(attachments),
        });
        Ok(())
    }
}
