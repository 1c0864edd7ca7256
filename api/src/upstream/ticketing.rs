use async_trait::async_trait;
use deskbridge_core::records::{Attachment, NewTicket, Ticket, TicketField};
use serde_json::json;

use super::{UpstreamError, UpstreamHttp};
use crate::config::UpstreamEndpoint;

const SERVICE: &str = "ticketing";

/// Operations the bridge needs from the ticketing system.
#[async_trait]
pub trait TicketingApi: Send + Sync {
    /// Most recent tickets for `email`, newest first, at most `limit` of them.
    async fn list_tickets(&self, email: &str, limit: usize) -> Result<Vec<Ticket>, UpstreamError>;

    async fn list_fields(&self) -> Result<Vec<TicketField>, UpstreamError>;

    /// One field including its choice list.
    async fn field(&self, field_id: u64) -> Result<TicketField, UpstreamError>;

    async fn create_ticket(
        &self,
        ticket: &NewTicket,
        attachments: &[Attachment],
    ) -> Result<Ticket, UpstreamError>;

    async fn add_note(
        &self,
        ticket_id: u64,
        body: &str,
        attachments: &[Attachment],
    ) -> Result<(), UpstreamError>;
}

/// Ticketing API over HTTP. Authenticates with the API key as the Basic-auth user name.
pub struct HttpTicketingApi {
    http: UpstreamHttp,
    base_url: url::Url,
    api_key: String,
}

impl HttpTicketingApi {
    pub fn new(http: UpstreamHttp, endpoint: &UpstreamEndpoint) -> Self {
        Self {
            http,
            base_url: endpoint.base_url.clone(),
            api_key: endpoint.credential.clone(),
        }
    }

    fn url(&self, path: &str) -> Result<url::Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|err| UpstreamError::Transport {
                service: SERVICE,
                message: format!("invalid url for '{path}': {err}"),
            })
    }

    fn get(&self, url: url::Url) -> reqwest::RequestBuilder {
        self.http
            .client()
            .get(url)
            .basic_auth(&self.api_key, Some("X"))
    }

    fn post(&self, url: url::Url) -> reqwest::RequestBuilder {
        self.http
            .client()
            .post(url)
            .basic_auth(&self.api_key, Some("X"))
    }
}

fn attachment_part(attachment: &Attachment) -> Result<reqwest::multipart::Part, UpstreamError> {
    reqwest::multipart::Part::bytes(attachment.bytes.clone())
        .file_name(attachment.file_name.clone())
        .mime_str(&attachment.content_type)
        .map_err(|err| UpstreamError::Transport {
            service: SERVICE,
            message: format!("invalid content type '{}': {err}", attachment.content_type),
        })
}

fn ticket_form(
    ticket: &NewTicket,
    attachments: &[Attachment],
) -> Result<reqwest::multipart::Form, UpstreamError> {
    let mut form = reqwest::multipart::Form::new()
        .text("email", ticket.email.clone())
        .text("subject", ticket.subject.clone())
        .text("description", ticket.description.clone());
    let optional = [
        ("name", &ticket.name),
        ("status", &ticket.status),
        ("priority", &ticket.priority),
        ("mailbox", &ticket.mailbox),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            form = form.text(key, value.clone());
        }
    }
    for attachment in attachments {
        form = form.part("attachments[]", attachment_part(attachment)?);
    }
    Ok(form)
}

fn note_form(body: &str, attachments: &[Attachment]) -> Result<reqwest::multipart::Form, UpstreamError> {
    let mut form = reqwest::multipart::Form::new()
        .text("body", body.to_string())
        .text("private", "true");
    for attachment in attachments {
        form = form.part("attachments[]", attachment_part(attachment)?);
    }
    Ok(form)
}

#[async_trait]
impl TicketingApi for HttpTicketingApi {
    async fn list_tickets(&self, email: &str, limit: usize) -> Result<Vec<Ticket>, UpstreamError> {
        let mut url = self.url("tickets")?;
        url.query_pairs_mut()
            .append_pair("email", email)
            .append_pair("order", "desc")
            .append_pair("page_size", &limit.to_string())
            .append_pair("page", "1");

        let response = self
            .http
            .call_with_retry(|| Ok(self.get(url.clone())))
            .await?;
        let mut tickets: Vec<Ticket> = self.http.decode(response).await?;
        tickets.truncate(limit);
        Ok(tickets)
    }

    async fn list_fields(&self) -> Result<Vec<TicketField>, UpstreamError> {
        let url = self.url("fields")?;
        let response = self
            .http
            .call_with_retry(|| Ok(self.get(url.clone())))
            .await?;
        self.http.decode(response).await
    }

    async fn field(&self, field_id: u64) -> Result<TicketField, UpstreamError> {
        let url = self.url(&format!("fields/{field_id}"))?;
        let response = self
            .http
            .call_with_retry(|| Ok(self.get(url.clone())))
            .await?;
        self.http.decode(response).await
    }

    async fn create_ticket(
        &self,
        ticket: &NewTicket,
        attachments: &[Attachment],
    ) -> Result<Ticket, UpstreamError> {
        let url = self.url("tickets")?;
        let response = self
            .http
            .call_with_retry(|| {
                let request = self.post(url.clone());
                if attachments.is_empty() {
                    Ok(request.json(ticket))
                } else {
                    Ok(request.multipart(ticket_form(ticket, attachments)?))
                }
            })
            .await?;
        let created: Ticket = self.http.decode(response).await?;
        tracing::info!(ticket_id = created.id, attachments = attachments.len(), "ticket created");
        Ok(created)
    }

    async fn add_note(
        &self,
        ticket_id: u64,
        body: &str,
        attachments: &[Attachment],
    ) -> Result<(), UpstreamError> {
        let url = self.url(&format!("tickets/{ticket_id}/notes"))?;
        self.http
            .call_with_retry(|| {
                let request = self.post(url.clone());
                if attachments.is_empty() {
                    Ok(request.json(&json!({ "body": body, "private": true })))
                } else {
                    Ok(request.multipart(note_form(body, attachments)?))
                }
            })
            .await?;
        Ok(())
    }
}
