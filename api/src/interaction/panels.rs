//! Panel renderers. Pure functions of already-loaded state; nothing here calls upstream.

use std::collections::HashMap;

use deskbridge_core::panel::{ActionStyle, ChoiceOption, Panel, PanelBuilder, TextStyle};
use deskbridge_core::records::Ticket;

use super::action;
use super::schema::TicketSchema;
use super::validate::{DESCRIPTION, EMAIL, FieldErrors, NAME, SUBJECT};
use crate::session::{InFlightMarker, MarkerStatus, Operation, PageWindow, SessionContext};

fn ticket_line(ticket: &Ticket) -> String {
    match &ticket.status {
        Some(status) => format!("#{} {} ({status})", ticket.id, ticket.subject),
        None => format!("#{} {}", ticket.id, ticket.subject),
    }
}

fn marker_line(builder: PanelBuilder, marker: &InFlightMarker) -> PanelBuilder {
    match (&marker.status, marker.operation) {
        (MarkerStatus::Pending, Operation::Create) => {
            builder.styled_text("Your ticket is being created.", TextStyle::Muted)
        }
        (MarkerStatus::Pending, Operation::Link { ticket_id }) => builder.styled_text(
            format!("Linking this conversation to ticket #{ticket_id}."),
            TextStyle::Muted,
        ),
        (MarkerStatus::Done { ticket_id }, Operation::Create) => {
            builder.styled_text(format!("Ticket #{ticket_id} created."), TextStyle::Success)
        }
        (MarkerStatus::Done { ticket_id }, Operation::Link { .. }) => builder.styled_text(
            format!("Conversation linked to ticket #{ticket_id}."),
            TextStyle::Success,
        ),
        (MarkerStatus::Failed { error }, _) => {
            builder.styled_text(format!("Last request failed: {error}"), TextStyle::Error)
        }
    }
}

pub fn home(ctx: &SessionContext, window: &PageWindow, marker: Option<&InFlightMarker>) -> Panel {
    let mut builder = Panel::builder().heading("Tickets");
    if let Some(email) = &ctx.email {
        let who = match &ctx.name {
            Some(name) => format!("{name} <{email}>"),
            None => email.clone(),
        };
        builder = builder.styled_text(who, TextStyle::Muted);
    }
    if let Some(marker) = marker {
        builder = marker_line(builder, marker);
    }

    if window.visible.is_empty() {
        builder = builder.text("No tickets yet.");
    }
    for ticket in &window.visible {
        builder = builder.text(ticket_line(ticket));
    }
    if window.has_more {
        builder = builder.styled_action(action::LOAD_MORE, "Load more", ActionStyle::Link);
    }

    builder
        .spacer()
        .action(action::CREATE_TICKET, "Create ticket")
        .styled_action(action::LINK_TICKET, "Link to existing ticket", ActionStyle::Secondary)
        .build()
}

/// The create form. `values` pre-fills inputs; on a re-render they are the submitted ones.
pub fn create_form(
    schema: Option<&TicketSchema>,
    values: &HashMap<String, String>,
    errors: &FieldErrors,
) -> Panel {
    let mut builder = Panel::builder()
        .heading("Create ticket")
        .input(EMAIL, "Email", true)
        .input(NAME, "Name", false)
        .input(SUBJECT, "Subject", true)
        .textarea(DESCRIPTION, "Description");

    if let Some(schema) = schema {
        for (name, label, choices) in schema.choices() {
            if choices.is_empty() {
                continue;
            }
            let options = choices
                .iter()
                .map(|choice| ChoiceOption {
                    value: choice.value.clone(),
                    label: choice.label.clone(),
                })
                .collect();
            builder = builder.choice(name, label, options);
            if !values.contains_key(name) {
                builder = builder.value(name, choices[0].value.clone());
            }
        }
    }

    builder = builder.values(values.iter().map(|(k, v)| (k.clone(), v.clone())));
    for (name, message) in errors {
        builder = builder.field_error(name, message.clone());
    }

    builder
        .spacer()
        .action(action::SUBMIT_TICKET, "Create")
        .styled_action(action::CANCEL, "Cancel", ActionStyle::Secondary)
        .build()
}

pub fn browse(window: &PageWindow) -> Panel {
    let mut builder = Panel::builder().heading("Link to an existing ticket");
    if window.visible.is_empty() {
        builder = builder.text("No tickets found for this customer.");
    }
    for ticket in &window.visible {
        builder = builder.styled_action(
            action::select_ticket(ticket.id),
            ticket_line(ticket),
            ActionStyle::Link,
        );
    }
    if window.has_more {
        builder = builder.styled_action(action::LOAD_MORE, "Load more", ActionStyle::Secondary);
    }
    builder
        .spacer()
        .styled_action(action::BACK, "Back", ActionStyle::Secondary)
        .build()
}

pub fn confirm_link(ticket_id: u64, ticket: Option<&Ticket>) -> Panel {
    let target = match ticket {
        Some(ticket) => ticket_line(ticket),
        None => format!("#{ticket_id}"),
    };
    Panel::builder()
        .heading("Link conversation")
        .text(format!("Add this conversation to ticket {target}?"))
        .value(action::TICKET_ID_FIELD, ticket_id.to_string())
        .action(action::confirm_link(ticket_id), "Link")
        .styled_action(action::LINK_TICKET, "Choose another", ActionStyle::Secondary)
        .styled_action(action::CANCEL, "Cancel", ActionStyle::Secondary)
        .build()
}

/// A recoverable failure: what went wrong plus a way to try again.
pub fn error(message: &str, retry_action: &str) -> Panel {
    Panel::builder()
        .heading("Something went wrong")
        .styled_text(message, TextStyle::Error)
        .action(retry_action, "Try again")
        .styled_action(action::HOME, "Home", ActionStyle::Secondary)
        .build()
}

pub fn session_expired() -> Panel {
    Panel::builder()
        .heading("Session expired")
        .styled_text(
            "This list is no longer available. Reload to see the latest tickets.",
            TextStyle::Error,
        )
        .action(action::REFRESH, "Reload")
        .build()
}

pub fn fallback() -> Panel {
    Panel::builder()
        .text("Nothing to show for that action.")
        .action(action::HOME, "Home")
        .build()
}
