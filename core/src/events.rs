use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::panel::Panel;

/// One inbound UI interaction posted by the inbox.
///
/// Every step of a multi-screen interaction arrives as a standalone event; the only
/// continuity between steps is the action id and the echoed session identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    /// Opaque action id of the trigger the user activated (empty on first render)
    #[serde(default)]
    pub action_id: String,
    /// Current input values of the rendered panel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_values: Option<HashMap<String, String>>,
    /// Identity of the conversation the panel is attached to
    #[serde(default)]
    pub session: SessionFields,
}

impl InboundEvent {
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form_values.as_ref()?.get(name).map(String::as_str)
    }
}

/// Caller-supplied identity fields, echoed back on every event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// The single reply sent for an inbound event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PanelResponse {
    pub panel: Panel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_event_accepts_camel_case_payload() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"actionId":"submit_ticket","formValues":{"subject":"Hi"},
                "session":{"email":"ann@example.com","threadId":"T-9"}}"#,
        )
        .expect("event should parse");
        assert_eq!(event.action_id, "submit_ticket");
        assert_eq!(event.form_value("subject"), Some("Hi"));
        assert_eq!(event.session.thread_id.as_deref(), Some("T-9"));
        assert!(event.session.name.is_none());
    }

    #[test]
    fn inbound_event_tolerates_missing_fields() {
        let event: InboundEvent = serde_json::from_str("{}").expect("empty event should parse");
        assert!(event.action_id.is_empty());
        assert!(event.form_values.is_none());
        assert!(event.session.email.is_none());
    }
}
