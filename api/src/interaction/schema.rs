use deskbridge_core::records::FieldChoice;

use super::validate::{MAILBOX, PRIORITY, STATUS};
use crate::upstream::{TicketingApi, UpstreamError};

/// Choice lists for the create form, resolved from the ticketing field schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketSchema {
    pub status: Vec<FieldChoice>,
    pub priority: Vec<FieldChoice>,
    pub mailbox: Vec<FieldChoice>,
}

impl TicketSchema {
    /// List the fields, then fetch choices for the ones the form renders.
    /// Fields missing from the schema render without a choice list.
    pub async fn load(ticketing: &dyn TicketingApi) -> Result<Self, UpstreamError> {
        let fields = ticketing.list_fields().await?;
        let mut schema = TicketSchema::default();
        for field in fields {
            let slot = match field.name.as_str() {
                STATUS => &mut schema.status,
                PRIORITY => &mut schema.priority,
                MAILBOX => &mut schema.mailbox,
                _ => continue,
            };
            *slot = ticketing.field(field.id).await?.choices;
        }
        Ok(schema)
    }

    pub fn choices(&self) -> [(&'static str, &'static str, &[FieldChoice]); 3] {
        [
            (STATUS, "Status", self.status.as_slice()),
            (PRIORITY, "Priority", self.priority.as_slice()),
            (MAILBOX, "Mailbox", self.mailbox.as_slice()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTicketing;

    #[tokio::test]
    async fn schema_resolves_choice_lists() {
        let ticketing = FakeTicketing::default();
        let schema = TicketSchema::load(&ticketing).await.expect("schema loads");
        assert_eq!(schema.status.len(), 2);
        assert_eq!(schema.priority[1].label, "High");
        assert_eq!(schema.mailbox[0].value, "10");
    }

    #[tokio::test]
    async fn schema_failure_surfaces() {
        let ticketing = FakeTicketing::default();
        ticketing.fail_schema_with(UpstreamError::Timeout { service: "ticketing" });
        assert!(TicketSchema::load(&ticketing).await.is_err());
    }
}
