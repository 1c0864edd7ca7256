use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A rendered UI panel returned to the inbox for every inbound event.
///
/// Panels are values: they are assembled once through [`PanelBuilder`] and never
/// mutated afterwards. Re-rendering a form means building a new panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Panel {
    elements: Vec<Element>,
    /// Pre-filled input values keyed by input name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<BTreeMap<String, String>>,
    /// Field-level validation messages keyed by input name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, String>>,
}

impl Panel {
    pub fn builder() -> PanelBuilder {
        PanelBuilder::default()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn values(&self) -> Option<&BTreeMap<String, String>> {
        self.values.as_ref()
    }

    pub fn errors(&self) -> Option<&BTreeMap<String, String>> {
        self.errors.as_ref()
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.as_ref()?.get(name).map(String::as_str)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.as_ref()?.get(name).map(String::as_str)
    }

    /// Action ids of every trigger on the panel, in display order.
    pub fn action_ids(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|element| match element {
                Element::Action { action_id, .. } => Some(action_id.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_action(&self, action_id: &str) -> bool {
        self.action_ids().contains(&action_id)
    }

    /// True when any text element contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.elements.iter().any(|element| match element {
            Element::Text { text, .. } => text.contains(needle),
            _ => false,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    #[default]
    Plain,
    Heading,
    Muted,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    #[default]
    Primary,
    Secondary,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// One display element. Serialized with a `type` tag so the inbox can dispatch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text {
        text: String,
        #[serde(default)]
        style: TextStyle,
    },
    Input {
        name: String,
        label: String,
        #[serde(default)]
        required: bool,
        #[serde(default)]
        multiline: bool,
    },
    Choice {
        name: String,
        label: String,
        options: Vec<ChoiceOption>,
    },
    Action {
        #[serde(rename = "actionId")]
        action_id: String,
        label: String,
        #[serde(default)]
        style: ActionStyle,
    },
    Spacer,
}

#[derive(Debug, Default)]
pub struct PanelBuilder {
    elements: Vec<Element>,
    values: BTreeMap<String, String>,
    errors: BTreeMap<String, String>,
}

impl PanelBuilder {
    pub fn text(self, text: impl Into<String>) -> Self {
        self.styled_text(text, TextStyle::Plain)
    }

    pub fn heading(self, text: impl Into<String>) -> Self {
        self.styled_text(text, TextStyle::Heading)
    }

    pub fn styled_text(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.elements.push(Element::Text {
            text: text.into(),
            style,
        });
        self
    }

    pub fn input(mut self, name: &str, label: &str, required: bool) -> Self {
        self.elements.push(Element::Input {
            name: name.to_string(),
            label: label.to_string(),
            required,
            multiline: false,
        });
        self
    }

    pub fn textarea(mut self, name: &str, label: &str) -> Self {
        self.elements.push(Element::Input {
            name: name.to_string(),
            label: label.to_string(),
            required: false,
            multiline: true,
        });
        self
    }

    pub fn choice(mut self, name: &str, label: &str, options: Vec<ChoiceOption>) -> Self {
        self.elements.push(Element::Choice {
            name: name.to_string(),
            label: label.to_string(),
            options,
        });
        self
    }

    pub fn action(self, action_id: impl Into<String>, label: impl Into<String>) -> Self {
        self.styled_action(action_id, label, ActionStyle::Primary)
    }

    pub fn styled_action(
        mut self,
        action_id: impl Into<String>,
        label: impl Into<String>,
        style: ActionStyle,
    ) -> Self {
        self.elements.push(Element::Action {
            action_id: action_id.into(),
            label: label.into(),
            style,
        });
        self
    }

    pub fn spacer(mut self) -> Self {
        self.elements.push(Element::Spacer);
        self
    }

    pub fn value(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn field_error(mut self, name: &str, message: impl Into<String>) -> Self {
        self.errors.insert(name.to_string(), message.into());
        self
    }

    pub fn build(self) -> Panel {
        Panel {
            elements: self.elements,
            values: (!self.values.is_empty()).then_some(self.values),
            errors: (!self.errors.is_empty()).then_some(self.errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_maps_are_omitted_from_json() {
        let panel = Panel::builder().text("hello").build();
        let json = serde_json::to_value(&panel).expect("panel should serialize");
        assert!(json.get("values").is_none());
        assert!(json.get("errors").is_none());
        assert_eq!(json["elements"][0]["type"], "text");
        assert_eq!(json["elements"][0]["style"], "plain");
    }

    #[test]
    fn action_elements_use_camel_case_id() {
        let panel = Panel::builder()
            .action("create_ticket", "Create ticket")
            .spacer()
            .build();
        let json = serde_json::to_value(&panel).expect("panel should serialize");
        assert_eq!(json["elements"][0]["actionId"], "create_ticket");
        assert_eq!(json["elements"][1]["type"], "spacer");
        assert!(panel.has_action("create_ticket"));
    }

    #[test]
    fn values_and_errors_are_addressable_by_name() {
        let panel = Panel::builder()
            .input("subject", "Subject", true)
            .value("subject", "Printer on fire")
            .field_error("email", "Email is required")
            .build();
        assert_eq!(panel.value("subject"), Some("Printer on fire"));
        assert_eq!(panel.error("email"), Some("Email is required"));
        assert_eq!(panel.error("subject"), None);
    }
}
