use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use deskbridge_core::records::NewTicket;
use regex::Regex;

pub const EMAIL: &str = "email";
pub const NAME: &str = "name";
pub const SUBJECT: &str = "subject";
pub const DESCRIPTION: &str = "description";
pub const STATUS: &str = "status";
pub const PRIORITY: &str = "priority";
pub const MAILBOX: &str = "mailbox";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

/// Field-level messages keyed by input name.
pub type FieldErrors = BTreeMap<String, String>;

/// Check the create form and build the ticket payload. Nothing upstream is touched here.
pub fn new_ticket(form: &HashMap<String, String>) -> Result<NewTicket, FieldErrors> {
    let field = |name: &str| {
        form.get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    };

    let mut errors = FieldErrors::new();
    match field(EMAIL) {
        None => {
            errors.insert(EMAIL.to_string(), "Email is required".to_string());
        }
        Some(email) if !EMAIL_RE.is_match(email) => {
            errors.insert(EMAIL.to_string(), "Enter a valid email address".to_string());
        }
        Some(_) => {}
    }
    if field(SUBJECT).is_none() {
        errors.insert(SUBJECT.to_string(), "Subject is required".to_string());
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let owned = |name: &str| field(name).map(str::to_string);
    Ok(NewTicket {
        email: owned(EMAIL).unwrap_or_default().to_lowercase(),
        name: owned(NAME),
        subject: owned(SUBJECT).unwrap_or_default(),
        description: owned(DESCRIPTION).unwrap_or_default(),
        status: owned(STATUS),
        priority: owned(PRIORITY),
        mailbox: owned(MAILBOX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn valid_form_builds_ticket() {
        let ticket = new_ticket(&form(&[
            (EMAIL, " Ann@Example.com "),
            (SUBJECT, "Order missing"),
            (DESCRIPTION, "Never arrived"),
            (PRIORITY, "3"),
            (STATUS, ""),
        ]))
        .expect("form is valid");
        assert_eq!(ticket.email, "ann@example.com");
        assert_eq!(ticket.subject, "Order missing");
        assert_eq!(ticket.priority.as_deref(), Some("3"));
        assert_eq!(ticket.status, None);
        assert_eq!(ticket.name, None);
    }

    #[test]
    fn empty_email_is_required() {
        let errors = new_ticket(&form(&[(EMAIL, "  "), (SUBJECT, "Hi")])).expect_err("invalid");
        assert_eq!(errors.get(EMAIL).map(String::as_str), Some("Email is required"));
        assert!(!errors.contains_key(SUBJECT));
    }

    #[test]
    fn malformed_email_and_missing_subject_are_both_reported() {
        let errors = new_ticket(&form(&[(EMAIL, "ann@localhost")])).expect_err("invalid");
        assert_eq!(
            errors.get(EMAIL).map(String::as_str),
            Some("Enter a valid email address")
        );
        assert_eq!(errors.get(SUBJECT).map(String::as_str), Some("Subject is required"));
    }
}
