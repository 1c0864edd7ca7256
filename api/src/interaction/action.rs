use std::collections::HashMap;

pub const HOME: &str = "home";
pub const REFRESH: &str = "refresh";
pub const CREATE_TICKET: &str = "create_ticket";
pub const SUBMIT_TICKET: &str = "submit_ticket";
pub const LINK_TICKET: &str = "link_ticket";
pub const SELECT_TICKET: &str = "select_ticket";
pub const LOAD_MORE: &str = "load_more";
pub const CONFIRM_LINK: &str = "confirm_link";
pub const CANCEL: &str = "cancel";
pub const BACK: &str = "back";

/// Form field carrying a ticket id when the action id has no `:{id}` suffix.
pub const TICKET_ID_FIELD: &str = "ticket_id";

/// Every action the engine recognizes, parsed once from the wire action id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Home,
    StartCreate,
    SubmitCreate,
    BrowseExisting,
    SelectTarget { ticket_id: u64 },
    LoadMore,
    ConfirmCommit { ticket_id: u64 },
    Back,
    Unknown(String),
}

impl Action {
    pub fn parse(action_id: &str, form: &HashMap<String, String>) -> Self {
        let raw = action_id.trim();
        let (name, suffix) = match raw.split_once(':') {
            Some((name, suffix)) => (name, Some(suffix)),
            None => (raw, None),
        };

        let ticket_id = || {
            suffix
                .filter(|s| !s.is_empty())
                .or_else(|| form.get(TICKET_ID_FIELD).map(String::as_str))
                .and_then(|id| id.trim().parse::<u64>().ok())
        };

        match (name, suffix) {
            ("" | HOME | REFRESH, None) => Action::Home,
            (CREATE_TICKET, None) => Action::StartCreate,
            (SUBMIT_TICKET, None) => Action::SubmitCreate,
            (LINK_TICKET, None) => Action::BrowseExisting,
            (LOAD_MORE, None) => Action::LoadMore,
            (CANCEL | BACK, None) => Action::Back,
            (SELECT_TICKET, _) => match ticket_id() {
                Some(ticket_id) => Action::SelectTarget { ticket_id },
                None => Action::Unknown(raw.to_string()),
            },
            (CONFIRM_LINK, _) => match ticket_id() {
                Some(ticket_id) => Action::ConfirmCommit { ticket_id },
                None => Action::Unknown(raw.to_string()),
            },
            _ => Action::Unknown(raw.to_string()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Home => HOME,
            Action::StartCreate => CREATE_TICKET,
            Action::SubmitCreate => SUBMIT_TICKET,
            Action::BrowseExisting => LINK_TICKET,
            Action::SelectTarget { .. } => SELECT_TICKET,
            Action::LoadMore => LOAD_MORE,
            Action::ConfirmCommit { .. } => CONFIRM_LINK,
            Action::Back => BACK,
            Action::Unknown(_) => "unknown",
        }
    }
}

pub fn select_ticket(ticket_id: u64) -> String {
    format!("{SELECT_TICKET}:{ticket_id}")
}

pub fn confirm_link(ticket_id: u64) -> String {
    format!("{CONFIRM_LINK}:{ticket_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(action_id: &str) -> Action {
        Action::parse(action_id, &HashMap::new())
    }

    #[test]
    fn plain_actions_parse() {
        assert_eq!(parse(""), Action::Home);
        assert_eq!(parse("refresh"), Action::Home);
        assert_eq!(parse("create_ticket"), Action::StartCreate);
        assert_eq!(parse("submit_ticket"), Action::SubmitCreate);
        assert_eq!(parse("link_ticket"), Action::BrowseExisting);
        assert_eq!(parse("load_more"), Action::LoadMore);
        assert_eq!(parse(" back "), Action::Back);
        assert_eq!(parse("cancel"), Action::Back);
    }

    #[test]
    fn ticket_id_comes_from_suffix_or_form() {
        assert_eq!(parse("select_ticket:42"), Action::SelectTarget { ticket_id: 42 });
        assert_eq!(parse(&confirm_link(7)), Action::ConfirmCommit { ticket_id: 7 });

        let form = HashMap::from([(TICKET_ID_FIELD.to_string(), "9".to_string())]);
        assert_eq!(
            Action::parse("confirm_link", &form),
            Action::ConfirmCommit { ticket_id: 9 }
        );
    }

    #[test]
    fn malformed_or_unknown_ids_fall_through() {
        assert_eq!(
            parse("select_ticket:abc"),
            Action::Unknown("select_ticket:abc".to_string())
        );
        assert_eq!(parse("confirm_link"), Action::Unknown("confirm_link".to_string()));
        assert_eq!(parse("home:1"), Action::Unknown("home:1".to_string()));
        assert_eq!(parse("launch_rocket"), Action::Unknown("launch_rocket".to_string()));
    }
}
