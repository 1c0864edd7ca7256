use std::collections::BTreeMap;

use deskbridge_core::events::{InboundEvent, PanelResponse, SessionFields};
use deskbridge_core::panel::{Element, Panel, TextStyle};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::util::{RequestBody, api_request, exit_error, print_json};

const SIGNATURE_HEADER: &str = "x-bridge-signature";

#[derive(clap::Args)]
pub struct EventArgs {
    /// Action id, e.g. "home", "create_ticket", "select_ticket:42"
    #[arg(long, default_value = "")]
    action_id: String,
    /// Form value as key=value (repeatable)
    #[arg(long = "value", value_name = "KEY=VALUE")]
    values: Vec<String>,
    /// Session email
    #[arg(long)]
    email: Option<String>,
    /// Session display name
    #[arg(long)]
    name: Option<String>,
    /// Conversation thread id
    #[arg(long)]
    thread_id: Option<String>,
    /// Sign the body with the shared secret
    #[arg(long)]
    sign: bool,
    #[arg(long, env = "BRIDGE_SIGNING_SECRET", hide_env_values = true)]
    secret: Option<String>,
    /// Print the raw JSON reply instead of rendering the panel
    #[arg(long)]
    raw: bool,
}

pub async fn run(api_url: &str, args: EventArgs) -> i32 {
    let form_values = match parse_values(&args.values) {
        Ok(values) => values,
        Err(bad) => exit_error(
            &format!("Invalid --value '{bad}'"),
            Some("Use --value key=value, e.g. --value subject=Printer"),
        ),
    };

    let event = InboundEvent {
        action_id: args.action_id,
        form_values: (!form_values.is_empty()).then(|| form_values.into_iter().collect()),
        session: SessionFields {
            email: args.email,
            name: args.name,
            thread_id: args.thread_id,
        },
    };
    let body = match serde_json::to_vec(&event) {
        Ok(body) => body,
        Err(e) => exit_error(&format!("Could not encode event: {e}"), None),
    };

    let mut headers = Vec::new();
    if args.sign {
        let Some(secret) = args.secret.as_deref() else {
            exit_error(
                "--sign needs a signing secret",
                Some("Set --secret or BRIDGE_SIGNING_SECRET"),
            );
        };
        headers.push((SIGNATURE_HEADER.to_string(), sign(secret, &body)));
    }

    let response = match api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/events",
        RequestBody::Json(body),
        &headers,
    )
    .await
    {
        Ok(response) => response,
        Err(code) => return code,
    };

    match serde_json::from_value::<PanelResponse>(response.body.clone()) {
        Ok(reply) if !args.raw && response.exit_code == 0 => print!("{}", render(&reply.panel)),
        _ => print_json(&response.body),
    }
    response.exit_code
}

/// Split `key=value` pairs; returns the first malformed entry on failure.
fn parse_values(values: &[String]) -> Result<BTreeMap<String, String>, String> {
    values
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(pair.clone()),
        })
        .collect()
}

fn sign(secret: &str, body: &[u8]) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        exit_error("Signing secret rejected", None);
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Plain-text rendering of a panel for the terminal.
fn render(panel: &Panel) -> String {
    let mut out = String::new();
    for element in panel.elements() {
        match element {
            Element::Text { text, style } => match style {
                TextStyle::Heading => out.push_str(&format!("== {text} ==\n")),
                TextStyle::Error => out.push_str(&format!("! {text}\n")),
                _ => out.push_str(&format!("{text}\n")),
            },
            Element::Input {
                name,
                label,
                required,
                ..
            } => {
                let marker = if *required { "*" } else { "" };
                let value = panel.value(name).unwrap_or_default();
                out.push_str(&format!("[{name}] {label}{marker}: {value}\n"));
                if let Some(error) = panel.error(name) {
                    out.push_str(&format!("  ! {error}\n"));
                }
            }
            Element::Choice {
                name,
                label,
                options,
            } => {
                let selected = panel.value(name);
                let options: Vec<String> = options
                    .iter()
                    .map(|option| {
                        if Some(option.value.as_str()) == selected {
                            format!("({})", option.label)
                        } else {
                            option.label.clone()
                        }
                    })
                    .collect();
                out.push_str(&format!("[{name}] {label}: {}\n", options.join(" | ")));
            }
            Element::Action {
                action_id, label, ..
            } => out.push_str(&format!("  > {label}  ({action_id})\n")),
            Element::Spacer => out.push('\n'),
        }
    }
    out
}
