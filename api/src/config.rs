use std::time::Duration;

use crate::upstream::retry::RetryPolicy;

/// The inbox abandons a request after this long; the reply deadline must stay below it.
pub const CALLER_TIMEOUT_MS: u64 = 10_000;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DEADLINE_MS: u64 = 9_000;
const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BASE_DELAY_MS: u64 = 500;
const DEFAULT_LIST_FETCH_CAP: usize = 20;
const DEFAULT_LIST_PAGE_SIZE: usize = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct UpstreamEndpoint {
    pub base_url: url::Url,
    pub credential: String,
}

/// Listing knobs shared by the home and browse views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSettings {
    pub fetch_cap: usize,
    pub page_size: usize,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            fetch_cap: DEFAULT_LIST_FETCH_CAP,
            page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub port: u16,
    pub ticketing: UpstreamEndpoint,
    pub messaging: UpstreamEndpoint,
    pub signing_secret: Option<String>,
    pub deadline: Duration,
    pub upstream_timeout: Duration,
    pub retry: RetryPolicy,
    pub lists: ListSettings,
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let deadline_ms = parse_or(&get, "BRIDGE_DEADLINE_MS", DEFAULT_DEADLINE_MS)?;
        if deadline_ms == 0 || deadline_ms >= CALLER_TIMEOUT_MS {
            return Err(ConfigError::Invalid {
                name: "BRIDGE_DEADLINE_MS",
                value: deadline_ms.to_string(),
                reason: format!("must be between 1 and {}", CALLER_TIMEOUT_MS - 1),
            });
        }

        let max_attempts = parse_or(&get, "UPSTREAM_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "UPSTREAM_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        let page_size = parse_or(&get, "LIST_PAGE_SIZE", DEFAULT_LIST_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                name: "LIST_PAGE_SIZE",
                value: "0".to_string(),
                reason: "page size must be positive".to_string(),
            });
        }

        let fetch_cap = parse_or(&get, "LIST_FETCH_CAP", DEFAULT_LIST_FETCH_CAP)?;
        if fetch_cap == 0 {
            return Err(ConfigError::Invalid {
                name: "LIST_FETCH_CAP",
                value: "0".to_string(),
                reason: "fetch cap must be positive".to_string(),
            });
        }

        Ok(Self {
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            ticketing: UpstreamEndpoint {
                base_url: required_url(&get, "TICKETING_BASE_URL")?,
                credential: get("TICKETING_API_KEY")
                    .ok_or(ConfigError::Missing("TICKETING_API_KEY"))?,
            },
            messaging: UpstreamEndpoint {
                base_url: required_url(&get, "MESSAGING_BASE_URL")?,
                credential: get("MESSAGING_TOKEN").ok_or(ConfigError::Missing("MESSAGING_TOKEN"))?,
            },
            signing_secret: get("BRIDGE_SIGNING_SECRET"),
            deadline: Duration::from_millis(deadline_ms),
            upstream_timeout: Duration::from_millis(parse_or(
                &get,
                "UPSTREAM_TIMEOUT_MS",
                DEFAULT_UPSTREAM_TIMEOUT_MS,
            )?),
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(parse_or(
                    &get,
                    "UPSTREAM_BASE_DELAY_MS",
                    DEFAULT_BASE_DELAY_MS,
                )?),
                ..RetryPolicy::default()
            },
            lists: ListSettings {
                fetch_cap,
                page_size,
            },
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|err| ConfigError::Invalid {
            name,
            value: raw,
            reason: err.to_string(),
        }),
    }
}

fn required_url<G>(get: &G, name: &'static str) -> Result<url::Url, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(name).ok_or(ConfigError::Missing(name))?;
    // A trailing slash keeps Url::join from dropping the last path segment.
    let normalized = if raw.ends_with('/') {
        raw.clone()
    } else {
        format!("{raw}/")
    };
    url::Url::parse(&normalized).map_err(|err| ConfigError::Invalid {
        name,
        value: raw,
        reason: err.to_string(),
    })
}
