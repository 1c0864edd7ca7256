//! HTTP plumbing for the ticketing and messaging APIs.
//!
//! Every outbound call goes through [`UpstreamHttp`], which enforces the per-call
//! timeout and folds transport failures and non-2xx statuses into [`UpstreamError`].

pub mod messaging;
pub mod retry;
pub mod ticketing;

use std::time::Duration;

use serde::de::DeserializeOwned;

use self::retry::RetryPolicy;

pub use self::messaging::{HttpMessagingApi, MessagingApi};
pub use self::ticketing::{HttpTicketingApi, TicketingApi};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("{service} did not answer in time")]
    Timeout { service: &'static str },
    #[error("{service} could not be reached: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} failed with status {status}")]
    Server {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} rejected the request with status {status}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} sent an unreadable response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    /// Transport failures, timeouts and 5xx responses are transient; everything else is
    /// surfaced to the caller on the first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Timeout { .. }
                | UpstreamError::Transport { .. }
                | UpstreamError::Server { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Server { status, .. } | UpstreamError::Rejected { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Map an HTTP status from `service` to the matching error variant.
    pub fn from_status(service: &'static str, status: u16, body: String) -> Self {
        if status >= 500 {
            UpstreamError::Server {
                service,
                status,
                body,
            }
        } else {
            UpstreamError::Rejected {
                service,
                status,
                body,
            }
        }
    }

    fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout { service }
        } else {
            UpstreamError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }
}

/// reqwest client bound to one upstream service.
#[derive(Clone)]
pub struct UpstreamHttp {
    client: reqwest::Client,
    service: &'static str,
    retry: RetryPolicy,
}

impl UpstreamHttp {
    pub fn new(
        service: &'static str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("deskbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| UpstreamError::from_reqwest(service, err))?;
        Ok(Self {
            client,
            service,
            retry,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send one request; non-2xx statuses become errors.
    pub async fn call(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = request
            .send()
            .await
            .map_err(|err| UpstreamError::from_reqwest(self.service, err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::from_status(self.service, status.as_u16(), body))
    }

    /// Send a request built fresh for every attempt, retrying transient failures.
    /// Multipart bodies cannot be cloned, hence the builder closure.
    pub async fn call_with_retry<F>(&self, build: F) -> Result<reqwest::Response, UpstreamError>
    where
        F: Fn() -> Result<reqwest::RequestBuilder, UpstreamError> + Send + Sync,
    {
        let build = &build;
        self.retry
            .run(self.service, move || async move { self.call(build()?).await })
            .await
    }

    pub async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, UpstreamError> {
        response
            .json::<T>()
            .await
            .map_err(|err| UpstreamError::Decode {
                service: self.service,
                message: err.to_string(),
            })
    }
}
