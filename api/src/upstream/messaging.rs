use async_trait::async_trait;
use deskbridge_core::records::Thread;
use serde_json::json;

use super::{UpstreamError, UpstreamHttp};
use crate::config::UpstreamEndpoint;

const SERVICE: &str = "messaging";

/// Operations the bridge needs from the inbox that hosts the conversation.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn fetch_thread(&self, thread_id: &str) -> Result<Thread, UpstreamError>;

    /// Post an internal note into the thread. Sent once; callers decide what a failure means.
    async fn post_note(&self, thread_id: &str, body: &str) -> Result<(), UpstreamError>;
}

pub struct HttpMessagingApi {
    http: UpstreamHttp,
    base_url: url::Url,
    token: String,
}

impl HttpMessagingApi {
    pub fn new(http: UpstreamHttp, endpoint: &UpstreamEndpoint) -> Self {
        Self {
            http,
            base_url: endpoint.base_url.clone(),
            token: endpoint.credential.clone(),
        }
    }

    fn thread_url(&self, thread_id: &str, suffix: &str) -> Result<url::Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Transport {
                service: SERVICE,
                message: format!("base url '{}' cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .push("threads")
            .push(thread_id)
            .extend(suffix.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }
}

#[async_trait]
impl MessagingApi for HttpMessagingApi {
    async fn fetch_thread(&self, thread_id: &str) -> Result<Thread, UpstreamError> {
        let url = self.thread_url(thread_id, "")?;
        let response = self
            .http
            .call_with_retry(|| Ok(self.http.client().get(url.clone()).bearer_auth(&self.token)))
            .await?;
        self.http.decode(response).await
    }

    async fn post_note(&self, thread_id: &str, body: &str) -> Result<(), UpstreamError> {
        let url = self.thread_url(thread_id, "reply")?;
        let request = self
            .http
            .client()
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "type": "note", "body": body }));
        self.http.call(request).await?;
        Ok(())
    }
}
