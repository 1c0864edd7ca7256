use std::sync::Arc;

use crate::upstream::MessagingApi;

/// Posts the outcome of background work back into the originating conversation.
///
/// Delivery is best effort: one attempt, failures are logged and swallowed. The ticket
/// or link the message describes already exists whether or not the note lands.
#[derive(Clone)]
pub struct CompletionNotifier {
    messaging: Arc<dyn MessagingApi>,
}

impl CompletionNotifier {
    pub fn new(messaging: Arc<dyn MessagingApi>) -> Self {
        Self { messaging }
    }

    /// Returns whether the note was accepted.
    pub async fn notify(&self, thread_id: Option<&str>, message: &str) -> bool {
        let Some(thread_id) = thread_id else {
            tracing::warn!("no thread id on session, completion note skipped");
            return false;
        };

        match self.messaging.post_note(thread_id, message).await {
            Ok(()) => {
                tracing::info!(thread_id, "completion note posted");
                true
            }
            Err(err) => {
                tracing::warn!(thread_id, error = %err, "completion note failed");
                false
            }
        }
    }
}
