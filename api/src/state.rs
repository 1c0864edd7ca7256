use std::sync::Arc;

use crate::interaction::InteractionEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: InteractionEngine,
    /// HMAC secret for inbound events; `None` accepts unsigned events.
    pub signing_secret: Option<Arc<str>>,
}
