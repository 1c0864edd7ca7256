//! Volatile per-session interaction state.
//!
//! Nothing here survives a restart. Transitions that find their state missing fall back
//! to a fresh upstream fetch or a "session expired" panel.

pub mod cursor;
pub mod marker;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use deskbridge_core::events::SessionFields;
use tokio::sync::RwLock;

pub use self::cursor::{Cursor, CursorStore, ListView, PageWindow};
pub use self::marker::{InFlightMarker, MarkerStatus, MarkerStore, Operation};

/// Keyed storage for session state. The in-memory implementation is the only one the
/// service ships, but transitions only ever see this trait.
#[async_trait]
pub trait SessionStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V>;

    async fn set(&self, key: &str, value: V);

    async fn delete(&self, key: &str);

    /// Apply `change` to the stored value in one step and return the result.
    /// Returns `None` without calling `change` when nothing is stored under `key`.
    async fn modify(
        &self,
        key: &str,
        change: &(dyn for<'a> Fn(&'a mut V) + Send + Sync),
    ) -> Option<V>;
}

pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> SessionStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: V) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn modify(
        &self,
        key: &str,
        change: &(dyn for<'a> Fn(&'a mut V) + Send + Sync),
    ) -> Option<V> {
        let mut entries = self.entries.write().await;
        let value = entries.get_mut(key)?;
        change(value);
        Some(value.clone())
    }
}

/// Identity derived from the caller-supplied session fields on every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub email: Option<String>,
    pub name: Option<String>,
    pub thread_id: Option<String>,
}

impl SessionContext {
    pub fn from_fields(fields: &SessionFields) -> Self {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Self {
            email: clean(&fields.email).map(|email| email.to_lowercase()),
            name: clean(&fields.name),
            thread_id: clean(&fields.thread_id),
        }
    }

    /// Key for cursors and in-flight markers. Only sessions with an email have one.
    pub fn key(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Label for log lines; never used as a store key.
    pub fn log_key(&self) -> &str {
        self.email.as_deref().unwrap_or("<anonymous>")
    }
}
