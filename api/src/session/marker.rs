use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Link { ticket_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerStatus {
    Pending,
    Done { ticket_id: u64 },
    Failed { error: String },
}

/// Advisory record of the latest background mutation for a session.
///
/// Markers are only ever overwritten by the next marker for the same key, so a stale
/// `Done`/`Failed` entry may linger indefinitely. Nothing treats them as authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightMarker {
    pub id: Uuid,
    pub key: String,
    pub operation: Operation,
    pub status: MarkerStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl InFlightMarker {
    pub fn is_pending(&self) -> bool {
        self.status == MarkerStatus::Pending
    }
}

#[derive(Clone)]
pub struct MarkerStore {
    store: Arc<dyn SessionStore<InFlightMarker>>,
}

impl MarkerStore {
    pub fn new(store: Arc<dyn SessionStore<InFlightMarker>>) -> Self {
        Self { store }
    }

    pub async fn current(&self, key: &str) -> Option<InFlightMarker> {
        self.store.get(key).await
    }

    /// Start a new pending marker, replacing whatever was there.
    pub async fn mark_pending(&self, key: &str, operation: Operation) -> InFlightMarker {
        let marker = InFlightMarker {
            id: Uuid::now_v7(),
            key: key.to_string(),
            operation,
            status: MarkerStatus::Pending,
            started_at: Utc::now(),
            finished_at: None,
        };
        self.store.set(key, marker.clone()).await;
        marker
    }

    /// Make sure a pending marker for `operation` exists without replacing one that the
    /// handler already created.
    pub async fn ensure_pending(&self, key: &str, operation: Operation) -> InFlightMarker {
        match self.store.get(key).await {
            Some(marker) if marker.is_pending() && marker.operation == operation => marker,
            _ => self.mark_pending(key, operation).await,
        }
    }

    /// Record the outcome of the mutation that created marker `id`. A newer marker for the
    /// same key wins: the resolution is dropped and `false` returned.
    pub async fn resolve(&self, key: &str, id: Uuid, status: MarkerStatus) -> bool {
        let resolved = self
            .store
            .modify(key, &|marker: &mut InFlightMarker| {
                if marker.id == id {
                    marker.status = status.clone();
                    marker.finished_at = Some(Utc::now());
                }
            })
            .await;
        match resolved {
            Some(marker) if marker.id == id => {
                let elapsed_ms = marker
                    .finished_at
                    .map(|finished| (finished - marker.started_at).num_milliseconds());
                tracing::debug!(
                    session_key = %marker.key,
                    marker_id = %id,
                    elapsed_ms,
                    "marker resolved"
                );
                true
            }
            _ => {
                tracing::debug!(session_key = key, marker_id = %id, "marker superseded, resolution dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;

    fn markers() -> MarkerStore {
        MarkerStore::new(MemoryStore::<InFlightMarker>::shared())
    }

    #[tokio::test]
    async fn pending_marker_resolves_to_done() {
        let markers = markers();
        let marker = markers.mark_pending("ann@example.com", Operation::Create).await;
        assert!(marker.is_pending());

        assert!(
            markers
                .resolve("ann@example.com", marker.id, MarkerStatus::Done { ticket_id: 12 })
                .await
        );
        let current = markers.current("ann@example.com").await.expect("marker kept");
        assert_eq!(current.status, MarkerStatus::Done { ticket_id: 12 });
        assert!(current.finished_at.is_some());
    }

    #[tokio::test]
    async fn newer_marker_is_not_overwritten_by_older_task() {
        let markers = markers();
        let first = markers.mark_pending("ann@example.com", Operation::Create).await;
        let second = markers
            .mark_pending("ann@example.com", Operation::Link { ticket_id: 3 })
            .await;

        let applied = markers
            .resolve(
                "ann@example.com",
                first.id,
                MarkerStatus::Failed {
                    error: "boom".to_string(),
                },
            )
            .await;
        assert!(!applied);
        let current = markers.current("ann@example.com").await.expect("marker");
        assert_eq!(current.id, second.id);
        assert!(current.is_pending());
    }

    #[tokio::test]
    async fn ensure_pending_keeps_existing_pending_marker() {
        let markers = markers();
        let first = markers.mark_pending("ann@example.com", Operation::Create).await;
        let ensured = markers.ensure_pending("ann@example.com", Operation::Create).await;
        assert_eq!(ensured.id, first.id);

        markers
            .resolve("ann@example.com", first.id, MarkerStatus::Done { ticket_id: 1 })
            .await;
        let fresh = markers.ensure_pending("ann@example.com", Operation::Create).await;
        assert_ne!(fresh.id, first.id);
        assert!(fresh.is_pending());
    }
}
