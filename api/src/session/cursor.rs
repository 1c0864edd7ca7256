use std::future::Future;
use std::sync::Arc;

use deskbridge_core::records::Ticket;

use super::SessionStore;
use crate::config::ListSettings;
use crate::upstream::UpstreamError;

/// Which list panel a cursor backs, so "load more" re-renders the same view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView {
    Home,
    Browse,
}

/// A fetch-once result set plus the number of items revealed so far.
///
/// `upstream_more` records whether the single upfront fetch came back full, i.e. the
/// ticketing system probably holds more records than were fetched. It is cleared once a
/// reveal finds nothing left locally; the list never re-queries past the fetch cap.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub view: ListView,
    pub items: Vec<Ticket>,
    pub revealed: usize,
    pub page_size: usize,
    upstream_more: bool,
    last_window: (usize, usize),
}

impl Cursor {
    pub fn new(view: ListView, items: Vec<Ticket>, settings: ListSettings) -> Self {
        let upstream_more = items.len() >= settings.fetch_cap;
        let revealed = settings.page_size.min(items.len());
        Self {
            view,
            items,
            revealed,
            page_size: settings.page_size,
            upstream_more,
            last_window: (0, revealed),
        }
    }

    pub fn has_more(&self) -> bool {
        self.revealed < self.items.len() || self.upstream_more
    }

    /// Reveal the next window. An empty reveal ends the list.
    pub fn advance(&mut self) {
        let start = self.revealed;
        let end = (start + self.page_size).min(self.items.len());
        if start == end {
            self.upstream_more = false;
        }
        self.revealed = end;
        self.last_window = (start, end);
    }

    pub fn window(&self) -> PageWindow {
        let (start, end) = self.last_window;
        PageWindow {
            view: self.view,
            visible: self.items[..self.revealed].to_vec(),
            added: self.items[start..end].to_vec(),
            has_more: self.has_more(),
        }
    }
}

/// What a list panel renders after a reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow {
    pub view: ListView,
    /// Every item revealed so far
    pub visible: Vec<Ticket>,
    /// Items revealed by the most recent step
    pub added: Vec<Ticket>,
    pub has_more: bool,
}

impl PageWindow {
    pub fn empty(view: ListView) -> Self {
        Self {
            view,
            visible: Vec::new(),
            added: Vec::new(),
            has_more: false,
        }
    }
}

/// Per-session pagination over a single capped upstream fetch.
#[derive(Clone)]
pub struct CursorStore {
    store: Arc<dyn SessionStore<Cursor>>,
    settings: ListSettings,
}

impl CursorStore {
    pub fn new(store: Arc<dyn SessionStore<Cursor>>, settings: ListSettings) -> Self {
        Self { store, settings }
    }

    /// Fetch up to the cap once, replace any cursor held for `key`, and return the
    /// first window.
    pub async fn start_list<F, Fut>(
        &self,
        key: &str,
        view: ListView,
        fetch: F,
    ) -> Result<PageWindow, UpstreamError>
    where
        F: FnOnce(usize) -> Fut,
        Fut: Future<Output = Result<Vec<Ticket>, UpstreamError>>,
    {
        let mut items = fetch(self.settings.fetch_cap).await?;
        items.truncate(self.settings.fetch_cap);
        let cursor = Cursor::new(view, items, self.settings);
        let window = cursor.window();
        tracing::debug!(
            session_key = key,
            fetched = cursor.items.len(),
            has_more = window.has_more,
            "list cursor started"
        );
        self.store.set(key, cursor).await;
        Ok(window)
    }

    /// Reveal the next window without touching the upstream system.
    /// `None` means no cursor exists for `key` (never started, or lost on restart).
    pub async fn next_page(&self, key: &str) -> Option<PageWindow> {
        let cursor = self.store.modify(key, &Cursor::advance).await?;
        Some(cursor.window())
    }

    /// Everything revealed so far, without advancing.
    pub async fn current(&self, key: &str) -> Option<PageWindow> {
        let cursor = self.store.get(key).await?;
        Some(PageWindow {
            added: Vec::new(),
            ..cursor.window()
        })
    }

    pub async fn peek(&self, key: &str) -> Option<Cursor> {
        self.store.get(key).await
    }

    pub async fn clear(&self, key: &str) {
        self.store.delete(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;

    fn tickets(n: usize) -> Vec<Ticket> {
        (1..=n as u64)
            .map(|id| Ticket {
                id,
                subject: format!("Ticket {id}"),
                status: None,
                created_at: None,
            })
            .collect()
    }

    fn store() -> CursorStore {
        CursorStore::new(MemoryStore::<Cursor>::shared(), ListSettings::default())
    }

    #[tokio::test]
    async fn twenty_items_page_through_in_fives_then_stop() {
        let cursors = store();
        let first = cursors
            .start_list("ann@example.com", ListView::Browse, |_| async { Ok(tickets(20)) })
            .await
            .expect("fetch succeeds");
        assert!(first.has_more);
        assert_eq!(first.added.len(), 5);

        for expected_visible in [10, 15, 20] {
            let window = cursors
                .next_page("ann@example.com")
                .await
                .expect("cursor exists");
            assert_eq!(window.added.len(), 5);
            assert_eq!(window.visible.len(), expected_visible);
            assert!(window.has_more, "a full fetch suggests more upstream");
        }

        let last = cursors
            .next_page("ann@example.com")
            .await
            .expect("cursor exists");
        assert!(last.added.is_empty());
        assert!(!last.has_more);
        assert_eq!(last.visible.len(), 20);
    }

    #[tokio::test]
    async fn short_fetch_has_no_more_after_local_slice() {
        let cursors = store();
        let first = cursors
            .start_list("ann@example.com", ListView::Home, |_| async { Ok(tickets(7)) })
            .await
            .expect("fetch succeeds");
        assert!(first.has_more);
        let second = cursors.next_page("ann@example.com").await.expect("cursor");
        assert_eq!(second.added.len(), 2);
        assert!(!second.has_more);
        assert_eq!(second.view, ListView::Home);
    }

    #[tokio::test]
    async fn fetch_receives_the_cap_and_overflow_is_dropped() {
        let cursors = store();
        let window = cursors
            .start_list("ann@example.com", ListView::Browse, |cap| async move {
                assert_eq!(cap, 20);
                Ok(tickets(25))
            })
            .await
            .expect("fetch succeeds");
        assert!(window.has_more);
        let cursor = cursors.peek("ann@example.com").await.expect("cursor stored");
        assert_eq!(cursor.items.len(), 20);
    }

    #[tokio::test]
    async fn next_page_without_cursor_is_not_found() {
        assert!(store().next_page("nobody@example.com").await.is_none());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_the_previous_cursor() {
        let cursors = store();
        cursors
            .start_list("ann@example.com", ListView::Home, |_| async { Ok(tickets(3)) })
            .await
            .expect("fetch succeeds");
        let err = cursors
            .start_list("ann@example.com", ListView::Browse, |_| async {
                Err(UpstreamError::Timeout { service: "ticketing" })
            })
            .await
            .expect_err("fetch fails");
        assert!(err.is_retryable());
        let cursor = cursors.peek("ann@example.com").await.expect("old cursor kept");
        assert_eq!(cursor.view, ListView::Home);
    }

    #[tokio::test]
    async fn concurrent_load_more_never_goes_backwards() {
        let cursors = store();
        cursors
            .start_list("ann@example.com", ListView::Browse, |_| async { Ok(tickets(20)) })
            .await
            .expect("fetch succeeds");
        let start = cursors.peek("ann@example.com").await.expect("cursor").revealed;

        let (a, b) = tokio::join!(
            cursors.next_page("ann@example.com"),
            cursors.next_page("ann@example.com")
        );
        assert!(a.is_some() && b.is_some());

        let end = cursors.peek("ann@example.com").await.expect("cursor").revealed;
        assert!(end == start + 5 || end == start + 10, "revealed moved {start} -> {end}");
    }

    #[tokio::test]
    async fn current_does_not_advance() {
        let cursors = store();
        cursors
            .start_list("ann@example.com", ListView::Home, |_| async { Ok(tickets(12)) })
            .await
            .expect("fetch succeeds");
        let window = cursors.current("ann@example.com").await.expect("cursor");
        assert_eq!(window.visible.len(), 5);
        assert!(window.added.is_empty());
        assert_eq!(cursors.peek("ann@example.com").await.expect("cursor").revealed, 5);
    }
}
