//! Deadline-bound replies.
//!
//! The inbox gives up on a request after a fixed timeout, so every event is answered by
//! whichever comes first: the handler's panel or a fallback panel built when the
//! deadline fires. The handler is never cancelled; only the reply is time-boxed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use deskbridge_core::panel::Panel;
use tokio::sync::oneshot;

use crate::interaction::Transition;

/// Work detached from the request, started only after the reply has been handed off.
pub struct BackgroundTask {
    label: &'static str,
    session_key: String,
    work: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
}

impl BackgroundTask {
    pub fn new<F>(label: &'static str, session_key: impl Into<String>, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            label,
            session_key: session_key.into(),
            work: Box::pin(work),
        }
    }
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("label", &self.label)
            .field("session_key", &self.session_key)
            .finish_non_exhaustive()
    }
}

/// Spawns background tasks and counts the ones still running.
#[derive(Clone, Default)]
pub struct BackgroundRunner {
    in_flight: Arc<AtomicUsize>,
}

impl BackgroundRunner {
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run `task` once `released` resolves (or its sender is dropped). A panic inside the
    /// task is contained and logged.
    pub fn spawn_after(&self, released: oneshot::Receiver<()>, task: BackgroundTask) {
        let in_flight = self.in_flight.clone();
        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let _ = released.await;
            let BackgroundTask {
                label,
                session_key,
                work,
            } = task;
            tracing::debug!(task = label, session_key = %session_key, "background task started");
            if let Err(err) = tokio::spawn(work).await {
                tracing::error!(task = label, session_key = %session_key, error = %err, "background task aborted");
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

/// One-shot "already replied" flag shared by the handler and the deadline timer.
#[derive(Clone, Default)]
pub struct ReplyLatch(Arc<AtomicBool>);

impl ReplyLatch {
    /// Returns true for exactly one caller.
    pub fn claim(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Handler,
    Deadline,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub panel: Panel,
    pub source: ReplySource,
}

#[derive(Clone)]
pub struct DeadlineResponder {
    deadline: Duration,
    background: BackgroundRunner,
}

impl DeadlineResponder {
    pub fn new(deadline: Duration, background: BackgroundRunner) -> Self {
        Self {
            deadline,
            background,
        }
    }

    pub fn background(&self) -> &BackgroundRunner {
        &self.background
    }

    /// Race `work` against the deadline and return the single reply for the event.
    ///
    /// `fallback` is only polled if the deadline wins. A deferred transition's background
    /// task is released after the reply is decided, whichever side decided it.
    ///
    /// Release follows the reply panel, not the HTTP write. On a multi-threaded runtime a
    /// background task whose first upstream call completes faster than axum flushes the
    /// response could post its completion note before the caller reads the reply. Every
    /// background task starts with at least one upstream round trip before notifying.
    pub async fn run<W, F>(&self, work: W, fallback: F) -> Reply
    where
        W: Future<Output = Transition> + Send + 'static,
        F: Future<Output = Panel> + Send,
    {
        let latch = ReplyLatch::default();
        let (reply_tx, mut reply_rx) = oneshot::channel::<Panel>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let worker_latch = latch.clone();
        let background = self.background.clone();
        tokio::spawn(async move {
            let (panel, task) = work.await.into_parts();
            if let Some(task) = task {
                background.spawn_after(release_rx, task);
            }
            if worker_latch.claim() {
                let _ = reply_tx.send(panel);
            } else {
                tracing::debug!("handler finished after the deadline reply, panel discarded");
            }
        });

        let reply = tokio::select! {
            biased;
            finished = &mut reply_rx => match finished {
                Ok(panel) => Reply { panel, source: ReplySource::Handler },
                Err(_) => {
                    tracing::error!("interaction handler aborted before replying");
                    latch.claim();
                    Reply { panel: fallback.await, source: ReplySource::Deadline }
                }
            },
            _ = tokio::time::sleep(self.deadline) => {
                if latch.claim() {
                    tracing::warn!(
                        deadline_ms = self.deadline.as_millis() as u64,
                        "reply deadline reached, sending fallback panel"
                    );
                    Reply { panel: fallback.await, source: ReplySource::Deadline }
                } else {
                    // The handler claimed the latch in the same instant; its panel is in flight.
                    match reply_rx.await {
                        Ok(panel) => Reply { panel, source: ReplySource::Handler },
                        Err(_) => Reply { panel: fallback.await, source: ReplySource::Deadline },
                    }
                }
            }
        };

        let _ = release_tx.send(());
        reply
    }
}
