//! Recording event sink.
//!
//! Captures every outbound event with its recipient so tests can assert
//! exactly what each participant was told, and in what order. Waiting
//! helpers are driven by a `watch` version counter rather than sleeps, so
//! they work unchanged under `tokio::time::pause()`.

use match_controller::channel::EventSink;
use match_controller::events::{ConnectionId, ServerEvent};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// An [`EventSink`] that records instead of delivering.
#[derive(Debug)]
pub struct RecordingSink {
    events: Mutex<Vec<(ConnectionId, ServerEvent)>>,
    version: watch::Sender<u64>,
}

impl RecordingSink {
    /// Create a new shared recording sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (version, _) = watch::channel(0);
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            version,
        })
    }

    /// Every recorded `(recipient, event)` pair, in send order.
    #[must_use]
    pub fn all(&self) -> Vec<(ConnectionId, ServerEvent)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events sent to `id`, in send order.
    #[must_use]
    pub fn events_for(&self, id: ConnectionId) -> Vec<ServerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Wait until an event for `id` matches `pred`, returning the first
    /// match (which may already have been recorded).
    pub async fn wait_matching<F>(&self, id: ConnectionId, pred: F) -> ServerEvent
    where
        F: Fn(&ServerEvent) -> bool,
    {
        let mut rx = self.version.subscribe();
        loop {
            if let Some(event) = self.events_for(id).into_iter().find(|e| pred(e)) {
                return event;
            }
            // The sender lives inside `self`, so this cannot fail while
            // we are borrowing it.
            if rx.changed().await.is_err() {
                unreachable!("recording sink dropped while awaited");
            }
        }
    }

    /// Wait until at least `count` events for `id` match `pred`.
    pub async fn wait_count<F>(&self, id: ConnectionId, pred: F, count: usize) -> Vec<ServerEvent>
    where
        F: Fn(&ServerEvent) -> bool,
    {
        let mut rx = self.version.subscribe();
        loop {
            let matched: Vec<ServerEvent> = self
                .events_for(id)
                .into_iter()
                .filter(|e| pred(e))
                .collect();
            if matched.len() >= count {
                return matched;
            }
            if rx.changed().await.is_err() {
                unreachable!("recording sink dropped while awaited");
            }
        }
    }
}

impl EventSink for RecordingSink {
    fn send_to(&self, to: ConnectionId, event: ServerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((to, event));
        self.version.send_modify(|v| *v += 1);
    }
}
