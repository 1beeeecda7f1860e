//! Controller gauges shared between the actor system, the transport and
//! the status/health surfaces.
//!
//! All fields are atomic for lock-free concurrent access; counters for
//! rates (sessions created, matches completed) are emitted through the
//! `metrics` macros at the call sites and rendered at `/metrics`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Live gauges for this controller instance.
#[derive(Debug, Default)]
pub struct ControllerMetrics {
    /// Participants currently in the matchmaking pool.
    current_searchers: AtomicU32,
    /// Live game sessions.
    current_sessions: AtomicU32,
    /// Open WebSocket connections.
    current_connections: AtomicU32,
}

/// Snapshot of the gauges at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub searchers: u32,
    pub sessions: u32,
    pub connections: u32,
}

impl ControllerMetrics {
    /// Create a new shared metrics instance.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_searchers(&self, count: u32) {
        self.current_searchers.store(count, Ordering::SeqCst);
    }

    pub fn increment_sessions(&self) {
        self.current_sessions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement_sessions(&self) {
        self.current_sessions.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn increment_connections(&self) {
        self.current_connections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement_connections(&self) {
        self.current_connections.fetch_sub(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn searchers(&self) -> u32 {
        self.current_searchers.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sessions(&self) -> u32 {
        self.current_sessions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn connections(&self) -> u32 {
        self.current_connections.load(Ordering::SeqCst)
    }

    /// Take a snapshot of all gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            searchers: self.current_searchers.load(Ordering::SeqCst),
            sessions: self.current_sessions.load(Ordering::SeqCst),
            connections: self.current_connections.load(Ordering::SeqCst),
        }
    }
}
