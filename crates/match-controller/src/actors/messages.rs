//! Message types exchanged with the actors.

use crate::errors::McError;
use crate::events::{ClientEvent, ConnectionId};
use tokio::sync::oneshot;

/// One participant of a session: connection identity plus display name,
/// immutable for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: ConnectionId,
    pub name: String,
}

/// Messages handled by the `MatchControllerActor`.
#[derive(Debug)]
pub enum ControllerMessage {
    /// An event arrived from a connected client.
    ClientEvent {
        from: ConnectionId,
        event: ClientEvent,
    },

    /// A client's transport closed (treated as an involuntary leave).
    Disconnected { from: ConnectionId },

    /// Snapshot of the controller state.
    GetStatus {
        respond_to: oneshot::Sender<ControllerStatus>,
    },

    /// Stop accepting new sessions and cancel the actor tree.
    Shutdown {
        respond_to: oneshot::Sender<Result<(), McError>>,
    },
}

/// Point-in-time controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    /// Participants currently in the matchmaking pool.
    pub searcher_count: usize,
    /// Live game sessions.
    pub session_count: usize,
    /// Whether the controller has stopped accepting new sessions.
    pub is_draining: bool,
}

/// Messages handled by a `GameSessionActor`. All fire-and-forget: a
/// session never reports precondition failures back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMessage {
    /// A participant signalled readiness for the next match.
    Ready { from: ConnectionId },
    /// A participant claimed a board cell.
    Move { from: ConnectionId, position: u8 },
    /// A participant left (voluntarily or by disconnect).
    Leave { from: ConnectionId },
}
