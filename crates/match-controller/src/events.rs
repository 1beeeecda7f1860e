//! Wire protocol for the Match Controller.
//!
//! Clients exchange JSON messages of the shape
//! `{"type": "<event>", "data": {...}}` over the WebSocket. Events carrying
//! no payload omit the `data` member entirely.
//!
//! [`ClientEvent`] is the inbound vocabulary, [`ServerEvent`] the outbound
//! one. Malformed inbound frames are dropped at the transport layer; the
//! protocol has no generic error event (the one user-visible failure is
//! [`ServerEvent::EnterFailure`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of one live client connection.
///
/// Unique per connection for the lifetime of the process; never reused for
/// a reconnecting client (reconnection is out of scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh connection identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An inclusive range of whole seconds a searcher will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min: u32,
    pub max: u32,
}

impl DurationRange {
    /// The overlap of two ranges, or `None` if they do not intersect.
    ///
    /// An inverted range (`min > max`) intersects nothing.
    #[must_use]
    pub fn intersect(&self, other: &DurationRange) -> Option<DurationRange> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(DurationRange { min, max })
    }
}

/// Time controls a searcher has declared themselves willing to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Acceptable break-phase duration, seconds.
    pub break_time: DurationRange,
    /// Acceptable match-phase duration, seconds.
    pub match_time: DurationRange,
}

/// The durations a paired session actually plays with, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameParams {
    /// Break-phase duration, seconds.
    pub break_time: u32,
    /// Match-phase duration, seconds.
    pub match_time: u32,
}

/// One compatible searcher, as presented in a search update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: ConnectionId,
    pub name: String,
    /// This candidate has a pending invite to the recipient.
    pub invited_you: bool,
    /// The recipient has a pending invite to this candidate.
    pub invited_by_you: bool,
}

/// Events received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Register in the matchmaking pool under a display name.
    Enter { username: String },
    /// Declare or change search parameters while in the pool.
    ChangeSearchParams { params: SearchParams },
    /// Leave the matchmaking pool.
    LeaveSearch,
    /// Invite another searcher to a game.
    Invite { target: ConnectionId },
    /// Withdraw one side of a pending invite.
    ///
    /// `was_invited` says which side `other` was on: `true` cancels an
    /// invite the caller sent to `other`, `false` declines an invite the
    /// caller received from `other`.
    CancelInvite {
        other: ConnectionId,
        was_invited: bool,
    },
    /// Accept a pending invite from `inviter`, forming a session.
    AcceptInvite { inviter: ConnectionId },
    /// Leave the current game session voluntarily.
    LeaveGame,
    /// Signal readiness for the next match during a break.
    Ready,
    /// Claim a board cell (0..=8) during a match.
    Move { position: u8 },
}

/// Events sent to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Registration accepted.
    EnterSuccess,
    /// Registration rejected (the only user-visible precondition failure).
    EnterFailure { reason: String },
    /// Periodic list of compatible searchers.
    SearchUpdate { candidates: Vec<Candidate> },
    /// A session formed; the break phase has begun.
    OpenRoom {
        break_time: u32,
        match_time: u32,
        opponent: String,
    },
    /// The opponent signalled readiness first.
    OpponentReady,
    /// The match phase has begun.
    StartGame { first_move: bool },
    /// The opponent claimed a cell.
    OpponentMove { position: u8 },
    /// The match ended with a winner (or "Friendship" on a draw).
    GameOver {
        winner: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The session is over (opponent left, or a break/grace timer ran out).
    DismissGame { reason: String, was_timeout: bool },
}
