//! Gridlock Match Controller Library
//!
//! Core functionality for the Gridlock Match Controller - a stateful
//! WebSocket server that pairs transient participants into two-player
//! tic-tac-toe sessions and referees them:
//!
//! - Matchmaking: search pool, compatibility, invite/accept handshake
//! - Break/match phase state machine with per-player countdown clocks
//! - Move legality, win/draw detection, forfeit on illegal moves
//! - Disconnect and timeout handling with a post-leave grace period
//!
//! # Architecture
//!
//! The service uses a small actor hierarchy:
//!
//! ```text
//! MatchControllerActor (singleton per instance)
//! ├── owns the searcher Directory (matchmaking pool)
//! ├── owns the session store (inviter identity → session)
//! └── supervises N GameSessionActors
//!     └── GameSessionActor (one per paired session)
//!         ├── owns board, turn and phase state
//!         └── owns two CountdownTimer clocks
//! ```
//!
//! # Key Design Decisions
//!
//! - **Run-to-completion**: every actor drains its mailbox one message at
//!   a time, so session and pool mutations are atomic without locks
//! - **Clocks inside the actor**: timer expiries are `select!`ed with the
//!   mailbox, so an expiry always observes fully-settled session state
//! - **Fire-and-forget delivery**: outbound events go through [`channel::EventSink`]
//!   and are never awaited; a vanished client is handled via its
//!   disconnect, not via send errors
//! - **Silent precondition failures**: stale invites, out-of-turn moves
//!   and events for dead sessions are dropped without a reply
//!
//! # Modules
//!
//! - [`actors`] - controller and session actors
//! - [`channel`] - outbound event delivery
//! - [`config`] - service configuration from environment
//! - [`directory`] - the matchmaking pool
//! - [`engine`] - pure move engine for the 3×3 board
//! - [`events`] - wire protocol
//! - [`observability`] - health endpoints
//! - [`timer`] - pausable one-shot countdown
//! - [`transport`] - WebSocket endpoint

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actors;
pub mod channel;
pub mod config;
pub mod directory;
pub mod engine;
pub mod errors;
pub mod events;
pub mod observability;
pub mod timer;
pub mod transport;
