//! Actor model implementation.
//!
//! Two actor kinds form the hierarchy:
//!
//! - [`MatchControllerHandle`] / `MatchControllerActor` — singleton owning
//!   the matchmaking pool and the session store
//! - `GameSessionActor` — one per paired session, owning the game state
//!   and both countdown clocks
//!
//! Every actor processes its mailbox one message at a time to completion,
//! which gives each session run-to-completion atomicity without locks.

mod controller;
mod messages;
mod metrics;
mod session;

pub use self::controller::MatchControllerHandle;
pub use self::messages::{ControllerStatus, PlayerInfo, SessionMessage};
pub use self::metrics::{ControllerMetrics, MetricsSnapshot};
pub use self::session::{GameSessionActor, GameSessionHandle};
