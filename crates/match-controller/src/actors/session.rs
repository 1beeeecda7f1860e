//! `GameSessionActor` - per-pair actor owning one game session.
//!
//! Each `GameSessionActor`:
//! - Owns the board, the turn state and the break/match phase machine
//! - Owns the two countdown clocks (one per participant)
//! - Notifies both participants of every outcome through the event sink
//!
//! # Phases
//!
//! The session cycles `Break` → `Match` → `Break` → ... until torn down.
//! A break is armed on the inviter's clock only; if nobody completes the
//! readiness handshake before it runs out, the session is dismissed. When
//! a participant leaves, the actor enters a terminal `Grace` phase: the
//! controller has already deleted the session from its store, and the
//! actor lingers only to run the remaining participant's grace clock.
//!
//! # Clocks
//!
//! Clock expiries are `select!`ed alongside the mailbox, so an expiry is
//! only observed between fully-processed messages. Every transition resets
//! the clocks it obsoletes before arming new ones; armings carry one extra
//! second on top of the configured duration.

use crate::channel::EventSink;
use crate::engine::{self, Board};
use crate::errors::McError;
use crate::events::{ConnectionId, GameParams, ServerEvent};
use crate::timer::CountdownTimer;

use super::messages::{PlayerInfo, SessionMessage};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the session mailbox.
const SESSION_CHANNEL_BUFFER: usize = 64;

/// Extra second granted on every clock arming, so a clock that reads
/// "10" dismisses at 11s.
const CLOCK_ARM_PADDING: Duration = Duration::from_secs(1);

/// Handle to a `GameSessionActor`.
#[derive(Debug, Clone)]
pub struct GameSessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    session_id: ConnectionId,
}

impl GameSessionHandle {
    /// The session key (the inviter's connection identity).
    #[must_use]
    pub fn session_id(&self) -> ConnectionId {
        self.session_id
    }

    /// Forward a readiness signal.
    pub async fn ready(&self, from: ConnectionId) -> Result<(), McError> {
        self.send(SessionMessage::Ready { from }).await
    }

    /// Forward a move.
    pub async fn play(&self, from: ConnectionId, position: u8) -> Result<(), McError> {
        self.send(SessionMessage::Move { from, position }).await
    }

    /// Forward a leave (voluntary or disconnect).
    pub async fn leave(&self, from: ConnectionId) -> Result<(), McError> {
        self.send(SessionMessage::Leave { from }).await
    }

    /// Cancel the session actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn send(&self, message: SessionMessage) -> Result<(), McError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| McError::Internal(format!("session mailbox send failed: {e}")))
    }
}

/// Which side of the session a clock or participant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seat {
    Inviter,
    Invitee,
}

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Pre-match countdown; waiting for both readiness signals.
    Break { first_ready: Option<ConnectionId> },
    /// Active turn-based play.
    Match,
    /// One participant left; only `remaining`'s grace clock is live and
    /// the session is already gone from the controller's store.
    Grace { remaining: ConnectionId },
}

/// The `GameSessionActor` implementation.
pub struct GameSessionActor {
    /// Session key: the inviter's connection identity.
    session_id: ConnectionId,
    inviter: PlayerInfo,
    invitee: PlayerInfo,
    params: GameParams,
    board: Board,
    /// Whose turn it is (during a match), or who moves first (during a
    /// break). Always one of the two participants.
    current_move: ConnectionId,
    /// Who moved first in the most recent match; the next match starts
    /// with the other participant.
    last_starter: Option<ConnectionId>,
    phase: Phase,
    inviter_clock: CountdownTimer,
    invitee_clock: CountdownTimer,
    receiver: mpsc::Receiver<SessionMessage>,
    cancel_token: CancellationToken,
    channel: Arc<dyn EventSink>,
}

impl GameSessionActor {
    /// Spawn a new session actor in the break phase.
    ///
    /// Returns a handle and the task join handle. The session is keyed by
    /// the inviter's identity; the inviter moves first in the first match.
    pub fn spawn(
        inviter: PlayerInfo,
        invitee: PlayerInfo,
        params: GameParams,
        cancel_token: CancellationToken,
        channel: Arc<dyn EventSink>,
    ) -> (GameSessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);
        let session_id = inviter.id;

        let actor = Self {
            session_id,
            current_move: inviter.id,
            inviter,
            invitee,
            params,
            board: engine::empty_board(),
            last_starter: None,
            phase: Phase::Break { first_ready: None },
            inviter_clock: CountdownTimer::new(),
            invitee_clock: CountdownTimer::new(),
            receiver,
            cancel_token: cancel_token.clone(),
            channel,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = GameSessionHandle {
            sender,
            cancel_token,
            session_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "mc.actor.session", fields(session_id = %self.session_id))]
    async fn run(mut self) {
        info!(
            target: "mc.actor.session",
            session_id = %self.session_id,
            inviter = %self.inviter.name,
            invitee = %self.invitee.name,
            break_time = self.params.break_time,
            match_time = self.params.match_time,
            "GameSessionActor started"
        );

        self.enter_break();

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "mc.actor.session",
                        session_id = %self.session_id,
                        "GameSessionActor received cancellation signal"
                    );
                    break;
                }

                () = self.inviter_clock.expired() => {
                    if self.handle_clock_expired(Seat::Inviter) {
                        break;
                    }
                }

                () = self.invitee_clock.expired() => {
                    if self.handle_clock_expired(Seat::Invitee) {
                        break;
                    }
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            if self.handle_message(message) {
                                break;
                            }
                        }
                        None => {
                            debug!(
                                target: "mc.actor.session",
                                session_id = %self.session_id,
                                "GameSessionActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "mc.actor.session",
            session_id = %self.session_id,
            "GameSessionActor stopped"
        );
    }

    /// Handle a single message. Returns true if the actor should exit.
    fn handle_message(&mut self, message: SessionMessage) -> bool {
        match message {
            SessionMessage::Ready { from } => {
                self.handle_ready(from);
                false
            }
            SessionMessage::Move { from, position } => {
                self.handle_move(from, position);
                false
            }
            SessionMessage::Leave { from } => self.handle_leave(from),
        }
    }

    /// Enter (or re-enter) the break phase: fresh board, alternated first
    /// mover, break countdown on the inviter's clock.
    fn enter_break(&mut self) {
        self.board = engine::empty_board();
        self.current_move = match self.last_starter {
            Some(starter) => self.opponent_id(starter),
            None => self.inviter.id,
        };

        self.inviter_clock.reset();
        self.invitee_clock.reset();
        self.inviter_clock
            .start(Duration::from_secs(u64::from(self.params.break_time)) + CLOCK_ARM_PADDING);

        self.phase = Phase::Break { first_ready: None };

        debug!(
            target: "mc.actor.session",
            session_id = %self.session_id,
            next_starter = %self.current_move,
            "Entered break phase"
        );
    }

    /// Readiness handshake. The first signal only notifies the opponent;
    /// the second (from the other participant) starts the match. A repeat
    /// signal from the same participant is dropped.
    fn handle_ready(&mut self, from: ConnectionId) {
        if !self.is_participant(from) {
            return;
        }
        let first_ready = match self.phase {
            Phase::Break { first_ready } => first_ready,
            Phase::Match | Phase::Grace { .. } => return,
        };

        match first_ready {
            None => {
                self.phase = Phase::Break {
                    first_ready: Some(from),
                };
                self.channel
                    .send_to(self.opponent_id(from), ServerEvent::OpponentReady);
                debug!(
                    target: "mc.actor.session",
                    session_id = %self.session_id,
                    from = %from,
                    "First readiness received"
                );
            }
            Some(first) if first == from => {
                debug!(
                    target: "mc.actor.session",
                    session_id = %self.session_id,
                    from = %from,
                    "Duplicate readiness dropped"
                );
            }
            Some(_) => self.start_match(),
        }
    }

    /// Break → Match: arm both clocks, pause the non-starter's, announce.
    fn start_match(&mut self) {
        let match_duration =
            Duration::from_secs(u64::from(self.params.match_time)) + CLOCK_ARM_PADDING;

        self.inviter_clock.reset();
        self.invitee_clock.reset();
        self.inviter_clock.start(match_duration);
        self.invitee_clock.start(match_duration);

        // Only the participant on turn burns clock time.
        if self.current_move == self.inviter.id {
            self.invitee_clock.pause();
        } else {
            self.inviter_clock.pause();
        }

        self.last_starter = Some(self.current_move);
        self.phase = Phase::Match;

        self.channel.send_to(
            self.inviter.id,
            ServerEvent::StartGame {
                first_move: self.current_move == self.inviter.id,
            },
        );
        self.channel.send_to(
            self.invitee.id,
            ServerEvent::StartGame {
                first_move: self.current_move == self.invitee.id,
            },
        );

        info!(
            target: "mc.actor.session",
            session_id = %self.session_id,
            starter = %self.current_move,
            "Match started"
        );
    }

    /// A move during a match. Stale moves (not the sender's turn) and
    /// out-of-range positions are dropped; a move into an occupied cell
    /// forfeits the match to the opponent.
    fn handle_move(&mut self, from: ConnectionId, position: u8) {
        if self.phase != Phase::Match || from != self.current_move {
            return;
        }
        let index = usize::from(position);
        if index >= 9 {
            warn!(
                target: "mc.actor.session",
                session_id = %self.session_id,
                position,
                "Dropping out-of-range move"
            );
            return;
        }

        if !engine::is_legal(&self.board, index) {
            self.forfeit(from);
            return;
        }

        self.board = engine::apply_move(&self.board, index, from);
        metrics::counter!("mc_moves_total").increment(1);

        let mover = self.player(from).clone();
        let opponent = self.opponent_of(from).clone();
        self.current_move = opponent.id;

        self.channel
            .send_to(opponent.id, ServerEvent::OpponentMove { position });

        if engine::check_win(&self.board, mover.id) {
            self.channel.send_to(
                opponent.id,
                ServerEvent::GameOver {
                    winner: mover.name.clone(),
                    message: None,
                },
            );
            self.channel.send_to(
                mover.id,
                ServerEvent::GameOver {
                    winner: mover.name.clone(),
                    message: Some("You win!".to_string()),
                },
            );
            self.finish_match("win");
        } else if engine::check_draw(&self.board) {
            let draw = ServerEvent::GameOver {
                winner: "Friendship".to_string(),
                message: Some("Draw!".to_string()),
            };
            self.channel.send_to(opponent.id, draw.clone());
            self.channel.send_to(mover.id, draw);
            self.finish_match("draw");
        } else {
            // Turn-based clock alternation.
            self.clock_mut(Self::seat_required(self.seat_of(mover.id)))
                .pause();
            self.clock_mut(Self::seat_required(self.seat_of(opponent.id)))
                .resume();
        }
    }

    /// Forfeit by `mover` (illegal move): the opponent wins immediately.
    fn forfeit(&mut self, mover_id: ConnectionId) {
        let mover = self.player(mover_id).clone();
        let opponent = self.opponent_of(mover_id).clone();
        let message = format!(
            "{} has made an illegal move. {} wins!",
            mover.name, opponent.name
        );

        let game_over = ServerEvent::GameOver {
            winner: opponent.name.clone(),
            message: Some(message),
        };
        self.channel.send_to(opponent.id, game_over.clone());
        self.channel.send_to(mover.id, game_over);

        warn!(
            target: "mc.actor.session",
            session_id = %self.session_id,
            mover = %mover.name,
            "Illegal move, match forfeited"
        );
        self.finish_match("forfeit");
    }

    /// A clock ran out. What that means depends on the phase.
    /// Returns true if the actor should exit.
    fn handle_clock_expired(&mut self, seat: Seat) -> bool {
        match self.phase {
            Phase::Break { .. } => {
                // Only the inviter's clock is armed during a break.
                self.inviter_clock.reset();
                self.invitee_clock.reset();

                let dismiss = ServerEvent::DismissGame {
                    reason: "Ran out of break time".to_string(),
                    was_timeout: true,
                };
                self.channel.send_to(self.inviter.id, dismiss.clone());
                self.channel.send_to(self.invitee.id, dismiss);

                info!(
                    target: "mc.actor.session",
                    session_id = %self.session_id,
                    "Break timed out, dismissing session"
                );
                true
            }

            Phase::Match => {
                let loser = self.seat_player(seat).clone();
                let winner = self.opponent_of(loser.id).clone();
                let message = format!("Time's up! {} wins!", winner.name);

                let game_over = ServerEvent::GameOver {
                    winner: winner.name.clone(),
                    message: Some(message),
                };
                self.channel.send_to(winner.id, game_over.clone());
                self.channel.send_to(loser.id, game_over);

                info!(
                    target: "mc.actor.session",
                    session_id = %self.session_id,
                    loser = %loser.name,
                    "Match clock expired"
                );
                self.finish_match("timeout");
                false
            }

            Phase::Grace { remaining } => {
                self.channel.send_to(
                    remaining,
                    ServerEvent::DismissGame {
                        reason: "Ran out of break time".to_string(),
                        was_timeout: true,
                    },
                );
                info!(
                    target: "mc.actor.session",
                    session_id = %self.session_id,
                    "Grace period expired"
                );
                true
            }
        }
    }

    /// A participant left. In Break or Match the remaining participant is
    /// notified and granted a grace countdown; in Grace the actor exits
    /// once the remaining participant is gone too.
    /// Returns true if the actor should exit.
    fn handle_leave(&mut self, from: ConnectionId) -> bool {
        match self.phase {
            Phase::Grace { remaining } => from == remaining,
            Phase::Break { .. } | Phase::Match => {
                if !self.is_participant(from) {
                    return false;
                }
                let remaining = self.opponent_of(from).clone();

                self.inviter_clock.reset();
                self.invitee_clock.reset();

                self.channel.send_to(
                    remaining.id,
                    ServerEvent::DismissGame {
                        reason: "Opponent has left the game".to_string(),
                        was_timeout: false,
                    },
                );

                let break_duration =
                    Duration::from_secs(u64::from(self.params.break_time)) + CLOCK_ARM_PADDING;
                self.clock_mut(Self::seat_required(self.seat_of(remaining.id)))
                    .start(break_duration);
                self.phase = Phase::Grace {
                    remaining: remaining.id,
                };

                info!(
                    target: "mc.actor.session",
                    session_id = %self.session_id,
                    remaining = %remaining.name,
                    "Participant left, grace period started"
                );
                false
            }
        }
    }

    /// Common tail of every match-ending outcome.
    fn finish_match(&mut self, outcome: &'static str) {
        metrics::counter!("mc_matches_completed_total", "outcome" => outcome).increment(1);
        self.enter_break();
    }

    fn is_participant(&self, id: ConnectionId) -> bool {
        id == self.inviter.id || id == self.invitee.id
    }

    /// The participant behind `id`. Callers guarantee `id` is one of the
    /// two participants; an unknown id resolves to the inviter.
    fn player(&self, id: ConnectionId) -> &PlayerInfo {
        if id == self.invitee.id {
            &self.invitee
        } else {
            &self.inviter
        }
    }

    fn opponent_of(&self, id: ConnectionId) -> &PlayerInfo {
        if id == self.inviter.id {
            &self.invitee
        } else {
            &self.inviter
        }
    }

    fn opponent_id(&self, id: ConnectionId) -> ConnectionId {
        self.opponent_of(id).id
    }

    fn seat_of(&self, id: ConnectionId) -> Option<Seat> {
        if id == self.inviter.id {
            Some(Seat::Inviter)
        } else if id == self.invitee.id {
            Some(Seat::Invitee)
        } else {
            None
        }
    }

    /// Participants are validated before seats are looked up; default to
    /// the inviter's seat rather than panic if that ever ceases to hold.
    fn seat_required(seat: Option<Seat>) -> Seat {
        seat.unwrap_or(Seat::Inviter)
    }

    fn seat_player(&self, seat: Seat) -> &PlayerInfo {
        match seat {
            Seat::Inviter => &self.inviter,
            Seat::Invitee => &self.invitee,
        }
    }

    fn clock_mut(&mut self, seat: Seat) -> &mut CountdownTimer {
        match seat {
            Seat::Inviter => &mut self.inviter_clock,
            Seat::Invitee => &mut self.invitee_clock,
        }
    }
}
