//! `MatchControllerActor` - singleton supervisor owning matchmaking state.
//!
//! The controller is the top-level actor:
//!
//! - Owns the searcher [`Directory`] (the matchmaking pool)
//! - Owns the session store: one entry per live session, keyed by the
//!   inviter's identity, with an index from either participant
//! - Routes every inbound client event; matchmaking events are handled
//!   in place, session events are forwarded to the owning session actor
//! - Broadcasts compatible-candidate lists to searchers on a fixed interval
//! - Supervises `GameSessionActor` tasks and reaps finished ones
//! - Owns the root `CancellationToken` for graceful shutdown
//!
//! Precondition failures (stale invites, events for dead sessions, moves
//! from strangers) are dropped without a reply; the one user-visible
//! failure is a duplicate display name on `enter`.

use crate::channel::EventSink;
use crate::directory::{self, Directory};
use crate::errors::McError;
use crate::events::{Candidate, ClientEvent, ConnectionId, SearchParams, ServerEvent};

use super::messages::{ControllerMessage, ControllerStatus, PlayerInfo};
use super::metrics::ControllerMetrics;
use super::session::{GameSessionActor, GameSessionHandle};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default channel buffer size for the controller mailbox.
const CONTROLLER_CHANNEL_BUFFER: usize = 1000;

/// Handle to the `MatchControllerActor`.
///
/// This is the public interface for the transport layer and for tests.
#[derive(Clone)]
pub struct MatchControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
    cancel_token: CancellationToken,
}

impl MatchControllerHandle {
    /// Create the controller actor and return a handle to it.
    ///
    /// This spawns the actor task and returns immediately.
    #[must_use]
    pub fn new(
        mc_id: String,
        channel: Arc<dyn EventSink>,
        metrics: Arc<ControllerMetrics>,
        search_update_interval: Duration,
        max_sessions: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(CONTROLLER_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let actor = MatchControllerActor {
            mc_id,
            receiver,
            cancel_token: cancel_token.clone(),
            directory: Directory::new(),
            sessions: HashMap::new(),
            session_index: HashMap::new(),
            channel,
            metrics,
            search_update_interval,
            max_sessions,
            accepting_new: true,
        };

        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    /// Deliver an inbound client event.
    pub async fn client_event(
        &self,
        from: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), McError> {
        self.sender
            .send(ControllerMessage::ClientEvent { from, event })
            .await
            .map_err(|e| McError::Internal(format!("channel send failed: {e}")))
    }

    /// Report a client's transport closing.
    pub async fn disconnected(&self, from: ConnectionId) -> Result<(), McError> {
        self.sender
            .send(ControllerMessage::Disconnected { from })
            .await
            .map_err(|e| McError::Internal(format!("channel send failed: {e}")))
    }

    /// Get the current controller status.
    pub async fn status(&self) -> Result<ControllerStatus, McError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::GetStatus { respond_to: tx })
            .await
            .map_err(|e| McError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| McError::Internal(format!("response receive failed: {e}")))
    }

    /// Initiate graceful shutdown.
    pub async fn shutdown(&self) -> Result<(), McError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::Shutdown { respond_to: tx })
            .await
            .map_err(|e| McError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| McError::Internal(format!("response receive failed: {e}")))?
    }

    /// Cancel the actor tree (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a child token tied to the controller's lifetime.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

/// Internal state for a managed session.
struct ManagedSession {
    /// Handle to the session actor.
    handle: GameSessionHandle,
    /// Join handle for monitoring the actor task.
    task_handle: JoinHandle<()>,
    /// Both participants, inviter first.
    participants: [PlayerInfo; 2],
}

/// The `MatchControllerActor` implementation.
struct MatchControllerActor {
    /// Instance ID.
    mc_id: String,
    /// Message receiver.
    receiver: mpsc::Receiver<ControllerMessage>,
    /// Cancellation token (root).
    cancel_token: CancellationToken,
    /// The matchmaking pool.
    directory: Directory,
    /// Live sessions keyed by the inviter's identity.
    sessions: HashMap<ConnectionId, ManagedSession>,
    /// Either participant's identity → session key.
    session_index: HashMap<ConnectionId, ConnectionId>,
    /// Outbound event delivery.
    channel: Arc<dyn EventSink>,
    /// Shared gauges.
    metrics: Arc<ControllerMetrics>,
    /// Interval between search-update broadcasts.
    search_update_interval: Duration,
    /// Session capacity.
    max_sessions: usize,
    /// Whether new sessions may still be created.
    accepting_new: bool,
}

impl MatchControllerActor {
    /// Run the actor message loop.
    #[instrument(skip_all, name = "mc.actor.controller", fields(mc_id = %self.mc_id))]
    async fn run(mut self) {
        info!(
            target: "mc.actor.controller",
            mc_id = %self.mc_id,
            "MatchControllerActor started"
        );

        let mut search_ticker = tokio::time::interval(self.search_update_interval);
        search_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            // Reap session actors that exited (break timeouts, grace
            // expiries) before the next message is processed, so stale
            // store entries never outlive one loop turn.
            self.reap_finished_sessions().await;

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "mc.actor.controller",
                        mc_id = %self.mc_id,
                        "MatchControllerActor received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                _ = search_ticker.tick() => {
                    self.broadcast_search_updates();
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            info!(
                                target: "mc.actor.controller",
                                mc_id = %self.mc_id,
                                "MatchControllerActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "mc.actor.controller",
            mc_id = %self.mc_id,
            sessions_remaining = self.sessions.len(),
            "MatchControllerActor stopped"
        );
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::ClientEvent { from, event } => {
                self.handle_client_event(from, event).await;
            }

            ControllerMessage::Disconnected { from } => {
                self.handle_disconnect(from).await;
            }

            ControllerMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(ControllerStatus {
                    searcher_count: self.directory.len(),
                    session_count: self.sessions.len(),
                    is_draining: !self.accepting_new,
                });
            }

            ControllerMessage::Shutdown { respond_to } => {
                info!(
                    target: "mc.actor.controller",
                    mc_id = %self.mc_id,
                    session_count = self.sessions.len(),
                    "Initiating graceful shutdown"
                );
                self.accepting_new = false;
                self.cancel_token.cancel();
                let _ = respond_to.send(Ok(()));
            }
        }
    }

    /// Route one client event.
    async fn handle_client_event(&mut self, from: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::Enter { username } => self.handle_enter(from, username),
            ClientEvent::ChangeSearchParams { params } => self.handle_change_params(from, params),
            ClientEvent::LeaveSearch => self.handle_leave_search(from),
            ClientEvent::Invite { target } => self.handle_invite(from, target),
            ClientEvent::CancelInvite { other, was_invited } => {
                self.handle_cancel_invite(from, other, was_invited);
            }
            ClientEvent::AcceptInvite { inviter } => self.handle_accept_invite(from, inviter),
            ClientEvent::LeaveGame => self.route_leave(from).await,
            ClientEvent::Ready => self.route_to_session(from, SessionRoute::Ready).await,
            ClientEvent::Move { position } => {
                self.route_to_session(from, SessionRoute::Move { position })
                    .await;
            }
        }
    }

    /// Register a participant in the matchmaking pool.
    fn handle_enter(&mut self, from: ConnectionId, username: String) {
        if self.session_index.contains_key(&from) {
            debug!(
                target: "mc.actor.controller",
                connection_id = %from,
                "Dropping enter from a participant already in a session"
            );
            return;
        }

        if self.name_in_use(&username, from) {
            self.channel.send_to(
                from,
                ServerEvent::EnterFailure {
                    reason: "username already exists".to_string(),
                },
            );
            return;
        }

        self.directory.insert(from, username);
        self.sync_searcher_gauge();
        self.channel.send_to(from, ServerEvent::EnterSuccess);

        debug!(
            target: "mc.actor.controller",
            connection_id = %from,
            searchers = self.directory.len(),
            "Participant entered matchmaking"
        );
    }

    /// Whether `name` is taken by another searcher or an active player.
    fn name_in_use(&self, name: &str, by: ConnectionId) -> bool {
        self.directory.name_in_use(name, by)
            || self.sessions.values().any(|session| {
                session
                    .participants
                    .iter()
                    .any(|player| player.name == name)
            })
    }

    fn handle_change_params(&mut self, from: ConnectionId, params: SearchParams) {
        if !self.directory.set_params(from, params) {
            debug!(
                target: "mc.actor.controller",
                connection_id = %from,
                "Dropping search params from a non-searcher"
            );
        }
    }

    fn handle_leave_search(&mut self, from: ConnectionId) {
        if self.directory.remove(from).is_some() {
            self.sync_searcher_gauge();
        }
    }

    /// Record an invite, provided the target is searching and the two
    /// declared parameter sets are compatible.
    fn handle_invite(&mut self, from: ConnectionId, target: ConnectionId) {
        if from == target {
            return;
        }
        let (Some(from_entry), Some(target_entry)) =
            (self.directory.get(from), self.directory.get(target))
        else {
            return;
        };
        let (Some(from_params), Some(target_params)) = (from_entry.params, target_entry.params)
        else {
            return;
        };
        if !directory::are_compatible(&from_params, &target_params) {
            return;
        }

        self.directory.record_invite(from, target);
        debug!(
            target: "mc.actor.controller",
            from = %from,
            to = %target,
            "Invite recorded"
        );
    }

    /// `was_invited` says which side `other` was on: `true` means the
    /// caller sent the invite being cancelled.
    fn handle_cancel_invite(&mut self, from: ConnectionId, other: ConnectionId, was_invited: bool) {
        if !self.directory.is_searching(other) {
            return;
        }
        let (inviter, invitee) = if was_invited { (from, other) } else { (other, from) };
        self.directory.cancel_invite(inviter, invitee);
    }

    /// Accept a pending invite. Preconditions that fail (stale invite,
    /// drifted params) drop silently per the error model; a controller
    /// that cannot take new sessions is logged as an error but is equally
    /// silent towards the client.
    fn handle_accept_invite(&mut self, accepter: ConnectionId, inviter: ConnectionId) {
        if let Err(e) = self.try_create_session(accepter, inviter) {
            warn!(
                target: "mc.actor.controller",
                mc_id = %self.mc_id,
                error = %e,
                "Dropping accept"
            );
        }
    }

    /// Form the session: remove both searchers from the pool, spawn the
    /// session actor, open the room on both sides.
    fn try_create_session(
        &mut self,
        accepter: ConnectionId,
        inviter: ConnectionId,
    ) -> Result<(), McError> {
        if !self.accepting_new {
            return Err(McError::Draining);
        }
        if self.sessions.len() >= self.max_sessions {
            return Err(McError::CapacityExceeded);
        }
        if !self.directory.has_invited(inviter, accepter) {
            return Ok(());
        }
        let (Some(inviter_entry), Some(accepter_entry)) =
            (self.directory.get(inviter), self.directory.get(accepter))
        else {
            return Ok(());
        };
        let (Some(inviter_params), Some(accepter_params)) =
            (inviter_entry.params, accepter_entry.params)
        else {
            return Ok(());
        };
        // Params may have changed since the invite; re-validate.
        let Some(game_params) =
            directory::compute_game_params(&inviter_params, &accepter_params)
        else {
            debug!(
                target: "mc.actor.controller",
                inviter = %inviter,
                accepter = %accepter,
                "Dropping accept with no longer compatible params"
            );
            return Ok(());
        };

        let Some(inviter_entry) = self.directory.remove(inviter) else {
            return Ok(());
        };
        let Some(accepter_entry) = self.directory.remove(accepter) else {
            return Ok(());
        };
        self.sync_searcher_gauge();

        let inviter_info = PlayerInfo {
            id: inviter,
            name: inviter_entry.name,
        };
        let invitee_info = PlayerInfo {
            id: accepter,
            name: accepter_entry.name,
        };

        let session_token = self.cancel_token.child_token();
        let (handle, task_handle) = GameSessionActor::spawn(
            inviter_info.clone(),
            invitee_info.clone(),
            game_params,
            session_token,
            Arc::clone(&self.channel),
        );

        self.sessions.insert(
            inviter,
            ManagedSession {
                handle,
                task_handle,
                participants: [inviter_info.clone(), invitee_info.clone()],
            },
        );
        self.session_index.insert(inviter, inviter);
        self.session_index.insert(accepter, inviter);
        self.metrics.increment_sessions();
        metrics::counter!("mc_sessions_created_total").increment(1);

        self.channel.send_to(
            accepter,
            ServerEvent::OpenRoom {
                break_time: game_params.break_time,
                match_time: game_params.match_time,
                opponent: inviter_info.name.clone(),
            },
        );
        self.channel.send_to(
            inviter,
            ServerEvent::OpenRoom {
                break_time: game_params.break_time,
                match_time: game_params.match_time,
                opponent: invitee_info.name.clone(),
            },
        );

        info!(
            target: "mc.actor.controller",
            mc_id = %self.mc_id,
            session_id = %inviter,
            inviter = %inviter_info.name,
            invitee = %invitee_info.name,
            break_time = game_params.break_time,
            match_time = game_params.match_time,
            total_sessions = self.sessions.len(),
            "Session created"
        );
        Ok(())
    }

    /// A participant leaves their session (voluntarily or by disconnect).
    /// The store entry is deleted immediately; the session actor lingers
    /// on its own to run the remaining participant's grace clock.
    async fn route_leave(&mut self, from: ConnectionId) {
        let Some(session_key) = self.session_index.remove(&from) else {
            return;
        };
        let Some(managed) = self.sessions.remove(&session_key) else {
            return;
        };
        for player in &managed.participants {
            self.session_index.remove(&player.id);
        }
        self.metrics.decrement_sessions();

        if let Err(e) = managed.handle.leave(from).await {
            debug!(
                target: "mc.actor.controller",
                session_id = %session_key,
                error = %e,
                "Session actor gone before leave could be delivered"
            );
        }

        info!(
            target: "mc.actor.controller",
            mc_id = %self.mc_id,
            session_id = %session_key,
            connection_id = %from,
            "Participant left session, store entry removed"
        );
    }

    /// Forward a ready/move event to the sender's session, if any.
    async fn route_to_session(&mut self, from: ConnectionId, route: SessionRoute) {
        let Some(session_key) = self.session_index.get(&from) else {
            return;
        };
        let Some(managed) = self.sessions.get(session_key) else {
            return;
        };

        let result = match route {
            SessionRoute::Ready => managed.handle.ready(from).await,
            SessionRoute::Move { position } => managed.handle.play(from, position).await,
        };
        if let Err(e) = result {
            debug!(
                target: "mc.actor.controller",
                session_id = %session_key,
                error = %e,
                "Dropping event for finished session"
            );
        }
    }

    /// Transport closed: leave the pool and any session.
    async fn handle_disconnect(&mut self, from: ConnectionId) {
        if self.directory.remove(from).is_some() {
            self.sync_searcher_gauge();
        }
        self.route_leave(from).await;

        debug!(
            target: "mc.actor.controller",
            connection_id = %from,
            "Participant disconnected"
        );
    }

    /// Send every searcher with declared params the list of compatible
    /// candidates, with pending-invite flags in both directions.
    fn broadcast_search_updates(&self) {
        for entry in self.directory.iter() {
            let Some(params) = entry.params else {
                continue;
            };

            let candidates: Vec<Candidate> = self
                .directory
                .iter()
                .filter(|other| other.id != entry.id)
                .filter_map(|other| {
                    let other_params = other.params?;
                    directory::are_compatible(&params, &other_params).then(|| Candidate {
                        id: other.id,
                        name: other.name.clone(),
                        invited_you: other.invited.contains(&entry.id),
                        invited_by_you: entry.invited.contains(&other.id),
                    })
                })
                .collect();

            self.channel
                .send_to(entry.id, ServerEvent::SearchUpdate { candidates });
        }
    }

    /// Remove store entries for session actors that have exited on their
    /// own (break timeout, grace expiry).
    async fn reap_finished_sessions(&mut self) {
        let finished: Vec<ConnectionId> = self
            .sessions
            .iter()
            .filter(|(_, managed)| managed.task_handle.is_finished())
            .map(|(key, _)| *key)
            .collect();

        for session_key in finished {
            if let Some(managed) = self.sessions.remove(&session_key) {
                for player in &managed.participants {
                    self.session_index.remove(&player.id);
                }
                self.metrics.decrement_sessions();

                match managed.task_handle.await {
                    Ok(()) => {
                        debug!(
                            target: "mc.actor.controller",
                            mc_id = %self.mc_id,
                            session_id = %session_key,
                            "Session actor exited cleanly, store entry reaped"
                        );
                    }
                    Err(join_error) => {
                        if join_error.is_panic() {
                            error!(
                                target: "mc.actor.controller",
                                mc_id = %self.mc_id,
                                session_id = %session_key,
                                error = ?join_error,
                                "Session actor panicked"
                            );
                        }
                    }
                }
            }
        }
    }

    fn sync_searcher_gauge(&self) {
        // Directory size fits comfortably in u32; saturate rather than panic.
        self.metrics
            .set_searchers(u32::try_from(self.directory.len()).unwrap_or(u32::MAX));
    }

    /// Perform graceful shutdown: cancel and drain all session actors.
    async fn graceful_shutdown(&mut self) {
        info!(
            target: "mc.actor.controller",
            mc_id = %self.mc_id,
            session_count = self.sessions.len(),
            "Performing graceful shutdown"
        );

        self.accepting_new = false;

        for managed in self.sessions.values() {
            managed.handle.cancel();
        }

        for (session_key, managed) in self.sessions.drain() {
            match tokio::time::timeout(Duration::from_secs(5), managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "mc.actor.controller",
                        mc_id = %self.mc_id,
                        session_id = %session_key,
                        "Session actor completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "mc.actor.controller",
                        mc_id = %self.mc_id,
                        session_id = %session_key,
                        error = ?e,
                        "Session actor task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "mc.actor.controller",
                        mc_id = %self.mc_id,
                        session_id = %session_key,
                        "Session actor shutdown timed out"
                    );
                }
            }
        }
        self.session_index.clear();

        info!(
            target: "mc.actor.controller",
            mc_id = %self.mc_id,
            "Graceful shutdown complete"
        );
    }
}

/// Which session operation an inbound event maps to.
#[derive(Debug, Clone, Copy)]
enum SessionRoute {
    Ready,
    Move { position: u8 },
}
