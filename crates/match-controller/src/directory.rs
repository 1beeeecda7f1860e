//! Matchmaking directory: who is searching, under what name, with which
//! declared time controls, and which invites are pending between them.
//!
//! The directory is a plain owned container (no interior mutability, no
//! global state); the controller actor is its only writer, which keeps
//! every mutation atomic with respect to other events.
//!
//! Compatibility policy: two searchers are compatible iff their break-time
//! ranges intersect and their match-time ranges intersect. The session
//! plays the floor midpoint of each intersection.

use crate::events::{ConnectionId, DurationRange, GameParams, SearchParams};
use std::collections::HashMap;

/// One searcher's pool entry.
#[derive(Debug, Clone)]
pub struct SearchEntry {
    pub id: ConnectionId,
    pub name: String,
    /// Absent until the searcher declares time controls; a searcher
    /// without params is compatible with nobody.
    pub params: Option<SearchParams>,
    /// Outgoing invites, in the order they were sent. No duplicates.
    pub invited: Vec<ConnectionId>,
    /// Incoming invites, in the order they arrived. No duplicates.
    pub was_invited: Vec<ConnectionId>,
}

impl SearchEntry {
    fn new(id: ConnectionId, name: String) -> Self {
        Self {
            id,
            name,
            params: None,
            invited: Vec::new(),
            was_invited: Vec::new(),
        }
    }
}

/// The matchmaking pool.
#[derive(Debug, Default)]
pub struct Directory {
    entries: HashMap<ConnectionId, SearchEntry>,
}

impl Directory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` under `name`, replacing any previous entry for the
    /// same connection (re-entering resets params and invites, including
    /// invites other searchers hold against `id`).
    pub fn insert(&mut self, id: ConnectionId, name: String) {
        self.remove(id);
        self.entries.insert(id, SearchEntry::new(id, name));
    }

    /// Remove `id` from the pool and purge it from every other entry's
    /// invite lists, returning the removed entry if there was one.
    pub fn remove(&mut self, id: ConnectionId) -> Option<SearchEntry> {
        let removed = self.entries.remove(&id);
        if removed.is_some() {
            for entry in self.entries.values_mut() {
                entry.invited.retain(|other| *other != id);
                entry.was_invited.retain(|other| *other != id);
            }
        }
        removed
    }

    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<&SearchEntry> {
        self.entries.get(&id)
    }

    #[must_use]
    pub fn is_searching(&self, id: ConnectionId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Whether `name` is held by a searcher other than `id`.
    #[must_use]
    pub fn name_in_use(&self, name: &str, by: ConnectionId) -> bool {
        self.entries
            .values()
            .any(|entry| entry.id != by && entry.name == name)
    }

    /// Declare or change a searcher's time controls. Returns `false` if
    /// the searcher is not in the pool.
    pub fn set_params(&mut self, id: ConnectionId, params: SearchParams) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.params = Some(params);
                true
            }
            None => false,
        }
    }

    /// Record an invite from `inviter` to `invitee` on both entries.
    /// Idempotent; both searchers must be in the pool.
    pub fn record_invite(&mut self, inviter: ConnectionId, invitee: ConnectionId) {
        if !self.entries.contains_key(&inviter) || !self.entries.contains_key(&invitee) {
            return;
        }
        if let Some(entry) = self.entries.get_mut(&inviter) {
            if !entry.invited.contains(&invitee) {
                entry.invited.push(invitee);
            }
        }
        if let Some(entry) = self.entries.get_mut(&invitee) {
            if !entry.was_invited.contains(&inviter) {
                entry.was_invited.push(inviter);
            }
        }
    }

    /// Remove the `inviter` → `invitee` invite from both entries.
    pub fn cancel_invite(&mut self, inviter: ConnectionId, invitee: ConnectionId) {
        if let Some(entry) = self.entries.get_mut(&inviter) {
            entry.invited.retain(|id| *id != invitee);
        }
        if let Some(entry) = self.entries.get_mut(&invitee) {
            entry.was_invited.retain(|id| *id != inviter);
        }
    }

    /// Whether `inviter` has a pending invite to `invitee`.
    #[must_use]
    pub fn has_invited(&self, inviter: ConnectionId, invitee: ConnectionId) -> bool {
        self.entries
            .get(&inviter)
            .is_some_and(|entry| entry.invited.contains(&invitee))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether two declared time controls can produce a game.
#[must_use]
pub fn are_compatible(a: &SearchParams, b: &SearchParams) -> bool {
    compute_game_params(a, b).is_some()
}

/// The durations a session between these two searchers plays with:
/// the floor midpoint of each range intersection. `None` if incompatible.
#[must_use]
pub fn compute_game_params(a: &SearchParams, b: &SearchParams) -> Option<GameParams> {
    let break_range = a.break_time.intersect(&b.break_time)?;
    let match_range = a.match_time.intersect(&b.match_time)?;
    Some(GameParams {
        break_time: midpoint(break_range),
        match_time: midpoint(match_range),
    })
}

fn midpoint(range: DurationRange) -> u32 {
    range.min + (range.max - range.min) / 2
}
