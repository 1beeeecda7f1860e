//! Pre-configured test data.

use match_controller::actors::PlayerInfo;
use match_controller::events::{ConnectionId, DurationRange, SearchParams};

/// Search params that accept exactly one break/match duration.
///
/// Two searchers with the same exact params always pair to exactly these
/// durations.
#[must_use]
pub fn exact_params(break_time: u32, match_time: u32) -> SearchParams {
    SearchParams {
        break_time: DurationRange {
            min: break_time,
            max: break_time,
        },
        match_time: DurationRange {
            min: match_time,
            max: match_time,
        },
    }
}

/// Search params over inclusive `(min, max)` ranges.
#[must_use]
pub fn range_params(break_time: (u32, u32), match_time: (u32, u32)) -> SearchParams {
    SearchParams {
        break_time: DurationRange {
            min: break_time.0,
            max: break_time.1,
        },
        match_time: DurationRange {
            min: match_time.0,
            max: match_time.1,
        },
    }
}

/// A participant with a fresh connection identity.
#[must_use]
pub fn player_info(name: &str) -> PlayerInfo {
    PlayerInfo {
        id: ConnectionId::new(),
        name: name.to_string(),
    }
}
