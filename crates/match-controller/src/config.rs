//! Match Controller configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults; the service starts with no environment at all.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Default bind address for the WebSocket + health server.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default interval between search-update broadcasts, milliseconds.
pub const DEFAULT_SEARCH_UPDATE_INTERVAL_MS: u64 = 1000;

/// Default maximum number of concurrent game sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Default instance ID prefix.
pub const DEFAULT_MC_ID_PREFIX: &str = "mc";

/// Match Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Interval between search-update broadcasts to searchers, in
    /// milliseconds (default: 1000).
    pub search_update_interval_ms: u64,

    /// Maximum concurrent game sessions this instance will host.
    pub max_sessions: usize,

    /// Unique identifier for this instance (auto-generated by default).
    pub mc_id: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("MC_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Fail fast on an unparseable address rather than at serve time.
        bind_address.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue(format!("MC_BIND_ADDRESS {bind_address:?}: {e}"))
        })?;

        let search_update_interval_ms = vars
            .get("MC_SEARCH_UPDATE_INTERVAL_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SEARCH_UPDATE_INTERVAL_MS);

        if search_update_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "MC_SEARCH_UPDATE_INTERVAL_MS must be nonzero".to_string(),
            ));
        }

        let max_sessions = vars
            .get("MC_MAX_SESSIONS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_SESSIONS);

        let mc_id = vars.get("MC_ID").cloned().unwrap_or_else(|| {
            let hostname = env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_MC_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            bind_address,
            search_update_interval_ms,
            max_sessions,
            mc_id,
        })
    }
}
