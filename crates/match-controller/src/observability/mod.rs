//! Health and readiness surfaces.

mod health;

pub use health::{health_router, HealthState};
