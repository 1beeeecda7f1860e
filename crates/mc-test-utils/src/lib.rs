//! # MC Test Utilities
//!
//! Shared test utilities for the Gridlock Match Controller.
//!
//! This crate provides a recording implementation of the outbound event
//! channel plus pre-configured search-parameter fixtures, so controller
//! and session behavior can be tested without a WebSocket in sight.
//!
//! ## Modules
//!
//! - `recording` - [`recording::RecordingSink`], an `EventSink` that
//!   captures every outbound event and lets tests await specific ones
//! - `fixtures` - search parameters and player builders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mc_test_utils::fixtures::exact_params;
//! use mc_test_utils::recording::RecordingSink;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let sink = RecordingSink::new();
//!     // ... drive a controller or session handle with `sink` ...
//!     let event = sink
//!         .wait_matching(some_id, |e| matches!(e, ServerEvent::OpenRoom { .. }))
//!         .await;
//! }
//! ```

pub mod fixtures;
pub mod recording;
