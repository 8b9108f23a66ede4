//! radiolink relay library
//!
//! The relay mediates remote control of a shared audio player: connections
//! identify as players (perform playback, report state) or remotes (send
//! commands, display state). The relay fans playback-state and connectivity
//! events between the two populations and owns the single process-wide
//! OAuth token set, refreshing it before expiry.
//!
//! This module tree is exposed for integration tests and for embedding the
//! relay in other binaries.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
pub mod tokens;
pub mod websocket;

// Re-export commonly used types
pub use error::{RelayError, RelayResult};
pub use state::RelayState;
