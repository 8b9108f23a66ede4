//! Error types for the relay
//!
//! No condition in the relay is fatal to the process: provider and storage
//! failures degrade to Unauthorized broadcasts or logged warnings, so these
//! variants surface in logs and return values rather than HTTP responses.

use thiserror::Error;

/// Relay error type
#[derive(Error, Debug)]
pub enum RelayError {
    /// No token set is held, so there is nothing to refresh
    #[error("no token set available")]
    Unauthenticated,

    /// The held token set has no refresh token
    #[error("token set has no refresh token")]
    MissingRefreshToken,

    /// Token refresh failed at the provider
    #[error("token refresh failed: {0}")]
    Refresh(#[from] radiolink_spotify_client::SpotifyError),

    /// A concurrent refresh attempt this caller awaited has failed
    #[error("concurrent token refresh failed")]
    CoalescedRefreshFailed,

    /// Storage I/O failed
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
