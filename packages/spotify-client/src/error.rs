//! Spotify accounts-service error types

use thiserror::Error;

/// Spotify accounts-service client errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Client credentials are missing
    #[error("client credentials are required for the Spotify accounts service")]
    MissingCredentials,

    /// No refresh token was provided
    #[error("refresh token cannot be empty")]
    MissingRefreshToken,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse Spotify response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The accounts service refused the grant (e.g. revoked refresh token)
    #[error("Spotify refused the token grant: {error}")]
    Refused {
        error: String,
        description: Option<String>,
    },

    /// The accounts service returned a server error
    #[error("Spotify accounts service error: HTTP {0}")]
    Server(u16),

    /// Rate limited by the accounts service
    #[error("Rate limited by the Spotify accounts service")]
    RateLimited,

    /// Request timeout
    #[error("Request to Spotify timed out")]
    Timeout,
}

impl SpotifyError {
    /// Check if this error is retryable (transient failure)
    ///
    /// Retries on timeouts, rate limiting, transport errors, and server
    /// errors (5xx). A refused grant is terminal: retrying a revoked
    /// refresh token cannot succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SpotifyError::Timeout | SpotifyError::RateLimited | SpotifyError::Server(_) => true,
            SpotifyError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Result type for Spotify accounts-service operations
pub type SpotifyResult<T> = Result<T, SpotifyError>;
