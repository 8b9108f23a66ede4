//! Spotify accounts-service response models

use serde::{Deserialize, Serialize};

/// A successful token grant from the accounts service
///
/// The refresh endpoint only returns `refresh_token` when Spotify decides to
/// rotate it; callers merging a grant into existing credentials must keep
/// their previous refresh token when the field is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Bearer token used to authorize playback calls
    pub access_token: String,

    /// Token type (always "Bearer" in practice)
    #[serde(default)]
    pub token_type: Option<String>,

    /// Space-separated scopes granted
    #[serde(default)]
    pub scope: Option<String>,

    /// Lifetime of the access token in seconds
    pub expires_in: u64,

    /// Rotated refresh token, if the service issued one
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Accounts-service error response body
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
