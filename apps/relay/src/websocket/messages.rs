//! Wire protocol for the relay
//!
//! Every frame is one JSON message with a `{ "type": ..., "payload": ... }`
//! envelope. A single enum covers both directions: several client frames
//! (Token, PlayerConnected, PlayerStateChanged) are relayed onward as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role a connection declares for itself
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    /// Performs playback and reports state
    Player,
    /// Sends commands and displays state
    Remote,
}

impl std::fmt::Display for ClientRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientRole::Player => write!(f, "player"),
            ClientRole::Remote => write!(f, "remote"),
        }
    }
}

/// The OAuth credential bundle authorizing playback
///
/// At most one TokenSet is authoritative process-wide. Provider fields keep
/// their wire names; `obtained_at` (epoch milliseconds) is stamped by the
/// relay when the set is accepted or refreshed. Fields this struct does not
/// model ride through `extra` so a relayed set reaches clients unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenSet {
    /// Bearer token used to authorize playback calls
    #[serde(default)]
    pub access_token: String,

    /// Long-lived token used to obtain fresh access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Lifetime of the access token in seconds, as granted
    #[serde(default)]
    pub expires_in: u64,

    /// Epoch milliseconds when the grant was obtained
    #[serde(default)]
    pub obtained_at: i64,

    /// Token type reported by the provider (always "Bearer" in practice)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Space-separated scopes granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Error marker from a failed client-side authorization; an error-marked
    /// set is cached and relayed but never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Provider fields the relay does not interpret
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl TokenSet {
    /// Refresh margin: a set is treated as expired this long before the
    /// provider would actually reject it
    pub const EXPIRY_MARGIN_MS: i64 = 5 * 60 * 1000;

    /// Whether the set needs a refresh at the given instant
    ///
    /// Boundary-exact: the set is expired from exactly
    /// `obtained_at + expires_in * 1000 - EXPIRY_MARGIN_MS` onward.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms - (self.obtained_at + self.expires_in as i64 * 1000) >= -Self::EXPIRY_MARGIN_MS
    }

    /// Whether the set needs a refresh now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp_millis())
    }

    /// Whether the set carries an error marker
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Messages relayed between players and remotes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum RelayMessage {
    /// A connection declares its role
    ClientType(ClientRole),

    /// A player reports the device identity it controls; relayed to remotes
    PlayerConnected(String),

    /// A player with the given device identity went away
    PlayerDisconnected(String),

    /// A player reports fresh playback state (opaque to the relay)
    PlayerStateChanged(Value),

    /// A client asks for the current token set
    RequestToken,

    /// The token set, client-submitted inbound or relayed outbound
    Token(TokenSet),

    /// No valid token set is available
    Unauthorized,
}
