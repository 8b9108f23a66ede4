//! Message routing between players and remotes
//!
//! One [`RelayHandler`] per connection dispatches inbound messages and runs
//! the remote-join sequence. Messages the relay only ever sends outbound
//! (PlayerDisconnected, Unauthorized) are dropped if a client submits them.

use serde_json::Value;
use tracing::{debug, info};

use crate::state::RelayState;
use crate::websocket::messages::{ClientRole, RelayMessage, TokenSet};
use crate::websocket::registry::{BroadcastScope, ConnectionId};

/// Routes one connection's inbound messages
pub struct RelayHandler {
    conn_id: ConnectionId,
    state: RelayState,
}

impl RelayHandler {
    pub fn new(conn_id: ConnectionId, state: RelayState) -> Self {
        Self { conn_id, state }
    }

    /// Handle one parsed inbound message
    pub async fn handle_message(&self, message: RelayMessage) {
        match message {
            RelayMessage::ClientType(role) => self.on_client_type(role),
            RelayMessage::PlayerConnected(device_id) => self.on_player_connected(device_id),
            RelayMessage::PlayerStateChanged(playback) => self.on_player_state_changed(playback),
            RelayMessage::RequestToken => self.on_request_token().await,
            RelayMessage::Token(set) => self.on_token(set).await,
            other => {
                debug!(
                    conn_id = %self.conn_id,
                    message = ?other,
                    "Dropping message type not accepted from clients"
                );
            }
        }
    }

    fn on_client_type(&self, role: ClientRole) {
        self.state
            .with_shared(|s| s.registry.identify(self.conn_id, role));
        info!(conn_id = %self.conn_id, role = %role, "Connection identified");

        if role == ClientRole::Remote {
            self.on_remote_joined();
        }
    }

    /// Bring a joining remote up to date
    ///
    /// Auth status goes out immediately: the current token set if it is
    /// fresh, Unauthorized otherwise. The player roster and last playback
    /// state follow after the settling delay, as a deferred task that is
    /// aborted if the remote disconnects first.
    fn on_remote_joined(&self) {
        let now_ms = chrono::Utc::now().timestamp_millis();
        match self.state.current_tokens() {
            Some(set) if !set.is_expired_at(now_ms) => {
                self.state.send_to(self.conn_id, &RelayMessage::Token(set));
            }
            _ => {
                self.state.send_to(self.conn_id, &RelayMessage::Unauthorized);
            }
        }

        let state = self.state.clone();
        let conn_id = self.conn_id;
        let replay = tokio::spawn(async move {
            tokio::time::sleep(state.settle_delay()).await;
            state.with_shared(|s| {
                for device_id in s.registry.player_device_identities() {
                    s.registry
                        .send_to(conn_id, &RelayMessage::PlayerConnected(device_id));
                }
                if let Some(playback) = s.last_player_state.clone() {
                    s.registry
                        .send_to(conn_id, &RelayMessage::PlayerStateChanged(playback));
                }
            });
        });
        self.state
            .with_shared(|s| s.registry.set_replay(self.conn_id, replay.abort_handle()));
    }

    fn on_player_connected(&self, device_id: String) {
        let recorded = self.state.with_shared(|s| {
            if !s.registry.is_player(self.conn_id) {
                return false;
            }
            s.registry
                .record_device_identity(self.conn_id, device_id.clone());
            s.registry.broadcast(
                BroadcastScope::Remotes,
                &RelayMessage::PlayerConnected(device_id.clone()),
            );
            true
        });

        if recorded {
            info!(conn_id = %self.conn_id, device_id = %device_id, "Player device connected");
        } else {
            debug!(
                conn_id = %self.conn_id,
                "Ignoring device report from a connection not identified as a player"
            );
        }
    }

    fn on_player_state_changed(&self, playback: Value) {
        self.state.with_shared(|s| {
            s.last_player_state = Some(playback.clone());
            let message = RelayMessage::PlayerStateChanged(playback);
            s.registry.broadcast(BroadcastScope::Remotes, &message);
        });
        debug!(conn_id = %self.conn_id, "Playback state relayed to remotes");
    }

    async fn on_request_token(&self) {
        if self.state.current_tokens().is_none() {
            let recipients = self
                .state
                .broadcast(BroadcastScope::All, &RelayMessage::Unauthorized);
            debug!(
                conn_id = %self.conn_id,
                recipients,
                "Token requested while unauthenticated"
            );
            return;
        }

        if self.state.tokens_expired() {
            match self.state.refresh_tokens().await {
                Ok(set) => {
                    self.state
                        .broadcast(BroadcastScope::All, &RelayMessage::Token(set));
                }
                // refresh_tokens has already broadcast Unauthorized
                Err(e) => {
                    debug!(
                        conn_id = %self.conn_id,
                        error = %e,
                        "Token request could not be satisfied"
                    );
                }
            }
            return;
        }

        match self.state.current_tokens() {
            Some(set) => {
                self.state
                    .broadcast(BroadcastScope::All, &RelayMessage::Token(set));
            }
            None => {
                self.state
                    .broadcast(BroadcastScope::All, &RelayMessage::Unauthorized);
            }
        }
    }

    async fn on_token(&self, set: TokenSet) {
        debug!(
            conn_id = %self.conn_id,
            has_error = set.has_error(),
            "Token set received"
        );
        self.state.submit_tokens(set).await;
    }
}
