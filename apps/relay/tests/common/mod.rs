//! Test helpers for relay integration tests
//!
//! Connections are driven directly at the state layer: each test connection
//! owns the receiving end of its outbound queue and a `RelayHandler`, which
//! is exactly what the socket loop wires up in production.

#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::mpsc;

use radiolink_relay::state::RelayState;
use radiolink_relay::storage::TokenStore;
use radiolink_relay::websocket::messages::{ClientRole, RelayMessage, TokenSet};
use radiolink_relay::websocket::registry::ConnectionId;
use radiolink_relay::websocket::relay::RelayHandler;
use radiolink_spotify_client::SpotifyClient;

/// A relay with its backing store kept on a temp directory
pub struct TestRelay {
    pub state: RelayState,
    pub store: TokenStore,
    _data_dir: tempfile::TempDir,
}

/// Build a relay with the given provider client and settling delay
pub fn test_relay(spotify: Option<SpotifyClient>, settle_delay: Duration) -> TestRelay {
    let data_dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(data_dir.path());
    let state = RelayState::new(spotify, store.clone(), settle_delay);
    TestRelay {
        state,
        store,
        _data_dir: data_dir,
    }
}

/// One simulated connection: registry entry, handler, and outbound queue
pub struct TestConn {
    pub id: ConnectionId,
    pub handler: RelayHandler,
    pub rx: mpsc::UnboundedReceiver<String>,
}

/// Register a new connection against the relay
pub fn connect(state: &RelayState) -> TestConn {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = state.register(tx);
    TestConn {
        id,
        handler: RelayHandler::new(id, state.clone()),
        rx,
    }
}

impl TestConn {
    /// Send a ClientType identification through the handler
    pub async fn identify(&self, role: ClientRole) {
        self.handler
            .handle_message(RelayMessage::ClientType(role))
            .await;
    }

    /// Next queued outbound message, if any
    pub fn try_next(&mut self) -> Option<RelayMessage> {
        self.rx
            .try_recv()
            .ok()
            .map(|frame| serde_json::from_str(&frame).unwrap())
    }

    /// All queued outbound messages
    pub fn drain(&mut self) -> Vec<RelayMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.try_next() {
            messages.push(message);
        }
        messages
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A token set that will not need a refresh for about an hour
pub fn fresh_token_set() -> TokenSet {
    TokenSet {
        access_token: "at-fresh".into(),
        refresh_token: Some("rt-1".into()),
        expires_in: 3600,
        obtained_at: now_ms(),
        ..Default::default()
    }
}

/// A token set already inside the refresh margin
pub fn expired_token_set() -> TokenSet {
    TokenSet {
        access_token: "at-stale".into(),
        refresh_token: Some("rt-1".into()),
        expires_in: 3600,
        obtained_at: now_ms() - 7_200_000,
        ..Default::default()
    }
}
