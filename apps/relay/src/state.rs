//! Shared relay state
//!
//! Registry membership, the token cache, and the last reported player state
//! share one mutual-exclusion domain. The lock is never held across an
//! await: token refreshes and storage writes read under the lock, release
//! it, perform the blocking call, then re-acquire to commit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use radiolink_spotify_client::SpotifyClient;

use crate::error::{RelayError, RelayResult};
use crate::storage::{TokenStore, TOKENS_DOCUMENT};
use crate::tokens::TokenCache;
use crate::websocket::messages::{RelayMessage, TokenSet};
use crate::websocket::registry::{BroadcastScope, ConnectionId, Registry};

/// Snapshot of connection counts for diagnostics
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ConnectionStats {
    pub connections: usize,
    pub players: usize,
    pub remotes: usize,
}

/// Everything guarded by the relay's single lock
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub registry: Registry,
    pub tokens: TokenCache,
    pub last_player_state: Option<Value>,
}

/// Shared relay state handed to every connection handler
#[derive(Clone)]
pub struct RelayState {
    inner: Arc<Inner>,
}

struct Inner {
    shared: Mutex<Shared>,
    /// Held across the provider call so concurrent refreshes coalesce
    refresh_gate: AsyncMutex<()>,
    /// Bumped when a refresh attempt fails; a caller that snapshotted the
    /// value before taking the gate detects the failure of any attempt it
    /// overlapped and returns instead of calling the provider again
    refresh_epoch: AtomicU64,
    spotify: Option<SpotifyClient>,
    store: TokenStore,
    settle_delay: Duration,
}

impl RelayState {
    pub fn new(spotify: Option<SpotifyClient>, store: TokenStore, settle_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared::default()),
                refresh_gate: AsyncMutex::new(()),
                refresh_epoch: AtomicU64::new(0),
                spotify,
                store,
                settle_delay,
            }),
        }
    }

    /// Settling delay before a joining remote gets the player roster
    pub fn settle_delay(&self) -> Duration {
        self.inner.settle_delay
    }

    /// Run a closure under the shared-state lock
    pub(crate) fn with_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        let mut shared = self
            .inner
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut shared)
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Add a new, unidentified connection
    pub fn register(&self, sender: mpsc::UnboundedSender<String>) -> ConnectionId {
        let (id, count) = self.with_shared(|s| {
            let id = s.registry.register(sender);
            (id, s.registry.connection_count())
        });
        debug!(conn_id = %id, connections = count, "Connection registered");
        id
    }

    /// Remove a connection and notify remotes about a departed player
    ///
    /// Removal and the PlayerDisconnected fan-out happen under one lock
    /// acquisition, so no handler can observe the connection as removed
    /// while it is still a broadcast target.
    pub fn disconnect(&self, id: ConnectionId) {
        let departed_device = self.with_shared(|s| {
            let departed = s.registry.unregister(id)?;
            let device_id = departed.device_id.filter(|_| departed.was_player)?;
            s.registry.broadcast(
                BroadcastScope::Remotes,
                &RelayMessage::PlayerDisconnected(device_id.clone()),
            );
            Some(device_id)
        });

        match departed_device {
            Some(device_id) => {
                info!(conn_id = %id, device_id = %device_id, "Player disconnected")
            }
            None => debug!(conn_id = %id, "Connection closed"),
        }
    }

    /// Connection counts for diagnostics
    pub fn connection_stats(&self) -> ConnectionStats {
        self.with_shared(|s| ConnectionStats {
            connections: s.registry.connection_count(),
            players: s.registry.player_count(),
            remotes: s.registry.remote_count(),
        })
    }

    /// Send a message to every target in scope
    pub fn broadcast(&self, scope: BroadcastScope, message: &RelayMessage) -> usize {
        self.with_shared(|s| s.registry.broadcast(scope, message))
    }

    /// Send a message to a single connection
    pub fn send_to(&self, id: ConnectionId, message: &RelayMessage) -> bool {
        self.with_shared(|s| s.registry.send_to(id, message))
    }

    // ------------------------------------------------------------------
    // Token lifecycle
    // ------------------------------------------------------------------

    /// Load the persisted token set into the cache
    ///
    /// Called once at startup. Expiry is not validated here; a stale set is
    /// refreshed on first use.
    pub async fn load_tokens(&self) {
        match self.inner.store.get::<TokenSet>(TOKENS_DOCUMENT).await {
            Some(set) => {
                info!(expired = set.is_expired(), "Loaded persisted token set");
                self.with_shared(|s| s.tokens.replace(set));
            }
            None => info!("No persisted token set; waiting for authorization"),
        }
    }

    /// The currently held token set, if any
    pub fn current_tokens(&self) -> Option<TokenSet> {
        self.with_shared(|s| s.tokens.current().cloned())
    }

    /// Whether the held token set needs a refresh (true when none is held)
    pub fn tokens_expired(&self) -> bool {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.with_shared(|s| s.tokens.is_expired_at(now_ms))
    }

    /// Accept a client-submitted token set
    ///
    /// Unconditionally replaces the cache and relays the set to every
    /// connection. Error-marked sets are relayed but never persisted.
    pub async fn submit_tokens(&self, mut set: TokenSet) {
        if set.obtained_at == 0 {
            set.obtained_at = chrono::Utc::now().timestamp_millis();
        }

        let has_error = set.has_error();
        let message = RelayMessage::Token(set.clone());
        let recipients = self.with_shared(|s| {
            s.tokens.replace(set.clone());
            s.registry.broadcast(BroadcastScope::All, &message)
        });
        info!(recipients, has_error, "Token set submitted");

        if has_error {
            return;
        }
        if let Err(e) = self.inner.store.set(TOKENS_DOCUMENT, &set).await {
            warn!(error = %e, "Failed to persist token set");
        }
    }

    /// Refresh the held token set through the provider
    ///
    /// Single-flight: the gate is held across the provider call, so
    /// overlapping requests wait on the one outstanding attempt and adopt
    /// its result — a fresh set on success, an error (without a duplicate
    /// provider call) on failure. On provider failure the stale set is
    /// retained and Unauthorized is broadcast to all connections.
    pub async fn refresh_tokens(&self) -> RelayResult<TokenSet> {
        let epoch = self.inner.refresh_epoch.load(Ordering::Acquire);
        let _gate = self.inner.refresh_gate.lock().await;

        let now_ms = chrono::Utc::now().timestamp_millis();
        let (held, expired, refresh_token) = self.with_shared(|s| {
            (
                s.tokens.current().cloned(),
                s.tokens.is_expired_at(now_ms),
                s.tokens.refresh_token(),
            )
        });

        let Some(held) = held else {
            return Err(RelayError::Unauthenticated);
        };
        if !expired {
            // A concurrent caller refreshed while we waited on the gate
            return Ok(held);
        }
        if self.inner.refresh_epoch.load(Ordering::Acquire) != epoch {
            // An attempt we overlapped has failed and broadcast
            // Unauthorized; don't hit the provider again for this request
            return Err(RelayError::CoalescedRefreshFailed);
        }

        let Some(refresh_token) = refresh_token else {
            warn!("Token set has no refresh token; cannot refresh");
            self.inner.refresh_epoch.fetch_add(1, Ordering::AcqRel);
            self.broadcast(BroadcastScope::All, &RelayMessage::Unauthorized);
            return Err(RelayError::MissingRefreshToken);
        };
        let Some(spotify) = &self.inner.spotify else {
            warn!("No provider credentials configured; cannot refresh");
            self.inner.refresh_epoch.fetch_add(1, Ordering::AcqRel);
            self.broadcast(BroadcastScope::All, &RelayMessage::Unauthorized);
            return Err(RelayError::Configuration(
                "provider credentials not configured".into(),
            ));
        };

        match spotify.refresh(&refresh_token).await {
            Ok(grant) => {
                let now_ms = chrono::Utc::now().timestamp_millis();
                let merged = self.with_shared(|s| s.tokens.apply_grant(&grant, now_ms));
                info!(expires_in = merged.expires_in, "Token set refreshed");

                if let Err(e) = self.inner.store.set(TOKENS_DOCUMENT, &merged).await {
                    warn!(error = %e, "Failed to persist refreshed token set");
                }
                Ok(merged)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed; broadcasting Unauthorized");
                self.inner.refresh_epoch.fetch_add(1, Ordering::AcqRel);
                self.broadcast(BroadcastScope::All, &RelayMessage::Unauthorized);
                Err(RelayError::Refresh(e))
            }
        }
    }
}
