//! Connection registry and broadcast fan-out
//!
//! The registry owns every open connection plus the derived player and
//! remote membership sets. It is a plain data structure: callers hold the
//! relay's shared-state lock while touching it, which is what makes
//! "removed" and "broadcast target" impossible to observe at the same time.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use uuid::Uuid;

use super::messages::{ClientRole, RelayMessage};

/// Process-unique identifier for one transport session
pub type ConnectionId = Uuid;

/// Handle for one open connection
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Outbound frame queue drained by the connection's writer task
    sender: mpsc::UnboundedSender<String>,

    /// Device identity reported by a player, once known
    device_id: Option<String>,

    /// Pending remote-join replay, cancelled if the connection closes first
    replay: Option<AbortHandle>,
}

/// Delivery scope for a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastScope {
    /// One specific connection
    Single(ConnectionId),
    /// Every connection identified as a player
    Players,
    /// Every connection identified as a remote
    Remotes,
    /// Every open connection, identified or not
    All,
}

/// What `unregister` observed about the departing connection
#[derive(Debug)]
pub struct Departed {
    pub was_player: bool,
    pub device_id: Option<String>,
}

/// All open connections and the player/remote membership sets
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    players: HashSet<ConnectionId>,
    remotes: HashSet<ConnectionId>,
}

impl Registry {
    /// Add a new, unidentified connection
    pub fn register(&mut self, sender: mpsc::UnboundedSender<String>) -> ConnectionId {
        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            ConnectionHandle {
                sender,
                device_id: None,
                replay: None,
            },
        );
        id
    }

    /// Add the connection to the membership set for `role`
    ///
    /// Idempotent per call. Re-identification adds membership rather than
    /// rejecting; a connection may end up in both sets.
    pub fn identify(&mut self, id: ConnectionId, role: ClientRole) {
        if !self.connections.contains_key(&id) {
            return;
        }
        match role {
            ClientRole::Player => self.players.insert(id),
            ClientRole::Remote => self.remotes.insert(id),
        };
    }

    /// Whether the connection has identified as a player
    pub fn is_player(&self, id: ConnectionId) -> bool {
        self.players.contains(&id)
    }

    /// Attach a device identity to a player connection
    pub fn record_device_identity(&mut self, id: ConnectionId, device_id: String) {
        if let Some(handle) = self.connections.get_mut(&id) {
            handle.device_id = Some(device_id);
        }
    }

    /// Store the abort handle of a pending remote-join replay
    ///
    /// Replaces (and aborts) any previous replay for the connection. If the
    /// connection is already gone the task is aborted immediately.
    pub fn set_replay(&mut self, id: ConnectionId, replay: AbortHandle) {
        match self.connections.get_mut(&id) {
            Some(handle) => {
                if let Some(previous) = handle.replay.replace(replay) {
                    previous.abort();
                }
            }
            None => replay.abort(),
        }
    }

    /// Device identities of all currently-known players
    pub fn player_device_identities(&self) -> Vec<String> {
        self.players
            .iter()
            .filter_map(|id| self.connections.get(id).and_then(|h| h.device_id.clone()))
            .collect()
    }

    /// Remove the connection from all three sets, by identity
    ///
    /// Aborts any pending replay. Returns what was known about the
    /// connection so the caller can notify remotes about departed players.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Departed> {
        let handle = self.connections.remove(&id)?;
        if let Some(replay) = handle.replay {
            replay.abort();
        }
        let was_player = self.players.remove(&id);
        self.remotes.remove(&id);
        Some(Departed {
            was_player,
            device_id: handle.device_id,
        })
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of connections identified as players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Number of connections identified as remotes
    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Send a message to a single connection
    pub fn send_to(&self, id: ConnectionId, message: &RelayMessage) -> bool {
        self.broadcast(BroadcastScope::Single(id), message) == 1
    }

    /// Serialize a message once and deliver it to every target in scope
    ///
    /// Returns the number of successful deliveries. A closed target is
    /// logged and skipped; it never affects the remaining targets.
    pub fn broadcast(&self, scope: BroadcastScope, message: &RelayMessage) -> usize {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast message");
                return 0;
            }
        };

        let mut sent = 0;
        match scope {
            BroadcastScope::Single(id) => self.deliver(&id, &frame, &mut sent),
            BroadcastScope::Players => {
                for id in &self.players {
                    self.deliver(id, &frame, &mut sent);
                }
            }
            BroadcastScope::Remotes => {
                for id in &self.remotes {
                    self.deliver(id, &frame, &mut sent);
                }
            }
            BroadcastScope::All => {
                for id in self.connections.keys() {
                    self.deliver(id, &frame, &mut sent);
                }
            }
        }
        sent
    }

    fn deliver(&self, id: &ConnectionId, frame: &str, sent: &mut usize) {
        let Some(handle) = self.connections.get(id) else {
            return;
        };
        if handle.sender.send(frame.to_string()).is_ok() {
            *sent += 1;
        } else {
            tracing::debug!(conn_id = %id, "Dropping frame for closed connection");
        }
    }
}
