//! Realtime Fanout - broadcast distribution to connected listeners
//!
//! Tracks live listener connections in a concurrent registry. Each
//! connection gets its own unbounded channel drained by a dedicated
//! writer task, so a slow or dead peer never blocks delivery to the
//! rest; a failed send removes that connection and nothing else.
//! Listener count is always derived from the registry, never stored.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use stream_engine::Note;
use tokio::sync::mpsc;

pub type ClientId = u64;

/// Messages pushed to listeners
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Welcome { client_id: ClientId, listeners: usize },
    Listeners { count: usize },
    Note { note: Note },
    #[serde(rename_all = "camelCase")]
    Tip {
        chain_id: u64,
        token_id: u64,
        amount: u128,
    },
    #[serde(rename_all = "camelCase")]
    Echo { parent_note_id: String },
    Pong,
}

/// Messages accepted from listeners; anything unrecognized is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Ping,
    #[serde(other)]
    Unknown,
}

pub struct RealtimeFanout {
    clients: DashMap<ClientId, mpsc::UnboundedSender<String>>,
    next_id: AtomicU64,
}

impl RealtimeFanout {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Admit a connection: assign an id, greet it with the current
    /// listener count, then tell everyone the count changed.
    pub fn on_connect(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let client_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.clients.insert(client_id, sender);

        let listeners = self.listener_count();
        self.unicast(
            client_id,
            &ServerMessage::Welcome {
                client_id,
                listeners,
            },
        );
        self.broadcast_listener_count();
        tracing::debug!(client_id, listeners, "listener connected");
        (client_id, receiver)
    }

    pub fn on_disconnect(&self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_some() {
            tracing::debug!(client_id, "listener disconnected");
            self.broadcast_listener_count();
        }
    }

    /// Serialize once and deliver to every live connection. A failed
    /// send drops that connection from the registry; delivery to the
    /// rest continues and no error reaches the caller.
    pub fn broadcast(&self, message: &ServerMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("failed to serialize broadcast: {}", e);
                return;
            }
        };

        let mut dead = Vec::new();
        for entry in self.clients.iter() {
            if entry.value().send(payload.clone()).is_err() {
                dead.push(*entry.key());
            }
        }
        for client_id in dead {
            tracing::warn!(client_id, "removing unwritable listener");
            self.clients.remove(&client_id);
        }
    }

    /// Deliver to one connection, removing it on failure.
    pub fn unicast(&self, client_id: ClientId, message: &ServerMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("failed to serialize message: {}", e);
                return;
            }
        };
        let failed = match self.clients.get(&client_id) {
            Some(sender) => sender.send(payload).is_err(),
            None => false,
        };
        if failed {
            tracing::warn!(client_id, "removing unwritable listener");
            self.clients.remove(&client_id);
        }
    }

    /// `|live connections|` right now.
    pub fn listener_count(&self) -> usize {
        self.clients.len()
    }

    fn broadcast_listener_count(&self) {
        self.broadcast(&ServerMessage::Listeners {
            count: self.listener_count(),
        });
    }
}

impl Default for RealtimeFanout {
    fn default() -> Self {
        Self::new()
    }
}
