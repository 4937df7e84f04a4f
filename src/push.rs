//! Push Hub
//!
//! Per-user fan-out of position lifecycle events. Clients register an
//! unbounded channel keyed by user; delivery is fire-and-forget, a full
//! or closed channel drops the event and the client is swept on the
//! next unregister.

use crate::types::Position;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use uuid::Uuid;

/// Events pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PushEvent {
    PositionOpened {
        position: Position,
    },
    PositionUpdate {
        position_id: String,
        symbol: String,
        current_price: f64,
        unrealized_pnl: f64,
        timestamp: i64,
    },
    PositionClosed {
        position: Position,
        realized_pnl: f64,
    },
    OrderCancelled {
        position_id: String,
        timestamp: i64,
    },
}

struct Client {
    user_id: String,
    tx: UnboundedSender<String>,
}

#[derive(Default)]
pub struct PushHub {
    clients: DashMap<Uuid, Client>,
}

impl PushHub {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    pub fn register(&self, user_id: &str, tx: UnboundedSender<String>) -> Uuid {
        let client_id = Uuid::new_v4();
        self.clients.insert(
            client_id,
            Client {
                user_id: user_id.to_string(),
                tx,
            },
        );
        debug!(%client_id, user_id, "push client registered");
        client_id
    }

    pub fn unregister(&self, client_id: Uuid) {
        if self.clients.remove(&client_id).is_some() {
            debug!(%client_id, "push client unregistered");
        }
    }

    /// Send an event to every client of the given user. Serialization
    /// or channel failures are swallowed; push is advisory only.
    pub fn push_to_user(&self, user_id: &str, event: &PushEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(_) => return,
        };
        for entry in self.clients.iter() {
            if entry.user_id == user_id {
                let _ = entry.tx.send(payload.clone());
            }
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}
