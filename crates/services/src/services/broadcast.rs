//! Fan-out of task events to connected WebSocket clients.
//!
//! Every client gets an unbounded queue drained by its socket writer. When a
//! writer dies it drops the receiving half, so the next send to that client
//! fails and the client is removed after the broadcast pass.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::task_store::TaskStatus;

pub type ClientId = Uuid;
pub type ClientReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Frames pushed from the server to real-time clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        status: String,
    },
    #[serde(rename = "result")]
    TaskResult {
        task_id: String,
        status: TaskStatus,
        result: String,
    },
    #[serde(rename = "error")]
    TaskError {
        task_id: String,
        status: TaskStatus,
        error: String,
    },
    Ack {
        status: String,
    },
}

impl ServerMessage {
    pub fn connected() -> Self {
        ServerMessage::Status {
            task_id: None,
            status: "connected".to_string(),
        }
    }

    pub fn processing(task_id: &str) -> Self {
        ServerMessage::Status {
            task_id: Some(task_id.to_string()),
            status: TaskStatus::Processing.to_string(),
        }
    }

    pub fn completed(task_id: &str, result: &str) -> Self {
        ServerMessage::TaskResult {
            task_id: task_id.to_string(),
            status: TaskStatus::Completed,
            result: result.to_string(),
        }
    }

    pub fn failed(task_id: &str, error: &str) -> Self {
        ServerMessage::TaskError {
            task_id: task_id.to_string(),
            status: TaskStatus::Failed,
            error: error.to_string(),
        }
    }

    pub fn ack() -> Self {
        ServerMessage::Ack {
            status: "received".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BroadcastChannel {
    connections: DashMap<ClientId, mpsc::UnboundedSender<ServerMessage>>,
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. The `connected` status frame is already queued on
    /// the returned receiver.
    pub fn connect(&self) -> (ClientId, ClientReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client_id = Uuid::new_v4();
        // rx is alive, this cannot fail
        let _ = tx.send(ServerMessage::connected());
        self.connections.insert(client_id, tx);
        tracing::info!(
            "Client {} connected ({} open)",
            client_id,
            self.connections.len()
        );
        (client_id, rx)
    }

    /// Remove a client. Returns false if it was already gone.
    pub fn disconnect(&self, client_id: ClientId) -> bool {
        if self.connections.remove(&client_id).is_some() {
            tracing::info!(
                "Client {} disconnected ({} open)",
                client_id,
                self.connections.len()
            );
            true
        } else {
            tracing::debug!("Client {} already disconnected", client_id);
            false
        }
    }

    /// Send to a single client, dropping it if the send fails.
    pub fn send_to(&self, client_id: ClientId, message: ServerMessage) -> bool {
        let delivered = match self.connections.get(&client_id) {
            Some(tx) => tx.send(message).is_ok(),
            None => return false,
        };
        if !delivered {
            tracing::warn!("Send to client {} failed, dropping it", client_id);
            self.disconnect(client_id);
        }
        delivered
    }

    /// Deliver `message` to every registered client and return how many
    /// accepted it. Clients whose send fails are disconnected once the pass
    /// is over.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for entry in self.connections.iter() {
            if entry.value().send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*entry.key());
            }
        }

        for client_id in dead {
            tracing::warn!("Broadcast to client {} failed, dropping it", client_id);
            self.disconnect(client_id);
        }

        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, client_id: ClientId) -> bool {
        self.connections.contains_key(&client_id)
    }
}
