//! Registry of connected clients.

use std::collections::HashMap;

use tokio::sync::{mpsc, Mutex};

use crate::{error::RegistryError, message::ClientId};

/// Sending half of a client's outbound queue. The connection's writer task
/// owns the receiving half and forwards every frame to the socket in order.
pub type ClientSender = mpsc::UnboundedSender<String>;

/// Fresh ids drawn before giving up on finding an unused one.
const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Clone, Debug)]
pub struct ClientRecord {
    pub id: ClientId,
    pub channel: ClientSender,
    /// The `User-Agent` the client connected with
    pub descriptor: String,
}

impl ClientRecord {
    /// Whether the connection's writer is still draining this channel.
    pub fn is_open(&self) -> bool {
        !self.channel.is_closed()
    }
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, ClientRecord>>,
    capacity: Option<usize>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that refuses new clients once `capacity` are connected.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            capacity: Some(capacity),
        }
    }

    pub async fn register(
        &self,
        channel: ClientSender,
        descriptor: impl Into<String>,
    ) -> Result<ClientId, RegistryError> {
        let mut clients = self.clients.lock().await;
        if let Some(capacity) = self.capacity {
            if clients.len() >= capacity {
                return Err(RegistryError::Full(capacity));
            }
        }

        let id = (0..MAX_ID_ATTEMPTS)
            .map(|_| ClientId::new())
            .find(|id| !clients.contains_key(id))
            .ok_or(RegistryError::IdSpaceExhausted)?;

        clients.insert(
            id,
            ClientRecord {
                id,
                channel,
                descriptor: descriptor.into(),
            },
        );
        Ok(id)
    }

    /// Removes `id` if present. Returns whether an entry was removed.
    pub async fn unregister(&self, id: &ClientId) -> bool {
        self.clients.lock().await.remove(id).is_some()
    }

    /// A point-in-time copy of every registered client.
    pub async fn snapshot(&self) -> Vec<ClientRecord> {
        self.clients.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
