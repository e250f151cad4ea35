use std::collections::HashMap;

use msgs::client_type::ClientType;
pub use msgs::client_type::GAME_MASTER_HOST_ID;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::ConnectionError;

/// Server-local identifier of an accepted socket.
pub type ConnectionId = u32;

/// A registered participant. Frames pushed into `outbox` are written to its
/// socket by the connection's own task.
#[derive(Debug, Clone)]
pub struct Peer {
    pub connection: ConnectionId,
    pub kind: ClientType,
    pub outbox: mpsc::UnboundedSender<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Inner {
    by_host: HashMap<u32, Peer>,
    by_connection: HashMap<ConnectionId, u32>,
    last_agent_id: u32,
}

/// Bidirectional connection <-> host id map.
///
/// Both directions live behind one lock, so every reader sees either a fully
/// registered peer or none at all.
#[derive(Debug, Default)]
pub struct HostMapping {
    inner: Mutex<Inner>,
}

impl HostMapping {
    pub fn new() -> HostMapping {
        HostMapping::default()
    }

    pub fn register(&self, connection: ConnectionId, kind: ClientType, outbox: mpsc::UnboundedSender<Vec<u8>>) -> Result<u32, ConnectionError> {
        let mut inner = self.inner.lock();

        if inner.by_connection.contains_key(&connection) {
            return Err(ConnectionError::DuplicateRegistration(connection));
        }

        let host_id = match kind {
            ClientType::GameMaster => {
                if inner.by_host.contains_key(&GAME_MASTER_HOST_ID) {
                    return Err(ConnectionError::GameMasterAlreadyRegistered);
                }
                GAME_MASTER_HOST_ID
            }
            ClientType::Agent => inner.last_agent_id.checked_add(1).ok_or(ConnectionError::HostIdsExhausted)?,
        };

        inner.by_connection.insert(connection, host_id);
        let peer = Peer { connection, kind, outbox };
        if let Some(previous) = inner.by_host.insert(host_id, peer) {
            // Put the mapping back exactly as it was.
            inner.by_host.insert(host_id, previous);
            inner.by_connection.remove(&connection);
            return Err(ConnectionError::DuplicateRegistration(connection));
        }

        if kind == ClientType::Agent {
            inner.last_agent_id = host_id;
        }
        Ok(host_id)
    }

    /// Removes both directions. Returns the host id the connection held.
    pub fn unregister(&self, connection: ConnectionId) -> Option<(u32, ClientType)> {
        let mut inner = self.inner.lock();
        let host_id = inner.by_connection.remove(&connection)?;
        let peer = inner.by_host.remove(&host_id)?;
        Some((host_id, peer.kind))
    }

    pub fn host_for(&self, connection: ConnectionId) -> Option<u32> {
        self.inner.lock().by_connection.get(&connection).copied()
    }

    pub fn peer_for(&self, host_id: u32) -> Option<Peer> {
        self.inner.lock().by_host.get(&host_id).cloned()
    }

    pub fn game_master(&self) -> Option<Peer> {
        self.peer_for(GAME_MASTER_HOST_ID)
    }

    pub fn is_game_master(&self, host_id: u32) -> bool {
        self.inner
            .lock()
            .by_host
            .get(&host_id)
            .is_some_and(|peer| peer.kind == ClientType::GameMaster)
    }

    pub fn agent_peers(&self) -> Vec<(u32, Peer)> {
        self.inner
            .lock()
            .by_host
            .iter()
            .filter(|(_, peer)| peer.kind == ClientType::Agent)
            .map(|(host_id, peer)| (*host_id, peer.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
