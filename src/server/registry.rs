//! The set of live connections owned by the listener.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Identifies a connection within its registry.
pub type ConnectionId = u64;

#[derive(Debug)]
struct Entry {
    remote_addr: SocketAddr,
    close: Arc<Notify>,
}

/// Live connections, added on accept and removed by each connection once
/// its socket has been released.
#[derive(Debug, Default)]
pub struct Registry {
    next_id: AtomicU64,
    connections: Mutex<HashMap<ConnectionId, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. The returned [`Notify`] is signalled when the
    /// registry wants the connection closed.
    pub fn register(&self, remote_addr: SocketAddr) -> (ConnectionId, Arc<Notify>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let close = Arc::new(Notify::new());
        self.lock().insert(id, Entry { remote_addr, close: Arc::clone(&close) });
        (id, close)
    }

    /// Remove a connection. Returns `false` if it was not registered.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Ask every registered connection to close. Returns how many were asked.
    pub fn close_all(&self) -> usize {
        let connections = self.lock();
        for entry in connections.values() {
            // Stores a permit if the connection is not waiting right now.
            entry.close.notify_one();
        }
        connections.len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Remote address of a registered connection.
    pub fn remote_addr(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.lock().get(&id).map(|entry| entry.remote_addr)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Entry>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
