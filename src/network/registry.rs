//! Live client set
//!
//! Mutex-guarded map of connected clients. Inserts happen on accept,
//! removals on disconnect or failed writes, and broadcasts iterate over a
//! snapshot taken under the lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::ClientConnection;

/// The set of clients eligible for broadcast
///
/// ## Concurrency:
/// - `inner`: every mutation and snapshot holds the same lock, so a
///   broadcast never sees a half-removed entry
/// - `next_id`: atomic counter (lock-free)
/// - Once closed, the registry refuses new clients; this closes the gap
///   between `stop()` and an accept that was already in flight
#[derive(Default)]
pub struct ClientRegistry {
    inner: Mutex<RegistryState>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct RegistryState {
    /// Keyed by id, so iteration follows accept order
    clients: BTreeMap<u64, Arc<ClientConnection>>,
    closed: bool,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a new connection
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Add a connection
    ///
    /// Returns `false` if the registry is already closed; the caller owns
    /// the connection and must close it.
    pub fn insert(&self, connection: Arc<ClientConnection>) -> bool {
        let mut state = self.inner.lock();
        if state.closed {
            return false;
        }
        state.clients.insert(connection.id(), connection);
        true
    }

    /// Remove a connection by id (no-op if already gone)
    pub fn remove(&self, id: u64) -> Option<Arc<ClientConnection>> {
        self.inner.lock().clients.remove(&id)
    }

    /// Current members, in accept order
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.inner.lock().clients.values().cloned().collect()
    }

    /// Refuse further inserts and hand back everything still registered
    pub fn close(&self) -> Vec<Arc<ClientConnection>> {
        let mut state = self.inner.lock();
        state.closed = true;
        std::mem::take(&mut state.clients).into_values().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
