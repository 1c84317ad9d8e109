//! Active relay membership
//!
//! The set of stream names currently owned by a relay instance. An entry
//! is a reservation taken by the supervisor before launch and released
//! either when the instance shuts down or when launch fails; it is never
//! left behind by a failed startup.

use std::collections::HashSet;

use tokio::sync::Mutex;

/// Set of stream names with a live (or launching) relay instance
pub struct ActiveRelaySet {
    names: Mutex<HashSet<String>>,
}

impl ActiveRelaySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            names: Mutex::new(HashSet::new()),
        }
    }

    /// Atomically reserve a name; `false` if it is already reserved
    pub async fn try_reserve(&self, name: &str) -> bool {
        self.names.lock().await.insert(name.to_string())
    }

    /// Release a reservation; `true` if it was held
    pub async fn release(&self, name: &str) -> bool {
        self.names.lock().await.remove(name)
    }

    /// Whether a name is currently reserved
    pub async fn contains(&self, name: &str) -> bool {
        self.names.lock().await.contains(name)
    }

    /// Number of reservations
    pub async fn len(&self) -> usize {
        self.names.lock().await.len()
    }

    /// Whether no reservations are held
    pub async fn is_empty(&self) -> bool {
        self.names.lock().await.is_empty()
    }

    /// Copy of the reserved names
    pub async fn names(&self) -> Vec<String> {
        self.names.lock().await.iter().cloned().collect()
    }
}

impl Default for ActiveRelaySet {
    fn default() -> Self {
        Self::new()
    }
}
