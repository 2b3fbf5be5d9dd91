//! Known-peer bookkeeping.
//!
//! The registry is an owned value with interior locking. Whoever runs the
//! node shares it (typically behind an `Arc`); the ledger never sees it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    /// Stable peer identifier.
    pub peer_id: String,
    /// Dialable address, e.g. `/ip4/10.0.0.5/tcp/4001`.
    pub address: String,
    pub connected_at: DateTime<Utc>,
}

impl PeerInfo {
    pub fn new(peer_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            address: address.into(),
            connected_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, PeerInfo>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Returns `false` if the id is already known, in which
    /// case the existing entry is kept.
    pub fn add(&self, peer: PeerInfo) -> bool {
        let mut peers = self.peers.write();
        if peers.contains_key(&peer.peer_id) {
            return false;
        }
        debug!(peer_id = %peer.peer_id, address = %peer.address, "peer added");
        peers.insert(peer.peer_id.clone(), peer);
        true
    }

    pub fn remove(&self, peer_id: &str) -> Option<PeerInfo> {
        self.peers.write().remove(peer_id)
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.peers.read().contains_key(peer_id)
    }

    /// Copy of all known peers, oldest connection first.
    pub fn snapshot(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self.peers.read().values().cloned().collect();
        peers.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.peer_id.cmp(&b.peer_id))
        });
        peers
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn add_dedups_by_id() {
        let registry = PeerRegistry::new();
        assert!(registry.add(PeerInfo::new("peer-a", "/ip4/10.0.0.1/tcp/4001")));
        assert!(!registry.add(PeerInfo::new("peer-a", "/ip4/10.0.0.9/tcp/4001")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].address, "/ip4/10.0.0.1/tcp/4001");
    }

    #[test]
    fn remove_and_contains() {
        let registry = PeerRegistry::new();
        registry.add(PeerInfo::new("peer-a", "addr-a"));
        registry.add(PeerInfo::new("peer-b", "addr-b"));

        assert!(registry.contains("peer-b"));
        assert_eq!(registry.remove("peer-b").unwrap().address, "addr-b");
        assert!(!registry.contains("peer-b"));
        assert!(registry.remove("peer-b").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn snapshot_is_detached() {
        let registry = PeerRegistry::new();
        registry.add(PeerInfo::new("peer-a", "addr-a"));
        let snapshot = registry.snapshot();
        registry.remove("peer-a");
        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_adds() {
        let registry = Arc::new(PeerRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for i in 0..50 {
                        // Half the ids collide across threads.
                        registry.add(PeerInfo::new(format!("peer-{}", (t % 2) * 1000 + i), "addr"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 100);
    }
}
