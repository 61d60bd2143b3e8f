//! Peer registry capability.
//!
//! Discovery is not part of this node: the chunker and assembler never call
//! into a registry. The trait marks the seam where a discovery layer plugs in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::utils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub id: String,
    pub ip_address: String,
    pub port: u16,
    pub last_seen: DateTime<Utc>,
    /// Logical names of files this peer holds chunks for.
    pub available_files: Vec<String>,
    pub is_online: bool,
}

impl Peer {
    pub fn new(ip_address: impl Into<String>, port: u16) -> Self {
        Self {
            id: utils::random_id(),
            ip_address: ip_address.into(),
            port,
            last_seen: Utc::now(),
            available_files: Vec::new(),
            is_online: true,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ip_address, self.port)
    }

    pub fn info(&self) -> PeerInfo {
        PeerInfo {
            id: self.id.clone(),
            ip_address: self.ip_address.clone(),
            port: self.port,
            last_seen: self.last_seen,
            available_files: self.available_files.clone(),
        }
    }
}

/// Lightweight peer description for exchanging between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub id: String,
    pub ip_address: String,
    pub port: u16,
    pub last_seen: DateTime<Utc>,
    pub available_files: Vec<String>,
}

#[async_trait::async_trait]
pub trait PeerRegistry: Send + Sync {
    async fn register_peer(&self, peer: Peer);
    async fn available_peers(&self) -> Vec<Peer>;
    async fn peers_with_file(&self, file_name: &str) -> Vec<Peer>;
    async fn touch_peer(&self, peer_id: &str);
    async fn unregister_peer(&self, peer_id: &str);
    async fn is_peer_online(&self, peer_id: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use super::*;

    /// Registry double keyed by peer id.
    #[derive(Debug, Default)]
    struct MemoryPeerRegistry {
        peers: RwLock<HashMap<String, Peer>>,
    }

    impl MemoryPeerRegistry {
        fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait::async_trait]
    impl PeerRegistry for MemoryPeerRegistry {
        async fn register_peer(&self, peer: Peer) {
            self.peers.write().await.insert(peer.id.clone(), peer);
        }

        async fn available_peers(&self) -> Vec<Peer> {
            self.peers
                .read()
                .await
                .values()
                .filter(|peer| peer.is_online)
                .cloned()
                .collect()
        }

        async fn peers_with_file(&self, file_name: &str) -> Vec<Peer> {
            self.peers
                .read()
                .await
                .values()
                .filter(|peer| {
                    peer.is_online && peer.available_files.iter().any(|f| f == file_name)
                })
                .cloned()
                .collect()
        }

        async fn touch_peer(&self, peer_id: &str) {
            if let Some(peer) = self.peers.write().await.get_mut(peer_id) {
                peer.last_seen = Utc::now();
                peer.is_online = true;
            }
        }

        async fn unregister_peer(&self, peer_id: &str) {
            self.peers.write().await.remove(peer_id);
        }

        async fn is_peer_online(&self, peer_id: &str) -> bool {
            self.peers
                .read()
                .await
                .get(peer_id)
                .map_or(false, |peer| peer.is_online)
        }
    }

    #[test]
    fn test_peer_endpoint_and_info() {
        let mut peer = Peer::new("10.0.0.7", 4001);
        peer.available_files.push("movie".to_string());
        assert_eq!(peer.endpoint(), "10.0.0.7:4001");

        let info = peer.info();
        assert_eq!(info.id, peer.id);
        assert_eq!(info.available_files, vec!["movie".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_registry() {
        let registry: Box<dyn PeerRegistry> = Box::new(MemoryPeerRegistry::new());
        let mut a = Peer::new("10.0.0.1", 1);
        a.available_files.push("report".to_string());
        let mut b = Peer::new("10.0.0.2", 2);
        b.is_online = false;
        b.available_files.push("report".to_string());
        let (a_id, b_id) = (a.id.clone(), b.id.clone());

        registry.register_peer(a).await;
        registry.register_peer(b).await;

        assert_eq!(registry.available_peers().await.len(), 1);
        assert_eq!(registry.peers_with_file("report").await.len(), 1);
        assert!(registry.peers_with_file("other").await.is_empty());
        assert!(!registry.is_peer_online(&b_id).await);

        registry.touch_peer(&b_id).await;
        assert!(registry.is_peer_online(&b_id).await);
        assert_eq!(registry.peers_with_file("report").await.len(), 2);

        registry.unregister_peer(&a_id).await;
        assert!(!registry.is_peer_online(&a_id).await);
        assert_eq!(registry.available_peers().await.len(), 1);
    }
}
