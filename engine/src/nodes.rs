//! Node URI Registry — per-chain snapshot of Lightning node pubkeys and
//! connection URIs, surfaced by `getNodes`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub pubkey: String,
    pub uris: Vec<String>,
}

pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<String, NodeInfo>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Refresh a currency's node snapshot.
    pub async fn set(&self, symbol: &str, info: NodeInfo) {
        self.nodes.write().await.insert(symbol.to_string(), info);
    }

    /// Entries with no known node (Ether/ERC20, or a chain with no Lightning
    /// deployment) are simply absent, not an error.
    pub async fn all(&self) -> HashMap<String, NodeInfo> {
        self.nodes.read().await.clone()
    }

    pub async fn get(&self, symbol: &str) -> Option<NodeInfo> {
        self.nodes.read().await.get(symbol).cloned()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_node_is_none_not_error() {
        let registry = NodeRegistry::new();
        assert!(registry.get("ETH").await.is_none());
    }

    #[tokio::test]
    async fn set_and_list_nodes() {
        let registry = NodeRegistry::new();
        registry
            .set(
                "BTC",
                NodeInfo {
                    pubkey: "02abc".to_string(),
                    uris: vec!["02abc@10.0.0.1:9735".to_string()],
                },
            )
            .await;

        let all = registry.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all["BTC"].pubkey, "02abc");
    }
}
