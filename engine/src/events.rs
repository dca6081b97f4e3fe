//! Event Hub — fans out swap status updates to subscribers, ordered per swap
//! id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use swap_core::model::SwapStatus;

#[derive(Debug, Clone)]
pub struct SwapUpdate {
    pub swap_id: Uuid,
    pub status: SwapStatus,
}

const CHANNEL_CAPACITY: usize = 256;

/// One broadcast channel per swap id so a slow subscriber on one swap can
/// never starve updates for another (spec §5: "per-swap-id ordering is
/// preserved; cross-swap ordering is not guaranteed").
pub struct EventHub {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<SwapUpdate>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn sender(&self, swap_id: Uuid) -> broadcast::Sender<SwapUpdate> {
        if let Some(tx) = self.channels.read().await.get(&swap_id) {
            return tx.clone();
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(swap_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Publish a status update; dropped silently if nobody is subscribed yet.
    pub async fn publish(&self, swap_id: Uuid, status: SwapStatus) {
        let tx = self.sender(swap_id).await;
        let _ = tx.send(SwapUpdate { swap_id, status });
    }

    pub async fn subscribe(&self, swap_id: Uuid) -> broadcast::Receiver<SwapUpdate> {
        self.sender(swap_id).await.subscribe()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
