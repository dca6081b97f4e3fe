//! Swap Manager — HD key index reservation, HTLC delegation, and atomic
//! persistence for both swap kinds (spec §2, §4.2-§4.5, §5 "resource
//! acquisition").

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use swap_core::model::{ChannelCreation, ReverseSwap, Swap, SwapStatus};
use swap_core::ServiceResult;

use crate::events::EventHub;
use crate::repository::SwapRepository;

pub struct SwapManager {
    repository: Arc<SwapRepository>,
    events: Arc<EventHub>,
    /// Monotonic per-symbol HD index counter (design notes §9: "a single
    /// persisted counter per wallet with monotonic issuance"). Indices are
    /// not reclaimed on swap destruction in this implementation; see DESIGN.md.
    key_indices: tokio::sync::Mutex<HashMap<String, u64>>,
}

impl SwapManager {
    pub fn new(repository: Arc<SwapRepository>, events: Arc<EventHub>) -> Self {
        Self {
            repository,
            events,
            key_indices: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next HD key index for `symbol`'s wallet.
    pub async fn next_key_index(&self, symbol: &str) -> u64 {
        let mut indices = self.key_indices.lock().await;
        let next = indices.entry(symbol.to_string()).or_insert(0);
        let issued = *next;
        *next += 1;
        issued
    }

    pub async fn create_swap(&self, swap: Swap) -> ServiceResult<Uuid> {
        let id = swap.id;
        self.repository.insert_swap(swap).await?;
        info!("Created swap: {}", id);
        self.events.publish(id, SwapStatus::SwapCreated).await;
        Ok(id)
    }

    pub async fn attach_channel_creation(&self, creation: ChannelCreation) {
        self.repository.insert_channel_creation(creation).await;
    }

    pub async fn set_invoice(&self, id: Uuid, invoice: String) -> ServiceResult<Swap> {
        let swap = self.repository.set_invoice(id, invoice).await?;
        info!("Set invoice for swap: {}", id);
        self.events.publish(id, SwapStatus::InvoiceSet).await;
        Ok(swap)
    }

    pub async fn create_reverse_swap(&self, swap: ReverseSwap) -> ServiceResult<Uuid> {
        let id = swap.id;
        self.repository.insert_reverse_swap(swap).await?;
        info!("Created reverse swap: {}", id);
        self.events.publish(id, SwapStatus::SwapCreated).await;
        Ok(id)
    }

    /// Cascades to the Channel Creation before the Swap itself.
    pub async fn destroy_swap(&self, id: Uuid) {
        info!("Destroying swap: {}", id);
        self.repository.remove_swap(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use swap_core::currency::OrderSide;

    fn swap(preimage_hash: Vec<u8>) -> Swap {
        Swap {
            id: Uuid::new_v4(),
            preimage_hash,
            pair: "BTC/BTC".to_string(),
            order_side: OrderSide::Buy,
            invoice: None,
            onchain_amount: None,
            expected_amount: None,
            percentage_fee: None,
            accept_zero_conf: false,
            rate: None,
            lockup_address: "addr".to_string(),
            lockup_transaction_id: None,
            timeout_block_height: 800_000,
            refund_public_key: Some("pub".to_string()),
            claim_address: None,
            key_index: Some(0),
            redeem_script: Some("script".to_string()),
            referral_id: None,
            status: SwapStatus::SwapCreated,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn key_indices_are_monotonic_per_symbol() {
        let manager = SwapManager::new(Arc::new(SwapRepository::new()), Arc::new(EventHub::new()));
        assert_eq!(manager.next_key_index("BTC").await, 0);
        assert_eq!(manager.next_key_index("BTC").await, 1);
        assert_eq!(manager.next_key_index("LTC").await, 0);
    }

    #[tokio::test]
    async fn destroy_swap_removes_record_and_channel_creation() {
        let repo = Arc::new(SwapRepository::new());
        let manager = SwapManager::new(repo.clone(), Arc::new(EventHub::new()));
        let s = swap(vec![9]);
        let id = s.id;
        manager.create_swap(s).await.unwrap();
        manager
            .attach_channel_creation(ChannelCreation {
                swap_id: id,
                inbound_liquidity_percent: 25,
                private: false,
            })
            .await;

        manager.destroy_swap(id).await;

        assert!(repo.get_swap(id).await.is_err());
        assert!(repo.get_channel_creation(id).await.is_none());
    }
}
