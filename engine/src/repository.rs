//! Swap Repository — in-memory storage for Swap, ReverseSwap, and
//! ChannelCreation records with the uniqueness indices the orchestrator
//! relies on.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use swap_core::model::{ChannelCreation, ReverseSwap, Swap, SwapStatus};
use swap_core::{ServiceError, ServiceResult};

#[derive(Default)]
struct ForwardState {
    by_id: HashMap<Uuid, Swap>,
    by_preimage_hash: HashMap<Vec<u8>, Uuid>,
    by_invoice: HashMap<String, Uuid>,
    channel_creations: HashMap<Uuid, ChannelCreation>,
}

#[derive(Default)]
struct ReverseState {
    by_id: HashMap<Uuid, ReverseSwap>,
    by_preimage_hash: HashMap<Vec<u8>, Uuid>,
}

/// All state is held behind two independent locks so a forward-swap write
/// never blocks a reverse-swap read.
pub struct SwapRepository {
    forward: Arc<RwLock<ForwardState>>,
    reverse: Arc<RwLock<ReverseState>>,
}

impl SwapRepository {
    pub fn new() -> Self {
        Self {
            forward: Arc::new(RwLock::new(ForwardState::default())),
            reverse: Arc::new(RwLock::new(ReverseState::default())),
        }
    }

    /// Inserts a new forward swap, rejecting a duplicate preimage hash.
    pub async fn insert_swap(&self, swap: Swap) -> ServiceResult<()> {
        let mut state = self.forward.write().await;
        if state.by_preimage_hash.contains_key(&swap.preimage_hash) {
            return Err(ServiceError::SwapWithPreimageExists);
        }
        state.by_preimage_hash.insert(swap.preimage_hash.clone(), swap.id);
        state.by_id.insert(swap.id, swap);
        Ok(())
    }

    pub async fn get_swap(&self, id: Uuid) -> ServiceResult<Swap> {
        self.forward
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::SwapNotFound(id.to_string()))
    }

    pub async fn find_swap_by_lockup_transaction(&self, txid: &str) -> Option<Swap> {
        self.forward
            .read()
            .await
            .by_id
            .values()
            .find(|s| s.lockup_transaction_id.as_deref() == Some(txid))
            .cloned()
    }

    /// Sets the invoice exactly once; rejects if already set or if the
    /// invoice is already bound to another swap.
    pub async fn set_invoice(&self, id: Uuid, invoice: String) -> ServiceResult<Swap> {
        let mut state = self.forward.write().await;
        if state.by_invoice.contains_key(&invoice) {
            return Err(ServiceError::SwapWithInvoiceExists);
        }
        let swap = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| ServiceError::SwapNotFound(id.to_string()))?;
        if swap.invoice.is_some() {
            return Err(ServiceError::SwapHasInvoiceAlready);
        }
        swap.invoice = Some(invoice.clone());
        let updated = swap.clone();
        state.by_invoice.insert(invoice, id);
        Ok(updated)
    }

    pub async fn update_swap_status(&self, id: Uuid, status: SwapStatus) -> ServiceResult<()> {
        let mut state = self.forward.write().await;
        let swap = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| ServiceError::SwapNotFound(id.to_string()))?;
        swap.status = status;
        Ok(())
    }

    pub async fn set_lockup_transaction(&self, id: Uuid, txid: String) -> ServiceResult<()> {
        let mut state = self.forward.write().await;
        let swap = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| ServiceError::SwapNotFound(id.to_string()))?;
        swap.lockup_transaction_id = Some(txid);
        Ok(())
    }

    /// Destroys a forward swap and its channel creation, if any (spec §5:
    /// "Destruction on failure of createSwapWithInvoice cascades to Channel
    /// Creation first, then Swap").
    pub async fn remove_swap(&self, id: Uuid) {
        let mut state = self.forward.write().await;
        state.channel_creations.remove(&id);
        if let Some(swap) = state.by_id.remove(&id) {
            state.by_preimage_hash.remove(&swap.preimage_hash);
            if let Some(invoice) = &swap.invoice {
                state.by_invoice.remove(invoice);
            }
        }
    }

    pub async fn insert_channel_creation(&self, creation: ChannelCreation) {
        self.forward
            .write()
            .await
            .channel_creations
            .insert(creation.swap_id, creation);
    }

    pub async fn get_channel_creation(&self, swap_id: Uuid) -> Option<ChannelCreation> {
        self.forward
            .read()
            .await
            .channel_creations
            .get(&swap_id)
            .cloned()
    }

    pub async fn insert_reverse_swap(&self, swap: ReverseSwap) -> ServiceResult<()> {
        let mut state = self.reverse.write().await;
        if state.by_preimage_hash.contains_key(&swap.preimage_hash) {
            return Err(ServiceError::SwapWithPreimageExists);
        }
        state.by_preimage_hash.insert(swap.preimage_hash.clone(), swap.id);
        state.by_id.insert(swap.id, swap);
        Ok(())
    }

    pub async fn get_reverse_swap(&self, id: Uuid) -> ServiceResult<ReverseSwap> {
        self.reverse
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::SwapNotFound(id.to_string()))
    }

    pub async fn update_reverse_swap_status(&self, id: Uuid, status: SwapStatus) -> ServiceResult<()> {
        let mut state = self.reverse.write().await;
        let swap = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| ServiceError::SwapNotFound(id.to_string()))?;
        swap.status = status;
        Ok(())
    }
}

impl Default for SwapRepository {
    fn default() -> Self {
        Self::new()
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
            expected_amount: Some(100_000),
            percentage_fee: None,
            accept_zero_conf: false,
            rate: None,
            lockup_address: "addr".to_string(),
            lockup_transaction_id: None,
            timeout_block_height: 800_000,
            refund_public_key: None,
            claim_address: None,
            key_index: Some(0),
            redeem_script: None,
            referral_id: None,
            status: SwapStatus::SwapCreated,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_preimage_hash() {
        let repo = SwapRepository::new();
        repo.insert_swap(swap(vec![1, 2, 3])).await.unwrap();
        let err = repo.insert_swap(swap(vec![1, 2, 3])).await.unwrap_err();
        assert!(matches!(err, ServiceError::SwapWithPreimageExists));
    }

    #[tokio::test]
    async fn set_invoice_is_write_once() {
        let repo = SwapRepository::new();
        let s = swap(vec![1]);
        let id = s.id;
        repo.insert_swap(s).await.unwrap();

        repo.set_invoice(id, "lnbc1...".to_string()).await.unwrap();
        let err = repo
            .set_invoice(id, "lnbc2...".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::SwapHasInvoiceAlready));
    }

    #[tokio::test]
    async fn rejects_invoice_bound_to_another_swap() {
        let repo = SwapRepository::new();
        let a = swap(vec![1]);
        let b = swap(vec![2]);
        let (a_id, b_id) = (a.id, b.id);
        repo.insert_swap(a).await.unwrap();
        repo.insert_swap(b).await.unwrap();

        repo.set_invoice(a_id, "lnbc1...".to_string()).await.unwrap();
        let err = repo
            .set_invoice(b_id, "lnbc1...".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::SwapWithInvoiceExists));
    }

    #[tokio::test]
    async fn finds_swap_by_lockup_transaction_id() {
        let repo = SwapRepository::new();
        let s = swap(vec![1]);
        let id = s.id;
        repo.insert_swap(s).await.unwrap();
        repo.set_lockup_transaction(id, "txid123".to_string())
            .await
            .unwrap();

        let found = repo.find_swap_by_lockup_transaction("txid123").await.unwrap();
        assert_eq!(found.id, id);
        assert!(repo.find_swap_by_lockup_transaction("nope").await.is_none());
    }
}
