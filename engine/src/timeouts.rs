//! Timeout-Delta Provider — per-pair on-chain timeout in blocks, and block
//! count conversion across chains with different block times (spec §2, §4.5
//! step 6, §4.9).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use swap_core::currency::OrderSide;
use swap_core::{ServiceError, ServiceResult};

pub struct TimeoutDeltaProvider {
    /// Block count per pair id, precomputed at `init` from the configured
    /// minute-based `timeoutDelta` and the chain currency's block time.
    deltas: Arc<RwLock<HashMap<String, u32>>>,
}

impl TimeoutDeltaProvider {
    pub fn new() -> Self {
        Self {
            deltas: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn init(&self, deltas: HashMap<String, u32>) {
        *self.deltas.write().await = deltas;
    }

    /// The `side`/`is_reverse` parameters mirror spec §4.2/§4.5's call shape;
    /// a pair carries a single configured delta regardless of direction.
    pub async fn get_timeout(
        &self,
        pair_id: &str,
        _side: OrderSide,
        _is_reverse: bool,
    ) -> ServiceResult<u32> {
        self.deltas
            .read()
            .await
            .get(pair_id)
            .copied()
            .ok_or_else(|| ServiceError::PairNotFound(pair_id.to_string()))
    }

    /// Convert a block count measured on `from_block_minutes` chain to the
    /// equivalent block count on `to_block_minutes` chain.
    pub fn convert_blocks(from_block_minutes: f64, to_block_minutes: f64, blocks: u32) -> u32 {
        ((blocks as f64) * from_block_minutes / to_block_minutes).ceil() as u32
    }
}

impl Default for TimeoutDeltaProvider {
    fn default() -> Self {
        Self::new()
    }
}
