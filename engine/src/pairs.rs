//! Pair Registry — enumerated set of supported pairs with static config.
//! Insert-only: pairs are loaded at init and never deleted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use swap_core::model::Pair;
use swap_core::{ServiceError, ServiceResult};

pub struct PairRegistry {
    pairs: Arc<RwLock<HashMap<String, Pair>>>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self {
            pairs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert only if absent by composite id `base/quote`.
    pub async fn upsert_if_absent(&self, pair: Pair) {
        let mut pairs = self.pairs.write().await;
        pairs.entry(pair.id()).or_insert(pair);
    }

    pub async fn get(&self, pair_id: &str) -> ServiceResult<Pair> {
        self.pairs
            .read()
            .await
            .get(pair_id)
            .cloned()
            .ok_or_else(|| ServiceError::PairNotFound(pair_id.to_string()))
    }

    pub async fn all(&self) -> Vec<Pair> {
        self.pairs.read().await.values().cloned().collect()
    }

    /// Replace a pair's rate/limits/hash/fee snapshot atomically (spec §5:
    /// "writers ... replace the record atomically").
    pub async fn replace(&self, pair: Pair) {
        self.pairs.write().await.insert(pair.id(), pair);
    }
}

impl Default for PairRegistry {
    fn default() -> Self {
        Self::new()
    }
}
