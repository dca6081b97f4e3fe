//! Rate Provider — per-pair `{rate, limits, hash, pair fees snapshot}` plus
//! the zero-conf risk threshold.

use std::collections::HashMap;
use std::sync::Arc;

use bitcoin::hashes::{sha256, Hash};
use tokio::sync::RwLock;

use swap_core::model::Pair;
use swap_core::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
struct RateEntry {
    rate: f64,
    limits_minimal: u64,
    limits_maximal: u64,
    percentage_fee: f64,
    hash: String,
}

/// Content hash of a pair's rate+limits+fees snapshot — the "pair hash"
/// optimistic-concurrency token (glossary).
fn content_hash(base: &str, quote: &str, rate: f64, minimal: u64, maximal: u64, fee: f64) -> String {
    let payload = format!("{base}:{quote}:{rate}:{minimal}:{maximal}:{fee}");
    sha256::Hash::hash(payload.as_bytes()).to_string()
}

pub struct RateProvider {
    entries: Arc<RwLock<HashMap<String, RateEntry>>>,
    /// Per-currency ceiling below which an unconfirmed lockup is trusted.
    zero_conf_ceilings: HashMap<String, u64>,
}

impl RateProvider {
    pub fn new(zero_conf_ceilings: HashMap<String, u64>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            zero_conf_ceilings,
        }
    }

    /// Seed the provider from the initial pair configuration.
    pub async fn init(&self, pairs: &[Pair]) {
        let mut entries = self.entries.write().await;
        for pair in pairs {
            let hash = content_hash(
                &pair.base,
                &pair.quote,
                pair.rate,
                pair.limits.minimal,
                pair.limits.maximal,
                pair.percentage_fee,
            );
            entries.insert(
                pair.id(),
                RateEntry {
                    rate: pair.rate,
                    limits_minimal: pair.limits.minimal,
                    limits_maximal: pair.limits.maximal,
                    percentage_fee: pair.percentage_fee,
                    hash,
                },
            );
        }
    }

    /// Replace a pair's rate snapshot atomically, recomputing its hash.
    pub async fn refresh(&self, pair_id: &str, rate: f64) -> ServiceResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(pair_id)
            .ok_or_else(|| ServiceError::PairNotFound(pair_id.to_string()))?;
        entry.rate = rate;
        let (base, quote) = pair_id
            .split_once('/')
            .ok_or_else(|| ServiceError::PairNotFound(pair_id.to_string()))?;
        entry.hash = content_hash(
            base,
            quote,
            entry.rate,
            entry.limits_minimal,
            entry.limits_maximal,
            entry.percentage_fee,
        );
        Ok(())
    }

    pub async fn hash(&self, pair_id: &str) -> ServiceResult<String> {
        self.entries
            .read()
            .await
            .get(pair_id)
            .map(|e| e.hash.clone())
            .ok_or_else(|| ServiceError::PairNotFound(pair_id.to_string()))
    }

    pub async fn rate(&self, pair_id: &str) -> ServiceResult<f64> {
        self.entries
            .read()
            .await
            .get(pair_id)
            .map(|e| e.rate)
            .ok_or_else(|| ServiceError::PairNotFound(pair_id.to_string()))
    }

    pub async fn limits(&self, pair_id: &str) -> ServiceResult<(u64, u64)> {
        self.entries
            .read()
            .await
            .get(pair_id)
            .map(|e| (e.limits_minimal, e.limits_maximal))
            .ok_or_else(|| ServiceError::PairNotFound(pair_id.to_string()))
    }

    /// Admits zero-conf below the configured per-currency risk threshold.
    pub fn accept_zero_conf(&self, currency_symbol: &str, expected_amount: u64) -> bool {
        match self.zero_conf_ceilings.get(currency_symbol) {
            Some(&ceiling) => expected_amount <= ceiling,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_core::model::Limits;

    fn pair() -> Pair {
        Pair {
            base: "BTC".to_string(),
            quote: "BTC".to_string(),
            rate: 1.0,
            limits: Limits { minimal: 10_000, maximal: 4_000_000 },
            hash: String::new(),
            percentage_fee: 0.01,
            timeout_block_delta: 144,
        }
    }

    #[tokio::test]
    async fn same_snapshot_yields_same_hash() {
        let provider = RateProvider::new(HashMap::new());
        provider.init(&[pair()]).await;
        let h1 = provider.hash("BTC/BTC").await.unwrap();
        provider.refresh("BTC/BTC", 1.0).await.unwrap();
        let h2 = provider.hash("BTC/BTC").await.unwrap();
        assert_eq!(h1, h2);
    }

    #[tokio::test]
    async fn changed_rate_changes_hash() {
        let provider = RateProvider::new(HashMap::new());
        provider.init(&[pair()]).await;
        let h1 = provider.hash("BTC/BTC").await.unwrap();
        provider.refresh("BTC/BTC", 1.1).await.unwrap();
        let h2 = provider.hash("BTC/BTC").await.unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn zero_conf_respects_ceiling() {
        let mut ceilings = HashMap::new();
        ceilings.insert("BTC".to_string(), 1_000_000);
        let provider = RateProvider::new(ceilings);
        assert!(provider.accept_zero_conf("BTC", 500_000));
        assert!(!provider.accept_zero_conf("BTC", 2_000_000));
        assert!(!provider.accept_zero_conf("ETH", 1));
    }
}
