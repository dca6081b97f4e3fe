//! Referral Registry — flat referral/API-key identities, keyed by id with a
//! secondary index by routing node (spec §2, §3, §4.10 `addReferral`, §4.12
//! supplement).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use swap_core::model::Referral;
use swap_core::{ServiceError, ServiceResult};

#[derive(Default)]
struct State {
    by_id: HashMap<String, Referral>,
    by_routing_node: HashMap<String, String>,
}

pub struct ReferralRegistry {
    state: Arc<RwLock<State>>,
}

impl ReferralRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Validates and inserts a referral: id must be non-empty,
    /// unique, and `fee_share` must fall within `[0, 100]`.
    pub async fn add(&self, referral: Referral) -> ServiceResult<()> {
        if referral.id.trim().is_empty() {
            return Err(ServiceError::InvalidReferral(
                "referral id must not be empty".to_string(),
            ));
        }
        if referral.fee_share > 100 {
            return Err(ServiceError::InvalidReferral(
                "fee share must be between 0 and 100".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if state.by_id.contains_key(&referral.id) {
            return Err(ServiceError::InvalidReferral(format!(
                "referral {} already exists",
                referral.id
            )));
        }
        if let Some(node) = &referral.routing_node {
            state.by_routing_node.insert(node.clone(), referral.id.clone());
        }
        info!("Added referral: {}", referral.id);
        state.by_id.insert(referral.id.clone(), referral);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Referral> {
        self.state
            .read()
            .await
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::InvalidReferral(format!("unknown referral {id}")))
    }

    /// Resolve a referral from the routing node reported alongside an
    /// incoming Lightning payment.
    pub async fn by_routing_node(&self, node: &str) -> Option<Referral> {
        let state = self.state.read().await;
        state
            .by_routing_node
            .get(node)
            .and_then(|id| state.by_id.get(id))
            .cloned()
    }
}

impl Default for ReferralRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn referral(id: &str, routing_node: Option<&str>) -> Referral {
        Referral {
            id: id.to_string(),
            fee_share: 50,
            routing_node: routing_node.map(str::to_string),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn rejects_empty_id() {
        let registry = ReferralRegistry::new();
        assert!(registry.add(referral("", None)).await.is_err());
    }

    #[tokio::test]
    async fn rejects_fee_share_over_100() {
        let registry = ReferralRegistry::new();
        let mut r = referral("acme", None);
        r.fee_share = 150;
        assert!(registry.add(r).await.is_err());
    }

    #[tokio::test]
    async fn resolves_by_routing_node() {
        let registry = ReferralRegistry::new();
        registry.add(referral("acme", Some("02abc"))).await.unwrap();

        let resolved = registry.by_routing_node("02abc").await.unwrap();
        assert_eq!(resolved.id, "acme");
        assert!(registry.by_routing_node("02def").await.is_none());
    }

    #[tokio::test]
    async fn rejects_duplicate_id() {
        let registry = ReferralRegistry::new();
        registry.add(referral("acme", None)).await.unwrap();
        assert!(registry.add(referral("acme", None)).await.is_err());
    }
}
