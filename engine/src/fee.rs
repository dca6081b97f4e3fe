//! Fee Provider — per-pair percentage fee, plus a per-chain base fee in
//! satoshis keyed by `FeePurpose`, sized from the estimated fee rate and a
//! typical transaction weight for that operation.

use std::collections::HashMap;

use swap_core::model::FeePurpose;

/// Typical virtual size, in vBytes, of the transaction each purpose produces.
/// Claim and refund transactions spend a single HTLC input; a reverse-claim
/// also carries the preimage witness, making it marginally larger.
fn typical_vsize(purpose: FeePurpose) -> f64 {
    match purpose {
        FeePurpose::NormalClaim => 170.0,
        FeePurpose::ReverseLockup => 153.0,
        FeePurpose::ReverseClaim => 138.0,
    }
}

pub struct FeeProvider {
    percentage_fees: HashMap<String, f64>,
}

impl FeeProvider {
    pub fn new(percentage_fees: HashMap<String, f64>) -> Self {
        Self { percentage_fees }
    }

    pub fn percentage_fee(&self, pair_id: &str) -> f64 {
        self.percentage_fees.get(pair_id).copied().unwrap_or(0.0)
    }

    /// Base fee in satoshis: `ceil(fee_rate_sat_per_vbyte * typical_vsize)`.
    pub fn base_fee(&self, fee_rate_sat_per_vbyte: f64, purpose: FeePurpose) -> u64 {
        (fee_rate_sat_per_vbyte * typical_vsize(purpose)).ceil() as u64
    }

    /// Percentage component of the service fee for a given on-chain amount.
    pub fn percentage_component(&self, pair_id: &str, amount: u64) -> u64 {
        (amount as f64 * self.percentage_fee(pair_id)).floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_fee_scales_with_rate_and_purpose() {
        let provider = FeeProvider::new(HashMap::new());
        let claim = provider.base_fee(10.0, FeePurpose::NormalClaim);
        let reverse_claim = provider.base_fee(10.0, FeePurpose::ReverseClaim);
        assert_eq!(claim, 1700);
        assert!(reverse_claim < claim);
    }

    #[test]
    fn percentage_component_uses_configured_fee() {
        let mut fees = HashMap::new();
        fees.insert("BTC/BTC".to_string(), 0.01);
        let provider = FeeProvider::new(fees);
        assert_eq!(provider.percentage_component("BTC/BTC", 1_000_000), 10_000);
        assert_eq!(provider.percentage_component("ETH/BTC", 1_000_000), 0);
    }
}
