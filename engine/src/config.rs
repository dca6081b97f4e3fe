//! Deserializable configuration shape, loaded via the `config` crate with
//! layered file and environment sources.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyConfig {
    pub symbol: String,
    pub network: String,
    pub chain_id: Option<u64>,
    /// On-chain amount, in the currency's base unit, beneath which an
    /// unconfirmed lockup is trusted.
    #[serde(default)]
    pub zero_conf_ceiling: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairConfig {
    pub base: String,
    pub quote: String,
    #[serde(default)]
    pub rate: Option<f64>,
    /// Fractional percentage fee, e.g. `0.005` for 0.5%.
    pub fee: f64,
    /// On-chain HTLC timeout, in minutes.
    pub timeout_delta: u32,
    /// Base-unit swap limits. Defaults are conservative placeholders when
    /// omitted; production deployments should set these explicitly.
    #[serde(default)]
    pub minimal: Option<u64>,
    #[serde(default)]
    pub maximal: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub prepayminerfee: bool,
    #[serde(default)]
    pub swapwitnessaddress: bool,
    pub retry_interval: u64,
    pub rates_interval: u64,
    #[serde(default)]
    pub allow_reverse_swaps: bool,
    pub currencies: Vec<CurrencyConfig>,
    pub pairs: Vec<PairConfig>,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SWAP_SERVICE").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_config_from_json() {
        let raw = r#"{
            "retryInterval": 15,
            "ratesInterval": 60,
            "currencies": [{"symbol": "BTC", "network": "mainnet"}],
            "pairs": [{"base": "BTC", "quote": "BTC", "fee": 0.005, "timeoutDelta": 1440}]
        }"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.currencies.len(), 1);
        assert_eq!(cfg.pairs[0].timeout_delta, 1440);
        assert!(!cfg.prepayminerfee);
    }
}
