//! Currency identity — symbol, kind, and network descriptor.
//!
//! Collaborator handles (chain RPC, Lightning RPC, wallet) are not part of
//! this type: those live in `swap-engine::currency::CurrencyRuntime`, which
//! wraps a `Currency` with the optional capabilities the kind implies. This
//! crate only models the parts of a currency that are pure data.

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Re-architected as a tagged variant (design notes §9): every branch on
/// currency kind downstream becomes an exhaustive match instead of a runtime
/// capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyKind {
    /// UTXO chain with HTLC script support (BTC, LTC, ...).
    BitcoinLike,
    /// Native account-based asset (ETH).
    Ether,
    /// Account-based token riding on an Ether-kind chain.
    Erc20,
}

impl CurrencyKind {
    /// Claiming/refunding a `BitcoinLike` lockup needs a public key;
    /// account-based kinds need an address.
    pub fn needs_public_key(&self) -> bool {
        matches!(self, Self::BitcoinLike)
    }
}

/// Network descriptor — mainnet/testnet/regtest plus the chain id needed to
/// disambiguate account-based chains sharing an address format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub name: String,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub kind: CurrencyKind,
    pub network: NetworkDescriptor,
    /// For `Erc20`, the native chain this token rides on (e.g. "ETH").
    pub native_chain_symbol: Option<String>,
}

/// BUY: the quote currency buys the base currency. SELL: the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Case-insensitive parse.
    pub fn parse(raw: &str) -> ServiceResult<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(ServiceError::OrderSideNotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_order_side_case_insensitively() {
        assert_eq!(OrderSide::parse("BUY").unwrap(), OrderSide::Buy);
        assert_eq!(OrderSide::parse("Sell").unwrap(), OrderSide::Sell);
    }

    #[test]
    fn rejects_unknown_order_side() {
        assert!(OrderSide::parse("hold").is_err());
    }
}
