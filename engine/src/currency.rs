//! Runtime currency handle: the static `Currency` identity plus whichever
//! collaborator capabilities its kind implies (design notes §9: "absence is
//! a known failure mode", surfaced through `ServiceError::NoLndClient` /
//! `NotSupportedBySymbol` / `EthereumNotEnabled`).

use std::sync::Arc;

use swap_core::currency::Currency;

use crate::collaborators::{AccountProvider, ChainClient, LndClient, Wallet};

#[derive(Clone)]
pub struct CurrencyRuntime {
    pub currency: Currency,
    pub chain_client: Option<Arc<dyn ChainClient>>,
    pub lnd_client: Option<Arc<dyn LndClient>>,
    pub account_provider: Option<Arc<dyn AccountProvider>>,
    pub wallet: Option<Arc<dyn Wallet>>,
}

impl CurrencyRuntime {
    pub fn symbol(&self) -> &str {
        &self.currency.symbol
    }
}
