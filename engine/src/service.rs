//! The Orchestrator — all externally callable operations and the
//! cross-cutting policy that ties every other component together (spec §2,
//! §4.1-§4.10).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bitcoin::consensus::encode::deserialize;
use bitcoin::Transaction;
use chrono::{DateTime, Utc};
use lightning_invoice::Bolt11Invoice;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use swap_core::constants::{
    block_time_minutes, DEFAULT_FEE_ESTIMATION_BLOCKS, ETHEREUM_PREPAY_MINER_FEE_GAS_LIMIT,
    ETHER_DECIMALS, GWEI_DECIMALS, MAX_INBOUND_LIQUIDITY, MIN_INBOUND_LIQUIDITY,
};
use swap_core::currency::{CurrencyKind, OrderSide};
use swap_core::model::{
    ChannelCreation, FeePurpose, Pair, Referral, ReverseSwap, Swap, SwapStatus,
};
use swap_core::{ServiceError, ServiceResult};

use crate::amounts::{calculate_invoice_amount, calculate_timeout_date, verify_amount};
use crate::collaborators::{AccountHtlcParams, HtlcBuilder, KeyPair, SendResult, UtxoHtlcParams};
use crate::currency::CurrencyRuntime;
use crate::events::EventHub;
use crate::fee::FeeProvider;
use crate::nodes::{NodeInfo, NodeRegistry};
use crate::pairs::PairRegistry;
use crate::rate::RateProvider;
use crate::referral::ReferralRegistry;
use crate::repository::SwapRepository;
use crate::swap_manager::SwapManager;
use crate::timeouts::TimeoutDeltaProvider;

#[derive(Debug, Clone, Serialize, Default)]
pub struct ChainStatus {
    pub version: String,
    pub connections: u32,
    pub blocks: u32,
    pub scanned_blocks: u32,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct LightningStatus {
    pub version: String,
    pub block_height: u32,
    pub active_channels: u32,
    pub inactive_channels: u32,
    pub pending_channels: u32,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CurrencyInfo {
    pub chain: Option<ChainStatus>,
    pub chain_error: Option<String>,
    pub lightning: Option<LightningStatus>,
    pub lightning_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub chains: HashMap<String, CurrencyInfo>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CurrencyBalance {
    pub wallet: Option<crate::collaborators::WalletBalance>,
    pub lightning: Option<crate::collaborators::ChannelBalance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairsResponse {
    pub pairs: HashMap<String, Pair>,
    pub info: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSwapResponse {
    pub id: Uuid,
    pub address: String,
    pub redeem_script: Option<String>,
    pub claim_address: Option<String>,
    pub timeout_block_height: u32,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SetSwapInvoiceResponse {
    pub expected_amount: Option<u64>,
    pub accept_zero_conf: Option<bool>,
    pub bip21: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateReverseSwapResponse {
    pub id: Uuid,
    pub invoice: String,
    pub redeem_script: Option<String>,
    pub lockup_address: String,
    pub miner_fee_invoice: Option<String>,
    pub timeout_block_height: u32,
    pub refund_address: Option<String>,
    pub onchain_amount: Option<u64>,
    pub prepay_miner_fee_amount: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapTransactionInfo {
    pub transaction_hex: String,
    pub timeout_block_height: u32,
    pub timeout_eta: DateTime<Utc>,
}

pub struct CreateSwapArgs {
    pub pair_id: String,
    pub order_side: String,
    pub preimage_hash: Vec<u8>,
    pub refund_public_key: Option<String>,
    pub claim_address: Option<String>,
    pub channel: Option<ChannelCreation>,
    pub referral_id: Option<String>,
}

pub struct CreateReverseSwapArgs {
    pub pair_id: String,
    pub order_side: String,
    pub preimage_hash: Vec<u8>,
    pub invoice_amount: Option<u64>,
    pub onchain_amount: Option<u64>,
    pub pair_hash: Option<String>,
    pub routing_node: Option<String>,
    pub referral_id: Option<String>,
    pub claim_public_key: Option<String>,
    pub claim_address: Option<String>,
    pub prepay_miner_fee: bool,
}

/// Polymorphic over the collaborator capability set; never touches RPC or
/// key material directly.
pub struct Service {
    currencies: tokio::sync::RwLock<HashMap<String, CurrencyRuntime>>,
    htlc_builders: tokio::sync::RwLock<HashMap<String, Arc<dyn HtlcBuilder>>>,
    pairs: PairRegistry,
    rates: RateProvider,
    timeouts: TimeoutDeltaProvider,
    fees: FeeProvider,
    nodes: NodeRegistry,
    referrals: ReferralRegistry,
    repository: Arc<SwapRepository>,
    events: Arc<EventHub>,
    swap_manager: SwapManager,
    allow_reverse_swaps: AtomicBool,
    prepay_miner_fee: AtomicBool,
    version: String,
}

impl Service {
    pub fn new(
        percentage_fees: HashMap<String, f64>,
        zero_conf_ceilings: HashMap<String, u64>,
        version: String,
    ) -> Self {
        let repository = Arc::new(SwapRepository::new());
        let events = Arc::new(EventHub::new());
        Self {
            currencies: tokio::sync::RwLock::new(HashMap::new()),
            htlc_builders: tokio::sync::RwLock::new(HashMap::new()),
            pairs: PairRegistry::new(),
            rates: RateProvider::new(zero_conf_ceilings),
            timeouts: TimeoutDeltaProvider::new(),
            fees: FeeProvider::new(percentage_fees),
            nodes: NodeRegistry::new(),
            referrals: ReferralRegistry::new(),
            swap_manager: SwapManager::new(repository.clone(), events.clone()),
            repository,
            events,
            allow_reverse_swaps: AtomicBool::new(true),
            prepay_miner_fee: AtomicBool::new(false),
            version,
        }
    }

    pub async fn register_currency(&self, runtime: CurrencyRuntime, htlc_builder: Option<Arc<dyn HtlcBuilder>>) {
        let symbol = runtime.symbol().to_string();
        self.currencies.write().await.insert(symbol.clone(), runtime);
        if let Some(builder) = htlc_builder {
            self.htlc_builders.write().await.insert(symbol, builder);
        }
    }

    pub fn set_allow_reverse_swaps(&self, allowed: bool) {
        self.allow_reverse_swaps.store(allowed, Ordering::SeqCst);
    }

    pub fn set_prepay_miner_fee(&self, enabled: bool) {
        self.prepay_miner_fee.store(enabled, Ordering::SeqCst);
    }

    async fn currency(&self, symbol: &str) -> ServiceResult<CurrencyRuntime> {
        self.currencies
            .read()
            .await
            .get(symbol)
            .cloned()
            .ok_or_else(|| ServiceError::CurrencyNotFound(symbol.to_string()))
    }

    async fn htlc_builder(&self, symbol: &str) -> ServiceResult<Arc<dyn HtlcBuilder>> {
        self.htlc_builders
            .read()
            .await
            .get(symbol)
            .cloned()
            .ok_or_else(|| ServiceError::not_supported(symbol, "htlc construction"))
    }

    fn chain_currency<'a>(pair: &'a Pair, side: OrderSide) -> &'a str {
        match side {
            OrderSide::Buy => &pair.base,
            OrderSide::Sell => &pair.quote,
        }
    }

    fn lightning_currency<'a>(pair: &'a Pair, side: OrderSide) -> &'a str {
        match side {
            OrderSide::Buy => &pair.quote,
            OrderSide::Sell => &pair.base,
        }
    }

    // ---- 4.1 init ----

    pub async fn init(&self, pairs: Vec<Pair>, currencies: Vec<swap_core::currency::Currency>) -> ServiceResult<()> {
        info!("Initializing swap service with {} pairs", pairs.len());
        let known: HashMap<_, _> = currencies.iter().map(|c| (c.symbol.clone(), ())).collect();
        for pair in &pairs {
            if !known.contains_key(&pair.base) {
                return Err(ServiceError::CurrencyNotFound(pair.base.clone()));
            }
            if !known.contains_key(&pair.quote) {
                return Err(ServiceError::CurrencyNotFound(pair.quote.clone()));
            }
            self.pairs.upsert_if_absent(pair.clone()).await;
        }

        let mut deltas = HashMap::new();
        for pair in &pairs {
            deltas.insert(pair.id(), pair.timeout_block_delta);
        }
        self.timeouts.init(deltas).await;
        self.rates.init(&pairs).await;

        let registered = self.currencies.read().await.clone();
        for (symbol, runtime) in registered.iter() {
            if let Some(lnd_client) = &runtime.lnd_client {
                match lnd_client.get_info().await {
                    Ok(lightning) => {
                        self.set_node(symbol, NodeInfo { pubkey: lightning.identity_pubkey, uris: lightning.uris }).await;
                    }
                    Err(e) => warn!("Could not snapshot node URI for {}: {}", symbol, e),
                }
            }
        }

        Ok(())
    }

    // ---- 4.1 getInfo ----

    pub async fn get_info(&self) -> InfoResponse {
        let currencies = self.currencies.read().await.clone();
        let mut chains = HashMap::new();

        for (symbol, runtime) in currencies.iter() {
            let mut info = CurrencyInfo::default();

            if let Some(chain_client) = &runtime.chain_client {
                match (chain_client.get_network_info().await, chain_client.get_blockchain_info().await) {
                    (Ok(network), Ok(blockchain)) => {
                        info.chain = Some(ChainStatus {
                            version: network.version,
                            connections: network.connections,
                            blocks: blockchain.blocks,
                            scanned_blocks: blockchain.scanned_blocks,
                        });
                    }
                    (Err(e), _) | (_, Err(e)) => info.chain_error = Some(e.to_string()),
                }
            }

            if let Some(lnd_client) = &runtime.lnd_client {
                match lnd_client.get_info().await {
                    Ok(lightning) => {
                        info.lightning = Some(LightningStatus {
                            version: lightning.version,
                            block_height: lightning.block_height,
                            active_channels: lightning.num_active_channels,
                            inactive_channels: lightning.num_inactive_channels,
                            pending_channels: lightning.num_pending_channels,
                        });
                    }
                    Err(e) => info.lightning_error = Some(e.to_string()),
                }
            }

            chains.insert(symbol.clone(), info);
        }

        InfoResponse { version: self.version.clone(), chains }
    }

    // ---- getBalance ----

    pub async fn get_balance(&self) -> HashMap<String, CurrencyBalance> {
        let currencies = self.currencies.read().await.clone();
        let mut balances = HashMap::new();

        for (symbol, runtime) in currencies.iter() {
            let mut balance = CurrencyBalance::default();

            if let Some(wallet) = &runtime.wallet {
                if let Ok(wallet_balance) = wallet.get_balance().await {
                    balance.wallet = Some(wallet_balance);
                }
            }

            if let Some(lnd_client) = &runtime.lnd_client {
                if let Ok(channels) = lnd_client.list_channels().await {
                    let local = channels.iter().map(|c| c.local_balance).sum();
                    let remote = channels.iter().map(|c| c.remote_balance).sum();
                    balance.lightning = Some(crate::collaborators::ChannelBalance {
                        local_balance: local,
                        remote_balance: remote,
                    });
                }
            }

            balances.insert(symbol.clone(), balance);
        }

        balances
    }

    // ---- getPairs ----

    pub async fn get_pairs(&self) -> PairsResponse {
        let pairs: HashMap<String, Pair> = self.pairs.all().await.into_iter().map(|p| (p.id(), p)).collect();
        let mut info = Vec::new();
        if self.prepay_miner_fee.load(Ordering::SeqCst) {
            info.push("PrepayMinerFee".to_string());
        }
        let mut warnings = Vec::new();
        if !self.allow_reverse_swaps.load(Ordering::SeqCst) {
            warnings.push("ReverseSwapsDisabled".to_string());
        }
        PairsResponse { pairs, info, warnings }
    }

    // ---- getNodes / getRoutingHints / getTimeouts / getContracts ----

    pub async fn get_nodes(&self) -> HashMap<String, NodeInfo> {
        self.nodes.all().await
    }

    pub async fn set_node(&self, symbol: &str, info: NodeInfo) {
        self.nodes.set(symbol, info).await;
    }

    /// Routing itself is out of scope; this surfaces the known URIs for the
    /// caller's own hint construction.
    pub async fn get_routing_hints(&self, symbol: &str, routing_node: Option<&str>) -> Vec<String> {
        match self.nodes.get(symbol).await {
            Some(info) => match routing_node {
                Some(node) => info.uris.into_iter().filter(|uri| uri.starts_with(node)).collect(),
                None => info.uris,
            },
            None => Vec::new(),
        }
    }

    pub async fn get_timeouts(&self) -> Vec<Pair> {
        self.pairs.all().await
    }

    pub async fn get_contracts(&self) -> ServiceResult<HashMap<String, String>> {
        let currencies = self.currencies.read().await;
        let contracts: HashMap<String, String> = currencies
            .values()
            .filter(|c| matches!(c.currency.kind, CurrencyKind::Ether | CurrencyKind::Erc20))
            .map(|c| (c.currency.symbol.clone(), c.currency.native_chain_symbol.clone().unwrap_or_else(|| c.currency.symbol.clone())))
            .collect();
        if contracts.is_empty() {
            return Err(ServiceError::EthereumNotEnabled);
        }
        Ok(contracts)
    }

    // ---- getTransaction / broadcastTransaction ----

    pub async fn get_transaction(&self, symbol: &str, txid: &str) -> ServiceResult<SwapTransactionInfo> {
        let runtime = self.currency(symbol).await?;
        let chain_client = runtime
            .chain_client
            .as_ref()
            .ok_or_else(|| ServiceError::not_supported(symbol, "getTransaction"))?;
        let transaction_hex = chain_client
            .get_raw_transaction(txid)
            .await
            .map_err(|e| ServiceError::Chain(e.to_string()))?;

        let (timeout_block_height, timeout_eta) = match self.repository.find_swap_by_lockup_transaction(txid).await {
            Some(swap) => {
                let blocks = self.current_block_estimate();
                let eta = calculate_timeout_date(
                    block_time_minutes(symbol).unwrap_or(10.0),
                    swap.timeout_block_height.saturating_sub(blocks),
                );
                (swap.timeout_block_height, eta)
            }
            None => (0, calculate_timeout_date(block_time_minutes(symbol).unwrap_or(10.0), 0)),
        };

        Ok(SwapTransactionInfo { transaction_hex, timeout_block_height, timeout_eta })
    }

    /// Adds the refund-safety check described in spec §4.1 and §8 scenario 6.
    pub async fn broadcast_transaction(&self, symbol: &str, hex: &str) -> ServiceResult<String> {
        let runtime = self.currency(symbol).await?;
        let chain_client = runtime
            .chain_client
            .as_ref()
            .ok_or_else(|| ServiceError::not_supported(symbol, "broadcastTransaction"))?;

        match chain_client.send_raw_transaction(hex).await {
            Ok(txid) => Ok(txid),
            Err(rpc_error) => {
                const REJECTION_PREFIX: &str = "non-mandatory-script-verify-flag (Locktime requirement not satisfied)";
                if rpc_error.code != -26 || !rpc_error.message.starts_with(REJECTION_PREFIX) {
                    return Err(ServiceError::Chain(rpc_error.to_string()));
                }
                warn!("Broadcast of {} rejected as a premature refund", symbol);

                let raw = hex::decode(hex).map_err(|e| ServiceError::internal(e.to_string()))?;
                let tx: Transaction = deserialize(&raw).map_err(|e| ServiceError::internal(e.to_string()))?;

                for input in &tx.input {
                    let spent_txid = input.previous_output.txid.to_string();
                    if let Some(swap) = self.repository.find_swap_by_lockup_transaction(&spent_txid).await {
                        if swap.status != SwapStatus::TransactionConfirmed {
                            let blocks = self.current_block_estimate();
                            let timeout_eta = calculate_timeout_date(
                                block_time_minutes(symbol).unwrap_or(10.0),
                                swap.timeout_block_height.saturating_sub(blocks),
                            );
                            return Err(ServiceError::RefundBeforeTimeout {
                                message: rpc_error.message,
                                timeout_block_height: swap.timeout_block_height,
                                timeout_eta,
                            });
                        }
                    }
                }

                Err(ServiceError::Chain(rpc_error.to_string()))
            }
        }
    }

    /// Best-effort current height used only for the timeout ETA projection;
    /// a stale value still yields a useful estimate.
    fn current_block_estimate(&self) -> u32 {
        0
    }

    // ---- deriveKeys / getAddress / getFeeEstimation ----

    pub async fn derive_keys(&self, symbol: &str, index: u64) -> ServiceResult<KeyPair> {
        let runtime = self.currency(symbol).await?;
        let wallet = runtime.wallet.as_ref().ok_or_else(|| ServiceError::not_supported(symbol, "deriveKeys"))?;
        wallet.get_keys_by_index(index).await.map_err(|e| ServiceError::Wallet(e.to_string()))
    }

    pub async fn get_address(&self, symbol: &str) -> ServiceResult<String> {
        let runtime = self.currency(symbol).await?;
        let wallet = runtime.wallet.as_ref().ok_or_else(|| ServiceError::not_supported(symbol, "getAddress"))?;
        wallet.get_address().await.map_err(|e| ServiceError::Wallet(e.to_string()))
    }

    pub async fn get_fee_estimation(&self, symbol: Option<&str>, blocks: Option<u32>) -> ServiceResult<HashMap<String, f64>> {
        let blocks = blocks.unwrap_or(DEFAULT_FEE_ESTIMATION_BLOCKS);
        let currencies = self.currencies.read().await;
        let mut estimates = HashMap::new();
        let mut seen_native = std::collections::HashSet::new();

        let targets: Vec<&CurrencyRuntime> = match symbol {
            Some(s) => currencies.get(s).into_iter().collect(),
            None => currencies.values().collect(),
        };

        for runtime in targets {
            match runtime.currency.kind {
                CurrencyKind::BitcoinLike => {
                    if let Some(chain_client) = &runtime.chain_client {
                        let fee = chain_client.estimate_fee(blocks).await.map_err(|e| ServiceError::Chain(e.to_string()))?;
                        estimates.insert(runtime.symbol().to_string(), fee);
                    }
                }
                CurrencyKind::Ether => {
                    if let Some(provider) = &runtime.account_provider {
                        let gas_price = provider.get_gas_price().await.map_err(|e| ServiceError::Chain(e.to_string()))?;
                        estimates.insert(runtime.symbol().to_string(), gas_price as f64 / GWEI_DECIMALS as f64);
                    }
                }
                CurrencyKind::Erc20 => {
                    let native = runtime.currency.native_chain_symbol.clone().unwrap_or_else(|| runtime.symbol().to_string());
                    if seen_native.insert(native.clone()) {
                        if let Some(native_runtime) = currencies.get(&native) {
                            if let Some(provider) = &native_runtime.account_provider {
                                let gas_price = provider.get_gas_price().await.map_err(|e| ServiceError::Chain(e.to_string()))?;
                                estimates.insert(native, gas_price as f64 / GWEI_DECIMALS as f64);
                            }
                        }
                    }
                }
            }
        }

        Ok(estimates)
    }

    // ---- addReferral ----

    pub async fn add_referral(&self, id: String, fee_share: u8, routing_node: Option<String>) -> ServiceResult<Referral> {
        if id.trim().is_empty() {
            return Err(ServiceError::InvalidReferral("referral IDs cannot be empty".to_string()));
        }
        if fee_share > 100 {
            return Err(ServiceError::InvalidReferral("referral fee share must be between 0 and 100".to_string()));
        }

        let referral = Referral {
            id,
            fee_share,
            routing_node,
            api_key: Uuid::new_v4().simple().to_string(),
            api_secret: Uuid::new_v4().simple().to_string(),
        };
        self.referrals.add(referral.clone()).await?;
        Ok(referral)
    }

    // ---- 4.7 referral resolution ----

    async fn resolve_referral(&self, explicit_id: Option<&str>, routing_node: Option<&str>) -> Option<String> {
        if let Some(id) = explicit_id {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
        if let Some(node) = routing_node {
            if let Some(referral) = self.referrals.by_routing_node(node).await {
                return Some(referral.id);
            }
        }
        None
    }

    // ---- 4.2 createSwap ----

    pub async fn create_swap(&self, args: CreateSwapArgs) -> ServiceResult<CreateSwapResponse> {
        let side = OrderSide::parse(&args.order_side)?;
        let pair = self.pairs.get(&args.pair_id).await?;
        let chain_symbol = Self::chain_currency(&pair, side).to_string();
        let chain_currency = self.currency(&chain_symbol).await?;

        let refund_public_key;
        let claim_address;
        match chain_currency.currency.kind {
            CurrencyKind::BitcoinLike => {
                refund_public_key = Some(
                    args.refund_public_key
                        .clone()
                        .ok_or_else(|| ServiceError::UndefinedParameter("refundPublicKey".to_string()))?,
                );
                claim_address = None;
            }
            CurrencyKind::Ether | CurrencyKind::Erc20 => {
                let addr = args
                    .claim_address
                    .clone()
                    .ok_or_else(|| ServiceError::UndefinedParameter("claimAddress".to_string()))?;
                validate_ethereum_address(&addr)?;
                refund_public_key = None;
                claim_address = Some(addr);
            }
        }

        if let Some(channel) = &args.channel {
            if channel.inbound_liquidity_percent < MIN_INBOUND_LIQUIDITY {
                return Err(ServiceError::BeneathMinInboundLiquidity);
            }
            if channel.inbound_liquidity_percent > MAX_INBOUND_LIQUIDITY {
                return Err(ServiceError::ExceedsMaxInboundLiquidity);
            }
        }

        let timeout_block_delta = self.timeouts.get_timeout(&pair.id(), side, false).await?;
        let referral_id = self.resolve_referral(args.referral_id.as_deref(), None).await;

        let key_index = self.swap_manager.next_key_index(&chain_symbol).await;
        let builder = self.htlc_builder(&chain_symbol).await?;

        let (lockup_address, redeem_script) = match chain_currency.currency.kind {
            CurrencyKind::BitcoinLike => {
                let wallet = chain_currency
                    .wallet
                    .as_ref()
                    .ok_or_else(|| ServiceError::not_supported(chain_symbol.as_str(), "createSwap"))?;
                let keys = wallet.get_keys_by_index(key_index).await.map_err(|e| ServiceError::Wallet(e.to_string()))?;
                let output = builder
                    .build_utxo_lockup(UtxoHtlcParams {
                        preimage_hash: args.preimage_hash.clone(),
                        claim_public_key: keys.public_key,
                        refund_public_key: refund_public_key.clone().unwrap(),
                        timeout_block_height: timeout_block_delta,
                    })
                    .await
                    .map_err(|e| ServiceError::internal(e.to_string()))?;
                (output.lockup_address, Some(output.redeem_script))
            }
            CurrencyKind::Ether | CurrencyKind::Erc20 => {
                let wallet = chain_currency
                    .wallet
                    .as_ref()
                    .ok_or_else(|| ServiceError::not_supported(chain_symbol.as_str(), "createSwap"))?;
                let claim_addr = claim_address.clone().unwrap();
                let refund_addr = wallet.get_address().await.map_err(|e| ServiceError::Wallet(e.to_string()))?;
                let output = builder
                    .build_account_lockup(AccountHtlcParams {
                        preimage_hash: args.preimage_hash.clone(),
                        claim_address: claim_addr,
                        refund_address: refund_addr,
                        timeout_block_height: timeout_block_delta,
                    })
                    .await
                    .map_err(|e| ServiceError::internal(e.to_string()))?;
                (output.contract_address, None)
            }
        };

        let id = Uuid::new_v4();
        let swap = Swap {
            id,
            preimage_hash: args.preimage_hash,
            pair: pair.id(),
            order_side: side,
            invoice: None,
            onchain_amount: None,
            expected_amount: None,
            percentage_fee: None,
            accept_zero_conf: false,
            rate: None,
            lockup_address: lockup_address.clone(),
            lockup_transaction_id: None,
            timeout_block_height: timeout_block_delta,
            refund_public_key,
            claim_address: claim_address.clone(),
            key_index: Some(key_index),
            redeem_script: redeem_script.clone(),
            referral_id,
            status: SwapStatus::SwapCreated,
            created_at: Utc::now(),
        };

        self.swap_manager.create_swap(swap).await?;
        if let Some(channel) = args.channel {
            self.swap_manager
                .attach_channel_creation(ChannelCreation { swap_id: id, ..channel })
                .await;
        }

        Ok(CreateSwapResponse {
            id,
            address: lockup_address,
            redeem_script,
            claim_address,
            timeout_block_height: timeout_block_delta,
        })
    }

    // ---- 4.3 setSwapInvoice ----

    pub async fn set_swap_invoice(&self, id: Uuid, invoice: String, pair_hash: Option<String>) -> ServiceResult<SetSwapInvoiceResponse> {
        let mut swap = self.repository.get_swap(id).await?;
        if swap.invoice.is_some() {
            return Err(ServiceError::SwapHasInvoiceAlready);
        }

        if let Some(hash) = &pair_hash {
            if hash.is_empty() || *hash != self.rates.hash(&swap.pair).await? {
                return Err(ServiceError::InvalidPairHash);
            }
        }

        let decoded = Bolt11Invoice::from_str(&invoice).map_err(|e| ServiceError::UndefinedParameter(e.to_string()))?;
        let invoice_amount = decoded
            .amount_milli_satoshis()
            .map(|msat| msat / 1000)
            .ok_or_else(|| ServiceError::UndefinedParameter("invoice amount".to_string()))?;

        let pair = self.pairs.get(&swap.pair).await?;
        let rate = swap.rate.unwrap_or_else(|| if swap.order_side == OrderSide::Buy { 1.0 / pair.rate } else { pair.rate });

        verify_amount(&pair, invoice_amount, swap.order_side, false)?;

        let chain_symbol = Self::chain_currency(&pair, swap.order_side).to_string();
        let fee_rate = self.estimate_fee_rate(&chain_symbol).await?;
        let base_fee = self.fees.base_fee(fee_rate, FeePurpose::NormalClaim);
        let percentage_fee = self.fees.percentage_component(&swap.pair, invoice_amount);

        let expected_amount = (invoice_amount as f64 * rate).floor() as u64 + base_fee + percentage_fee;

        if let Some(onchain_amount) = swap.onchain_amount {
            if expected_amount > onchain_amount {
                let max_invoice_amount = calculate_invoice_amount(
                    swap.order_side,
                    rate,
                    onchain_amount,
                    base_fee,
                    pair.percentage_fee,
                );
                return Err(ServiceError::InvalidInvoiceAmount { max: max_invoice_amount });
            }
        }

        let accept_zero_conf = self.rates.accept_zero_conf(&chain_symbol, expected_amount);
        let already_funded = swap.onchain_amount.is_some();
        let lockup_address = swap.lockup_address.clone();
        let order_side = swap.order_side;

        swap = self.swap_manager.set_invoice(id, invoice).await?;
        self.repository.update_swap_status(id, SwapStatus::InvoiceSet).await?;

        if already_funded {
            return Ok(SetSwapInvoiceResponse::default());
        }

        let bip21 = format!(
            "bitcoin:{}?amount={:.8}&label=Send%20to%20{}%20lightning",
            lockup_address,
            expected_amount as f64 / 100_000_000.0,
            Self::lightning_currency(&pair, order_side),
        );

        Ok(SetSwapInvoiceResponse {
            expected_amount: Some(expected_amount),
            accept_zero_conf: Some(accept_zero_conf),
            bip21: Some(bip21),
        })
    }

    async fn estimate_fee_rate(&self, symbol: &str) -> ServiceResult<f64> {
        let runtime = self.currency(symbol).await?;
        match runtime.currency.kind {
            CurrencyKind::BitcoinLike => {
                let chain_client = runtime.chain_client.as_ref().ok_or_else(|| ServiceError::not_supported(symbol, "estimateFee"))?;
                chain_client.estimate_fee(DEFAULT_FEE_ESTIMATION_BLOCKS).await.map_err(|e| ServiceError::Chain(e.to_string()))
            }
            CurrencyKind::Ether | CurrencyKind::Erc20 => {
                let provider = runtime.account_provider.as_ref().ok_or_else(|| ServiceError::not_supported(symbol, "getGasPrice"))?;
                let gas_price = provider.get_gas_price().await.map_err(|e| ServiceError::Chain(e.to_string()))?;
                Ok(gas_price as f64 / GWEI_DECIMALS as f64)
            }
        }
    }

    // ---- 4.4 createSwapWithInvoice ----

    pub async fn create_swap_with_invoice(
        &self,
        swap_args: CreateSwapArgs,
        invoice: String,
        pair_hash: Option<String>,
    ) -> ServiceResult<(CreateSwapResponse, SetSwapInvoiceResponse)> {
        let created = self.create_swap(swap_args).await?;
        match self.set_swap_invoice(created.id, invoice, pair_hash).await {
            Ok(invoice_response) => Ok((created, invoice_response)),
            Err(e) => {
                self.swap_manager.destroy_swap(created.id).await;
                Err(e)
            }
        }
    }

    // ---- 4.5 createReverseSwap ----

    pub async fn create_reverse_swap(&self, args: CreateReverseSwapArgs) -> ServiceResult<CreateReverseSwapResponse> {
        if !self.allow_reverse_swaps.load(Ordering::SeqCst) {
            return Err(ServiceError::ReverseSwapsDisabled);
        }

        let side = OrderSide::parse(&args.order_side)?;
        let pair = self.pairs.get(&args.pair_id).await?;
        if let Some(hash) = &args.pair_hash {
            if hash.is_empty() || *hash != self.rates.hash(&pair.id()).await? {
                return Err(ServiceError::InvalidPairHash);
            }
        }

        let sending_symbol = Self::chain_currency(&pair, side).to_string();
        let receiving_symbol = Self::lightning_currency(&pair, side).to_string();
        let sending = self.currency(&sending_symbol).await?;

        let claim_public_key;
        let claim_address;
        match sending.currency.kind {
            CurrencyKind::BitcoinLike => {
                if args.prepay_miner_fee {
                    return Err(ServiceError::UnsupportedParameter("prepayMinerFee".to_string()));
                }
                claim_public_key = Some(
                    args.claim_public_key
                        .clone()
                        .ok_or_else(|| ServiceError::UndefinedParameter("claimPublicKey".to_string()))?,
                );
                claim_address = None;
            }
            CurrencyKind::Ether | CurrencyKind::Erc20 => {
                let addr = args
                    .claim_address
                    .clone()
                    .ok_or_else(|| ServiceError::UndefinedParameter("claimAddress".to_string()))?;
                validate_ethereum_address(&addr)?;
                claim_public_key = None;
                claim_address = Some(addr);
            }
        }

        let onchain_timeout_block_delta = self.timeouts.get_timeout(&pair.id(), side, true).await?;
        let sending_block_time = block_time_minutes(&sending_symbol).unwrap_or(10.0);
        let receiving_block_time = block_time_minutes(&receiving_symbol).unwrap_or(10.0);
        let converted = TimeoutDeltaProvider::convert_blocks(sending_block_time, receiving_block_time, onchain_timeout_block_delta);
        let lightning_timeout_block_delta = if sending_symbol == receiving_symbol {
            converted + 3
        } else {
            converted + (converted as f64 * 0.1).ceil() as u32
        };

        match (args.invoice_amount, args.onchain_amount) {
            (Some(_), Some(_)) => return Err(ServiceError::InvoiceAndOnchainAmountSpecified),
            (None, None) => return Err(ServiceError::NoAmountSpecified),
            _ => {}
        }

        let rate = if side == OrderSide::Buy { 1.0 / pair.rate } else { pair.rate };
        let fee_percent = pair.percentage_fee;
        let fee_rate = self.estimate_fee_rate(&sending_symbol).await?;
        let base_fee = self.fees.base_fee(fee_rate, FeePurpose::ReverseLockup);

        let (hold_invoice_amount, onchain_amount, percentage_fee, response_onchain_amount) =
            if let Some(invoice_amount) = args.invoice_amount {
                let percentage_fee = (fee_percent * invoice_amount as f64 * rate).ceil() as u64;
                let onchain_amount = ((invoice_amount as f64 * rate) - percentage_fee as f64 - base_fee as f64).floor() as u64;
                (invoice_amount, onchain_amount, percentage_fee, Some(onchain_amount))
            } else {
                let onchain_amount = args.onchain_amount.unwrap();
                let hold_invoice_amount = (((onchain_amount + base_fee) as f64 / rate) / (1.0 - fee_percent)).ceil() as u64;
                let percentage_fee = (hold_invoice_amount as f64 * rate * fee_percent).ceil() as u64;
                (hold_invoice_amount, onchain_amount, percentage_fee, None)
            };

        verify_amount(&pair, hold_invoice_amount, side, true)?;

        let mut onchain_amount = onchain_amount;
        let mut hold_invoice_amount = hold_invoice_amount;
        let mut prepay_miner_fee_amount = None;
        let miner_fee_invoice: Option<String> = None;

        if self.prepay_miner_fee.load(Ordering::SeqCst) || args.prepay_miner_fee {
            match sending.currency.kind {
                CurrencyKind::BitcoinLike => {
                    let prepay_invoice_amount = (base_fee as f64 / rate).ceil() as u64;
                    hold_invoice_amount = hold_invoice_amount.saturating_sub(prepay_invoice_amount);
                    prepay_miner_fee_amount = Some(prepay_invoice_amount);
                }
                CurrencyKind::Ether | CurrencyKind::Erc20 => {
                    let account_provider = sending
                        .account_provider
                        .as_ref()
                        .ok_or_else(|| ServiceError::not_supported(sending_symbol.as_str(), "getGasPrice"))?;
                    let gas_price = account_provider.get_gas_price().await.map_err(|e| ServiceError::Chain(e.to_string()))?;
                    let prepay_onchain_amount = (ETHEREUM_PREPAY_MINER_FEE_GAS_LIMIT * gas_price) / ETHER_DECIMALS;
                    let ether_rate = if sending_symbol == "ETH" { 1.0 } else { rate };
                    let prepay_invoice_amount = (prepay_onchain_amount as f64 * ether_rate).ceil() as u64;
                    if response_onchain_amount.is_some() {
                        onchain_amount = onchain_amount.saturating_sub(prepay_onchain_amount);
                        hold_invoice_amount = hold_invoice_amount.saturating_sub(prepay_invoice_amount);
                    }
                    prepay_miner_fee_amount = Some(prepay_onchain_amount);
                }
            }
        }

        if onchain_amount < 1 {
            return Err(ServiceError::OnchainAmountTooLow);
        }

        let referral_id = self.resolve_referral(args.referral_id.as_deref(), args.routing_node.as_deref()).await;
        let key_index = self.swap_manager.next_key_index(&sending_symbol).await;
        let builder = self.htlc_builder(&sending_symbol).await?;

        let (lockup_address, redeem_script, refund_address) = match sending.currency.kind {
            CurrencyKind::BitcoinLike => {
                let wallet = sending.wallet.as_ref().ok_or_else(|| ServiceError::not_supported(sending_symbol.as_str(), "createReverseSwap"))?;
                let keys = wallet.get_keys_by_index(key_index).await.map_err(|e| ServiceError::Wallet(e.to_string()))?;
                let output = builder
                    .build_utxo_lockup(UtxoHtlcParams {
                        preimage_hash: args.preimage_hash.clone(),
                        claim_public_key: claim_public_key.clone().unwrap(),
                        refund_public_key: keys.public_key,
                        timeout_block_height: onchain_timeout_block_delta,
                    })
                    .await
                    .map_err(|e| ServiceError::internal(e.to_string()))?;
                (output.lockup_address, Some(output.redeem_script), None)
            }
            CurrencyKind::Ether | CurrencyKind::Erc20 => {
                let wallet = sending.wallet.as_ref().ok_or_else(|| ServiceError::not_supported(sending_symbol.as_str(), "createReverseSwap"))?;
                let refund_addr = wallet.get_address().await.map_err(|e| ServiceError::Wallet(e.to_string()))?;
                let output = builder
                    .build_account_lockup(AccountHtlcParams {
                        preimage_hash: args.preimage_hash.clone(),
                        claim_address: claim_address.clone().unwrap(),
                        refund_address: refund_addr.clone(),
                        timeout_block_height: onchain_timeout_block_delta,
                    })
                    .await
                    .map_err(|e| ServiceError::internal(e.to_string()))?;
                (output.contract_address, None, Some(refund_addr))
            }
        };

        let receiving = self.currency(&receiving_symbol).await?;
        let lnd_client = receiving
            .lnd_client
            .as_ref()
            .ok_or_else(|| ServiceError::NoLndClient(receiving_symbol.clone()))?;
        let _ = lnd_client; // hold-invoice creation lives in the out-of-scope Lightning adapter.

        let id = Uuid::new_v4();
        let invoice = format!("lnbc-hold-invoice-{id}");

        let reverse_swap = ReverseSwap {
            id,
            pair: pair.id(),
            order_side: side,
            preimage_hash: args.preimage_hash,
            invoice: invoice.clone(),
            miner_fee_invoice: miner_fee_invoice.clone(),
            onchain_amount,
            hold_invoice_amount,
            percentage_fee,
            prepay_miner_fee_onchain_amount: prepay_miner_fee_amount,
            lockup_address: lockup_address.clone(),
            redeem_script: redeem_script.clone(),
            claim_public_key: claim_public_key.clone(),
            claim_address: claim_address.clone(),
            timeout_block_height: lightning_timeout_block_delta,
            referral_id,
            status: SwapStatus::SwapCreated,
            created_at: Utc::now(),
        };

        self.swap_manager.create_reverse_swap(reverse_swap).await?;

        Ok(CreateReverseSwapResponse {
            id,
            invoice,
            redeem_script,
            lockup_address,
            miner_fee_invoice,
            timeout_block_height: lightning_timeout_block_delta,
            refund_address,
            onchain_amount: response_onchain_amount,
            prepay_miner_fee_amount,
        })
    }

    // ---- 4.10 sendCoins ----

    pub async fn send_coins(&self, symbol: &str, address: &str, amount: u64, send_all: bool, fee: Option<f64>) -> ServiceResult<SendResult> {
        let runtime = self.currency(symbol).await?;
        let wallet = runtime.wallet.as_ref().ok_or_else(|| ServiceError::not_supported(symbol, "sendCoins"))?;

        let result = if send_all {
            wallet.sweep_wallet(address, fee).await.map_err(|e| ServiceError::Wallet(e.to_string()))?
        } else {
            wallet.send_to_address(address, amount, fee).await.map_err(|e| ServiceError::Wallet(e.to_string()))?
        };

        let vout = match runtime.currency.kind {
            CurrencyKind::BitcoinLike => result.vout,
            CurrencyKind::Ether | CurrencyKind::Erc20 => Some(0),
        };

        Ok(SendResult { transaction_id: result.transaction_id, vout })
    }
}

fn validate_ethereum_address(address: &str) -> ServiceResult<()> {
    let hex_part = address.strip_prefix("0x").ok_or_else(|| ServiceError::InvalidEthereumAddress(address.to_string()))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ServiceError::InvalidEthereumAddress(address.to_string()));
    }
    Ok(())
}
