//! Traits for every collaborator the orchestrator calls through but does not
//! implement itself.
//!
//! The orchestrator is generic over these capabilities; swapping a real RPC
//! client in for a test fake never touches `service.rs`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error shape for a raw chain-node RPC rejection.
/// Kept distinct from `ServiceError` because `broadcastTransaction` needs to
/// pattern-match the numeric code and message verbatim.
#[derive(Debug, Clone)]
pub struct ChainRpcError {
    pub code: i32,
    pub message: String,
}

impl std::fmt::Display for ChainRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chain rpc error {}: {}", self.code, self.message)
    }
}
impl std::error::Error for ChainRpcError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub version: String,
    pub connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainInfo {
    pub blocks: u32,
    pub scanned_blocks: u32,
}

/// Capability for a UTXO-style chain RPC client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_network_info(&self) -> anyhow::Result<NetworkInfo>;
    async fn get_blockchain_info(&self) -> anyhow::Result<BlockchainInfo>;
    /// Fee rate for confirmation within `blocks` blocks, in sat/vByte.
    async fn estimate_fee(&self, blocks: u32) -> anyhow::Result<f64>;
    async fn get_raw_transaction(&self, txid: &str) -> anyhow::Result<String>;
    /// Broadcast a raw transaction; a premature-refund rejection surfaces as
    /// `Err(ChainRpcError { code: -26, .. })` with the node's verbatim
    /// message.
    async fn send_raw_transaction(&self, hex: &str) -> Result<String, ChainRpcError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelBalance {
    pub local_balance: u64,
    pub remote_balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightningInfo {
    pub version: String,
    pub block_height: u32,
    pub num_active_channels: u32,
    pub num_inactive_channels: u32,
    pub num_pending_channels: u32,
    pub identity_pubkey: String,
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub payment_hash: String,
    pub payment_preimage: String,
}

/// Capability for a Lightning node RPC client.
#[async_trait]
pub trait LndClient: Send + Sync {
    async fn get_info(&self) -> anyhow::Result<LightningInfo>;
    async fn list_channels(&self) -> anyhow::Result<Vec<ChannelBalance>>;
    async fn send_payment(&self, invoice: &str) -> anyhow::Result<PaymentResult>;
}

/// Capability for an account-based chain's RPC provider (Ether/ERC20).
#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn get_block_number(&self) -> anyhow::Result<u64>;
    /// Gas price in wei.
    async fn get_gas_price(&self) -> anyhow::Result<u64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    pub total: u64,
    pub confirmed: u64,
    pub unconfirmed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPair {
    pub public_key: String,
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub transaction_id: String,
    pub vout: Option<u32>,
}

/// Capability for a currency's wallet (key derivation, UTXO selection,
/// broadcast are all out of scope; only the surface the
/// orchestrator calls through is modeled here).
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn get_balance(&self) -> anyhow::Result<WalletBalance>;
    async fn get_address(&self) -> anyhow::Result<String>;
    /// HD-derive the key pair at `index`.
    async fn get_keys_by_index(&self, index: u64) -> anyhow::Result<KeyPair>;
    async fn send_to_address(&self, address: &str, amount: u64, fee: Option<f64>) -> anyhow::Result<SendResult>;
    async fn sweep_wallet(&self, address: &str, fee: Option<f64>) -> anyhow::Result<SendResult>;
}

#[derive(Debug, Clone)]
pub struct UtxoHtlcParams {
    pub preimage_hash: Vec<u8>,
    pub claim_public_key: String,
    pub refund_public_key: String,
    pub timeout_block_height: u32,
}

#[derive(Debug, Clone)]
pub struct UtxoHtlcOutput {
    pub redeem_script: String,
    pub lockup_address: String,
}

#[derive(Debug, Clone)]
pub struct AccountHtlcParams {
    pub preimage_hash: Vec<u8>,
    pub claim_address: String,
    pub refund_address: String,
    pub timeout_block_height: u32,
}

#[derive(Debug, Clone)]
pub struct AccountHtlcOutput {
    pub contract_address: String,
}

/// The HTLC script builder and watchtower ("swap nursery") are out of scope
///; this is the narrow surface the Swap Manager needs from them.
#[async_trait]
pub trait HtlcBuilder: Send + Sync {
    async fn build_utxo_lockup(&self, params: UtxoHtlcParams) -> anyhow::Result<UtxoHtlcOutput>;
    async fn build_account_lockup(&self, params: AccountHtlcParams) -> anyhow::Result<AccountHtlcOutput>;
}
