//! Core swap records: Pair, Swap, Reverse Swap, Channel Creation,
//! Referral, and the lifecycle status shared by both swap kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::OrderSide;

/// `base/quote` composite identity used everywhere a pair is referenced.
pub fn pair_id(base: &str, quote: &str) -> String {
    format!("{base}/{quote}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub minimal: u64,
    pub maximal: u64,
}

/// A supported `base/quote` pair. Loaded from persistent config at init,
/// never deleted at runtime; `rate` and `hash` are refreshed periodically by
/// the Rate Provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
    pub rate: f64,
    pub limits: Limits,
    pub hash: String,
    /// Fraction in `[0, 1]`; spec calls this both `baseFeePercent` (§3) and
    /// `percentageFee` (§4.5 step 8) — same field.
    pub percentage_fee: f64,
    pub timeout_block_delta: u32,
}

impl Pair {
    pub fn id(&self) -> String {
        pair_id(&self.base, &self.quote)
    }
}

/// Fee-provider lookup key: which HTLC operation the base fee sizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeePurpose {
    /// Forward swap: claiming the user's on-chain lockup.
    NormalClaim,
    /// Reverse swap: locking up funds on-chain for the user to claim.
    ReverseLockup,
    /// Reverse swap: the user's claim transaction (used for estimation only).
    ReverseClaim,
}

/// Lifecycle status shared by Swap and Reverse Swap, fanned out by the Event
/// Hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapStatus {
    SwapCreated,
    InvoiceSet,
    TransactionMempool,
    TransactionConfirmed,
    InvoicePaid,
    InvoicePending,
    InvoiceFailedToPay,
    InvoiceSettled,
    SwapRefunded,
    SwapExpired,
}

/// Forward (submarine) swap record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swap {
    pub id: Uuid,
    /// 32-byte SHA-256 of the payment preimage; globally unique.
    pub preimage_hash: Vec<u8>,
    pub pair: String,
    pub order_side: OrderSide,
    /// Set-once: write-never-overwrite (enforced by `SwapRepository`).
    pub invoice: Option<String>,
    pub onchain_amount: Option<u64>,
    pub expected_amount: Option<u64>,
    pub percentage_fee: Option<u64>,
    pub accept_zero_conf: bool,
    /// Locked at invoice-set; immutable afterwards.
    pub rate: Option<f64>,
    pub lockup_address: String,
    pub lockup_transaction_id: Option<String>,
    pub timeout_block_height: u32,
    pub refund_public_key: Option<String>,
    pub claim_address: Option<String>,
    pub key_index: Option<u64>,
    pub redeem_script: Option<String>,
    pub referral_id: Option<String>,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
}

/// Reverse swap record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseSwap {
    pub id: Uuid,
    pub pair: String,
    pub order_side: OrderSide,
    pub preimage_hash: Vec<u8>,
    pub invoice: String,
    pub miner_fee_invoice: Option<String>,
    pub onchain_amount: u64,
    pub hold_invoice_amount: u64,
    pub percentage_fee: u64,
    pub prepay_miner_fee_onchain_amount: Option<u64>,
    pub lockup_address: String,
    pub redeem_script: Option<String>,
    pub claim_public_key: Option<String>,
    pub claim_address: Option<String>,
    pub timeout_block_height: u32,
    pub referral_id: Option<String>,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
}

/// Associated with a forward Swap; destroyed alongside it on rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCreation {
    pub swap_id: Uuid,
    pub inbound_liquidity_percent: u32,
    pub private: bool,
}

/// Flat referral/API-key identity (spec §1: "a flat referral/API-key scheme
/// is the only identity model").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: String,
    pub fee_share: u8,
    pub routing_node: Option<String>,
    pub api_key: String,
    pub api_secret: String,
}
