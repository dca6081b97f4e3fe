//! Error taxonomy for the swap orchestration core
//!
//! One variant per precondition or business rule the orchestrator enforces,
//! so callers (and tests) can match on structured data instead of parsing
//! messages.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Closed error type covering every lookup, validation, and business-rule
/// failure the orchestrator and its collaborators can report.
#[derive(Error, Debug)]
pub enum ServiceError {
    // --- Lookup ---
    #[error("could not find currency {0}")]
    CurrencyNotFound(String),

    #[error("could not find pair {0}")]
    PairNotFound(String),

    #[error("could not find swap {0}")]
    SwapNotFound(String),

    #[error("could not find order side {0}")]
    OrderSideNotFound(String),

    #[error("no LND client for currency {0}")]
    NoLndClient(String),

    #[error("{operation} is not supported by {symbol}")]
    NotSupportedBySymbol { symbol: String, operation: String },

    #[error("Ethereum is not enabled")]
    EthereumNotEnabled,

    // --- Precondition / validation ---
    #[error("undefined parameter: {0}")]
    UndefinedParameter(String),

    #[error("unsupported parameter: {0}")]
    UnsupportedParameter(String),

    #[error("invalid Ethereum address: {0}")]
    InvalidEthereumAddress(String),

    #[error("{0} is not a whole number")]
    NotWholeNumber(String),

    #[error("invalid pair hash")]
    InvalidPairHash,

    #[error("{0}")]
    InvalidReferral(String),

    // --- Business rule ---
    #[error("swap with preimage hash already exists")]
    SwapWithPreimageExists,

    #[error("swap with invoice already exists")]
    SwapWithInvoiceExists,

    #[error("swap has an invoice set already")]
    SwapHasInvoiceAlready,

    #[error("swap has no lockup")]
    SwapNoLockup,

    #[error("invoice amount is too high, maximum is {max}")]
    InvalidInvoiceAmount { max: u64 },

    #[error("amount {amount} is beneath minimal {min}")]
    BeneathMinimalAmount { amount: u64, min: u64 },

    #[error("amount {amount} exceeds maximal {max}")]
    ExceedMaximalAmount { amount: u64, max: u64 },

    #[error("on-chain amount is too low")]
    OnchainAmountTooLow,

    #[error("reverse swaps are disabled")]
    ReverseSwapsDisabled,

    #[error("exceeds maximal inbound liquidity")]
    ExceedsMaxInboundLiquidity,

    #[error("beneath minimal inbound liquidity")]
    BeneathMinInboundLiquidity,

    #[error("invoice and on-chain amount were specified")]
    InvoiceAndOnchainAmountSpecified,

    #[error("no amount was specified")]
    NoAmountSpecified,

    /// Structured refund-safety rejection for `broadcastTransaction`:
    /// the chain rejected a premature refund and the input matched a known,
    /// unfinished lockup.
    #[error("{message}")]
    RefundBeforeTimeout {
        message: String,
        timeout_block_height: u32,
        timeout_eta: DateTime<Utc>,
    },

    // --- Collaborator passthrough ---
    #[error("chain collaborator error: {0}")]
    Chain(String),

    #[error("lightning collaborator error: {0}")]
    Lightning(String),

    #[error("wallet collaborator error: {0}")]
    Wallet(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn not_supported<S: Into<String>>(symbol: S, operation: S) -> Self {
        Self::NotSupportedBySymbol {
            symbol: symbol.into(),
            operation: operation.into(),
        }
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}
