//! Bit-exact constants from spec §6.

/// wei per gwei.
pub const GWEI_DECIMALS: u64 = 1_000_000_000;
/// wei per ether.
pub const ETHER_DECIMALS: u64 = 1_000_000_000_000_000_000;

/// Gas budget used to size the reverse-swap prepay-miner-fee on-chain amount.
pub const ETHEREUM_PREPAY_MINER_FEE_GAS_LIMIT: u64 = 100_000;

pub const MIN_INBOUND_LIQUIDITY: u32 = 10;
pub const MAX_INBOUND_LIQUIDITY: u32 = 50;

/// Default block target used by `getFeeEstimation` when none is given.
pub const DEFAULT_FEE_ESTIMATION_BLOCKS: u32 = 2;

/// Average minutes per block, keyed by currency symbol, for timeout-date
/// projection. Account chains carry their own constant here too
/// so `calculate_timeout_date` has one source of truth.
pub fn block_time_minutes(symbol: &str) -> Option<f64> {
    match symbol {
        "BTC" => Some(10.0),
        "LTC" => Some(2.5),
        "ETH" => Some(0.2), // ~12s blocks
        _ => None,
    }
}
