//! Pure amount and timeout arithmetic shared by `createSwap`,
//! `setSwapInvoice`, and `createReverseSwap`.

use chrono::{DateTime, Duration, Utc};

use swap_core::currency::OrderSide;
use swap_core::model::Pair;
use swap_core::{ServiceError, ServiceResult};

/// §4.8: convert `amount` into base-pair units, then check it against the
/// pair's configured limits.
pub fn verify_amount(pair: &Pair, amount: u64, side: OrderSide, is_reverse: bool) -> ServiceResult<()> {
    let scales_up = (!is_reverse && side == OrderSide::Buy) || (is_reverse && side == OrderSide::Sell);
    let converted = if scales_up {
        (amount as f64 * pair.rate).floor()
    } else {
        amount as f64
    };

    if converted > pair.limits.maximal as f64 {
        return Err(ServiceError::ExceedMaximalAmount {
            amount: converted as u64,
            max: pair.limits.maximal,
        });
    }
    if converted.ceil() < pair.limits.minimal as f64 {
        return Err(ServiceError::BeneathMinimalAmount {
            amount: converted as u64,
            min: pair.limits.minimal,
        });
    }
    Ok(())
}

/// §4.6: back-compute the invoice amount a given on-chain amount implies,
/// used to cap `setSwapInvoice` when the user already funded the lockup.
pub fn calculate_invoice_amount(
    side: OrderSide,
    rate: f64,
    onchain_amount: u64,
    base_fee: u64,
    percentage_fee: f64,
) -> u64 {
    let effective_rate = if side == OrderSide::Buy { 1.0 / rate } else { rate };
    let numerator = (onchain_amount as f64 - base_fee as f64) * effective_rate;
    (numerator / (1.0 + percentage_fee)).floor().max(0.0) as u64
}

/// §4.9: project a timeout block height forward into wall-clock time.
pub fn calculate_timeout_date(block_time_minutes: f64, blocks_missing: u32) -> DateTime<Utc> {
    let seconds = blocks_missing as f64 * block_time_minutes * 60.0;
    Utc::now() + Duration::seconds(seconds.round() as i64)
}
