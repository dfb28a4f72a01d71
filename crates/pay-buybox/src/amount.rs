//! # Amount Formatting
//!
//! The NVP API only accepts amounts with exactly two decimals, a '.'
//! separator and no grouping, e.g. `1234.50`.

use pay_core::{PaymentError, PaymentResult};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Format an amount for the `AMT` family of fields.
///
/// Rounds half away from zero to two decimals.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Parse an amount returned by the gateway (`AMT`, `NETREFUNDAMT`, ...)
pub fn parse_amount(value: &str) -> PaymentResult<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|e| PaymentError::InvalidResponse(format!("Invalid amount '{}': {}", value, e)))
}
