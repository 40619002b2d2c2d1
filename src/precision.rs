//! Decimal precision handling for prices and quantities sent to the exchange.
//!
//! Exchange price and lot filters reject values carrying more fractional digits
//! than the symbol allows, so every price and size the engine emits goes through
//! [`truncate`]. Truncation works on the shortest decimal representation of the
//! value and drops the surplus digits toward zero: it never rounds up, and a
//! value that already fits the precision is returned unchanged.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Truncate `value` to at most `precision` fractional digits.
///
/// Values with no decimal form (non-finite, or beyond `Decimal`'s range) are
/// returned as they are.
///
/// ```
/// use expert_trader::precision::truncate;
///
/// assert_eq!(truncate(10.219999999999, 2), 10.21);
/// assert_eq!(truncate(6.100001, 0), 6.0);
/// assert_eq!(truncate(10.21, 2), 10.21);
/// ```
pub fn truncate(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let Ok(exact) = Decimal::from_str(&value.to_string()) else {
        return value;
    };
    let truncated = exact.round_dp_with_strategy(precision, RoundingStrategy::ToZero);

    // Through the string form so short decimals land on their nearest f64
    truncated.to_string().parse::<f64>().unwrap_or(value)
}

/// Number of significant fractional digits in an exchange tick or step string.
///
/// `"0.01000000"` → 2, `"1.00000000"` → 0, `"0.00001"` → 5. `None` when the
/// string is not a decimal number.
pub fn precision_of(step: &str) -> Option<u32> {
    Decimal::from_str(step.trim())
        .ok()
        .map(|step| step.normalize().scale())
}
