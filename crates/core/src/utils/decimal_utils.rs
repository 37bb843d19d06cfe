//! Fixed-scale decimal helpers.
//!
//! Intermediate accounting values are materialized at scale 10 and monetary
//! values are presented at scale 2, both with banker's rounding.

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::{DISPLAY_DECIMAL_PRECISION, INTERMEDIATE_DECIMAL_PRECISION, QUANTITY_THRESHOLD};

/// Rounds an intermediate result to scale 10 (banker's rounding).
pub fn round_intermediate(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(INTERMEDIATE_DECIMAL_PRECISION, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Rounds a monetary amount for presentation (scale 2, banker's rounding).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DECIMAL_PRECISION, RoundingStrategy::MidpointNearestEven)
}

/// Converts a return ratio (0.2706) to a presentation percentage (27.06).
pub fn ratio_to_percent(ratio: Decimal) -> Decimal {
    round_money(ratio * Decimal::ONE_HUNDRED)
}

pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold =
        Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// Safe division returning zero when the divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Lossy conversion into the floating point domain used by IRR and annualization.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Re-materializes a float result as an intermediate-scale decimal.
pub fn from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(round_intermediate)
}

/// Formats a ratio for descriptions: 2 -> "2:1", 0.5 -> "1:2".
pub fn format_ratio(ratio: Decimal) -> String {
    if ratio >= Decimal::ONE || ratio.is_zero() {
        format!("{}:1", ratio.normalize())
    } else {
        format!("1:{}", round_intermediate(Decimal::ONE / ratio).normalize())
    }
}
