// Decimal <-> base unit conversion. Only the API boundary touches floats.

use crate::error::{BridgeError, BridgeResult};

// 2^64 as f64; anything at or above it does not fit in u64
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Converts a decimal coin amount to base units with half-up rounding:
/// `trunc(value * scale + 0.5)`. Counterparts use the same rule, keep it.
pub fn to_base_units(field: &'static str, value: f64, scale: u64) -> BridgeResult<u64> {
    if !value.is_finite() {
        return Err(BridgeError::InvalidAmount { field, reason: format!("{} is not finite", value) });
    }
    if value < 0.0 {
        return Err(BridgeError::InvalidAmount { field, reason: format!("{} is negative", value) });
    }
    let scaled = (value * scale as f64 + 0.5).trunc();
    if scaled >= U64_LIMIT {
        return Err(BridgeError::InvalidAmount { field, reason: format!("{} overflows base units", value) });
    }
    Ok(scaled as u64)
}

pub fn from_base_units(amount: u64, scale: u64) -> f64 {
    amount as f64 / scale as f64
}
