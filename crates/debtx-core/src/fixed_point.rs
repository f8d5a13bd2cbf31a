//! Fixed-point conversions
//!
//! Decimal <-> integer conversions for token amounts, 18-decimal health
//! factors and basis points. Conversions into integers always truncate
//! toward zero, never round.

use alloy::primitives::U256;

use crate::constants::BASIS_POINTS;
use crate::OrderError;

/// Largest power of ten that fits in a U256 is 10^77. Larger decimal
/// counts are clamped to this value.
pub const MAX_DECIMALS: u8 = 77;

/// Convert a float to a fixed-point integer.
///
/// `value` is first truncated to `precision` fractional digits and then
/// scaled by `10^decimals`. Works on the shortest decimal representation
/// of the float, so `0.29` converts to exactly `29 * 10^(decimals-2)`.
pub fn to_fixed_point(value: f64, decimals: u8, precision: u8) -> Result<U256, OrderError> {
    if !value.is_finite() {
        return Err(OrderError::invalid_amount(format!(
            "{} is not a finite number",
            value
        )));
    }
    if value < 0.0 {
        return Err(OrderError::invalid_amount(format!(
            "{} is negative",
            value
        )));
    }
    // f64 Display never uses exponent notation
    scale_decimal_str(&value.to_string(), decimals, precision)
}

/// Parse a human-readable decimal string (e.g. "100.5") into the token's
/// smallest unit. Fractional digits beyond `decimals` are dropped.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, OrderError> {
    scale_decimal_str(amount.trim(), decimals, decimals)
}

/// Inverse of [`to_fixed_point`], for display only.
pub fn from_fixed_point(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals).parse().unwrap_or(f64::MAX)
}

/// Render a fixed-point integer as a decimal string without trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let decimals = decimals.min(MAX_DECIMALS) as usize;
    let digits = value.to_string();
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// `bp / 10000`
pub fn basis_points_to_fraction(bp: u64) -> f64 {
    bp as f64 / BASIS_POINTS as f64
}

/// `amount * bp / 10000`, truncating
pub fn apply_basis_points(amount: U256, bp: u64) -> U256 {
    amount.saturating_mul(U256::from(bp)) / U256::from(BASIS_POINTS)
}

/// `10^decimals`, with decimals clamped to [`MAX_DECIMALS`]
pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals.min(MAX_DECIMALS)))
}

fn scale_decimal_str(input: &str, decimals: u8, precision: u8) -> Result<U256, OrderError> {
    if input.starts_with('-') {
        return Err(OrderError::invalid_amount(format!("{} is negative", input)));
    }
    let input = input.strip_prefix('+').unwrap_or(input);

    let (int_part, frac_part) = match input.split_once('.') {
        Some((i, f)) => (i, f),
        None => (input, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(OrderError::invalid_amount("empty amount"));
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(OrderError::invalid_amount(format!(
            "'{}' is not a decimal number",
            input
        )));
    }

    let decimals = decimals.min(MAX_DECIMALS) as usize;
    let keep = (precision as usize).min(decimals).min(frac_part.len());

    let mut digits = String::with_capacity(int_part.len() + decimals);
    digits.push_str(int_part);
    digits.push_str(&frac_part[..keep]);
    digits.extend(std::iter::repeat('0').take(decimals - keep));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10).map_err(|_| {
        OrderError::invalid_amount(format!("{} exceeds the 256-bit range", input))
    })
}
