// Exact arithmetic over decimal-string token amounts.
//
// Every monetary field in this service is a wei-scale unsigned integer
// carried as a decimal string (uint256 scale, up to 78 digits). All math
// goes through BigUint; floating point only appears in percentage_of,
// after the division has already happened in integer space.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenMathError {
    #[error("Invalid token amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid percentage: {0}")]
    InvalidPercentage(String),
}

/// Parses a decimal-string amount. An empty (or whitespace-only) string is
/// treated as zero; any other non-numeric input is an error.
pub fn parse_amount(value: &str) -> Result<BigUint, TokenMathError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(BigUint::zero());
    }
    trimmed
        .parse::<BigUint>()
        .map_err(|_| TokenMathError::InvalidAmount(value.to_string()))
}

pub fn add(a: &str, b: &str) -> Result<String, TokenMathError> {
    Ok((parse_amount(a)? + parse_amount(b)?).to_string())
}

/// Subtraction clamped at zero: amounts are unsigned, so a result that
/// would go negative is reported as "0" rather than an error.
pub fn subtract(a: &str, b: &str) -> Result<String, TokenMathError> {
    let a = parse_amount(a)?;
    let b = parse_amount(b)?;
    if b >= a {
        Ok("0".to_string())
    } else {
        Ok((a - b).to_string())
    }
}

/// Multiplies an amount by a percentage given as a decimal string
/// (e.g. "2.5" means 2.5%). Internally rational: the percentage is split
/// into integer digits and a power-of-ten scale, and the result truncates
/// toward zero. No floating point is involved.
pub fn multiply_by_fraction(amount: &str, percentage: &str) -> Result<String, TokenMathError> {
    let amount = parse_amount(amount)?;
    let (digits, scale) = parse_percentage(percentage)?;

    let denominator = BigUint::from(100u32) * BigUint::from(10u32).pow(scale);
    if digits.is_zero() {
        return Ok("0".to_string());
    }
    Ok((amount * digits / denominator).to_string())
}

pub fn compare(a: &str, b: &str) -> Result<Ordering, TokenMathError> {
    Ok(parse_amount(a)?.cmp(&parse_amount(b)?))
}

pub fn is_zero(value: &str) -> Result<bool, TokenMathError> {
    Ok(parse_amount(value)?.is_zero())
}

pub fn is_positive(value: &str) -> Result<bool, TokenMathError> {
    Ok(!parse_amount(value)?.is_zero())
}

pub fn sum<'a, I>(values: I) -> Result<String, TokenMathError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total = BigUint::zero();
    for value in values {
        total += parse_amount(value)?;
    }
    Ok(total.to_string())
}

/// Computes `amount * numerator / denominator` exactly, truncating toward
/// zero. A zero denominator yields "0" (pro-rata share of an empty pool).
pub fn mul_div(amount: &str, numerator: &str, denominator: &str) -> Result<String, TokenMathError> {
    let amount = parse_amount(amount)?;
    let numerator = parse_amount(numerator)?;
    let denominator = parse_amount(denominator)?;
    if denominator.is_zero() {
        return Ok("0".to_string());
    }
    Ok((amount * numerator / denominator).to_string())
}

/// Returns `a` as a percentage of `b`. Division by zero is defined as 0.0.
/// The ratio is computed in integer space at four decimal places of
/// precision before the single conversion to f64.
pub fn percentage_of(a: &str, b: &str) -> Result<f64, TokenMathError> {
    let a = parse_amount(a)?;
    let b = parse_amount(b)?;
    if b.is_zero() {
        return Ok(0.0);
    }
    // a / b * 100, scaled by 10^4 so small ratios survive integer division
    let scaled = a * BigUint::from(1_000_000u32) / b;
    Ok(scaled.to_f64().unwrap_or(f64::MAX) / 10_000.0)
}

/// Formats an amount with thousands separators for display ("1234567" ->
/// "1,234,567").
pub fn format(value: &str) -> Result<String, TokenMathError> {
    let digits = parse_amount(value)?.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    Ok(out)
}

/// Splits a decimal percentage string into (digits, scale) where the value
/// equals digits / 10^scale. Rejects negative and non-numeric input.
fn parse_percentage(percentage: &str) -> Result<(BigUint, u32), TokenMathError> {
    let trimmed = percentage.trim();
    if trimmed.is_empty() {
        return Ok((BigUint::zero(), 0));
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(TokenMathError::InvalidPercentage(percentage.to_string()));
    }
    let joined = format!("{}{}", int_part, frac_part);
    let digits = joined
        .parse::<BigUint>()
        .map_err(|_| TokenMathError::InvalidPercentage(percentage.to_string()))?;
    let scale = u32::try_from(frac_part.len())
        .map_err(|_| TokenMathError::InvalidPercentage(percentage.to_string()))?;
    Ok((digits, scale))
}
