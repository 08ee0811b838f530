use anyhow::{bail, Result};

// --- Arithmetic ---
// Each operator receives the already-computed child values in order.

pub fn sum(values: &[f64]) -> Result<f64> {
    Ok(values.iter().sum())
}

/// First operand minus every following operand.
pub fn difference(values: &[f64]) -> Result<f64> {
    match values.split_first() {
        Some((first, rest)) => Ok(rest.iter().fold(*first, |acc, v| acc - v)),
        None => bail!("difference needs at least one operand"),
    }
}

pub fn product(values: &[f64]) -> Result<f64> {
    Ok(values.iter().product())
}

/// Koza's protected division: a zero divisor yields 1 instead of a fault.
pub fn protected_quotient(values: &[f64]) -> Result<f64> {
    match values.split_first() {
        Some((first, rest)) => Ok(rest.iter().fold(*first, |acc, divisor| {
            if *divisor == 0.0 {
                1.0
            } else {
                acc / divisor
            }
        })),
        None => bail!("quotient needs at least one operand"),
    }
}

pub fn negate(values: &[f64]) -> Result<f64> {
    match values {
        [value] => Ok(-value),
        _ => bail!("negate takes exactly one operand, got {}", values.len()),
    }
}
