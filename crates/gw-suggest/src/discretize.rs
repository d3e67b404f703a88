//! Linear sampling of a single parameter's feasible domain.
//!
//! Every sample is a pure function of `(domain, count, index)`, so an axis
//! can be read at any position without building its full value list.

use gw_types::{config_error, GwResult, ParameterDomain};

/// Digits after the decimal point in rendered real values.
pub const REAL_PRECISION: usize = 4;

/// Sample `index` of `count` evenly spaced integers in `[min, max]`, floor
/// rounded.
pub fn integer_at(min: i64, max: i64, count: usize, index: usize) -> i64 {
    if count <= 1 {
        return min;
    }
    // i128 keeps (max - min) * index exact for the full i64 range.
    let span = max as i128 - min as i128;
    (min as i128 + span * index as i128 / (count - 1) as i128) as i64
}

/// Sample `index` of `count` evenly spaced reals in `[min, max]`.
pub fn real_at(min: f64, max: f64, count: usize, index: usize) -> f64 {
    if count <= 1 {
        return min;
    }
    let step = (max - min) / (count - 1) as f64;
    min + step * index as f64
}

/// Position in a list of `len` categories picked by sample `index` of `count`.
pub fn categorical_at(len: usize, count: usize, index: usize) -> usize {
    if count <= 1 || len == 0 {
        return 0;
    }
    ((len - 1) as u128 * index as u128 / (count - 1) as u128) as usize
}

/// Evenly spaced, endpoint-inclusive integers with floor rounding.
///
/// Duplicates appear when the range is narrower than `count - 1`.
pub fn discretize_integer(min: i64, max: i64, count: usize) -> GwResult<Vec<i64>> {
    check_integer(min, max, count)?;
    Ok((0..count).map(|i| integer_at(min, max, count, i)).collect())
}

/// Evenly spaced reals, rendered with [`REAL_PRECISION`] fractional digits.
pub fn discretize_real(min: f64, max: f64, count: usize) -> GwResult<Vec<String>> {
    check_real(min, max, count)?;
    Ok((0..count)
        .map(|i| format_real(real_at(min, max, count, i)))
        .collect())
}

/// Categories picked at evenly spaced indices of `list`.
pub fn discretize_categorical(list: &[String], count: usize) -> GwResult<Vec<String>> {
    check_categorical(list, count)?;
    Ok((0..count)
        .map(|i| list[categorical_at(list.len(), count, i)].clone())
        .collect())
}

/// Discretize any domain into its string values.
pub fn discretize(domain: &ParameterDomain, count: usize) -> GwResult<Vec<String>> {
    check_domain(domain, count)?;
    Ok((0..count).map(|i| sample(domain, count, i)).collect())
}

/// Reject a domain that cannot be sampled `count` times.
pub fn check_domain(domain: &ParameterDomain, count: usize) -> GwResult<()> {
    match domain {
        ParameterDomain::Integer { min, max } => check_integer(*min, *max, count),
        ParameterDomain::Real { min, max } => check_real(*min, *max, count),
        ParameterDomain::Categorical { categories } => check_categorical(categories, count),
    }
}

/// Sample `index` of `count` rendered as a string. The domain must have
/// passed [`check_domain`] for `count`.
pub fn sample(domain: &ParameterDomain, count: usize, index: usize) -> String {
    match domain {
        ParameterDomain::Integer { min, max } => integer_at(*min, *max, count, index).to_string(),
        ParameterDomain::Real { min, max } => format_real(real_at(*min, *max, count, index)),
        ParameterDomain::Categorical { categories } => {
            categories[categorical_at(categories.len(), count, index)].clone()
        }
    }
}

pub fn format_real(value: f64) -> String {
    format!("{:.*}", REAL_PRECISION, value)
}

fn check_integer(min: i64, max: i64, count: usize) -> GwResult<()> {
    check_count(count)?;
    if min > max {
        return Err(config_error!("integer range [{}, {}] is inverted", min, max));
    }
    Ok(())
}

fn check_real(min: f64, max: f64, count: usize) -> GwResult<()> {
    check_count(count)?;
    if min.is_nan() || max.is_nan() || min > max {
        return Err(config_error!("real range [{}, {}] is invalid", min, max));
    }
    Ok(())
}

fn check_categorical(list: &[String], count: usize) -> GwResult<()> {
    check_count(count)?;
    if list.is_empty() {
        return Err(config_error!("categorical list is empty"));
    }
    Ok(())
}

fn check_count(count: usize) -> GwResult<()> {
    if count == 0 {
        return Err(config_error!("resolution must be at least 1, got 0"));
    }
    Ok(())
}
