//! One-sided Mann-Whitney U test
//!
//! Tests whether the values of sample `x` are stochastically greater than
//! the values of sample `y`.
//!
//! The p-value is calculated from the exact distribution of U when
//! one of the samples has at most [`EXACT_MAX_SIZE`] values and there
//! are no ties. Otherwise the normal approximation with tie and continuity
//! correction is used.
//!
//! # Examples
//!
//! ```
//! use drugsets::stats::mannwhitney::greater;
//!
//! let x = [3.0, 2.0];
//! let y = [0.3];
//!
//! let result = greater(&x, &y).unwrap();
//! assert_eq!(result.statistic(), 2.0);
//! assert!((result.pvalue() - 1.0 / 3.0).abs() < 1e-12);
//! ```
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::trace;

use crate::f64_from_usize;
use crate::stats::rank;
use crate::{DrugsetError, DrugsetResult};

/// Largest sample size for which the exact distribution is used
pub const EXACT_MAX_SIZE: usize = 8;

/// Method used to calculate the p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Exact,
    Asymptotic,
}

/// The result of a Mann-Whitney U test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitney {
    statistic: f64,
    pvalue: f64,
    method: Method,
}

impl MannWhitney {
    /// The U statistic of sample `x`
    pub fn statistic(&self) -> f64 {
        self.statistic
    }

    /// The one-sided p-value
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// How the p-value was calculated
    pub fn method(&self) -> Method {
        self.method
    }
}

/// Tests if the values in `x` are stochastically greater than the values in `y`
///
/// # Errors
///
/// [`DrugsetError::InvalidInput`] if one of the samples is empty or contains `NaN`
pub fn greater(x: &[f64], y: &[f64]) -> DrugsetResult<MannWhitney> {
    if x.is_empty() || y.is_empty() {
        return Err(DrugsetError::InvalidInput(
            "Mann-Whitney U test requires two non-empty samples".to_string(),
        ));
    }
    if x.iter().chain(y.iter()).any(|v| v.is_nan()) {
        return Err(DrugsetError::InvalidInput(
            "Mann-Whitney U test is undefined for NaN values".to_string(),
        ));
    }

    let n1 = x.len();
    let n2 = y.len();
    let combined: Vec<f64> = x.iter().chain(y.iter()).copied().collect();
    let (ranks, ties) = rank(&combined);

    let rank_sum: f64 = ranks[..n1].iter().sum();
    let n1f = f64_from_usize(n1);
    let statistic = rank_sum - n1f * (n1f + 1.0) / 2.0;

    let method = if n1.min(n2) <= EXACT_MAX_SIZE && ties.is_empty() {
        Method::Exact
    } else {
        Method::Asymptotic
    };

    let pvalue = match method {
        Method::Exact => exact_sf(statistic, n1, n2),
        Method::Asymptotic => asymptotic_sf(statistic, n1, n2, &ties),
    };
    trace!("n1: {n1}, n2: {n2}, U: {statistic}, p: {pvalue} ({method:?})");

    Ok(MannWhitney {
        statistic,
        pvalue: pvalue.clamp(0.0, 1.0),
        method,
    })
}

/// Returns the number of arrangements of the two samples for every value of U
///
/// The counts are the coefficients of the Gaussian binomial coefficient
///
/// ```text
/// [n1 + n2 choose m]_q = prod_{i=1..m} (1 - q^(n + i)) / (1 - q^i)
/// ```
///
/// with `m = min(n1, n2)` and `n = max(n1, n2)`. The distribution of U
/// is the same for both samples.
fn exact_counts(n1: usize, n2: usize) -> Vec<i128> {
    let m = n1.min(n2);
    let n = n1.max(n2);
    let mut poly: Vec<i128> = vec![1];
    for i in 1..=m {
        // multiply by (1 - q^(n + i))
        let shift = n + i;
        let mut next = vec![0i128; poly.len() + shift];
        for (k, coef) in poly.iter().enumerate() {
            next[k] += coef;
            next[k + shift] -= coef;
        }
        // divide by (1 - q^i)
        for k in i..next.len() {
            next[k] += next[k - i];
        }
        next.truncate(i * n + 1);
        poly = next;
    }
    poly
}

/// Probability of a U statistic of at least `statistic`
fn exact_sf(statistic: f64, n1: usize, n2: usize) -> f64 {
    let counts = exact_counts(n1, n2);
    // without ties, U is always a whole number
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let k = statistic.round() as usize;
    let total: i128 = counts.iter().sum();
    let upper: i128 = counts.iter().skip(k).sum();
    #[allow(clippy::cast_precision_loss)]
    let pvalue = upper as f64 / total as f64;
    pvalue
}

/// Normal approximation of the upper tail of U
fn asymptotic_sf(statistic: f64, n1: usize, n2: usize, ties: &[usize]) -> f64 {
    let n1 = f64_from_usize(n1);
    let n2 = f64_from_usize(n2);
    let n = n1 + n2;

    let mu = n1 * n2 / 2.0;
    let tie_term: f64 = ties
        .iter()
        .map(|t| {
            let t = f64_from_usize(*t);
            t * t * t - t
        })
        .sum();
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        // all values are identical
        return 1.0;
    }

    // continuity correction
    let z = (statistic - mu - 0.5) / variance.sqrt();
    let normal = Normal::new(0.0, 1.0).expect("standard normal distribution is valid");
    normal.sf(z)
}
