//! Post-solve diagnostics on realized returns.
//!
//! Nothing here feeds back into the optimization; it exists to check a
//! reported weight vector against the downside floor it was solved under.

use serde::{Deserialize, Serialize};

use super::constraints::sample_count;
use super::returns::ReturnMatrix;
use crate::error::{FolioError, Result};

/// Realized tail statistics of a weight vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailReport {
    pub percentile: f64,
    /// `k = round(T * percentile)`.
    pub sample_count: usize,
    /// Mean of the `k` worst realized returns.
    pub worst_mean: f64,
    /// Linearly interpolated `percentile` quantile of realized returns.
    pub percentile_threshold: f64,
    /// Mean of realized returns at or below the threshold.
    pub below_threshold_mean: f64,
}

/// Mean of the `k` smallest values. Ties keep their original order.
pub fn worst_k_mean(values: &[f64], k: usize) -> Result<f64> {
    if k == 0 || k > values.len() {
        return Err(FolioError::invalid_parameter(
            "k",
            format!("{} is outside 1..={}", k, values.len()),
        ));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted[..k].iter().sum::<f64>() / k as f64)
}

/// Quantile `q` in `[0, 1]` with linear interpolation between order
/// statistics.
pub fn percentile_linear(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(FolioError::DataShape("no values".into()));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(FolioError::invalid_parameter(
            "percentile",
            format!("{} is outside [0, 1]", q),
        ));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Realized tail statistics of `weights` over the return history.
pub fn tail_report(returns: &ReturnMatrix, weights: &[f64], percentile: f64) -> Result<TailReport> {
    let k = sample_count(returns.n_periods(), percentile)?;
    let realized = returns.portfolio_returns(weights)?;

    let threshold = percentile_linear(&realized, percentile)?;
    let below: Vec<f64> = realized.iter().copied().filter(|r| *r <= threshold).collect();
    let below_threshold_mean = below.iter().sum::<f64>() / below.len() as f64;

    Ok(TailReport {
        percentile,
        sample_count: k,
        worst_mean: worst_k_mean(&realized, k)?,
        percentile_threshold: threshold,
        below_threshold_mean,
    })
}
