//! Feasible-region builders: budget, no-short and historical downside.

use serde::{Deserialize, Serialize};

use super::returns::ReturnMatrix;
use crate::atoms::{matmul, sum, sum_smallest};
use crate::constraints::{Constraint, ConstraintExt};
use crate::error::{FolioError, Result};
use crate::expr::{constant_dmatrix, Expr};

/// Bound on the average return of the worst fraction of historical periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownsideSpec {
    /// Fraction of periods, in `(0, 1]`, that make up the tail.
    pub percentile: f64,
    /// Lowest acceptable average return over the tail; negative values are
    /// loss floors.
    pub max_loss: f64,
}

impl DownsideSpec {
    pub fn new(percentile: f64, max_loss: f64) -> Result<Self> {
        let spec = DownsideSpec {
            percentile,
            max_loss,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<()> {
        validate_percentile(self.percentile)?;
        if !self.max_loss.is_finite() {
            return Err(FolioError::invalid_parameter("max_loss", "must be finite"));
        }
        Ok(())
    }

    /// Number of tail periods, `round(T * percentile)`.
    pub fn sample_count(&self, n_periods: usize) -> Result<usize> {
        self.validate()?;
        sample_count(n_periods, self.percentile)
    }
}

pub(crate) fn validate_percentile(percentile: f64) -> Result<()> {
    if !(percentile > 0.0 && percentile <= 1.0) {
        return Err(FolioError::invalid_parameter(
            "percentile",
            format!("{} is outside (0, 1]", percentile),
        ));
    }
    Ok(())
}

/// `round(T * percentile)` with ties to even, rejecting an empty tail.
pub(crate) fn sample_count(n_periods: usize, percentile: f64) -> Result<usize> {
    validate_percentile(percentile)?;
    let k = (n_periods as f64 * percentile).round_ties_even() as usize;
    if k == 0 {
        return Err(FolioError::invalid_parameter(
            "percentile",
            format!(
                "{} of {} periods selects no samples",
                percentile, n_periods
            ),
        ));
    }
    Ok(k)
}

/// Average of the `k` worst realized portfolio returns, `sum_smallest(R w, k) / k`.
pub fn average_worst_k(returns: &ReturnMatrix, weights: &Expr, k: usize) -> Expr {
    let r = constant_dmatrix(returns.as_matrix().clone());
    sum_smallest(&matmul(&r, weights), k) / k as f64
}

/// A group of constraints on the weight vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintSet {
    /// Weights sum to one.
    Budget,
    /// Weights are non-negative.
    NoShort,
    /// Average of the worst periods stays above `max_loss`.
    Downside(DownsideSpec),
}

impl ConstraintSet {
    /// Build the constraints over `weights` for this return history.
    pub fn build(&self, returns: &ReturnMatrix, weights: &Expr) -> Result<Vec<Constraint>> {
        let constraints = match self {
            ConstraintSet::Budget => vec![sum(weights).equals(1.0)],
            ConstraintSet::NoShort => vec![weights.geq(0.0)],
            ConstraintSet::Downside(spec) => {
                let k = spec.sample_count(returns.n_periods())?;
                vec![average_worst_k(returns, weights, k).geq(spec.max_loss)]
            }
        };
        Ok(constraints)
    }
}
