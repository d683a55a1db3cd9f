//! Allocation strategies and their objective expressions.
//!
//! Every strategy maximizes a concave expression of one weight-vector
//! variable. Named diagnostic expressions ride along and are evaluated at
//! the optimum by the orchestrator.

use serde::{Deserialize, Serialize};

use super::constraints::{average_worst_k, ConstraintSet, DownsideSpec};
use super::returns::ReturnMatrix;
use crate::atoms::{dot, quad_form};
use crate::error::{FolioError, Result};
use crate::expr::{constant_dmatrix, constant_vec, named_variable, Expr};

/// A closed set of allocation policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    /// Maximize expected return `w'mu`.
    SimpleReturn,
    /// Maximize `w'mu - gamma * w'Sigma w`.
    MeanVariance { gamma: f64 },
    /// Maximize `w'alpha` with the worst-period average bounded below.
    ///
    /// Budget and no-short constraints are applied only when `long_only` is
    /// set.
    AlphaDownside {
        alphas: Vec<f64>,
        downside: DownsideSpec,
        #[serde(default)]
        long_only: bool,
    },
}

/// A scalar evaluated at the optimum and reported in
/// [`SolveResult::auxiliary`](super::SolveResult).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub name: String,
    pub expr: Expr,
    /// Applied to the evaluated value.
    pub transform: fn(f64) -> f64,
}

impl Diagnostic {
    fn new(name: &str, expr: Expr) -> Self {
        Diagnostic {
            name: name.to_string(),
            expr,
            transform: |v| v,
        }
    }
}

/// The pieces a strategy contributes to a program.
#[derive(Debug, Clone)]
pub struct ObjectiveTerms {
    /// Expression to maximize.
    pub objective: Expr,
    /// The weight-vector variable.
    pub weights: Expr,
    pub diagnostics: Vec<Diagnostic>,
}

impl Strategy {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::SimpleReturn => "simple_return",
            Strategy::MeanVariance { .. } => "mean_variance",
            Strategy::AlphaDownside { .. } => "alpha_downside",
        }
    }

    /// Constraint groups this strategy is solved under.
    pub fn constraint_sets(&self) -> Vec<ConstraintSet> {
        match self {
            Strategy::SimpleReturn | Strategy::MeanVariance { .. } => {
                vec![ConstraintSet::Budget, ConstraintSet::NoShort]
            }
            Strategy::AlphaDownside {
                downside,
                long_only,
                ..
            } => {
                let mut sets = vec![ConstraintSet::Downside(*downside)];
                if *long_only {
                    sets.push(ConstraintSet::Budget);
                    sets.push(ConstraintSet::NoShort);
                }
                sets
            }
        }
    }

    /// Build the objective over a fresh weight variable.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a negative or non-finite `gamma`, an alpha
    /// vector of the wrong length, or a downside tail with no periods.
    /// `DataShape` when mean-variance is asked for with a single period.
    pub fn build_objective(&self, returns: &ReturnMatrix) -> Result<ObjectiveTerms> {
        let n = returns.n_assets();
        let weights = named_variable("weights", n);

        let terms = match self {
            Strategy::SimpleReturn => {
                let mu = constant_vec(returns.column_means());
                let expected_return = dot(&mu, &weights);
                ObjectiveTerms {
                    objective: expected_return.clone(),
                    weights,
                    diagnostics: vec![Diagnostic::new("expected_return", expected_return)],
                }
            }

            Strategy::MeanVariance { gamma } => {
                if !gamma.is_finite() || *gamma < 0.0 {
                    return Err(FolioError::invalid_parameter(
                        "gamma",
                        format!("risk aversion must be finite and non-negative, got {}", gamma),
                    ));
                }
                let mu = constant_vec(returns.column_means());
                let sigma = constant_dmatrix(returns.covariance()?);
                let expected_return = dot(&mu, &weights);
                let variance = quad_form(&weights, &sigma);

                ObjectiveTerms {
                    objective: &expected_return - &(&variance * *gamma),
                    weights,
                    diagnostics: vec![
                        Diagnostic::new("expected_return", expected_return),
                        Diagnostic::new("expected_variance", variance.clone()),
                        Diagnostic {
                            name: "expected_volatility".to_string(),
                            expr: variance,
                            transform: |v| v.max(0.0).sqrt(),
                        },
                    ],
                }
            }

            Strategy::AlphaDownside {
                alphas, downside, ..
            } => {
                if alphas.len() != n {
                    return Err(FolioError::invalid_parameter(
                        "alphas",
                        format!("{} alphas for {} assets", alphas.len(), n),
                    ));
                }
                if alphas.iter().any(|a| !a.is_finite()) {
                    return Err(FolioError::invalid_parameter("alphas", "must be finite"));
                }
                let k = downside.sample_count(returns.n_periods())?;
                let alpha = constant_vec(alphas.clone());
                let expected_alpha = dot(&alpha, &weights);
                let worst_average = average_worst_k(returns, &weights, k);

                ObjectiveTerms {
                    objective: expected_alpha.clone(),
                    weights,
                    diagnostics: vec![
                        Diagnostic::new("expected_alpha", expected_alpha),
                        Diagnostic::new("worst_average", worst_average),
                    ],
                }
            }
        };

        Ok(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn returns() -> ReturnMatrix {
        ReturnMatrix::from_rows(&[
            vec![0.01, -0.02],
            vec![0.02, 0.01],
            vec![-0.03, 0.04],
            vec![0.00, 0.02],
        ])
        .unwrap()
    }

    #[test]
    fn test_objectives_are_concave() {
        let downside = DownsideSpec::new(0.5, -0.015).unwrap();
        for strategy in [
            Strategy::SimpleReturn,
            Strategy::MeanVariance { gamma: 2.0 },
            Strategy::AlphaDownside {
                alphas: vec![1.0, -1.0],
                downside,
                long_only: false,
            },
        ] {
            let terms = strategy.build_objective(&returns()).unwrap();
            assert!(terms.objective.is_concave(), "{}", strategy.name());
            assert!(terms.weights.is_variable());
        }
    }

    #[test]
    fn test_negative_gamma_rejected() {
        let err = Strategy::MeanVariance { gamma: -0.1 }
            .build_objective(&returns())
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidParameter { ref name, .. } if name == "gamma"));
    }

    #[test]
    fn test_alpha_length_checked() {
        let strategy = Strategy::AlphaDownside {
            alphas: vec![1.0],
            downside: DownsideSpec::new(0.5, -0.015).unwrap(),
            long_only: false,
        };
        assert!(strategy.build_objective(&returns()).is_err());
    }

    #[test]
    fn test_constraint_sets() {
        assert_eq!(Strategy::SimpleReturn.constraint_sets().len(), 2);
        let downside = DownsideSpec::new(0.5, -0.015).unwrap();
        let faithful = Strategy::AlphaDownside {
            alphas: vec![1.0, -1.0],
            downside,
            long_only: false,
        };
        assert_eq!(
            faithful.constraint_sets(),
            vec![ConstraintSet::Downside(downside)]
        );
    }

    #[test]
    fn test_strategy_from_json() {
        let s: Strategy = serde_json::from_str(r#"{"type": "mean_variance", "gamma": 0.3}"#).unwrap();
        assert_eq!(s, Strategy::MeanVariance { gamma: 0.3 });

        let s: Strategy = serde_json::from_str(
            r#"{"type": "alpha_downside", "alphas": [1.0, -1.0],
                "downside": {"percentile": 0.05, "max_loss": -0.05}}"#,
        )
        .unwrap();
        assert!(matches!(s, Strategy::AlphaDownside { long_only: false, .. }));
    }
}
