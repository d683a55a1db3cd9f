//! Solve orchestration: assemble, solve, extract and round.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::objective::{ObjectiveTerms, Strategy};
use super::returns::ReturnMatrix;
use crate::constraints::Constraint;
use crate::error::Result;
use crate::problem::Problem;
use crate::solver::{Settings, SolveStatus};

/// Outcome of a portfolio solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortfolioStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// Iteration limit, numerical failure or an unrecognized solver status.
    SolverError,
}

impl From<SolveStatus> for PortfolioStatus {
    fn from(status: SolveStatus) -> Self {
        match status {
            SolveStatus::Optimal | SolveStatus::OptimalInaccurate => PortfolioStatus::Optimal,
            SolveStatus::Infeasible => PortfolioStatus::Infeasible,
            SolveStatus::Unbounded => PortfolioStatus::Unbounded,
            SolveStatus::MaxIterations | SolveStatus::NumericalError | SolveStatus::Unknown => {
                PortfolioStatus::SolverError
            }
        }
    }
}

/// The result of one solve. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    /// Weights rounded to three decimals; `None` unless optimal.
    pub weights: Option<Vec<f64>>,
    /// Unrounded solver solution; `None` unless optimal.
    pub raw_weights: Option<Vec<f64>>,
    pub status: PortfolioStatus,
    /// Maximized objective value; `None` unless optimal.
    pub objective_value: Option<f64>,
    /// Diagnostics evaluated at the unrounded optimum.
    pub auxiliary: BTreeMap<String, f64>,
}

impl SolveResult {
    fn failed(status: PortfolioStatus) -> Self {
        SolveResult {
            weights: None,
            raw_weights: None,
            status,
            objective_value: None,
            auxiliary: BTreeMap::new(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == PortfolioStatus::Optimal
    }
}

/// Optimize with default solver settings.
pub fn optimize(returns: &ReturnMatrix, strategy: &Strategy) -> Result<SolveResult> {
    optimize_with(returns, strategy, &Settings::default())
}

/// Build the strategy's objective and constraints, then solve.
///
/// Parameter and data errors are returned before the solver runs. Solver
/// failures come back as `Ok` with a non-optimal status.
pub fn optimize_with(
    returns: &ReturnMatrix,
    strategy: &Strategy,
    settings: &Settings,
) -> Result<SolveResult> {
    let terms = strategy.build_objective(returns)?;

    let mut constraints = Vec::new();
    for set in strategy.constraint_sets() {
        constraints.extend(set.build(returns, &terms.weights)?);
    }

    info!(
        strategy = strategy.name(),
        assets = returns.n_assets(),
        periods = returns.n_periods(),
        "optimizing portfolio"
    );
    solve_program(terms, constraints, settings)
}

/// Maximize `terms.objective` subject to `constraints`.
pub fn solve_program(
    terms: ObjectiveTerms,
    constraints: Vec<Constraint>,
    settings: &Settings,
) -> Result<SolveResult> {
    let solution = Problem::maximize(terms.objective)
        .subject_to(constraints)
        .solve_with(settings.clone())?;

    if solution.status == SolveStatus::OptimalInaccurate {
        warn!(
            iterations = solution.iterations,
            "solver reached reduced accuracy only"
        );
    }

    let status = PortfolioStatus::from(solution.status);
    info!(?status, iterations = solution.iterations, "portfolio solve finished");
    if status != PortfolioStatus::Optimal {
        return Ok(SolveResult::failed(status));
    }

    let raw = solution.vector(&terms.weights)?;
    let mut auxiliary = BTreeMap::new();
    for diagnostic in &terms.diagnostics {
        let value = solution.eval(&diagnostic.expr)?;
        auxiliary.insert(diagnostic.name.clone(), (diagnostic.transform)(value[(0, 0)]));
    }

    Ok(SolveResult {
        weights: Some(round_weights(&raw)),
        raw_weights: Some(raw),
        status,
        objective_value: solution.value,
        auxiliary,
    })
}

/// Round to three decimals, ties to even. The sum is not renormalized.
pub fn round_weights(weights: &[f64]) -> Vec<f64> {
    // Adding 0.0 turns -0.0 into 0.0
    weights
        .iter()
        .map(|w| (w * 1000.0).round_ties_even() / 1000.0 + 0.0)
        .collect()
}
