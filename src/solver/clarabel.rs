//! Clarabel solver integration.
//!
//! This module provides the interface to the Clarabel conic solver.

use std::collections::HashMap;

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stuffing::{ConeDims, StuffedProblem, VariableMap};
use crate::error::{FolioError, Result};
use crate::expr::{Array, Expr, ExprId};

/// Solution status from the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Solution found to reduced accuracy.
    OptimalInaccurate,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Iteration or time limit reached.
    MaxIterations,
    /// Numerical difficulties.
    NumericalError,
    /// Unknown status.
    Unknown,
}

impl SolveStatus {
    /// A primal solution is available.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::OptimalInaccurate)
    }
}

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::AlmostSolved => SolveStatus::OptimalInaccurate,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            SolverStatus::MaxIterations | SolverStatus::MaxTime => SolveStatus::MaxIterations,
            SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
                SolveStatus::NumericalError
            }
            _ => SolveStatus::Unknown,
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Wall-clock limit in seconds; `None` means no limit.
    pub time_limit: Option<f64>,
    /// Absolute tolerance.
    pub tol_gap_abs: f64,
    /// Relative tolerance.
    pub tol_gap_rel: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 100,
            time_limit: None,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

/// Solution from the solver.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status.
    pub status: SolveStatus,
    /// Optimal value (if solved).
    pub value: Option<f64>,
    /// Primal variable values (if solved).
    pub primal: Option<HashMap<ExprId, Array>>,
    /// Solve time in seconds.
    pub solve_time: f64,
    /// Number of iterations.
    pub iterations: u32,
}

impl Solution {
    /// Get the value of a variable.
    pub fn get_value(&self, var_id: ExprId) -> Option<&Array> {
        self.primal.as_ref().and_then(|p| p.get(&var_id))
    }

    /// Get scalar value for a variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression is not a variable, the variable is
    /// not in the solution, or the variable is not scalar.
    pub fn try_value(&self, var: &Expr) -> Result<f64> {
        self.lookup(var)?.as_scalar().ok_or_else(|| {
            FolioError::InvalidProblem("variable is not scalar; use `vector()`".into())
        })
    }

    /// Get the values of a variable flattened in column-major order.
    pub fn vector(&self, var: &Expr) -> Result<Vec<f64>> {
        Ok(self.lookup(var)?.to_vec())
    }

    /// Evaluate any expression at the solution.
    ///
    /// ```
    /// use cvxfolio::prelude::*;
    ///
    /// let w = variable(2);
    /// let solution = Problem::maximize(dot(&constant_vec(vec![1.0, 2.0]), &w))
    ///     .subject_to([sum(&w).equals(1.0), w.geq(0.0)])
    ///     .solve()
    ///     .unwrap();
    ///
    /// let spread = solution.eval(&(&w * 2.0)).unwrap();
    /// assert!((spread[(1, 0)] - 2.0).abs() < 1e-4);
    /// ```
    pub fn eval(&self, expr: &Expr) -> Result<DMatrix<f64>> {
        let primal = self
            .primal
            .as_ref()
            .ok_or_else(|| FolioError::InvalidProblem("no primal solution available".into()))?;
        expr.evaluate(primal)
    }

    fn lookup(&self, var: &Expr) -> Result<&Array> {
        let var_id = var
            .variable_id()
            .ok_or_else(|| FolioError::InvalidProblem("expression is not a variable".into()))?;
        self.get_value(var_id)
            .ok_or_else(|| FolioError::InvalidProblem("variable not in solution".into()))
    }
}

/// Solve the stuffed problem using Clarabel.
pub fn solve(problem: &StuffedProblem, settings: &Settings) -> Result<Solution> {
    let p = to_clarabel_csc(&problem.p);
    let a = to_clarabel_csc(&problem.a);
    let cones = to_clarabel_cones(&problem.cone_dims);

    let clarabel_settings = DefaultSettingsBuilder::default()
        .verbose(settings.verbose)
        .max_iter(settings.max_iter)
        .time_limit(settings.time_limit.unwrap_or(f64::INFINITY))
        .tol_gap_abs(settings.tol_gap_abs)
        .tol_gap_rel(settings.tol_gap_rel)
        .build()
        .map_err(|e| FolioError::SolverError(e.to_string()))?;

    debug!(
        variables = problem.var_map.total_vars,
        zero_rows = problem.cone_dims.zero,
        nonneg_rows = problem.cone_dims.nonneg,
        p_nnz = problem.p.nnz(),
        a_nnz = problem.a.nnz(),
        "calling clarabel"
    );

    let mut solver = DefaultSolver::new(&p, &problem.q, &a, &problem.b, &cones, clarabel_settings);
    solver.solve();

    let status: SolveStatus = solver.solution.status.into();
    let solve_time = solver.solution.solve_time;
    let iterations = solver.info.iterations;
    debug!(?status, iterations, solve_time, "clarabel finished");

    if status.has_solution() {
        let primal = unpack_primal(&solver.solution.x, &problem.var_map);
        let value = compute_objective(&solver.solution.x, &problem.p, &problem.q)
            + problem.objective_offset;

        Ok(Solution {
            status,
            value: Some(value),
            primal: Some(primal),
            solve_time,
            iterations,
        })
    } else {
        Ok(Solution {
            status,
            value: None,
            primal: None,
            solve_time,
            iterations,
        })
    }
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Convert cone dimensions to Clarabel cones.
fn to_clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::new();
    if dims.zero > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.zero));
    }
    if dims.nonneg > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.nonneg));
    }
    cones
}

/// Unpack primal solution into variable values.
fn unpack_primal(x: &[f64], var_map: &VariableMap) -> HashMap<ExprId, Array> {
    var_map
        .id_to_col
        .iter()
        .map(|(&var_id, &(start, size))| {
            let values = &x[start..start + size];
            let arr = if size == 1 {
                Array::Scalar(values[0])
            } else {
                Array::from_vec(values.to_vec())
            };
            (var_id, arr)
        })
        .collect()
}

/// Compute objective value: (1/2) x' P x + q' x.
fn compute_objective(x: &[f64], p: &nalgebra_sparse::CscMatrix<f64>, q: &[f64]) -> f64 {
    let linear: f64 = q.iter().zip(x.iter()).map(|(qi, xi)| qi * xi).sum();

    // P holds the upper triangle only
    let mut quadratic = 0.0;
    for (row, col, val) in p.triplet_iter() {
        if row == col {
            quadratic += 0.5 * *val * x[row] * x[col];
        } else {
            quadratic += *val * x[row] * x[col];
        }
    }

    linear + quadratic
}
