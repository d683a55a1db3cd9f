//! Problem definition and solving API.
//!
//! The `Problem` struct represents an optimization problem with:
//! - An objective (minimize or maximize)
//! - A set of constraints
//!
//! Use the builder pattern to construct problems:
//! ```
//! use cvxfolio::prelude::*;
//!
//! let w = variable(2);
//! let mu = constant_vec(vec![0.01, 0.02]);
//! let solution = Problem::maximize(dot(&mu, &w))
//!     .subject_to([sum(&w).equals(1.0), w.geq(0.0)])
//!     .solve()?;
//!
//! assert_eq!(solution.status, SolveStatus::Optimal);
//! # Ok::<(), cvxfolio::FolioError>(())
//! ```
//!
//! Solving returns `Ok` for every solver outcome; check
//! [`Solution::status`](crate::solver::Solution) before reading values.

use std::sync::Arc;

use tracing::debug;

use crate::canon::{canonicalize, ConeConstraint, LinExpr};
use crate::constraints::Constraint;
use crate::error::{FolioError, Result};
use crate::expr::{Expr, ExprId, Shape, VariableData};
use crate::solver::{solve, stuff_problem, Settings, Solution};

/// Objective type for optimization problems.
#[derive(Debug, Clone)]
pub enum Objective {
    /// Minimize the expression.
    Minimize(Expr),
    /// Maximize the expression (internally converted to minimization).
    Maximize(Expr),
}

impl Objective {
    /// Get the expression being optimized.
    pub fn expr(&self) -> &Expr {
        match self {
            Objective::Minimize(e) | Objective::Maximize(e) => e,
        }
    }
}

/// An optimization problem.
#[derive(Debug, Clone)]
pub struct Problem {
    /// The objective to optimize.
    pub objective: Objective,
    /// The constraints.
    pub constraints: Vec<Constraint>,
}

impl Problem {
    /// Create a minimization problem.
    pub fn minimize(expr: impl Into<Expr>) -> ProblemBuilder {
        ProblemBuilder {
            objective: Objective::Minimize(expr.into()),
            constraints: Vec::new(),
        }
    }

    /// Create a maximization problem.
    pub fn maximize(expr: impl Into<Expr>) -> ProblemBuilder {
        ProblemBuilder {
            objective: Objective::Maximize(expr.into()),
            constraints: Vec::new(),
        }
    }

    /// Check if this problem is DCP-compliant.
    ///
    /// A problem is DCP if:
    /// - Minimize: objective is convex
    /// - Maximize: objective is concave
    /// - All constraints are DCP
    pub fn is_dcp(&self) -> bool {
        let obj_valid = match &self.objective {
            Objective::Minimize(e) => e.is_convex(),
            Objective::Maximize(e) => e.is_concave(),
        };

        obj_valid && self.constraints.iter().all(|c| c.is_dcp())
    }

    /// Get all variable IDs in this problem.
    pub fn variables(&self) -> Vec<ExprId> {
        self.variable_data().into_iter().map(|v| v.id).collect()
    }

    fn variable_data(&self) -> Vec<VariableData> {
        let mut vars = self.objective.expr().variable_data();
        for c in &self.constraints {
            vars.extend(c.expr().variable_data());
        }
        vars.sort_by_key(|v| v.id);
        vars.dedup_by_key(|v| v.id);
        vars
    }

    /// Solve the problem with default settings.
    pub fn solve(&self) -> Result<Solution> {
        self.solve_with(Settings::default())
    }

    /// Solve the problem with custom settings.
    ///
    /// # Errors
    ///
    /// Returns `NotDcp` for a non-convex formulation and `InvalidProblem` or
    /// `ShapeMismatch` when the expressions cannot be put in cone form.
    /// Infeasible and unbounded problems are reported through the returned
    /// status.
    pub fn solve_with(&self, settings: Settings) -> Result<Solution> {
        if !self.is_dcp() {
            return Err(FolioError::NotDcp(self.dcp_violation_message()));
        }

        let (obj_expr, negate_result) = match &self.objective {
            Objective::Minimize(e) => (e.clone(), false),
            Objective::Maximize(e) => (Expr::Neg(Arc::new(e.clone())), true),
        };

        let obj_canon = canonicalize(&obj_expr, true)?;
        let obj_quad = obj_canon.expr.into_quadratic()?;

        let user_vars = self.variable_data();
        let mut all_vars: Vec<(ExprId, Shape)> =
            user_vars.iter().map(|v| (v.id, v.shape.clone())).collect();
        all_vars.extend(obj_canon.aux_vars);

        let mut cones: Vec<ConeConstraint> = obj_canon.constraints;
        for constraint in &self.constraints {
            let (canon, aux) = canonicalize_constraint(constraint)?;
            cones.extend(canon);
            all_vars.extend(aux);
        }

        // Sign-restricted variables
        for v in user_vars.iter().filter(|v| v.nonneg) {
            cones.push(ConeConstraint::NonNeg {
                a: LinExpr::variable(v.id, v.shape.clone()),
            });
        }

        let stuffed = stuff_problem(&obj_quad, &cones, &all_vars);
        debug!(
            variables = stuffed.var_map.total_vars,
            constraints = stuffed.cone_dims.total(),
            "problem stuffed"
        );

        let mut solution = solve(&stuffed, &settings)?;
        if negate_result {
            solution.value = solution.value.map(|v| -v);
        }
        Ok(solution)
    }

    /// Get a message describing why the problem is not DCP.
    fn dcp_violation_message(&self) -> String {
        let mut violations = Vec::new();

        match &self.objective {
            Objective::Minimize(e) if !e.is_convex() => {
                violations.push(format!(
                    "Objective has curvature {:?} but must be convex for minimization",
                    e.curvature()
                ));
            }
            Objective::Maximize(e) if !e.is_concave() => {
                violations.push(format!(
                    "Objective has curvature {:?} but must be concave for maximization",
                    e.curvature()
                ));
            }
            _ => {}
        }

        for (i, c) in self.constraints.iter().enumerate() {
            if !c.is_dcp() {
                violations.push(format!("Constraint {} is not DCP", i));
            }
        }

        if violations.is_empty() {
            "Unknown DCP violation".into()
        } else {
            violations.join("; ")
        }
    }
}

/// Builder for constructing problems.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    objective: Objective,
    constraints: Vec<Constraint>,
}

impl ProblemBuilder {
    /// Add constraints to the problem.
    pub fn subject_to(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Add a single constraint.
    pub fn constraint(mut self, c: Constraint) -> Self {
        self.constraints.push(c);
        self
    }

    /// Build the problem.
    pub fn build(self) -> Problem {
        Problem {
            objective: self.objective,
            constraints: self.constraints,
        }
    }

    /// Build and solve the problem with default settings.
    pub fn solve(self) -> Result<Solution> {
        self.build().solve()
    }

    /// Build and solve the problem with custom settings.
    pub fn solve_with(self, settings: Settings) -> Result<Solution> {
        self.build().solve_with(settings)
    }
}

/// Canonicalize a user constraint into cone constraints and the auxiliary
/// variables they introduce.
fn canonicalize_constraint(
    constraint: &Constraint,
) -> Result<(Vec<ConeConstraint>, Vec<(ExprId, Shape)>)> {
    let canon = canonicalize(constraint.expr(), false)?;
    let a = canon.expr.into_linear()?;
    let mut result = vec![match constraint {
        Constraint::Zero(_) => ConeConstraint::Zero { a },
        Constraint::NonNeg(_) => ConeConstraint::NonNeg { a },
    }];
    result.extend(canon.constraints);
    Ok((result, canon.aux_vars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::{dot, quad_form, sum, sum_largest, sum_smallest};
    use crate::constraints::ConstraintExt;
    use crate::expr::{constant_dmatrix, constant_vec, nonneg_variable, variable};
    use crate::solver::SolveStatus;
    use nalgebra::DMatrix;

    #[test]
    fn test_problem_builder() {
        let x = variable(5);
        let problem = Problem::minimize(sum(&x)).build();
        assert!(problem.is_dcp());
        assert_eq!(problem.variables().len(), 1);
    }

    #[test]
    fn test_maximize_convex_not_dcp() {
        let x = variable(3);
        let problem = Problem::maximize(sum_largest(&x, 2)).build();
        assert!(!problem.is_dcp());
    }

    #[test]
    fn test_minimize_concave_not_dcp() {
        let x = variable(3);
        let problem = Problem::minimize(sum_smallest(&x, 2)).build();
        assert!(!problem.is_dcp());
        let err = problem.solve().unwrap_err();
        assert!(matches!(err, FolioError::NotDcp(_)));
    }

    #[test]
    fn test_downside_constraint_is_dcp() {
        let w = variable(2);
        let r = constant_dmatrix(DMatrix::from_row_slice(2, 2, &[0.01, -0.02, 0.02, 0.01]));
        let floor = (sum_smallest(&crate::atoms::matmul(&r, &w), 1) / 1.0).geq(-0.01);
        let problem = Problem::maximize(sum(&w)).subject_to([floor]).build();
        assert!(problem.is_dcp());
    }

    #[test]
    fn test_solve_simple_lp() {
        // Minimize sum(x) subject to x >= 1
        let x = variable(5);
        let result = Problem::minimize(sum(&x))
            .subject_to([x.geq(1.0)])
            .solve()
            .unwrap();

        assert_eq!(result.status, SolveStatus::Optimal);
        let value = result.value.unwrap();
        assert!((value - 5.0).abs() < 1e-4, "Expected ~5.0, got {}", value);
    }

    #[test]
    fn test_nonneg_variable_is_enforced() {
        // Without the sign restriction this would be unbounded
        let x = nonneg_variable(2);
        let result = Problem::minimize(sum(&x)).solve().unwrap();
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!(result.value.unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_maximize_flips_value() {
        let w = variable(2);
        let mu = constant_vec(vec![0.01, 0.03]);
        let result = Problem::maximize(dot(&mu, &w))
            .subject_to([sum(&w).equals(1.0), w.geq(0.0)])
            .solve()
            .unwrap();

        assert!((result.value.unwrap() - 0.03).abs() < 1e-6);
        let weights = result.vector(&w).unwrap();
        assert!((weights[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_quadratic_objective() {
        // Minimize x'x subject to sum(x) = 2 -> x = [1, 1], value 2
        let x = variable(2);
        let eye = constant_dmatrix(DMatrix::identity(2, 2));
        let result = Problem::minimize(quad_form(&x, &eye))
            .subject_to([sum(&x).equals(2.0)])
            .solve()
            .unwrap();

        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.value.unwrap() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_infeasible_is_not_an_error() {
        let x = variable(1);
        let result = Problem::minimize(sum(&x))
            .subject_to([x.geq(1.0), x.leq(0.0)])
            .solve()
            .unwrap();

        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.value.is_none());
        assert!(result.primal.is_none());
    }
}
