//! Constraint types for optimization problems.
//!
//! Constraints map to cone constraints in the solver:
//! - Zero: Ax + b = 0 (zero cone / equality)
//! - NonNeg: Ax + b >= 0 (nonnegative orthant)

use std::sync::Arc;

use crate::expr::{Expr, ExprId};

/// A constraint in an optimization problem.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Equality constraint: expr == 0.
    /// Maps to the zero cone.
    Zero(Arc<Expr>),

    /// Inequality constraint: expr >= 0.
    /// Maps to the nonnegative orthant cone.
    NonNeg(Arc<Expr>),
}

impl Constraint {
    /// Create an equality constraint: lhs == rhs.
    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Constraint::Zero(Arc::new(lhs - rhs))
    }

    /// Create an inequality constraint: lhs <= rhs.
    pub fn leq(lhs: Expr, rhs: Expr) -> Self {
        // lhs <= rhs  <=>  rhs - lhs >= 0
        Constraint::NonNeg(Arc::new(rhs - lhs))
    }

    /// Create an inequality constraint: lhs >= rhs.
    pub fn geq(lhs: Expr, rhs: Expr) -> Self {
        Constraint::NonNeg(Arc::new(lhs - rhs))
    }

    /// Check if this constraint is DCP-compliant.
    ///
    /// DCP rules for constraints:
    /// - Zero: expression must be affine (equality of affine expressions)
    /// - NonNeg: expression must be concave (concave >= 0)
    pub fn is_dcp(&self) -> bool {
        match self {
            Constraint::Zero(expr) => expr.is_affine(),
            Constraint::NonNeg(expr) => expr.is_concave(),
        }
    }

    /// The expression constrained to the cone.
    pub fn expr(&self) -> &Expr {
        match self {
            Constraint::Zero(e) | Constraint::NonNeg(e) => e.as_ref(),
        }
    }

    /// Get all variable IDs in this constraint.
    pub fn variables(&self) -> Vec<ExprId> {
        self.expr().variables()
    }
}

/// Extension trait for creating constraints from expressions.
///
/// The right-hand side may be another expression or a plain `f64`:
///
/// ```
/// use cvxfolio::prelude::*;
///
/// let w = variable(3);
/// let budget = sum(&w).equals(1.0);
/// let long_only = w.geq(0.0);
/// assert!(budget.is_dcp() && long_only.is_dcp());
/// ```
pub trait ConstraintExt {
    /// Create equality constraint: self == rhs.
    fn equals(&self, rhs: impl Into<Expr>) -> Constraint;

    /// Create inequality constraint: self <= rhs.
    fn leq(&self, rhs: impl Into<Expr>) -> Constraint;

    /// Create inequality constraint: self >= rhs.
    fn geq(&self, rhs: impl Into<Expr>) -> Constraint;
}

impl ConstraintExt for Expr {
    fn equals(&self, rhs: impl Into<Expr>) -> Constraint {
        Constraint::eq(self.clone(), rhs.into())
    }

    fn leq(&self, rhs: impl Into<Expr>) -> Constraint {
        Constraint::leq(self.clone(), rhs.into())
    }

    fn geq(&self, rhs: impl Into<Expr>) -> Constraint {
        Constraint::geq(self.clone(), rhs.into())
    }
}
