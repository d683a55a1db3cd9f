//! Nonlinear atoms for convex optimization.
//!
//! These atoms have specific curvature properties (convex or concave)
//! and require DCP composition rules to be applied correctly.

use std::sync::Arc;

use crate::expr::Expr;

/// Quadratic form: x' P x.
///
/// Properties:
/// - Curvature: Convex if P is PSD, concave if P is NSD
/// - Sign: Non-negative if P is PSD
///
/// P must be a constant symmetric matrix.
pub fn quad_form(x: &Expr, p: &Expr) -> Expr {
    Expr::QuadForm(Arc::new(x.clone()), Arc::new(p.clone()))
}

/// Sum of the `k` largest entries of `x`.
///
/// Properties:
/// - Curvature: Convex when x is convex
/// - Sign: Same as x
///
/// `k` must lie in `1..=len(x)`; this is checked when the problem is
/// canonicalized.
pub fn sum_largest(x: &Expr, k: usize) -> Expr {
    Expr::SumLargest(Arc::new(x.clone()), k)
}

/// Sum of the `k` smallest entries of `x`.
///
/// Properties:
/// - Curvature: Concave when x is concave
/// - Sign: Same as x
///
/// Applied to a portfolio return series `R w`, `sum_smallest(R w, k) / k`
/// is the average of the `k` worst periods.
pub fn sum_smallest(x: &Expr, k: usize) -> Expr {
    Expr::SumSmallest(Arc::new(x.clone()), k)
}
