//! Affine atoms and operator overloading.
//!
//! Affine atoms are both convex and concave. They include:
//! - Addition, subtraction, negation
//! - Scalar multiplication and division
//! - Sum, transpose, matrix products

use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use crate::expr::{constant, Expr};

// ============================================================================
// Operator overloading for Expr
// ============================================================================

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Arc::new(self))
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Arc::new(self.clone()))
    }
}

/// Implements a binary operator for every owned/borrowed pairing of `Expr`.
macro_rules! expr_binop {
    ($trait:ident, $method:ident, |$a:ident, $b:ident| $body:expr) => {
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                let ($a, $b) = (Arc::new(self), Arc::new(rhs));
                $body
            }
        }

        impl $trait for &Expr {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                let ($a, $b) = (Arc::new(self.clone()), Arc::new(rhs.clone()));
                $body
            }
        }

        impl $trait<&Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                let ($a, $b) = (Arc::new(self), Arc::new(rhs.clone()));
                $body
            }
        }

        impl $trait<Expr> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                let ($a, $b) = (Arc::new(self.clone()), Arc::new(rhs));
                $body
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                let ($a, $b) = (Arc::new(self), Arc::new(constant(rhs)));
                $body
            }
        }

        impl $trait<f64> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                let ($a, $b) = (Arc::new(self.clone()), Arc::new(constant(rhs)));
                $body
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                let ($a, $b) = (Arc::new(constant(self)), Arc::new(rhs));
                $body
            }
        }

        impl $trait<&Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                let ($a, $b) = (Arc::new(constant(self)), Arc::new(rhs.clone()));
                $body
            }
        }
    };
}

expr_binop!(Add, add, |a, b| Expr::Add(a, b));
expr_binop!(Sub, sub, |a, b| Expr::Add(a, Arc::new(Expr::Neg(b))));
expr_binop!(Mul, mul, |a, b| Expr::Mul(a, b));

// Division by scalar
impl Div<f64> for Expr {
    type Output = Expr;

    fn div(self, rhs: f64) -> Expr {
        Expr::Mul(Arc::new(constant(1.0 / rhs)), Arc::new(self))
    }
}

impl Div<f64> for &Expr {
    type Output = Expr;

    fn div(self, rhs: f64) -> Expr {
        Expr::Mul(Arc::new(constant(1.0 / rhs)), Arc::new(self.clone()))
    }
}

// ============================================================================
// Affine atom functions
// ============================================================================

/// Sum of all elements.
pub fn sum(expr: &Expr) -> Expr {
    Expr::Sum(Arc::new(expr.clone()))
}

/// Transpose an expression.
pub fn transpose(expr: &Expr) -> Expr {
    Expr::Transpose(Arc::new(expr.clone()))
}

/// Matrix-vector or matrix-matrix multiplication.
///
/// With a `T x N` return matrix and an `N`-vector of weights this is the
/// per-period portfolio return series.
pub fn matmul(a: &Expr, b: &Expr) -> Expr {
    Expr::MatMul(Arc::new(a.clone()), Arc::new(b.clone()))
}

/// Dot product (inner product) of two vectors, as `a' b`.
pub fn dot(a: &Expr, b: &Expr) -> Expr {
    Expr::MatMul(
        Arc::new(Expr::Transpose(Arc::new(a.clone()))),
        Arc::new(b.clone()),
    )
}
