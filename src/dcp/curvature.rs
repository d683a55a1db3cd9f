//! Curvature tracking for DCP (Disciplined Convex Programming).
//!
//! This module implements the curvature rules that determine whether an
//! expression is convex, concave, affine, or unknown.

use crate::expr::{Array, Expr};

/// Curvature of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curvature {
    /// Constant value (most restrictive).
    Constant,
    /// Affine function (both convex and concave).
    Affine,
    /// Convex function.
    Convex,
    /// Concave function.
    Concave,
    /// Unknown curvature (not DCP-compliant).
    Unknown,
}

impl Curvature {
    /// Check if the curvature is convex (constant, affine, or convex).
    pub fn is_convex(self) -> bool {
        matches!(self, Curvature::Constant | Curvature::Affine | Curvature::Convex)
    }

    /// Check if the curvature is concave (constant, affine, or concave).
    pub fn is_concave(self) -> bool {
        matches!(self, Curvature::Constant | Curvature::Affine | Curvature::Concave)
    }

    /// Check if the curvature is affine (constant or affine).
    pub fn is_affine(self) -> bool {
        matches!(self, Curvature::Constant | Curvature::Affine)
    }

    /// Check if this is a constant.
    pub fn is_constant(self) -> bool {
        matches!(self, Curvature::Constant)
    }

    /// Negate the curvature (convex <-> concave).
    pub fn negate(self) -> Self {
        match self {
            Curvature::Convex => Curvature::Concave,
            Curvature::Concave => Curvature::Convex,
            other => other,
        }
    }
}

/// Combine curvatures for addition: a + b.
pub fn add_curvature(a: Curvature, b: Curvature) -> Curvature {
    use Curvature::*;
    match (a, b) {
        (Constant, x) | (x, Constant) => x,
        (Affine, Affine) => Affine,
        (Affine, x) | (x, Affine) => x,
        (Convex, Convex) => Convex,
        (Concave, Concave) => Concave,
        (Convex, Concave) | (Concave, Convex) => Unknown,
        (Unknown, _) | (_, Unknown) => Unknown,
    }
}

/// Combine curvatures for scalar multiplication: scalar * expr.
///
/// If scalar > 0: preserves curvature
/// If scalar < 0: negates curvature
/// If scalar == 0: constant
pub fn scalar_mul_curvature(scalar: f64, expr_curv: Curvature) -> Curvature {
    if scalar == 0.0 {
        Curvature::Constant
    } else if scalar > 0.0 {
        expr_curv
    } else {
        expr_curv.negate()
    }
}

/// Determine if a matrix is PSD, NSD, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsdStatus {
    Psd,
    Nsd,
    Neither,
}

impl PsdStatus {
    /// Determine PSD status of an array.
    pub fn of_array(arr: &Array) -> Self {
        match arr.is_psd() {
            Some(true) => PsdStatus::Psd,
            Some(false) => {
                let negated = match arr {
                    Array::Scalar(v) => Array::Scalar(-v),
                    Array::Dense(m) => Array::Dense(-m.clone()),
                };
                if negated.is_psd() == Some(true) {
                    PsdStatus::Nsd
                } else {
                    PsdStatus::Neither
                }
            }
            None => PsdStatus::Neither,
        }
    }
}

impl Expr {
    /// Get the curvature of this expression.
    pub fn curvature(&self) -> Curvature {
        match self {
            // Leaves
            Expr::Variable(_) => Curvature::Affine,
            Expr::Constant(_) => Curvature::Constant,

            // Affine operations preserve/combine curvatures
            Expr::Add(a, b) => add_curvature(a.curvature(), b.curvature()),
            Expr::Neg(a) => a.curvature().negate(),
            Expr::Mul(a, b) => mul_curvature(a, b),
            Expr::MatMul(a, b) => matmul_curvature(a, b),
            Expr::Sum(a) => a.curvature(),
            Expr::Transpose(a) => a.curvature(),

            Expr::QuadForm(x, p) => {
                // x'Px: convex if P is PSD and x is affine
                //       concave if P is NSD and x is affine
                if !x.curvature().is_affine() {
                    return Curvature::Unknown;
                }
                match p.constant_value().map(PsdStatus::of_array) {
                    Some(PsdStatus::Psd) => Curvature::Convex,
                    Some(PsdStatus::Nsd) => Curvature::Concave,
                    _ => Curvature::Unknown,
                }
            }
            // Sum of the k largest entries is a pointwise maximum of sums
            Expr::SumLargest(x, _) => match x.curvature() {
                Curvature::Constant => Curvature::Constant,
                c if c.is_convex() => Curvature::Convex,
                _ => Curvature::Unknown,
            },
            Expr::SumSmallest(x, _) => match x.curvature() {
                Curvature::Constant => Curvature::Constant,
                c if c.is_concave() => Curvature::Concave,
                _ => Curvature::Unknown,
            },
        }
    }

    /// Check if this expression is convex.
    pub fn is_convex(&self) -> bool {
        self.curvature().is_convex()
    }

    /// Check if this expression is concave.
    pub fn is_concave(&self) -> bool {
        self.curvature().is_concave()
    }

    /// Check if this expression is affine.
    pub fn is_affine(&self) -> bool {
        self.curvature().is_affine()
    }
}

/// Handle multiplication curvature.
fn mul_curvature(a: &Expr, b: &Expr) -> Curvature {
    let ac = a.curvature();
    let bc = b.curvature();

    if ac.is_constant() && bc.is_constant() {
        return Curvature::Constant;
    }

    let (constant, other) = if ac.is_constant() {
        (a, bc)
    } else if bc.is_constant() {
        (b, ac)
    } else {
        // affine * affine is quadratic
        return Curvature::Unknown;
    };

    if let Some(scalar) = constant.constant_value().and_then(Array::as_scalar) {
        return scalar_mul_curvature(scalar, other);
    }
    // Elementwise scaling by a non-scalar constant
    if other.is_affine() {
        Curvature::Affine
    } else {
        Curvature::Unknown
    }
}

/// Handle matrix multiplication curvature.
fn matmul_curvature(a: &Expr, b: &Expr) -> Curvature {
    let ac = a.curvature();
    let bc = b.curvature();

    match (ac.is_constant(), bc.is_constant()) {
        (true, true) => Curvature::Constant,
        (true, false) if bc.is_affine() => Curvature::Affine,
        (false, true) if ac.is_affine() => Curvature::Affine,
        _ => Curvature::Unknown,
    }
}
