//! Linear and quadratic expression representations for canonicalization.
//!
//! After canonicalization, expressions are represented in standard form:
//! - Linear: sum_i(A_i * x_i) + b
//! - Quadratic: x' P x + q' x + r
//!
//! Every array is flattened in column-major order, so row `i` of a
//! coefficient matrix is entry `i` of `vec(expr)`.

use std::collections::HashMap;

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::error::{FolioError, Result};
use crate::expr::{ExprId, Shape};
use crate::sparse::{csc_add, csc_repeat_rows, csc_scale, csc_scale_rows};

/// A linear expression in standard form: sum_i(A_i * x_i) + b
///
/// Each term is a sparse coefficient matrix multiplied by a variable.
/// The constant term `b` is a dense matrix with the expression's shape.
#[derive(Debug, Clone)]
pub struct LinExpr {
    /// Coefficient matrices for each variable: var_id -> coefficient matrix.
    /// The coefficient matrix A_i has shape (output_size, var_size).
    pub coeffs: HashMap<ExprId, CscMatrix<f64>>,
    /// Constant term (offset), `shape.rows() x shape.cols()`.
    pub constant: DMatrix<f64>,
    /// Output shape of this expression.
    pub shape: Shape,
}

impl LinExpr {
    /// Create a zero linear expression with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        LinExpr {
            coeffs: HashMap::new(),
            constant: DMatrix::zeros(shape.rows(), shape.cols()),
            shape,
        }
    }

    /// Create a linear expression for a single variable (identity coefficient).
    pub fn variable(var_id: ExprId, shape: Shape) -> Self {
        let mut coeffs = HashMap::new();
        coeffs.insert(var_id, CscMatrix::identity(shape.size()));
        LinExpr {
            coeffs,
            constant: DMatrix::zeros(shape.rows(), shape.cols()),
            shape,
        }
    }

    /// Create a constant linear expression.
    pub fn constant(value: DMatrix<f64>) -> Self {
        let shape = Shape::matrix(value.nrows(), value.ncols());
        LinExpr {
            coeffs: HashMap::new(),
            constant: value,
            shape,
        }
    }

    /// Create a scalar constant.
    pub fn scalar(value: f64) -> Self {
        LinExpr {
            coeffs: HashMap::new(),
            constant: DMatrix::from_element(1, 1, value),
            shape: Shape::scalar(),
        }
    }

    /// Check if this is a constant (no variables).
    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Get the output size (flattened).
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// The constant term flattened in column-major order.
    pub fn flat_constant(&self) -> Vec<f64> {
        self.constant.iter().copied().collect()
    }

    /// Repeat a single-entry expression so it has `n` entries.
    fn broadcast_to(&self, shape: &Shape) -> LinExpr {
        let n = shape.size();
        let coeffs = self
            .coeffs
            .iter()
            .map(|(k, v)| (*k, csc_repeat_rows(v, n)))
            .collect();
        LinExpr {
            coeffs,
            constant: DMatrix::from_element(shape.rows(), shape.cols(), self.constant[(0, 0)]),
            shape: shape.clone(),
        }
    }

    /// Add two linear expressions.
    ///
    /// A single-entry operand is broadcast against the other side; any other
    /// size disagreement is a `ShapeMismatch`.
    pub fn add(&self, other: &LinExpr) -> Result<LinExpr> {
        if self.size() != other.size() {
            if other.size() == 1 {
                return self.add(&other.broadcast_to(&self.shape));
            }
            if self.size() == 1 {
                return self.broadcast_to(&other.shape).add(other);
            }
            return Err(FolioError::ShapeMismatch {
                expected: self.shape.to_string(),
                got: other.shape.to_string(),
            });
        }

        let mut coeffs = self.coeffs.clone();
        for (var_id, coeff) in &other.coeffs {
            coeffs
                .entry(*var_id)
                .and_modify(|c| *c = csc_add(c, coeff))
                .or_insert_with(|| coeff.clone());
        }

        // Shapes with equal size share the column-major layout
        let rhs = DMatrix::from_column_slice(
            self.constant.nrows(),
            self.constant.ncols(),
            other.constant.as_slice(),
        );

        Ok(LinExpr {
            coeffs,
            constant: &self.constant + rhs,
            shape: self.shape.clone(),
        })
    }

    /// Negate a linear expression.
    pub fn neg(&self) -> LinExpr {
        self.scale(-1.0)
    }

    /// Scale by a scalar.
    pub fn scale(&self, scalar: f64) -> LinExpr {
        let coeffs = self
            .coeffs
            .iter()
            .map(|(k, v)| (*k, csc_scale(v, scalar)))
            .collect();
        LinExpr {
            coeffs,
            constant: &self.constant * scalar,
            shape: self.shape.clone(),
        }
    }

    /// Multiply entry `i` by `factors[i]` (elementwise product with a constant).
    pub fn scale_entries(&self, factors: &[f64]) -> LinExpr {
        let coeffs = self
            .coeffs
            .iter()
            .map(|(k, v)| (*k, csc_scale_rows(v, factors)))
            .collect();
        let mut constant = self.constant.clone();
        for (c, f) in constant.iter_mut().zip(factors) {
            *c *= f;
        }
        LinExpr {
            coeffs,
            constant,
            shape: self.shape.clone(),
        }
    }

    /// Get all variable IDs in this expression.
    pub fn variables(&self) -> Vec<ExprId> {
        let mut vars: Vec<_> = self.coeffs.keys().copied().collect();
        vars.sort();
        vars
    }
}

/// A quadratic expression: x' P x + q' x + r
///
/// Used for quadratic objectives in QP problems.
#[derive(Debug, Clone)]
pub struct QuadExpr {
    /// Quadratic term blocks: (var_i, var_j) -> block of P.
    /// The blocks together form a symmetric matrix.
    pub quad_coeffs: HashMap<(ExprId, ExprId), CscMatrix<f64>>,
    /// Linear term: q' x
    pub linear: LinExpr,
    /// Constant term: r
    pub constant: f64,
}

impl QuadExpr {
    /// Create a quadratic expression from a scalar linear expression.
    pub fn from_linear(linear: LinExpr) -> Result<Self> {
        if linear.size() != 1 {
            return Err(FolioError::InvalidProblem(format!(
                "objective must be scalar, got shape {}",
                linear.shape
            )));
        }
        let constant = linear.constant[(0, 0)];
        Ok(QuadExpr {
            quad_coeffs: HashMap::new(),
            linear: LinExpr {
                coeffs: linear.coeffs,
                constant: DMatrix::zeros(1, 1),
                shape: Shape::scalar(),
            },
            constant,
        })
    }

    /// Check if this is purely linear (no quadratic terms).
    pub fn is_linear(&self) -> bool {
        self.quad_coeffs.is_empty()
    }

    /// Add two quadratic expressions.
    pub fn add(&self, other: &QuadExpr) -> Result<QuadExpr> {
        let mut quad_coeffs = self.quad_coeffs.clone();
        for (key, coeff) in &other.quad_coeffs {
            quad_coeffs
                .entry(*key)
                .and_modify(|c| *c = csc_add(c, coeff))
                .or_insert_with(|| coeff.clone());
        }
        Ok(QuadExpr {
            quad_coeffs,
            linear: self.linear.add(&other.linear)?,
            constant: self.constant + other.constant,
        })
    }

    /// Scale by a scalar.
    pub fn scale(&self, scalar: f64) -> QuadExpr {
        let quad_coeffs = self
            .quad_coeffs
            .iter()
            .map(|(k, v)| (*k, csc_scale(v, scalar)))
            .collect();
        QuadExpr {
            quad_coeffs,
            linear: self.linear.scale(scalar),
            constant: self.constant * scalar,
        }
    }

    /// Get all variable IDs in this expression.
    pub fn variables(&self) -> Vec<ExprId> {
        let mut vars: Vec<_> = self.linear.variables();
        for (v1, v2) in self.quad_coeffs.keys() {
            vars.push(*v1);
            vars.push(*v2);
        }
        vars.sort();
        vars.dedup();
        vars
    }
}
