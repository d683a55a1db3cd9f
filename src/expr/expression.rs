//! The expression tree behind every portfolio objective and constraint.
//!
//! `Expr` covers weights, return data and the handful of atoms the
//! strategies need (`matmul`, `quad_form`, `sum_largest`, `sum_smallest`).
//! Expressions form an immutable DAG using `Arc` for sharing, so a return
//! matrix constant can appear in several terms without being copied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nalgebra::DMatrix;

use super::shape::Shape;

/// Process-wide identifier; variables are ordered by it when stuffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u64);

impl ExprId {
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        ExprId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ExprId {
    fn default() -> Self {
        Self::new()
    }
}

/// Numeric storage for constants and solution values.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    /// Dense matrix storage. Vectors are stored as n x 1 columns.
    Dense(DMatrix<f64>),
    /// Scalar value.
    Scalar(f64),
}

impl Array {
    /// Get the shape of the array.
    pub fn shape(&self) -> Shape {
        match self {
            Array::Dense(m) => Shape::matrix(m.nrows(), m.ncols()),
            Array::Scalar(_) => Shape::scalar(),
        }
    }

    /// Try to get as a scalar value.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Array::Scalar(v) => Some(*v),
            Array::Dense(m) if m.nrows() == 1 && m.ncols() == 1 => Some(m[(0, 0)]),
            _ => None,
        }
    }

    /// View the value as a dense matrix (a scalar becomes 1 x 1).
    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            Array::Dense(m) => m.clone(),
            Array::Scalar(v) => DMatrix::from_element(1, 1, *v),
        }
    }

    /// Flatten in column-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Array::Dense(m) => m.iter().copied().collect(),
            Array::Scalar(v) => vec![*v],
        }
    }

    /// Check if all elements are non-negative.
    pub fn is_nonneg(&self) -> bool {
        match self {
            Array::Scalar(v) => *v >= 0.0,
            Array::Dense(m) => m.iter().all(|&v| v >= 0.0),
        }
    }

    /// Check if all elements are non-positive.
    pub fn is_nonpos(&self) -> bool {
        match self {
            Array::Scalar(v) => *v <= 0.0,
            Array::Dense(m) => m.iter().all(|&v| v <= 0.0),
        }
    }

    /// Check if a symmetric matrix is positive semi-definite.
    ///
    /// Returns `None` for non-square or non-symmetric input. Sample
    /// covariance matrices are often singular (fewer periods than assets,
    /// perfectly correlated columns), so the test is on the smallest
    /// eigenvalue with a tolerance relative to the spectral radius rather than
    /// on a Cholesky factorization.
    pub fn is_psd(&self) -> Option<bool> {
        match self {
            Array::Scalar(v) => Some(*v >= 0.0),
            Array::Dense(m) => {
                if m.nrows() != m.ncols() {
                    return None;
                }
                let n = m.nrows();
                let scale = m.amax().max(1.0);
                for i in 0..n {
                    for j in (i + 1)..n {
                        if (m[(i, j)] - m[(j, i)]).abs() > 1e-10 * scale {
                            return None;
                        }
                    }
                }
                let eigen = m.clone().symmetric_eigen();
                let radius = eigen.eigenvalues.amax();
                let min = eigen.eigenvalues.min();
                Some(min >= -1e-10 * radius.max(f64::MIN_POSITIVE))
            }
        }
    }

    /// Create from a vector (stored as a column).
    pub fn from_vec(v: Vec<f64>) -> Self {
        let n = v.len();
        Array::Dense(DMatrix::from_vec(n, 1, v))
    }
}

impl From<f64> for Array {
    fn from(v: f64) -> Self {
        Array::Scalar(v)
    }
}

impl From<Vec<f64>> for Array {
    fn from(v: Vec<f64>) -> Self {
        Array::from_vec(v)
    }
}

impl From<DMatrix<f64>> for Array {
    fn from(m: DMatrix<f64>) -> Self {
        Array::Dense(m)
    }
}

#[derive(Debug, Clone)]
pub struct VariableData {
    pub id: ExprId,
    pub shape: Shape,
    pub name: Option<String>,
    /// Long-only: `x >= 0` is added when the problem is canonicalized.
    pub nonneg: bool,
}

#[derive(Debug, Clone)]
pub struct ConstantData {
    pub id: ExprId,
    pub value: Array,
}

impl ConstantData {
    pub fn shape(&self) -> Shape {
        self.value.shape()
    }
}

/// A node in the expression DAG.
#[derive(Debug, Clone)]
pub enum Expr {
    Variable(VariableData),
    Constant(ConstantData),

    // Affine
    Add(Arc<Expr>, Arc<Expr>),
    Neg(Arc<Expr>),
    /// One side must be a scalar constant, e.g. `gamma * risk`.
    Mul(Arc<Expr>, Arc<Expr>),
    Sum(Arc<Expr>),
    Transpose(Arc<Expr>),
    /// `R @ w` turns a return matrix and weights into per-period returns.
    MatMul(Arc<Expr>, Arc<Expr>),

    // Nonlinear
    /// `w' Sigma w`, the portfolio variance.
    QuadForm(Arc<Expr>, Arc<Expr>),
    /// Worst-case tail sums for the downside floor.
    SumLargest(Arc<Expr>, usize),
    SumSmallest(Arc<Expr>, usize),
}

impl Expr {
    pub fn shape(&self) -> Shape {
        match self {
            Expr::Variable(v) => v.shape.clone(),
            Expr::Constant(c) => c.shape(),

            Expr::Add(a, b) | Expr::Mul(a, b) => a
                .shape()
                .broadcast(&b.shape())
                .unwrap_or_else(Shape::scalar),
            Expr::Neg(a) => a.shape(),
            Expr::Sum(_) => Shape::scalar(),
            Expr::Transpose(a) => a.shape().transpose(),
            Expr::MatMul(a, b) => a.shape().matmul(&b.shape()).unwrap_or_else(Shape::scalar),

            Expr::QuadForm(_, _) | Expr::SumLargest(_, _) | Expr::SumSmallest(_, _) => {
                Shape::scalar()
            }
        }
    }

    /// `Some` only for a `Variable` leaf.
    pub fn variable_id(&self) -> Option<ExprId> {
        match self {
            Expr::Variable(v) => Some(v.id),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant(_))
    }

    /// Get the constant value if this is a constant expression.
    pub fn constant_value(&self) -> Option<&Array> {
        match self {
            Expr::Constant(c) => Some(&c.value),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Expr::Variable(_))
    }

    /// Ids of every weight or slack reachable from this node.
    pub fn variables(&self) -> Vec<ExprId> {
        self.variable_data().into_iter().map(|v| v.id).collect()
    }

    /// Collect all variables in this expression, ordered by id.
    pub fn variable_data(&self) -> Vec<VariableData> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort_by_key(|v| v.id);
        vars.dedup_by_key(|v| v.id);
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<VariableData>) {
        match self {
            Expr::Variable(v) => vars.push(v.clone()),
            Expr::Constant(_) => {}
            Expr::Add(a, b) | Expr::Mul(a, b) | Expr::MatMul(a, b) | Expr::QuadForm(a, b) => {
                a.collect_variables(vars);
                b.collect_variables(vars);
            }
            Expr::Neg(a)
            | Expr::Sum(a)
            | Expr::Transpose(a)
            | Expr::SumLargest(a, _)
            | Expr::SumSmallest(a, _) => a.collect_variables(vars),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        crate::expr::constant(value)
    }
}

impl From<&Expr> for Expr {
    fn from(expr: &Expr) -> Self {
        expr.clone()
    }
}
