//! Numeric evaluation of expressions.
//!
//! Used after a solve to compute diagnostics (expected return, realized
//! tail average) from the optimal variable values. Every value is carried as
//! a dense matrix; vectors are n x 1 columns and scalars are 1 x 1.

use std::collections::HashMap;

use nalgebra::DMatrix;

use super::expression::{Array, Expr, ExprId};
use crate::error::{FolioError, Result};

impl Expr {
    /// Evaluate the expression with the given variable values.
    ///
    /// Fails with `InvalidProblem` when a variable has no value, and with
    /// `ShapeMismatch` when operand dimensions are incompatible.
    pub fn evaluate(&self, values: &HashMap<ExprId, Array>) -> Result<DMatrix<f64>> {
        match self {
            Expr::Variable(v) => {
                let value = values.get(&v.id).ok_or_else(|| {
                    FolioError::InvalidProblem(format!(
                        "no value for variable {}",
                        v.name.as_deref().unwrap_or("<unnamed>")
                    ))
                })?;
                let flat = value.to_vec();
                let (rows, cols) = (v.shape.rows(), v.shape.cols());
                if flat.len() != rows * cols {
                    return Err(FolioError::ShapeMismatch {
                        expected: v.shape.to_string(),
                        got: value.shape().to_string(),
                    });
                }
                Ok(DMatrix::from_column_slice(rows, cols, &flat))
            }
            Expr::Constant(c) => Ok(c.value.to_dense()),
            Expr::Add(a, b) => {
                let (a, b) = (a.evaluate(values)?, b.evaluate(values)?);
                elementwise(a, b, |x, y| x + y)
            }
            Expr::Neg(a) => Ok(-a.evaluate(values)?),
            Expr::Mul(a, b) => {
                let (a, b) = (a.evaluate(values)?, b.evaluate(values)?);
                elementwise(a, b, |x, y| x * y)
            }
            Expr::Sum(a) => Ok(scalar(a.evaluate(values)?.sum())),
            Expr::Transpose(a) => Ok(a.evaluate(values)?.transpose()),
            Expr::MatMul(a, b) => {
                let (a, b) = (a.evaluate(values)?, b.evaluate(values)?);
                if a.ncols() == b.nrows() {
                    Ok(a * b)
                } else if a.ncols() == 1 && a.nrows() == b.nrows() {
                    // A column vector on the left acts as a row
                    Ok(a.transpose() * b)
                } else {
                    Err(FolioError::ShapeMismatch {
                        expected: format!("{} columns", b.nrows()),
                        got: format!("{}x{}", a.nrows(), a.ncols()),
                    })
                }
            }
            Expr::QuadForm(x, p) => {
                let (x, p) = (x.evaluate(values)?, p.evaluate(values)?);
                let x = column(x);
                if p.nrows() != x.nrows() || p.ncols() != x.nrows() {
                    return Err(FolioError::ShapeMismatch {
                        expected: format!("{}x{}", x.nrows(), x.nrows()),
                        got: format!("{}x{}", p.nrows(), p.ncols()),
                    });
                }
                Ok(scalar((x.transpose() * &p * &x)[(0, 0)]))
            }
            Expr::SumLargest(x, k) => {
                let mut v: Vec<f64> = x.evaluate(values)?.iter().copied().collect();
                v.sort_by(|a, b| b.total_cmp(a));
                Ok(scalar(v.iter().take(*k).sum()))
            }
            Expr::SumSmallest(x, k) => {
                let mut v: Vec<f64> = x.evaluate(values)?.iter().copied().collect();
                v.sort_by(|a, b| a.total_cmp(b));
                Ok(scalar(v.iter().take(*k).sum()))
            }
        }
    }
}

fn scalar(v: f64) -> DMatrix<f64> {
    DMatrix::from_element(1, 1, v)
}

fn column(m: DMatrix<f64>) -> DMatrix<f64> {
    if m.ncols() == 1 {
        m
    } else {
        let n = m.len();
        m.reshape_generic(nalgebra::Dyn(n), nalgebra::Dyn(1))
    }
}

fn elementwise(a: DMatrix<f64>, b: DMatrix<f64>, op: impl Fn(f64, f64) -> f64) -> Result<DMatrix<f64>> {
    if a.len() == 1 {
        let s = a[(0, 0)];
        Ok(b.map(|y| op(s, y)))
    } else if b.len() == 1 {
        let s = b[(0, 0)];
        Ok(a.map(|x| op(x, s)))
    } else if a.shape() == b.shape() {
        Ok(a.zip_map(&b, op))
    } else if a.len() == b.len() && (a.ncols() == 1 || a.nrows() == 1) {
        // Row and column vectors of equal length
        let b = b.reshape_generic(nalgebra::Dyn(a.nrows()), nalgebra::Dyn(a.ncols()));
        Ok(a.zip_map(&b, op))
    } else {
        Err(FolioError::ShapeMismatch {
            expected: format!("{}x{}", a.nrows(), a.ncols()),
            got: format!("{}x{}", b.nrows(), b.ncols()),
        })
    }
}
