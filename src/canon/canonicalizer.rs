//! Expression canonicalization.
//!
//! Canonicalization transforms arbitrary DCP expressions into standard form:
//! - Affine expressions become LinExpr
//! - Quadratic objectives become QuadExpr (with P matrix for native QP)
//! - Order-statistic sums are reformulated as affine + cone constraints

use std::collections::HashMap;

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use super::lin_expr::{LinExpr, QuadExpr};
use crate::error::{FolioError, Result};
use crate::expr::{Array, Expr, ExprId, Shape};
use crate::sparse::{
    csc_hstack, csc_kron, csc_matmul, csc_permute_rows, csc_to_dense, dense_to_csc,
};

/// A cone constraint in standard form: Ax + b in K.
#[derive(Debug, Clone)]
pub enum ConeConstraint {
    /// Zero cone: Ax + b = 0 (equality).
    Zero { a: LinExpr },
    /// Nonnegative cone: Ax + b >= 0.
    NonNeg { a: LinExpr },
}

/// Result of canonicalizing an expression.
#[derive(Debug)]
pub struct CanonResult {
    /// The canonicalized expression (affine or quadratic).
    pub expr: CanonExpr,
    /// Additional cone constraints introduced during canonicalization.
    pub constraints: Vec<ConeConstraint>,
    /// Auxiliary variables introduced during canonicalization.
    pub aux_vars: Vec<(ExprId, Shape)>,
}

/// The type of canonicalized expression.
#[derive(Debug)]
pub enum CanonExpr {
    /// Linear expression.
    Linear(LinExpr),
    /// Quadratic expression (for objectives only).
    Quadratic(QuadExpr),
}

impl CanonExpr {
    /// Take the linear expression, failing if quadratic terms remain.
    pub fn into_linear(self) -> Result<LinExpr> {
        match self {
            CanonExpr::Linear(l) => Ok(l),
            CanonExpr::Quadratic(_) => Err(FolioError::InvalidProblem(
                "quadratic terms are only supported in the objective".into(),
            )),
        }
    }

    /// Get as quadratic expression, converting linear if needed.
    pub fn into_quadratic(self) -> Result<QuadExpr> {
        match self {
            CanonExpr::Linear(l) => QuadExpr::from_linear(l),
            CanonExpr::Quadratic(q) => Ok(q),
        }
    }

    fn scale(self, scalar: f64) -> CanonExpr {
        match self {
            CanonExpr::Linear(l) => CanonExpr::Linear(l.scale(scalar)),
            CanonExpr::Quadratic(q) => CanonExpr::Quadratic(q.scale(scalar)),
        }
    }
}

/// Canonicalize an expression.
///
/// This converts the expression tree into affine form plus cone constraints.
/// For objectives, quadratic expressions are preserved for native QP support.
pub fn canonicalize(expr: &Expr, for_objective: bool) -> Result<CanonResult> {
    let mut ctx = CanonContext::new();
    let canon_expr = ctx.canonicalize_expr(expr, for_objective)?;
    Ok(CanonResult {
        expr: canon_expr,
        constraints: ctx.constraints,
        aux_vars: ctx.aux_vars,
    })
}

/// Context for canonicalization, tracking auxiliary variables and constraints.
struct CanonContext {
    constraints: Vec<ConeConstraint>,
    aux_vars: Vec<(ExprId, Shape)>,
}

impl CanonContext {
    fn new() -> Self {
        CanonContext {
            constraints: Vec::new(),
            aux_vars: Vec::new(),
        }
    }

    /// Create a new auxiliary variable.
    fn new_aux_var(&mut self, shape: Shape) -> LinExpr {
        let var_id = ExprId::new();
        self.aux_vars.push((var_id, shape.clone()));
        LinExpr::variable(var_id, shape)
    }

    /// Create a new non-negative auxiliary variable.
    fn new_nonneg_aux_var(&mut self, shape: Shape) -> LinExpr {
        let var = self.new_aux_var(shape);
        self.constraints.push(ConeConstraint::NonNeg { a: var.clone() });
        var
    }

    fn linear(&mut self, expr: &Expr) -> Result<LinExpr> {
        self.canonicalize_expr(expr, false)?.into_linear()
    }

    /// Canonicalize an expression.
    fn canonicalize_expr(&mut self, expr: &Expr, for_objective: bool) -> Result<CanonExpr> {
        let canon = match expr {
            // Leaves
            Expr::Variable(v) => CanonExpr::Linear(LinExpr::variable(v.id, v.shape.clone())),
            Expr::Constant(c) => CanonExpr::Linear(canonicalize_constant(&c.value)),

            // Affine operations
            Expr::Add(a, b) => {
                let ca = self.canonicalize_expr(a, for_objective)?;
                let cb = self.canonicalize_expr(b, for_objective)?;
                match (ca, cb) {
                    (CanonExpr::Linear(la), CanonExpr::Linear(lb)) => {
                        CanonExpr::Linear(la.add(&lb)?)
                    }
                    (ca, cb) => {
                        CanonExpr::Quadratic(ca.into_quadratic()?.add(&cb.into_quadratic()?)?)
                    }
                }
            }
            Expr::Neg(a) => self.canonicalize_expr(a, for_objective)?.scale(-1.0),
            Expr::Mul(a, b) => self.canonicalize_mul(a, b, for_objective)?,
            Expr::MatMul(a, b) => CanonExpr::Linear(self.canonicalize_matmul(a, b)?),
            Expr::Sum(a) => {
                let la = self.linear(a)?;
                CanonExpr::Linear(sum_entries(&la))
            }
            Expr::Transpose(a) => {
                let la = self.linear(a)?;
                CanonExpr::Linear(transpose_lin(&la))
            }

            // Nonlinear atoms
            Expr::QuadForm(x, p) => self.canonicalize_quad_form(x, p, for_objective)?,
            Expr::SumLargest(x, k) => {
                let lx = self.linear(x)?;
                CanonExpr::Linear(self.sum_largest_lin(&lx, *k)?)
            }
            Expr::SumSmallest(x, k) => {
                // sum_smallest(x, k) = -sum_largest(-x, k)
                let lx = self.linear(x)?;
                CanonExpr::Linear(self.sum_largest_lin(&lx.neg(), *k)?.neg())
            }
        };
        Ok(canon)
    }

    fn canonicalize_mul(&mut self, a: &Expr, b: &Expr, for_objective: bool) -> Result<CanonExpr> {
        // Scalar constant on either side keeps quadratic terms intact
        for (c, other) in [(a, b), (b, a)] {
            if let Some(scalar) = c.constant_value().and_then(Array::as_scalar) {
                return Ok(self.canonicalize_expr(other, for_objective)?.scale(scalar));
            }
        }

        // Elementwise product with a constant array
        let la = self.linear(a)?;
        let lb = self.linear(b)?;
        let (constant, other) = match (la.is_constant(), lb.is_constant()) {
            (true, _) => (la, lb),
            (false, true) => (lb, la),
            (false, false) => {
                return Err(FolioError::NotDcp(
                    "product of two non-constant expressions".into(),
                ))
            }
        };
        let factors = constant.flat_constant();
        if factors.len() == 1 {
            return Ok(CanonExpr::Linear(other.scale(factors[0])));
        }
        if factors.len() != other.size() {
            return Err(FolioError::ShapeMismatch {
                expected: other.shape.to_string(),
                got: constant.shape.to_string(),
            });
        }
        Ok(CanonExpr::Linear(other.scale_entries(&factors)))
    }

    fn canonicalize_matmul(&mut self, a: &Expr, b: &Expr) -> Result<LinExpr> {
        let la = self.linear(a)?;
        let lb = self.linear(b)?;
        if la.is_constant() {
            matmul_const_lin(&la.constant, &lb)
        } else if lb.is_constant() {
            lin_matmul_const(&la, &lb.constant)
        } else {
            Err(FolioError::NotDcp(
                "matrix product of two non-constant expressions".into(),
            ))
        }
    }

    fn canonicalize_quad_form(&mut self, x: &Expr, p: &Expr, for_objective: bool) -> Result<CanonExpr> {
        if !for_objective {
            return Err(FolioError::InvalidProblem(
                "quad_form is only supported in the objective".into(),
            ));
        }
        let p_mat = p
            .constant_value()
            .map(Array::to_dense)
            .ok_or_else(|| FolioError::NotDcp("quad_form matrix must be constant".into()))?;
        let lx = self.linear(x)?;
        let n = lx.size();
        if p_mat.nrows() != n || p_mat.ncols() != n {
            return Err(FolioError::ShapeMismatch {
                expected: format!("({}, {})", n, n),
                got: format!("({}, {})", p_mat.nrows(), p_mat.ncols()),
            });
        }

        let d = DMatrix::from_column_slice(n, 1, &lx.flat_constant());
        if lx.is_constant() {
            return Ok(CanonExpr::Linear(LinExpr::scalar(
                (d.transpose() * &p_mat * &d)[(0, 0)],
            )));
        }

        // x = C v + d over the stacked variables v:
        // x'Px = v'(C'PC)v + 2 d'PC v + d'Pd
        let vars = lx.variables();
        let blocks: Vec<&CscMatrix<f64>> = vars.iter().map(|id| &lx.coeffs[id]).collect();
        let c = csc_hstack(&blocks);
        let p_csc = dense_to_csc(&p_mat);
        let pc = csc_matmul(&p_csc, &c);
        let ct = c.transpose();
        let quad = csc_to_dense(&csc_matmul(&ct, &pc));

        let lin_row = (d.transpose() * &p_mat) * csc_to_dense(&c) * 2.0;
        let constant = (d.transpose() * &p_mat * &d)[(0, 0)];

        let sizes: Vec<usize> = blocks.iter().map(|b| b.ncols()).collect();
        let offsets: Vec<usize> = sizes
            .iter()
            .scan(0, |acc, s| {
                let start = *acc;
                *acc += s;
                Some(start)
            })
            .collect();

        let mut quad_coeffs = HashMap::new();
        let mut lin_coeffs = HashMap::new();
        for (i, vi) in vars.iter().enumerate() {
            for (j, vj) in vars.iter().enumerate() {
                let block = quad
                    .view((offsets[i], offsets[j]), (sizes[i], sizes[j]))
                    .into_owned();
                quad_coeffs.insert((*vi, *vj), dense_to_csc(&block));
            }
            let row = lin_row.view((0, offsets[i]), (1, sizes[i])).into_owned();
            lin_coeffs.insert(*vi, dense_to_csc(&row));
        }

        Ok(CanonExpr::Quadratic(QuadExpr {
            quad_coeffs,
            linear: LinExpr {
                coeffs: lin_coeffs,
                constant: DMatrix::zeros(1, 1),
                shape: Shape::scalar(),
            },
            constant,
        }))
    }

    /// Epigraph of the sum of the k largest entries of `y`:
    ///
    /// sum_largest(y, k) = min { k t + sum(u) : u >= 0, u >= y - t }
    ///
    /// Any feasible (t, u) bounds the sum from above and the bound is tight
    /// at t = y_(k), the k-th largest entry.
    fn sum_largest_lin(&mut self, y: &LinExpr, k: usize) -> Result<LinExpr> {
        let n = y.size();
        if k == 0 || k > n {
            return Err(FolioError::InvalidProblem(format!(
                "order statistic count k = {} must lie in 1..={}",
                k, n
            )));
        }
        let t = self.new_aux_var(Shape::scalar());
        let u = self.new_nonneg_aux_var(Shape::vector(n));

        // u - y + t >= 0
        let slack = u.add(&y.neg())?.add(&t)?;
        self.constraints.push(ConeConstraint::NonNeg { a: slack });

        t.scale(k as f64).add(&sum_entries(&u))
    }
}

// ============================================================================
// Affine helpers
// ============================================================================

fn canonicalize_constant(arr: &Array) -> LinExpr {
    match arr {
        Array::Scalar(v) => LinExpr::scalar(*v),
        Array::Dense(m) => LinExpr::constant(m.clone()),
    }
}

fn sum_entries(x: &LinExpr) -> LinExpr {
    let size = x.size();
    let ones = dense_to_csc(&DMatrix::from_element(1, size, 1.0));
    let coeffs = x
        .coeffs
        .iter()
        .map(|(k, v)| (*k, csc_matmul(&ones, v)))
        .collect();
    LinExpr {
        coeffs,
        constant: DMatrix::from_element(1, 1, x.constant.sum()),
        shape: Shape::scalar(),
    }
}

fn transpose_lin(x: &LinExpr) -> LinExpr {
    let (m, n) = (x.shape.rows(), x.shape.cols());
    // Entry (i, j) moves from i + j*m to j + i*n
    let mut perm = vec![0usize; m * n];
    for j in 0..n {
        for i in 0..m {
            perm[i + j * m] = j + i * n;
        }
    }
    let coeffs = x
        .coeffs
        .iter()
        .map(|(k, v)| (*k, csc_permute_rows(v, &perm)))
        .collect();
    LinExpr {
        coeffs,
        constant: x.constant.transpose(),
        shape: x.shape.transpose(),
    }
}

/// `A @ E` for constant `A`: vec(A E) = (I_n ⊗ A) vec(E).
fn matmul_const_lin(a: &DMatrix<f64>, e: &LinExpr) -> Result<LinExpr> {
    let (m, n) = (e.shape.rows(), e.shape.cols());
    let a = if a.ncols() == m {
        a.clone()
    } else if a.ncols() == 1 && a.nrows() == m {
        // A column vector on the left acts as a row
        a.transpose()
    } else {
        return Err(FolioError::ShapeMismatch {
            expected: format!("{} columns", m),
            got: format!("({}, {})", a.nrows(), a.ncols()),
        });
    };

    let op = csc_kron(&CscMatrix::identity(n), &dense_to_csc(&a));
    let coeffs = e
        .coeffs
        .iter()
        .map(|(k, v)| (*k, csc_matmul(&op, v)))
        .collect();
    let constant = &a * DMatrix::from_column_slice(m, n, &e.flat_constant());
    let shape = if e.shape.is_vector() {
        Shape::vector(constant.nrows())
    } else {
        Shape::matrix(constant.nrows(), constant.ncols())
    };
    Ok(LinExpr {
        coeffs,
        constant,
        shape,
    })
}

/// `E @ B` for constant `B`: vec(E B) = (B' ⊗ I_m) vec(E).
fn lin_matmul_const(e: &LinExpr, b: &DMatrix<f64>) -> Result<LinExpr> {
    let (m, n) = if e.shape.is_vector() && e.shape.size() == b.nrows() && b.nrows() != 1 {
        // A vector on the left acts as a row
        (1, e.shape.size())
    } else {
        (e.shape.rows(), e.shape.cols())
    };
    if n != b.nrows() {
        return Err(FolioError::ShapeMismatch {
            expected: format!("{} rows", n),
            got: format!("({}, {})", b.nrows(), b.ncols()),
        });
    }

    let op = csc_kron(&dense_to_csc(&b.transpose()), &CscMatrix::identity(m));
    let coeffs = e
        .coeffs
        .iter()
        .map(|(k, v)| (*k, csc_matmul(&op, v)))
        .collect();
    let constant = DMatrix::from_column_slice(m, n, &e.flat_constant()) * b;
    let shape = Shape::matrix(constant.nrows(), constant.ncols());
    Ok(LinExpr {
        coeffs,
        constant,
        shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::{dot, matmul, quad_form, sum, sum_largest, sum_smallest, transpose};
    use crate::expr::{constant_dmatrix, constant_vec, variable};

    fn linear(expr: &Expr) -> LinExpr {
        canonicalize(expr, false).unwrap().expr.into_linear().unwrap()
    }

    #[test]
    fn test_canonicalize_variable() {
        let x = variable(5);
        let result = canonicalize(&x, false).unwrap();
        assert!(result.constraints.is_empty());
        assert!(matches!(result.expr, CanonExpr::Linear(_)));
    }

    #[test]
    fn test_dot_with_constant_on_left() {
        let w = variable(3);
        let mu = constant_vec(vec![0.1, 0.2, 0.3]);
        let l = linear(&dot(&mu, &w));
        assert_eq!(l.size(), 1);
        let c = csc_to_dense(&l.coeffs[&w.variable_id().unwrap()]);
        assert_eq!(c, DMatrix::from_row_slice(1, 3, &[0.1, 0.2, 0.3]));
    }

    #[test]
    fn test_return_matrix_product() {
        let w = variable(2);
        let r = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let l = linear(&matmul(&constant_dmatrix(r.clone()), &w));
        assert_eq!(l.shape, Shape::vector(3));
        assert_eq!(csc_to_dense(&l.coeffs[&w.variable_id().unwrap()]), r);
    }

    #[test]
    fn test_transpose_permutes_entries() {
        let x = variable((2, 3));
        let l = linear(&transpose(&x));
        let c = csc_to_dense(&l.coeffs[&x.variable_id().unwrap()]);
        // Entry (0, 1) of x' sits at flat index 3 and is entry (1, 0) of x
        assert_eq!(c[(3, 1)], 1.0);
        assert_eq!(l.shape, Shape::matrix(3, 2));
    }

    #[test]
    fn test_sum_of_affine() {
        let w = variable(4);
        let l = linear(&(sum(&w) - 1.0));
        assert_eq!(l.flat_constant(), vec![-1.0]);
        assert_eq!(l.coeffs[&w.variable_id().unwrap()].nnz(), 4);
    }

    #[test]
    fn test_sum_largest_epigraph() {
        let x = variable(5);
        let result = canonicalize(&sum_largest(&x, 2), false).unwrap();
        // t free, u >= 0 and u - x + t >= 0
        assert_eq!(result.aux_vars.len(), 2);
        assert_eq!(result.constraints.len(), 2);
        let l = result.expr.into_linear().unwrap();
        let t_id = result.aux_vars[0].0;
        assert_eq!(csc_to_dense(&l.coeffs[&t_id])[(0, 0)], 2.0);
    }

    #[test]
    fn test_sum_smallest_negates() {
        let x = variable(4);
        let result = canonicalize(&sum_smallest(&x, 1), false).unwrap();
        let l = result.expr.into_linear().unwrap();
        let t_id = result.aux_vars[0].0;
        assert_eq!(csc_to_dense(&l.coeffs[&t_id])[(0, 0)], -1.0);
    }

    #[test]
    fn test_order_statistic_count_checked() {
        let x = variable(3);
        assert!(canonicalize(&sum_smallest(&x, 0), false).is_err());
        assert!(canonicalize(&sum_smallest(&x, 4), false).is_err());
    }

    #[test]
    fn test_quad_form_objective() {
        let w = variable(2);
        let p = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let result = canonicalize(&(0.5 * quad_form(&w, &constant_dmatrix(p.clone()))), true).unwrap();
        let q = match result.expr {
            CanonExpr::Quadratic(q) => q,
            CanonExpr::Linear(_) => panic!("expected quadratic"),
        };
        let id = w.variable_id().unwrap();
        assert_eq!(csc_to_dense(&q.quad_coeffs[&(id, id)]), p * 0.5);
        assert_eq!(q.constant, 0.0);
    }

    #[test]
    fn test_quad_form_of_shifted_variable() {
        // (w - 1)' I (w - 1) = w'w - 2 sum(w) + n
        let w = variable(3);
        let p = constant_dmatrix(DMatrix::identity(3, 3));
        let result = canonicalize(&quad_form(&(&w - 1.0), &p), true).unwrap();
        let q = result.expr.into_quadratic().unwrap();
        let id = w.variable_id().unwrap();
        assert_eq!(q.constant, 3.0);
        let lin = csc_to_dense(&q.linear.coeffs[&id]);
        assert!(lin.iter().all(|&v| v == -2.0));
    }

    #[test]
    fn test_quad_form_in_constraint_rejected() {
        let w = variable(2);
        let p = constant_dmatrix(DMatrix::identity(2, 2));
        assert!(canonicalize(&quad_form(&w, &p), false).is_err());
    }

    #[test]
    fn test_mean_variance_objective_keeps_quadratic() {
        let w = variable(2);
        let mu = constant_vec(vec![0.0, 0.0125]);
        let cov = constant_dmatrix(DMatrix::identity(2, 2));
        let obj = dot(&mu, &w) - 100.0 * quad_form(&w, &cov);
        let result = canonicalize(&(-obj), true).unwrap();
        let q = result.expr.into_quadratic().unwrap();
        let id = w.variable_id().unwrap();
        assert_eq!(csc_to_dense(&q.quad_coeffs[&(id, id)])[(0, 0)], 100.0);
    }
}
