//! Constants: expected returns, historical return matrices, covariances.

use nalgebra::DMatrix;

use super::expression::{Array, ConstantData, Expr, ExprId};
use super::shape::Shape;

/// A scalar such as a risk-aversion weight or a loss floor.
pub fn constant(value: f64) -> Expr {
    from_array(Array::Scalar(value))
}

/// A column vector, e.g. mean returns or alpha scores.
pub fn constant_vec(values: Vec<f64>) -> Expr {
    from_array(Array::from_vec(values))
}

/// A `rows x cols` matrix from column-major data.
pub fn constant_matrix(values: Vec<f64>, rows: usize, cols: usize) -> Expr {
    from_array(Array::Dense(DMatrix::from_vec(rows, cols, values)))
}

/// Wrap an existing matrix, typically the periods x assets return matrix.
pub fn constant_dmatrix(matrix: DMatrix<f64>) -> Expr {
    from_array(Array::Dense(matrix))
}

/// All ones. `ones(n)` dotted with the weights gives the budget row.
pub fn ones(shape: impl Into<Shape>) -> Expr {
    let shape = shape.into();
    let value = if shape.is_scalar() {
        Array::Scalar(1.0)
    } else {
        Array::Dense(DMatrix::from_element(shape.rows(), shape.cols(), 1.0))
    };
    from_array(value)
}

fn from_array(value: Array) -> Expr {
    Expr::Constant(ConstantData {
        id: ExprId::new(),
        value,
    })
}

/// Lift plain numbers or vectors into constant expressions.
pub trait IntoConstant {
    fn into_constant(self) -> Expr;
}

impl IntoConstant for f64 {
    fn into_constant(self) -> Expr {
        constant(self)
    }
}

impl IntoConstant for Vec<f64> {
    fn into_constant(self) -> Expr {
        constant_vec(self)
    }
}

impl IntoConstant for &[f64] {
    fn into_constant(self) -> Expr {
        constant_vec(self.to_vec())
    }
}

impl IntoConstant for DMatrix<f64> {
    fn into_constant(self) -> Expr {
        constant_dmatrix(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_scalar() {
        let c = constant(5.0);
        assert_eq!(c.constant_value().and_then(Array::as_scalar), Some(5.0));
    }

    #[test]
    fn test_constant_vec_is_column() {
        let c = constant_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(c.shape(), Shape::matrix(3, 1));
    }

    #[test]
    fn test_constant_matrix_column_major() {
        // [[1, 3], [2, 4]]
        let c = constant_matrix(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        let m = c.constant_value().map(Array::to_dense).unwrap();
        assert_eq!(m[(0, 1)], 3.0);
        assert_eq!(m[(1, 0)], 2.0);
    }

    #[test]
    fn test_ones() {
        let o = ones(5);
        assert_eq!(o.shape(), Shape::matrix(5, 1));
        assert!(o.constant_value().unwrap().is_nonneg());
    }

    #[test]
    fn test_into_constant() {
        let a: Expr = 5.0.into_constant();
        let b: Expr = vec![1.0, 2.0].into_constant();
        assert!(a.is_constant() && b.is_constant());
    }
}
