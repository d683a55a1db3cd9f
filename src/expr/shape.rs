//! Expression shapes.
//!
//! Conventions:
//! - `()` is a scalar
//! - `(n,)` is a vector of length n (a weight vector, a column of returns)
//! - `(m, n)` is an m x n matrix (a return matrix, a covariance matrix)

use std::fmt;

/// Dimensions of an expression; at most two axes.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn scalar() -> Self {
        Shape(vec![])
    }

    pub fn vector(n: usize) -> Self {
        Shape(vec![n])
    }

    pub fn matrix(m: usize, n: usize) -> Self {
        Shape(vec![m, n])
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.0.iter().product::<usize>().max(1)
    }

    /// Number of dimensions (0 for scalar, 1 for vector, 2 for matrix).
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_vector(&self) -> bool {
        self.0.len() == 1
    }

    /// Number of rows (1 for scalar, n for vector, m for matrix).
    pub fn rows(&self) -> usize {
        self.0.first().copied().unwrap_or(1)
    }

    /// Number of columns (1 for scalar and vector, n for matrix).
    pub fn cols(&self) -> usize {
        self.0.get(1).copied().unwrap_or(1)
    }

    /// A 1x1 matrix, a length-1 vector and a scalar all hold one value.
    pub fn is_scalar_like(&self) -> bool {
        self.size() == 1
    }

    /// Get the transposed shape.
    pub fn transpose(&self) -> Self {
        match self.0.len() {
            0 => Shape::scalar(),
            1 => Shape::matrix(1, self.0[0]),
            _ => Shape::matrix(self.cols(), self.rows()),
        }
    }

    /// Check if shapes are broadcastable and return the result shape.
    ///
    /// Only the cases the modeling layer produces are accepted: equal
    /// element counts, or one side holding a single value.
    pub fn broadcast(&self, other: &Shape) -> Option<Shape> {
        if self == other {
            Some(self.clone())
        } else if other.is_scalar_like() {
            Some(self.clone())
        } else if self.is_scalar_like() {
            Some(other.clone())
        } else if self.size() == other.size() && self.cols() == 1 && other.cols() == 1 {
            // (n,) and (n, 1) describe the same column
            Some(Shape::vector(self.size()))
        } else {
            None
        }
    }

    /// Check if matrix multiplication is valid and return result shape.
    pub fn matmul(&self, other: &Shape) -> Option<Shape> {
        match (self.ndim(), other.ndim()) {
            (2, 2) if self.cols() == other.rows() => {
                Some(Shape::matrix(self.rows(), other.cols()))
            }
            (2, 1) if self.cols() == other.rows() => Some(Shape::vector(self.rows())),
            // vector @ matrix treats the vector as a row
            (1, 2) if self.rows() == other.rows() => Some(Shape::vector(other.cols())),
            (1, 1) if self.rows() == other.rows() => Some(Shape::scalar()),
            _ => None,
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "()"),
            [n] => write!(f, "({},)", n),
            [m, n, ..] => write!(f, "({}, {})", m, n),
        }
    }
}

impl From<()> for Shape {
    fn from(_: ()) -> Self {
        Shape::scalar()
    }
}

impl From<usize> for Shape {
    fn from(n: usize) -> Self {
        Shape::vector(n)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((m, n): (usize, usize)) -> Self {
        Shape::matrix(m, n)
    }
}
