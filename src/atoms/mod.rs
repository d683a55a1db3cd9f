//! Atom functions for building expressions.
//!
//! Atoms are the building blocks of optimization problems. They include:
//!
//! - **Affine atoms**: Operations that preserve linearity (add, mul, sum, matmul)
//! - **Nonlinear atoms**: Operations with specific curvature (quadratic forms,
//!   sums of order statistics)

pub mod affine;
pub mod nonlinear;

pub use affine::{dot, matmul, sum, transpose};
pub use nonlinear::{quad_form, sum_largest, sum_smallest};
