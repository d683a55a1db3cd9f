//! # cvxfolio
//!
//! Convex portfolio allocation in Rust.
//!
//! cvxfolio selects asset weights from a history of returns under one of
//! three policies:
//!
//! - **Simple return**: maximize expected return, fully invested and long only
//! - **Mean-variance**: maximize `w'mu - gamma * w'Sigma w`, fully invested and long only
//! - **Alpha with downside floor**: maximize `w'alpha` while the average of
//!   the worst historical periods stays above a loss floor
//!
//! The programs are written in a small Disciplined Convex Programming (DCP)
//! layer and solved with Clarabel.
//!
//! ## Quick Start
//!
//! ```
//! use cvxfolio::portfolio::{optimize, DownsideSpec, ReturnMatrix, Strategy};
//!
//! let returns = ReturnMatrix::from_rows(&[
//!     vec![0.01, -0.02],
//!     vec![0.02, 0.01],
//!     vec![-0.03, 0.04],
//!     vec![0.00, 0.02],
//! ])?;
//!
//! let strategy = Strategy::AlphaDownside {
//!     alphas: vec![1.0, -1.0],
//!     downside: DownsideSpec::new(0.5, -0.015)?,
//!     long_only: true,
//! };
//! let result = optimize(&returns, &strategy)?;
//! println!("{:?} {:?}", result.status, result.weights);
//! # Ok::<(), cvxfolio::FolioError>(())
//! ```
//!
//! ## DCP Rules
//!
//! The modeling layer enforces Disciplined Convex Programming rules:
//!
//! - **Minimization** requires a **convex** objective
//! - **Maximization** requires a **concave** objective
//! - **Equality constraints** require **affine** expressions
//! - **Inequality constraints** (>=) require **concave** left-hand side
//!
//! ## Supported Atoms
//!
//! ### Affine
//! - Arithmetic: `+`, `-`, `*` (by scalar or elementwise constant), `/` (by scalar)
//! - `sum`, `transpose`, `matmul`, `dot`
//!
//! ### Convex
//! - `quad_form` (with PSD matrix), `sum_largest`
//!
//! ### Concave
//! - `quad_form` (with NSD matrix), `sum_smallest`
//!
//! ## Architecture
//!
//! - **Expression trees** built using the `Expr` enum with `Arc` sharing
//! - **DCP verification** via curvature and sign tracking
//! - **Canonicalization** to affine expressions plus zero and nonnegative cones
//! - **Native QP** for quadratic objectives
//! - **Portfolio engine** in [`portfolio`] on top of the modeling layer

pub mod atoms;
pub mod canon;
pub mod constraints;
pub mod dcp;
pub mod error;
pub mod expr;
pub mod portfolio;
pub mod problem;
pub mod solver;
pub mod sparse;

/// Prelude module for convenient imports.
///
/// ```
/// use cvxfolio::prelude::*;
/// ```
pub mod prelude {
    // Expression types
    pub use crate::expr::{
        constant, constant_dmatrix, constant_matrix, constant_vec, named_variable,
        nonneg_variable, ones, variable, Array, Expr, ExprId, IntoConstant, Shape,
        VariableBuilder, VariableExt,
    };

    // Atoms
    pub use crate::atoms::{dot, matmul, quad_form, sum, sum_largest, sum_smallest, transpose};

    // Constraints
    pub use crate::constraints::{Constraint, ConstraintExt};

    // DCP
    pub use crate::dcp::{Curvature, Sign};

    // Problem
    pub use crate::problem::{Objective, Problem, ProblemBuilder};

    // Solver
    pub use crate::solver::{Settings, Solution, SolveStatus};

    // Portfolio engine
    pub use crate::portfolio::{
        optimize, optimize_with, DownsideSpec, PortfolioStatus, ReturnMatrix, SolveResult,
        Strategy,
    };

    // Errors
    pub use crate::error::{FolioError, Result};
}

// Re-export main types at crate root
pub use error::{FolioError, Result};
pub use problem::Problem;
pub use solver::{Solution, SolveStatus};
