//! Expression types and creation utilities.
//!
//! This module provides the core expression types for building optimization problems:
//! - `Expr` - The main expression enum representing all expressions
//! - `Shape` - Shape information for expressions
//! - Variable creation via `variable()` and `VariableBuilder`
//! - Constant creation via `constant()` and related functions
//! - Numeric evaluation of an expression at given variable values

pub mod constant;
pub mod eval;
pub mod expression;
pub mod shape;
pub mod variable;

// Re-export main types
pub use constant::{constant, constant_dmatrix, constant_matrix, constant_vec, ones, IntoConstant};
pub use expression::{Array, ConstantData, Expr, ExprId, VariableData};
pub use shape::Shape;
pub use variable::{named_variable, nonneg_variable, variable, VariableBuilder, VariableExt};
