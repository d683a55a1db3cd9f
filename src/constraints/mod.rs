//! Constraints built from expressions.

pub mod constraint;

pub use constraint::{Constraint, ConstraintExt};
