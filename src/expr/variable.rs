//! Decision variables: portfolio weights, epigraph slacks, tail thresholds.

use super::expression::{Expr, ExprId, VariableData};
use super::shape::Shape;

/// Builds a variable with an optional name and a long-only bound.
#[derive(Default)]
pub struct VariableBuilder {
    shape: Shape,
    name: Option<String>,
    nonneg: bool,
}

impl VariableBuilder {
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            ..Default::default()
        }
    }

    pub fn scalar() -> Self {
        Self::new(Shape::scalar())
    }

    /// One entry per asset.
    pub fn vector(n: usize) -> Self {
        Self::new(Shape::vector(n))
    }

    /// Set the name of the variable.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Constrain the variable to be non-negative (x >= 0).
    ///
    /// The bound is added as a cone constraint when the problem is solved.
    pub fn nonneg(mut self) -> Self {
        self.nonneg = true;
        self
    }

    /// Build the variable expression.
    pub fn build(self) -> Expr {
        Expr::Variable(VariableData {
            id: ExprId::new(),
            shape: self.shape,
            name: self.name,
            nonneg: self.nonneg,
        })
    }
}

/// Create a variable with the given shape.
///
/// # Examples
///
/// ```
/// use cvxfolio::expr::variable;
///
/// // Scalar variable
/// let t = variable(());
///
/// // One weight per asset
/// let w = variable(4);
/// ```
pub fn variable(shape: impl Into<Shape>) -> Expr {
    VariableBuilder::new(shape).build()
}

/// Extension trait for variable-like operations on Expr.
pub trait VariableExt {
    /// Mark this variable as non-negative.
    fn nonneg(self) -> Expr;

    /// Give a name to this expression (if it's a variable).
    fn named(self, name: impl Into<String>) -> Expr;
}

impl VariableExt for Expr {
    fn nonneg(self) -> Expr {
        match self {
            Expr::Variable(mut v) => {
                v.nonneg = true;
                Expr::Variable(v)
            }
            other => other,
        }
    }

    fn named(self, name: impl Into<String>) -> Expr {
        match self {
            Expr::Variable(mut v) => {
                v.name = Some(name.into());
                Expr::Variable(v)
            }
            other => other,
        }
    }
}

/// Create a named variable with the given shape.
pub fn named_variable(name: impl Into<String>, shape: impl Into<Shape>) -> Expr {
    VariableBuilder::new(shape).name(name).build()
}

/// Create a non-negative variable with the given shape.
pub fn nonneg_variable(shape: impl Into<Shape>) -> Expr {
    VariableBuilder::new(shape).nonneg().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_variable_builder() {
        let w = VariableBuilder::vector(5).name("weights").nonneg().build();

        if let Expr::Variable(v) = &w {
            assert_eq!(v.shape, Shape::vector(5));
            assert_eq!(v.name.as_deref(), Some("weights"));
            assert!(v.nonneg);
        } else {
            panic!("Expected Variable");
        }
    }

    #[test]
    fn test_variable_ext() {
        let w = variable(3).nonneg().named("w");
        if let Expr::Variable(v) = &w {
            assert!(v.nonneg);
            assert_eq!(v.name.as_deref(), Some("w"));
        } else {
            panic!("Expected Variable");
        }
    }

    #[test]
    fn test_ext_on_non_variable_is_noop() {
        let c = crate::expr::constant(1.0).nonneg();
        assert!(c.is_constant());
    }

    #[test]
    fn test_scalar_variable() {
        assert_eq!(VariableBuilder::scalar().build().shape(), Shape::scalar());
        assert_eq!(named_variable("t", ()).shape(), Shape::scalar());
    }
}
