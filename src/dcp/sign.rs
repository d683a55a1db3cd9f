//! Sign inference.
//!
//! Curvature rules for `k * f` and `quad_form(w, sigma)` depend on the sign
//! of the scalar or matrix involved, so a risk-aversion weight or a
//! long-only weight vector carries its sign through the tree.

use crate::expr::Expr;

/// What is known about the sign of every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Nonnegative,
    Nonpositive,
    Zero,
    /// Mixed or undetermined, e.g. a return matrix with gains and losses.
    Unknown,
}

impl Sign {
    pub fn is_nonneg(self) -> bool {
        matches!(self, Sign::Nonnegative | Sign::Zero)
    }

    pub fn is_nonpos(self) -> bool {
        matches!(self, Sign::Nonpositive | Sign::Zero)
    }

    /// Sign of `-x`.
    pub fn negate(self) -> Self {
        match self {
            Sign::Nonnegative => Sign::Nonpositive,
            Sign::Nonpositive => Sign::Nonnegative,
            other => other,
        }
    }
}

/// Combine signs for addition: a + b.
pub fn add_sign(a: Sign, b: Sign) -> Sign {
    use Sign::*;
    match (a, b) {
        (Zero, x) | (x, Zero) => x,
        (Nonnegative, Nonnegative) => Nonnegative,
        (Nonpositive, Nonpositive) => Nonpositive,
        _ => Unknown,
    }
}

/// Combine signs for multiplication: a * b.
pub fn mul_sign(a: Sign, b: Sign) -> Sign {
    use Sign::*;
    match (a, b) {
        (Zero, _) | (_, Zero) => Zero,
        (Nonnegative, Nonnegative) | (Nonpositive, Nonpositive) => Nonnegative,
        (Nonnegative, Nonpositive) | (Nonpositive, Nonnegative) => Nonpositive,
        (Unknown, _) | (_, Unknown) => Unknown,
    }
}

impl Expr {
    /// Get the sign of this expression.
    pub fn sign(&self) -> Sign {
        match self {
            Expr::Variable(v) => {
                if v.nonneg {
                    Sign::Nonnegative
                } else {
                    Sign::Unknown
                }
            }
            Expr::Constant(c) => match (c.value.is_nonneg(), c.value.is_nonpos()) {
                (true, true) => Sign::Zero,
                (true, false) => Sign::Nonnegative,
                (false, true) => Sign::Nonpositive,
                (false, false) => Sign::Unknown,
            },

            Expr::Add(a, b) => add_sign(a.sign(), b.sign()),
            Expr::Neg(a) => a.sign().negate(),
            Expr::Mul(a, b) => mul_sign(a.sign(), b.sign()),
            // A sum of same-signed products keeps the product sign
            Expr::MatMul(a, b) => mul_sign(a.sign(), b.sign()),
            Expr::Sum(a) | Expr::Transpose(a) => a.sign(),

            Expr::QuadForm(_, p) => {
                use super::curvature::PsdStatus;
                match p.constant_value().map(PsdStatus::of_array) {
                    Some(PsdStatus::Psd) => Sign::Nonnegative,
                    Some(PsdStatus::Nsd) => Sign::Nonpositive,
                    _ => Sign::Unknown,
                }
            }
            Expr::SumLargest(x, _) | Expr::SumSmallest(x, _) => x.sign(),
        }
    }

    /// Check if this expression is non-negative.
    pub fn is_nonneg(&self) -> bool {
        self.sign().is_nonneg()
    }

    /// Check if this expression is non-positive.
    pub fn is_nonpos(&self) -> bool {
        self.sign().is_nonpos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::{dot, sum, sum_smallest};
    use crate::expr::{constant, constant_vec, nonneg_variable, variable};

    #[test]
    fn test_sign_basics() {
        assert!(Sign::Zero.is_nonneg());
        assert!(Sign::Zero.is_nonpos());
        assert!(!Sign::Nonnegative.is_nonpos());
        assert_eq!(Sign::Nonnegative.negate(), Sign::Nonpositive);
    }

    #[test]
    fn test_add_and_mul_sign() {
        use Sign::*;
        assert_eq!(add_sign(Nonnegative, Nonpositive), Unknown);
        assert_eq!(add_sign(Zero, Nonpositive), Nonpositive);
        assert_eq!(mul_sign(Nonpositive, Nonpositive), Nonnegative);
        assert_eq!(mul_sign(Zero, Unknown), Zero);
    }

    #[test]
    fn test_long_only_weights() {
        let w = nonneg_variable(3);
        assert_eq!(w.sign(), Sign::Nonnegative);
        assert_eq!(sum(&w).sign(), Sign::Nonnegative);
        assert_eq!(variable(3).sign(), Sign::Unknown);
    }

    #[test]
    fn test_constant_sign() {
        assert_eq!(constant(5.0).sign(), Sign::Nonnegative);
        assert_eq!(constant(-5.0).sign(), Sign::Nonpositive);
        assert_eq!(constant(0.0).sign(), Sign::Zero);
    }

    #[test]
    fn test_mixed_returns_have_unknown_sign() {
        let w = nonneg_variable(2);
        let mu = constant_vec(vec![0.01, -0.02]);
        let tail = sum_smallest(&dot(&mu, &w), 1);
        assert_eq!(tail.sign(), Sign::Unknown);
    }
}
