//! Solve tests for the modeling layer.
//!
//! Test cases are defined as data, then run programmatically.

use cvxfolio::prelude::*;
use nalgebra::DMatrix;

/// Tolerance for comparing floating point results
const TOL: f64 = 1e-4;

/// A test case definition
struct TestCase {
    name: &'static str,
    /// Function that builds the problem and returns (problem, expected_value)
    build: fn() -> (Problem, f64),
}

/// All minimize test cases
fn minimize_test_cases() -> Vec<TestCase> {
    vec![
        // ========== Linear Programs ==========
        TestCase {
            name: "sum_nonneg_constraint",
            build: || {
                // minimize sum(x) s.t. x >= 1, x in R^5
                // optimal: x = [1,1,1,1,1], value = 5
                let x = variable(5);
                let prob = Problem::minimize(sum(&x))
                    .subject_to([x.geq(&constant(1.0))])
                    .build();
                (prob, 5.0)
            },
        },
        TestCase {
            name: "sum_equality_constraint",
            build: || {
                // minimize sum(x) s.t. x == 2, x in R^3
                let x = variable(3);
                let prob = Problem::minimize(sum(&x))
                    .subject_to([x.equals(2.0)])
                    .build();
                (prob, 6.0)
            },
        },
        TestCase {
            name: "sum_upper_bound",
            build: || {
                // minimize -sum(x) s.t. x <= 3, x in R^4
                let x = variable(4);
                let neg_sum = &constant(-1.0) * &sum(&x);
                let prob = Problem::minimize(neg_sum)
                    .subject_to([x.leq(3.0)])
                    .build();
                (prob, -12.0)
            },
        },
        TestCase {
            name: "weighted_sum",
            build: || {
                // minimize 2*x + 3*y s.t. x >= 1, y >= 2
                let x = variable(1);
                let y = variable(1);
                let obj = &(2.0 * &x) + &(3.0 * &y);
                let prob = Problem::minimize(obj)
                    .subject_to([x.geq(1.0), y.geq(2.0)])
                    .build();
                (prob, 8.0)
            },
        },
        TestCase {
            name: "matmul_lower_bounds",
            build: || {
                // minimize x1 + x2 s.t. x1 + 2 x2 >= 4, 3 x1 + x2 >= 3
                // optimal: x = [0.4, 1.8], value = 2.2
                let x = variable(2);
                let a = constant_dmatrix(DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 1.0]));
                let prob = Problem::minimize(sum(&x))
                    .subject_to([matmul(&a, &x).geq(constant_vec(vec![4.0, 3.0]))])
                    .build();
                (prob, 2.2)
            },
        },

        // ========== Order statistics ==========
        TestCase {
            name: "sum_largest_spread",
            build: || {
                // minimize the two largest of x s.t. sum(x) = 3, x in R^3
                // optimal: x = [1,1,1], value = 2
                let x = variable(3);
                let prob = Problem::minimize(sum_largest(&x, 2))
                    .subject_to([sum(&x).equals(3.0)])
                    .build();
                (prob, 2.0)
            },
        },

        // ========== Quadratic Programs ==========
        TestCase {
            name: "quad_form_identity",
            build: || {
                // minimize x'x s.t. sum(x) = 2
                let x = variable(2);
                let eye = constant_dmatrix(DMatrix::identity(2, 2));
                let prob = Problem::minimize(quad_form(&x, &eye))
                    .subject_to([sum(&x).equals(2.0)])
                    .build();
                (prob, 2.0)
            },
        },
        TestCase {
            name: "quad_form_plus_linear",
            build: || {
                // minimize x'x - 2 sum(x) s.t. x <= 10
                // optimal: x = [1,1], value = -2
                let x = variable(2);
                let eye = constant_dmatrix(DMatrix::identity(2, 2));
                let prob = Problem::minimize(&quad_form(&x, &eye) - &(2.0 * &sum(&x)))
                    .subject_to([x.leq(10.0)])
                    .build();
                (prob, -2.0)
            },
        },
        TestCase {
            name: "quad_form_non_diagonal",
            build: || {
                // P = [[2, 1], [1, 2]], minimize x'Px s.t. x1 + x2 = 1
                // optimal: x = [0.5, 0.5], value = 1.5
                let p = constant_dmatrix(DMatrix::from_vec(2, 2, vec![2.0, 1.0, 1.0, 2.0]));
                let x = variable(2);
                let prob = Problem::minimize(quad_form(&x, &p))
                    .subject_to([sum(&x).equals(1.0)])
                    .build();
                (prob, 1.5)
            },
        },
    ]
}

fn maximize_test_cases() -> Vec<TestCase> {
    vec![
        TestCase {
            name: "maximize_sum_upper_bound",
            build: || {
                // maximize sum(x) s.t. x <= 2, x in R^3
                let x = variable(3);
                let prob = Problem::maximize(sum(&x))
                    .subject_to([x.leq(2.0)])
                    .build();
                (prob, 6.0)
            },
        },
        TestCase {
            name: "maximize_sum_smallest",
            build: || {
                // maximize the two smallest of x s.t. x <= [1, 2, 3]
                // optimal: x = [1, 2, 3], value = 3
                let x = variable(3);
                let prob = Problem::maximize(sum_smallest(&x, 2))
                    .subject_to([x.leq(constant_vec(vec![1.0, 2.0, 3.0]))])
                    .build();
                (prob, 3.0)
            },
        },
        TestCase {
            name: "maximize_mean_minus_variance",
            build: || {
                // maximize mu'x - x'x with mu = [2, 4], x <= 10
                // optimal: x = mu / 2, value = 10 - 5 = 5
                let x = variable(2);
                let mu = constant_vec(vec![2.0, 4.0]);
                let eye = constant_dmatrix(DMatrix::identity(2, 2));
                let prob = Problem::maximize(&dot(&mu, &x) - &quad_form(&x, &eye))
                    .subject_to([x.leq(10.0)])
                    .build();
                (prob, 5.0)
            },
        },
    ]
}

/// Test cases expected to be infeasible
fn infeasible_test_cases() -> Vec<(&'static str, Problem)> {
    vec![
        ("infeasible_bounds", {
            // x >= 1 and x <= 0 is infeasible
            let x = variable(3);
            Problem::minimize(sum(&x))
                .subject_to([x.geq(1.0), x.leq(0.0)])
                .build()
        }),
        ("infeasible_equality", {
            // x == 1 and x == 2 is infeasible
            let x = variable(1);
            Problem::minimize(sum(&x))
                .subject_to([x.equals(1.0), x.equals(2.0)])
                .build()
        }),
        ("infeasible_tail_floor", {
            // the two smallest of x cannot average above their cap
            let x = variable(2);
            Problem::maximize(sum(&x))
                .subject_to([x.leq(0.0), (sum_smallest(&x, 2) / 2.0).geq(0.5)])
                .build()
        }),
    ]
}

/// Test cases expected to be unbounded
fn unbounded_test_cases() -> Vec<(&'static str, Problem)> {
    vec![
        ("unbounded_below", {
            // minimize sum(x) with only upper bound
            let x = variable(3);
            Problem::minimize(sum(&x)).subject_to([x.leq(1.0)]).build()
        }),
        ("unbounded_above", {
            // maximize sum(x) with only lower bound
            let x = variable(3);
            Problem::maximize(sum(&x)).subject_to([x.geq(1.0)]).build()
        }),
    ]
}

// ============================================================================
// Test runner
// ============================================================================

fn run_cases(cases: Vec<TestCase>) {
    for case in cases {
        let (prob, expected) = (case.build)();

        assert!(prob.is_dcp(), "Problem '{}' should be DCP", case.name);

        let result = prob.solve();
        assert!(result.is_ok(), "Problem '{}' should solve: {:?}", case.name, result.err());

        let solution = result.unwrap();
        assert_eq!(
            solution.status,
            SolveStatus::Optimal,
            "Problem '{}' should be optimal, got {:?}",
            case.name,
            solution.status
        );

        let value = solution.value.expect("should have value");
        let rel_err = (value - expected).abs() / (1.0 + expected.abs());
        assert!(
            rel_err < TOL,
            "Problem '{}': expected {}, got {} (rel_err={})",
            case.name,
            expected,
            value,
            rel_err
        );
    }
}

#[test]
fn test_minimize_atoms() {
    run_cases(minimize_test_cases());
}

#[test]
fn test_maximize_atoms() {
    run_cases(maximize_test_cases());
}

#[test]
fn test_infeasible() {
    for (name, prob) in infeasible_test_cases() {
        let solution = prob.solve().expect("infeasibility is a status, not an error");
        assert_eq!(
            solution.status,
            SolveStatus::Infeasible,
            "Problem '{}' should be infeasible",
            name
        );
        assert!(solution.value.is_none());
    }
}

#[test]
fn test_unbounded() {
    for (name, prob) in unbounded_test_cases() {
        let solution = prob.solve().expect("unboundedness is a status, not an error");
        assert_eq!(
            solution.status,
            SolveStatus::Unbounded,
            "Problem '{}' should be unbounded",
            name
        );
    }
}

// ============================================================================
// Solution access
// ============================================================================

#[test]
fn test_primal_values() {
    // minimize sum(x) s.t. x >= [1, 2, 3]
    let x = variable(3);
    let solution = Problem::minimize(sum(&x))
        .subject_to([x.geq(constant_vec(vec![1.0, 2.0, 3.0]))])
        .solve()
        .unwrap();

    let values = solution.vector(&x).unwrap();
    for (got, want) in values.iter().zip([1.0, 2.0, 3.0]) {
        assert!((got - want).abs() < TOL, "expected {}, got {}", want, got);
    }
    assert!(solution.try_value(&x).is_err(), "vector variable is not scalar");
}

#[test]
fn test_scalar_value_and_eval() {
    let x = variable(1);
    let y = variable(1);
    let solution = Problem::minimize(&x + &y)
        .subject_to([x.geq(1.0), y.geq(2.0)])
        .solve()
        .unwrap();

    assert!((solution.try_value(&x).unwrap() - 1.0).abs() < TOL);
    let total = solution.eval(&(&x + &y)).unwrap();
    assert!((total[(0, 0)] - 3.0).abs() < TOL);

    // Not a variable
    assert!(solution.try_value(&(&x + &y)).is_err());
}

#[test]
fn test_sum_smallest_in_constraint() {
    // maximize sum(x) s.t. x <= 1, average of the worst two >= 0.25, x in R^3
    // the floor is slack at x = [1, 1, 1]
    let x = variable(3);
    let solution = Problem::maximize(sum(&x))
        .subject_to([x.leq(1.0), (sum_smallest(&x, 2) / 2.0).geq(0.25)])
        .solve()
        .unwrap();

    assert_eq!(solution.status, SolveStatus::Optimal);
    assert!((solution.value.unwrap() - 3.0).abs() < TOL);
}

#[test]
fn test_binding_tail_floor() {
    // maximize x1 - x2 s.t. the smallest entry of [x1 - 1, x2] is >= -0.5, x <= 10
    // optimal: x = [10, -0.5], value 10.5
    let x = variable(2);
    let shifted = &x - &constant_vec(vec![1.0, 0.0]);
    let d = constant_vec(vec![1.0, -1.0]);
    let solution = Problem::maximize(dot(&d, &x))
        .subject_to([
            sum_smallest(&shifted, 1).geq(-0.5),
            x.leq(constant_vec(vec![10.0, 10.0])),
        ])
        .solve()
        .unwrap();

    assert_eq!(solution.status, SolveStatus::Optimal);
    assert!((solution.value.unwrap() - 10.5).abs() < 1e-3);
}

#[test]
fn test_transpose_in_constraint() {
    // minimize sum(x) s.t. x' a >= 2 with a = [1, 1], x >= 0
    let x = variable(2);
    let a = constant_vec(vec![1.0, 1.0]);
    let solution = Problem::minimize(sum(&x))
        .subject_to([matmul(&transpose(&x), &a).geq(2.0), x.geq(0.0)])
        .solve()
        .unwrap();

    assert!((solution.value.unwrap() - 2.0).abs() < TOL);
}

#[test]
fn test_nonneg_variable() {
    let x = nonneg_variable(2);
    let solution = Problem::minimize(dot(&constant_vec(vec![1.0, 2.0]), &x))
        .subject_to([sum(&x).equals(1.0)])
        .solve()
        .unwrap();

    let values = solution.vector(&x).unwrap();
    assert!((values[0] - 1.0).abs() < TOL);
    assert!(values[1].abs() < TOL);
}

// ============================================================================
// DCP rejections
// ============================================================================

#[test]
fn test_minimize_concave_not_dcp() {
    let x = variable(3);
    let prob = Problem::minimize(sum_smallest(&x, 2)).build();
    assert!(!prob.is_dcp());
    assert!(matches!(prob.solve(), Err(FolioError::NotDcp(_))));
}

#[test]
fn test_maximize_convex_not_dcp() {
    let x = variable(3);
    let prob = Problem::maximize(sum_largest(&x, 2)).build();
    assert!(!prob.is_dcp());
}

#[test]
fn test_convex_lower_bound_not_dcp() {
    // sum_largest(x) >= 1 describes a non-convex set
    let x = variable(3);
    let prob = Problem::minimize(sum(&x))
        .subject_to([sum_largest(&x, 1).geq(1.0)])
        .build();
    assert!(!prob.is_dcp());
}

#[test]
fn test_indefinite_quad_form_not_dcp() {
    let x = variable(2);
    let p = constant_dmatrix(DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]));
    let prob = Problem::minimize(quad_form(&x, &p)).build();
    assert!(!prob.is_dcp());
}

#[test]
fn test_product_of_variables_not_dcp() {
    let x = variable(1);
    let y = variable(1);
    let prob = Problem::minimize(&x * &y).build();
    assert!(!prob.is_dcp());
}

#[test]
fn test_quad_form_in_constraint_rejected() {
    // DCP-valid, but only objectives may carry quadratic terms
    let x = variable(2);
    let eye = constant_dmatrix(DMatrix::identity(2, 2));
    let result = Problem::minimize(sum(&x))
        .subject_to([quad_form(&x, &eye).leq(1.0)])
        .solve();
    assert!(matches!(result, Err(FolioError::InvalidProblem(_))));
}

#[test]
fn test_sum_smallest_k_out_of_range() {
    let x = variable(3);
    let result = Problem::maximize(sum_smallest(&x, 4))
        .subject_to([x.leq(1.0)])
        .solve();
    assert!(matches!(result, Err(FolioError::InvalidProblem(_))));
}

// ============================================================================
// Scale
// ============================================================================

#[test]
fn test_scale_100_variables_lp() {
    let n = 100;
    let x = variable(n);
    let solution = Problem::minimize(sum(&x))
        .subject_to([x.geq(1.0)])
        .solve()
        .unwrap();
    assert!((solution.value.unwrap() - n as f64).abs() / (n as f64) < TOL);
}

#[test]
fn test_scale_30_variables_qp() {
    // minimize x'x s.t. sum(x) = 30 -> x = 1, value 30
    let n = 30;
    let x = variable(n);
    let eye = constant_dmatrix(DMatrix::identity(n, n));
    let solution = Problem::minimize(quad_form(&x, &eye))
        .subject_to([sum(&x).equals(n as f64)])
        .solve()
        .unwrap();
    assert!((solution.value.unwrap() - n as f64).abs() / (n as f64) < TOL);
}
