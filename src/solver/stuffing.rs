//! Matrix stuffing: converts canonicalized expressions to solver format.
//!
//! This module builds the matrices (P, q, A, b) and cone specifications
//! required by Clarabel from the canonicalized problem.

use std::collections::HashMap;

use nalgebra_sparse::CscMatrix;

use crate::canon::{ConeConstraint, LinExpr, QuadExpr};
use crate::expr::{ExprId, Shape};
use crate::sparse::{csc_from_triplets, csc_scale};

/// Cone dimensions for Clarabel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Number of zero cone (equality) rows.
    pub zero: usize,
    /// Number of nonnegative cone rows.
    pub nonneg: usize,
}

impl ConeDims {
    /// Total number of constraint rows.
    pub fn total(&self) -> usize {
        self.zero + self.nonneg
    }
}

/// Mapping from variable IDs to column indices in the optimization variable.
#[derive(Debug, Clone)]
pub struct VariableMap {
    /// Map from variable ID to (start_col, size).
    pub id_to_col: HashMap<ExprId, (usize, usize)>,
    /// Total number of optimization variables.
    pub total_vars: usize,
}

impl VariableMap {
    /// Create from a list of (variable_id, shape) pairs.
    pub fn from_vars(vars: &[(ExprId, Shape)]) -> Self {
        let mut id_to_col = HashMap::new();
        let mut offset = 0;

        for (var_id, shape) in vars {
            let size = shape.size();
            id_to_col.insert(*var_id, (offset, size));
            offset += size;
        }

        VariableMap {
            id_to_col,
            total_vars: offset,
        }
    }

    /// Get the column range for a variable.
    pub fn get(&self, var_id: ExprId) -> Option<(usize, usize)> {
        self.id_to_col.get(&var_id).copied()
    }
}

/// Stuffed problem ready for Clarabel.
#[derive(Debug)]
pub struct StuffedProblem {
    /// Quadratic cost matrix P (n x n, upper triangle).
    pub p: CscMatrix<f64>,
    /// Linear cost vector q (n).
    pub q: Vec<f64>,
    /// Constraint matrix A (m x n).
    pub a: CscMatrix<f64>,
    /// Constraint vector b (m).
    pub b: Vec<f64>,
    /// Cone dimensions.
    pub cone_dims: ConeDims,
    /// Variable mapping for solution recovery.
    pub var_map: VariableMap,
    /// Constant offset in objective.
    pub objective_offset: f64,
}

/// Build the stuffed problem from canonicalized components.
pub fn stuff_problem(
    objective: &QuadExpr,
    constraints: &[ConeConstraint],
    variables: &[(ExprId, Shape)],
) -> StuffedProblem {
    let var_map = VariableMap::from_vars(variables);
    let (p, q) = stuff_objective(objective, &var_map);
    let (a, b, cone_dims) = stuff_constraints(constraints, &var_map);

    StuffedProblem {
        p,
        q,
        a,
        b,
        cone_dims,
        var_map,
        objective_offset: objective.constant,
    }
}

/// Stuff the objective into P and q.
fn stuff_objective(objective: &QuadExpr, var_map: &VariableMap) -> (CscMatrix<f64>, Vec<f64>) {
    let n = var_map.total_vars;

    // A scalar objective has a single-row coefficient per variable
    let mut q = vec![0.0; n];
    for (var_id, coeff) in &objective.linear.coeffs {
        if let Some((start, size)) = var_map.get(*var_id) {
            for (_row, col, val) in coeff.triplet_iter() {
                if col < size {
                    q[start + col] += *val;
                }
            }
        }
    }

    let mut p_rows = Vec::new();
    let mut p_cols = Vec::new();
    let mut p_vals = Vec::new();

    for ((var_i, var_j), coeff) in &objective.quad_coeffs {
        if let (Some((start_i, _)), Some((start_j, _))) =
            (var_map.get(*var_i), var_map.get(*var_j))
        {
            for (row, col, val) in coeff.triplet_iter() {
                let global_row = start_i + row;
                let global_col = start_j + col;
                // Clarabel reads the upper triangle of the symmetric P
                if global_row <= global_col {
                    p_rows.push(global_row);
                    p_cols.push(global_col);
                    p_vals.push(*val);
                }
            }
        }
    }

    let p = csc_from_triplets(n, n, p_rows, p_cols, p_vals);

    // Clarabel minimizes (1/2) x' P x + q' x
    (csc_scale(&p, 2.0), q)
}

/// Stuff constraints into A, b, and cone dims.
///
/// Zero rows come first, then nonnegative rows, matching the cone order
/// handed to Clarabel.
fn stuff_constraints(
    constraints: &[ConeConstraint],
    var_map: &VariableMap,
) -> (CscMatrix<f64>, Vec<f64>, ConeDims) {
    let n = var_map.total_vars;

    let mut zeros: Vec<&LinExpr> = Vec::new();
    let mut nonnegs: Vec<&LinExpr> = Vec::new();
    for c in constraints {
        match c {
            ConeConstraint::Zero { a } => zeros.push(a),
            ConeConstraint::NonNeg { a } => nonnegs.push(a),
        }
    }

    let cone_dims = ConeDims {
        zero: zeros.iter().map(|e| e.size()).sum(),
        nonneg: nonnegs.iter().map(|e| e.size()).sum(),
    };

    let mut rows = TripletRows {
        a_rows: Vec::new(),
        a_cols: Vec::new(),
        a_vals: Vec::new(),
        b: vec![0.0; cone_dims.total()],
        offset: 0,
    };

    for expr in zeros {
        rows.push(expr, var_map, false);
    }
    for expr in nonnegs {
        rows.push(expr, var_map, true);
    }

    let a = csc_from_triplets(cone_dims.total(), n, rows.a_rows, rows.a_cols, rows.a_vals);
    (a, rows.b, cone_dims)
}

/// Accumulates constraint rows in triplet form.
struct TripletRows {
    a_rows: Vec<usize>,
    a_cols: Vec<usize>,
    a_vals: Vec<f64>,
    b: Vec<f64>,
    offset: usize,
}

impl TripletRows {
    /// Stuff a single linear expression `expr = C x + d` into A and b.
    ///
    /// Clarabel's form is `A x + s = b` with `s` in the cone.
    /// - Zero cone, `C x + d = 0`: A = C, b = -d (s = 0)
    /// - NonNeg cone, `C x + d >= 0`: A = -C, b = d (s = C x + d)
    fn push(&mut self, expr: &LinExpr, var_map: &VariableMap, negate: bool) {
        let sign = if negate { -1.0 } else { 1.0 };

        for (var_id, coeff) in &expr.coeffs {
            if let Some((col_start, _)) = var_map.get(*var_id) {
                for (row, col, val) in coeff.triplet_iter() {
                    self.a_rows.push(self.offset + row);
                    self.a_cols.push(col_start + col);
                    self.a_vals.push(*val * sign);
                }
            }
        }

        for (idx, d) in expr.flat_constant().into_iter().enumerate().take(expr.size()) {
            self.b[self.offset + idx] = -sign * d;
        }
        self.offset += expr.size();
    }
}
