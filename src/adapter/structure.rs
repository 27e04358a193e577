//! Dimension probing and Jacobian sparsity-structure discovery.
//!
//! Both run exactly once, at construction, from a single evaluation pass at
//! the initial point. Everything they produce (group dimensions, stacking
//! offsets, the global row/column index arrays) is immutable for the
//! problem's lifetime; the per-call Jacobian value pass consumes the
//! discovered [`GroupPattern`]s directly so the value order can never drift
//! from the structure order.

use ndarray::ArrayView1;

use crate::adapter::constraint::{Constraint, ConstraintEval, ConstraintJacobian};
use crate::error::{Error, Result};

/// Ordering token for one group's slice of the stacked Jacobian.
#[derive(Debug)]
pub(crate) enum GroupPattern {
    /// Fully populated `nrows x n` block, enumerated row-major.
    Dense { nrows: usize },
    /// Native triplet coordinates, in the evaluator's own order. Row indices
    /// are local to the group; the global arrays carry the row offset.
    Sparse { rows: Vec<usize>, cols: Vec<usize> },
}

impl GroupPattern {
    pub(crate) fn nnz(&self, n: usize) -> usize {
        match self {
            GroupPattern::Dense { nrows } => nrows * n,
            GroupPattern::Sparse { rows, .. } => rows.len(),
        }
    }
}

/// The immutable structural description of a stacked constraint system.
#[derive(Debug)]
pub struct ProblemStructure {
    /// Number of variables.
    pub n: usize,
    /// Total stacked constraint dimension, `sum(dims)`.
    pub m: usize,
    /// Discovered output dimension of each group, in declaration order.
    pub dims: Vec<usize>,
    /// Start of each group's row range in the stacked vector.
    pub offsets: Vec<usize>,
    pub(crate) patterns: Vec<GroupPattern>,
    /// Global row indices of the stacked Jacobian nonzeros.
    pub rows: Vec<i32>,
    /// Global column indices, parallel to `rows`.
    pub cols: Vec<i32>,
}

impl ProblemStructure {
    /// Probe every group once at `x0`: measure its output dimension and
    /// classify its Jacobian. A fused evaluator is called once and both
    /// halves are used, so no redundant evaluation happens.
    pub fn discover(constraints: &[Constraint], x0: ArrayView1<f64>) -> Result<Self> {
        let n = x0.len();
        let mut dims = Vec::with_capacity(constraints.len());
        let mut offsets = Vec::with_capacity(constraints.len());
        let mut patterns = Vec::with_capacity(constraints.len());
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut offset = 0usize;

        for (i, con) in constraints.iter().enumerate() {
            let (value, probe_jac) = match &con.eval {
                ConstraintEval::Value(f) => (f(x0), con.jacobian.as_ref().map(|j| j(x0))),
                ConstraintEval::ValueAndJacobian(f) => {
                    if con.jacobian.is_some() {
                        return Err(Error::Config(format!(
                            "constraint group {i} supplies both a fused evaluator and a \
                             separate jacobian"
                        )));
                    }
                    let (v, j) = f(x0);
                    (v, Some(j))
                }
            };
            if value.iter().any(|v| v.is_nan()) {
                return Err(Error::Config(format!(
                    "constraint group {i} is not defined at the initial point"
                )));
            }
            let dim = value.len();

            let pattern = match probe_jac {
                // Approximated by finite differences later: fully dense.
                None => GroupPattern::Dense { nrows: dim },
                Some(ConstraintJacobian::Dense(block)) => {
                    if block.nrows() != dim || block.ncols() != n {
                        return Err(Error::Config(format!(
                            "constraint group {i} jacobian has shape {}x{}, expected {dim}x{n}",
                            block.nrows(),
                            block.ncols()
                        )));
                    }
                    GroupPattern::Dense { nrows: dim }
                }
                Some(ConstraintJacobian::Sparse(tri)) => {
                    if tri.rows() != dim || tri.cols() != n {
                        return Err(Error::Config(format!(
                            "constraint group {i} sparse jacobian has shape {}x{}, \
                             expected {dim}x{n}",
                            tri.rows(),
                            tri.cols()
                        )));
                    }
                    GroupPattern::Sparse {
                        rows: tri.row_inds().to_vec(),
                        cols: tri.col_inds().to_vec(),
                    }
                }
            };

            match &pattern {
                GroupPattern::Dense { nrows } => {
                    for r in 0..*nrows {
                        for c in 0..n {
                            rows.push((offset + r) as i32);
                            cols.push(c as i32);
                        }
                    }
                }
                GroupPattern::Sparse { rows: gr, cols: gc } => {
                    for (&r, &c) in gr.iter().zip(gc) {
                        rows.push((offset + r) as i32);
                        cols.push(c as i32);
                    }
                }
            }

            dims.push(dim);
            offsets.push(offset);
            patterns.push(pattern);
            offset += dim;
        }

        Ok(ProblemStructure {
            n,
            m: offset,
            dims,
            offsets,
            patterns,
            rows,
            cols,
        })
    }

    /// Number of structural nonzeros in the stacked Jacobian.
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::constraint::ConstraintKind;
    use ndarray::{array, Array1, Array2};
    use sprs::TriMat;

    fn x0() -> Array1<f64> {
        array![2.0, 2.0]
    }

    #[test]
    fn dense_single_group_enumerates_row_major() {
        // A 2x2 identity-like dense jacobian over n=2 variables.
        let con = Constraint::equality(|x| array![x[0], x[1]])
            .jacobian(|_| ConstraintJacobian::Dense(Array2::eye(2)));
        let s = ProblemStructure::discover(&[con], x0().view()).unwrap();
        assert_eq!(s.rows, vec![0, 0, 1, 1]);
        assert_eq!(s.cols, vec![0, 1, 0, 1]);
        assert_eq!(s.dims, vec![2]);
        assert_eq!(s.m, 2);
    }

    #[test]
    fn sparse_group_keeps_native_coordinates_shifted_by_row_offset() {
        let dense_first = Constraint::equality(|x| array![x[0] + x[1]]);
        let sparse_second = Constraint::inequality(|x| array![x[0], x[1]]).jacobian(|_| {
            let mut tri = TriMat::new((2, 2));
            // Deliberately not in row-major order: the native order must
            // survive discovery untouched.
            tri.add_triplet(1, 1, 4.0);
            tri.add_triplet(0, 0, 3.0);
            ConstraintJacobian::Sparse(tri)
        });
        let s = ProblemStructure::discover(&[dense_first, sparse_second], x0().view()).unwrap();
        // Group 0: dense 1x2 block at rows [0]. Group 1: triplets shifted by
        // its row offset of 1.
        assert_eq!(s.rows, vec![0, 0, 2, 1]);
        assert_eq!(s.cols, vec![0, 1, 1, 0]);
        assert_eq!(s.offsets, vec![0, 1]);
        assert_eq!(s.m, 3);
        assert_eq!(s.nnz(), 4);
    }

    #[test]
    fn missing_jacobian_means_dense() {
        let con = Constraint::inequality(|x| array![x[0], x[1], x[0] * x[1]]);
        let s = ProblemStructure::discover(&[con], x0().view()).unwrap();
        assert_eq!(s.nnz(), 3 * 2);
        assert_eq!(s.dims, vec![3]);
    }

    #[test]
    fn fused_evaluator_is_probed_once_for_both_halves() {
        let con = Constraint::new_fused(ConstraintKind::Equality, |x| {
            (array![x[0] - x[1]], ConstraintJacobian::Dense(array![[1.0, -1.0]]))
        });
        let s = ProblemStructure::discover(&[con], x0().view()).unwrap();
        assert_eq!(s.dims, vec![1]);
        assert_eq!(s.rows, vec![0, 0]);
        assert_eq!(s.cols, vec![0, 1]);
    }

    #[test]
    fn fused_plus_separate_jacobian_is_rejected() {
        let con = Constraint::new_fused(ConstraintKind::Equality, |x| {
            (array![x[0]], ConstraintJacobian::Dense(array![[1.0, 0.0]]))
        })
        .jacobian(|_| ConstraintJacobian::Dense(array![[1.0, 0.0]]));
        let err = ProblemStructure::discover(&[con], x0().view()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn misshapen_dense_jacobian_fails_at_discovery_not_mid_solve() {
        let con = Constraint::equality(|x| array![x[0]])
            .jacobian(|_| ConstraintJacobian::Dense(Array2::zeros((3, 2))));
        let err = ProblemStructure::discover(&[con], x0().view()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn nan_probe_value_is_a_configuration_error() {
        let con = Constraint::equality(|x| array![(x[0] - 3.0).sqrt()]);
        let err = ProblemStructure::discover(&[con], x0().view()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_constraint_list_yields_an_empty_structure() {
        let s = ProblemStructure::discover(&[], x0().view()).unwrap();
        assert_eq!(s.m, 0);
        assert_eq!(s.nnz(), 0);
        assert!(s.dims.is_empty());
    }
}
