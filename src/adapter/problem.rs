//! The problem object handed to Ipopt: evaluates and stacks constraint
//! values, produces Jacobian values in the order fixed at discovery, and
//! assembles the Lagrangian Hessian from per-group multiplier slices.

use ndarray::{Array1, Array2, ArrayView1};

use crate::adapter::constraint::{Constraint, ConstraintEval, ConstraintJacobian};
use crate::adapter::finite_diff::{approx_fprime, approx_jacobian};
use crate::adapter::structure::{GroupPattern, ProblemStructure};
use crate::error::{Error, Result};

pub type ObjectiveFn = Box<dyn Fn(ArrayView1<f64>) -> f64>;
pub type FusedObjectiveFn = Box<dyn Fn(ArrayView1<f64>) -> (f64, Array1<f64>)>;
pub type GradientFn = Box<dyn Fn(ArrayView1<f64>) -> Array1<f64>>;
pub type ObjectiveHessianFn = Box<dyn Fn(ArrayView1<f64>) -> Array2<f64>>;

/// How the objective (and possibly its gradient) is produced.
pub(crate) enum ObjectiveEval {
    Value(ObjectiveFn),
    /// One call yields both value and gradient; the pair is cached so the
    /// solver's back-to-back objective/gradient calls at the same point cost
    /// a single evaluation.
    ValueAndGradient(FusedObjectiveFn),
}

/// Adapter between a user problem description and Ipopt's callback layout.
///
/// All structural state is fixed at construction; across solver iterations
/// only the evaluation counters and the fused-objective cache change. One
/// adapter serves one solve at a time (the solver drives its callbacks from
/// a single thread); concurrent solves need separate instances.
pub struct ProblemAdapter {
    objective: ObjectiveEval,
    gradient: Option<GradientFn>,
    obj_hessian: Option<ObjectiveHessianFn>,
    constraints: Vec<Constraint>,
    structure: ProblemStructure,
    eps: f64,
    /// Last `(x, f, grad)` from a fused objective evaluation.
    fused_cache: Option<(Vec<f64>, f64, Array1<f64>)>,
    /// Objective evaluation count.
    pub nfev: usize,
    /// Gradient evaluation count.
    pub njev: usize,
    /// Latest iteration number reported by the solver.
    pub nit: usize,
}

impl std::fmt::Debug for ProblemAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProblemAdapter")
            .field("structure", &self.structure)
            .field("eps", &self.eps)
            .field("nfev", &self.nfev)
            .field("njev", &self.njev)
            .field("nit", &self.nit)
            .finish_non_exhaustive()
    }
}

impl ProblemAdapter {
    /// Assemble an adapter. Partial Hessian information (objective with
    /// Hessian but a constraint without, or vice versa) is rejected here,
    /// before the first solver callback ever runs.
    pub(crate) fn new(
        objective: ObjectiveEval,
        gradient: Option<GradientFn>,
        obj_hessian: Option<ObjectiveHessianFn>,
        constraints: Vec<Constraint>,
        structure: ProblemStructure,
        eps: f64,
    ) -> Result<Self> {
        if gradient.is_some() && matches!(objective, ObjectiveEval::ValueAndGradient(_)) {
            return Err(Error::Config(
                "objective already returns its gradient; a separate gradient evaluator \
                 is ambiguous"
                    .into(),
            ));
        }
        let with_obj_hessian = obj_hessian.is_some();
        for (i, con) in constraints.iter().enumerate() {
            if con.hessian.is_some() != with_obj_hessian {
                return Err(Error::Config(format!(
                    "a hessian must be supplied for the objective and every constraint \
                     group, or for none of them (mismatch at constraint group {i})"
                )));
            }
        }
        Ok(ProblemAdapter {
            objective,
            gradient,
            obj_hessian,
            constraints,
            structure,
            eps,
            fused_cache: None,
            nfev: 0,
            njev: 0,
            nit: 0,
        })
    }

    pub fn n(&self) -> usize {
        self.structure.n
    }

    pub fn m(&self) -> usize {
        self.structure.m
    }

    pub fn structure(&self) -> &ProblemStructure {
        &self.structure
    }

    /// Whether second derivatives are available. When false the solver is
    /// configured for a limited-memory quasi-Newton approximation instead.
    pub fn has_hessian(&self) -> bool {
        self.obj_hessian.is_some()
    }

    /// Nonzero count of the Lagrangian Hessian's lower triangle (dense), or
    /// zero when the quasi-Newton approximation is in effect.
    pub fn hessian_nnz(&self) -> usize {
        if self.has_hessian() {
            let n = self.structure.n;
            n * (n + 1) / 2
        } else {
            0
        }
    }

    pub fn objective(&mut self, x: &[f64]) -> f64 {
        self.nfev += 1;
        let xv = ArrayView1::from(x);
        match &self.objective {
            ObjectiveEval::Value(f) => f(xv),
            ObjectiveEval::ValueAndGradient(f) => {
                let (val, grad) = f(xv);
                self.fused_cache = Some((x.to_vec(), val, grad));
                val
            }
        }
    }

    pub fn gradient(&mut self, x: &[f64]) -> Array1<f64> {
        self.njev += 1;
        let xv = ArrayView1::from(x);
        if let Some(g) = &self.gradient {
            return g(xv);
        }
        match &self.objective {
            ObjectiveEval::ValueAndGradient(f) => {
                if let Some((cached_x, _, grad)) = &self.fused_cache {
                    if cached_x.as_slice() == x {
                        return grad.clone();
                    }
                }
                let (val, grad) = f(xv);
                self.fused_cache = Some((x.to_vec(), val, grad.clone()));
                grad
            }
            ObjectiveEval::Value(f) => approx_fprime(x, |p| f(p), self.eps),
        }
    }

    /// Evaluate every group in declaration order and concatenate. Empty for
    /// an unconstrained problem.
    pub fn constraints(&self, x: &[f64]) -> Array1<f64> {
        let xv = ArrayView1::from(x);
        let mut stacked = Vec::with_capacity(self.structure.m);
        for con in &self.constraints {
            stacked.extend(con.value(xv));
        }
        Array1::from(stacked)
    }

    /// The precomputed global (row, col) index arrays. Stable for the
    /// adapter's lifetime.
    pub fn jacobian_structure(&self) -> (&[i32], &[i32]) {
        (&self.structure.rows, &self.structure.cols)
    }

    /// Jacobian values, element-for-element in the order fixed by
    /// [`Self::jacobian_structure`]. A group whose evaluator diverges from
    /// its discovered pattern (changed representation, shape, or nonzero
    /// count) produces an error that the callback layer reports to the
    /// solver as a failed evaluation.
    pub fn jacobian(&self, x: &[f64]) -> std::result::Result<Vec<f64>, String> {
        let xv = ArrayView1::from(x);
        let n = self.structure.n;
        let mut values = Vec::with_capacity(self.structure.nnz());
        for (i, (con, pattern)) in self
            .constraints
            .iter()
            .zip(&self.structure.patterns)
            .enumerate()
        {
            let evaluated = match &con.eval {
                ConstraintEval::ValueAndJacobian(f) => Some(f(xv).1),
                ConstraintEval::Value(_) => con.jacobian.as_ref().map(|j| j(xv)),
            };
            match (pattern, evaluated) {
                (GroupPattern::Dense { nrows }, None) => {
                    let block = approx_jacobian(x, |p| con.value(p), self.eps, *nrows);
                    values.extend(block.iter().copied());
                }
                (GroupPattern::Dense { nrows }, Some(ConstraintJacobian::Dense(block))) => {
                    if block.nrows() != *nrows || block.ncols() != n {
                        return Err(format!(
                            "constraint group {i} jacobian changed shape to {}x{}",
                            block.nrows(),
                            block.ncols()
                        ));
                    }
                    values.extend(block.iter().copied());
                }
                (GroupPattern::Sparse { rows, .. }, Some(ConstraintJacobian::Sparse(tri))) => {
                    if tri.nnz() != rows.len() {
                        return Err(format!(
                            "constraint group {i} sparse jacobian changed nonzero count \
                             from {} to {}",
                            rows.len(),
                            tri.nnz()
                        ));
                    }
                    values.extend(tri.data().iter().copied());
                }
                (_, Some(_)) => {
                    return Err(format!(
                        "constraint group {i} changed jacobian representation after \
                         structure discovery"
                    ));
                }
                // A sparse pattern can only come from an explicit evaluator,
                // so this arm is unreachable; report rather than panic under
                // a solver callback.
                (GroupPattern::Sparse { .. }, None) => {
                    return Err(format!(
                        "constraint group {i} has a sparse pattern but no jacobian evaluator"
                    ));
                }
            }
        }
        Ok(values)
    }

    /// Lower-triangular Lagrangian Hessian values, row-major with col <= row:
    /// `obj_factor * H_f(x) + sum_i H_i(x, lambda_i)` where `lambda_i` is the
    /// group's slice of the stacked multiplier vector.
    pub fn hessian(
        &self,
        x: &[f64],
        lambda: &[f64],
        obj_factor: f64,
    ) -> std::result::Result<Vec<f64>, String> {
        let xv = ArrayView1::from(x);
        let n = self.structure.n;
        let obj_hessian = self
            .obj_hessian
            .as_ref()
            .ok_or_else(|| "hessian callback invoked without an objective hessian".to_string())?;
        let block = obj_hessian(xv);
        if block.shape() != [n, n] {
            return Err(format!(
                "objective hessian has shape {}x{}, expected {n}x{n}",
                block.nrows(),
                block.ncols()
            ));
        }
        let mut h = block * obj_factor;
        for (i, con) in self.constraints.iter().enumerate() {
            if let Some(con_hessian) = &con.hessian {
                let offset = self.structure.offsets[i];
                let dim = self.structure.dims[i];
                let multipliers = ArrayView1::from(&lambda[offset..offset + dim]);
                let contribution = con_hessian(xv, multipliers);
                if contribution.shape() != [n, n] {
                    return Err(format!(
                        "constraint group {i} hessian has shape {}x{}, expected {n}x{n}",
                        contribution.nrows(),
                        contribution.ncols()
                    ));
                }
                h += &contribution;
            }
        }
        let mut values = Vec::with_capacity(n * (n + 1) / 2);
        for r in 0..n {
            for c in 0..=r {
                values.push(h[[r, c]]);
            }
        }
        Ok(values)
    }

    /// Passive per-iteration hook; only records the latest iteration count.
    pub fn record_iteration(&mut self, iter_count: i32) {
        self.nit = iter_count.max(0) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::constraint::ConstraintKind;
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::cell::Cell;
    use std::rc::Rc;

    fn adapter_for(
        objective: ObjectiveEval,
        gradient: Option<GradientFn>,
        obj_hessian: Option<ObjectiveHessianFn>,
        constraints: Vec<Constraint>,
        x0: &[f64],
    ) -> Result<ProblemAdapter> {
        let structure = ProblemStructure::discover(&constraints, ArrayView1::from(x0))?;
        ProblemAdapter::new(objective, gradient, obj_hessian, constraints, structure, 1e-8)
    }

    fn sphere() -> ObjectiveEval {
        ObjectiveEval::Value(Box::new(|x| x[0] * x[0] + x[1] * x[1]))
    }

    #[test]
    fn stacked_constraints_slice_back_to_group_values() {
        let g1 = |x: ArrayView1<f64>| array![x[0] + x[1] - 1.0];
        let g2 = |x: ArrayView1<f64>| array![x[0], x[1] * 2.0];
        let constraints = vec![Constraint::equality(g1), Constraint::inequality(g2)];
        let adapter =
            adapter_for(sphere(), None, None, constraints, &[2.0, 2.0]).unwrap();

        let x = [0.25, -1.5];
        let stacked = adapter.constraints(&x);
        assert_eq!(stacked.len(), adapter.m());
        let offsets = &adapter.structure().offsets;
        let dims = &adapter.structure().dims;
        let expected1 = g1(ArrayView1::from(&x[..]));
        let expected2 = g2(ArrayView1::from(&x[..]));
        assert_eq!(
            stacked.slice(ndarray::s![offsets[0]..offsets[0] + dims[0]]),
            expected1
        );
        assert_eq!(
            stacked.slice(ndarray::s![offsets[1]..offsets[1] + dims[1]]),
            expected2
        );
    }

    #[test]
    fn jacobian_values_match_structure_length_at_any_point() {
        let constraints = vec![
            Constraint::equality(|x| array![x[0] * x[1]]),
            Constraint::inequality(|x| array![x[0], x[1]]).jacobian(|_| {
                let mut tri = sprs::TriMat::new((2, 2));
                tri.add_triplet(0, 0, 1.0);
                tri.add_triplet(1, 1, 1.0);
                ConstraintJacobian::Sparse(tri)
            }),
        ];
        let adapter =
            adapter_for(sphere(), None, None, constraints, &[2.0, 2.0]).unwrap();
        let (rows, cols) = adapter.jacobian_structure();
        assert_eq!(rows.len(), cols.len());
        for x in [[2.0, 2.0], [0.1, -7.0], [100.0, 0.0]] {
            let values = adapter.jacobian(&x).unwrap();
            assert_eq!(values.len(), rows.len());
        }
    }

    #[test]
    fn dense_jacobian_values_are_the_row_major_flattening() {
        let adapter = adapter_for(
            sphere(),
            None,
            None,
            vec![
                Constraint::equality(|x| array![x[0], x[1]])
                    .jacobian(|_| ConstraintJacobian::Dense(array![[1.0, 2.0], [3.0, 4.0]])),
            ],
            &[2.0, 2.0],
        )
        .unwrap();
        let (rows, cols) = adapter.jacobian_structure();
        assert_eq!(rows, &[0, 0, 1, 1]);
        assert_eq!(cols, &[0, 1, 0, 1]);
        assert_eq!(adapter.jacobian(&[0.0, 0.0]).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn lagrangian_hessian_lower_triangle_for_the_hand_computed_case() {
        // f = x1^2 + x2^2 with one zero-curvature equality constraint
        // x1 + x2 = 1. Expected lower triangle: [2*sigma, 0, 2*sigma].
        let constraints = vec![Constraint::equality(|x| array![x[0] + x[1] - 1.0])
            .jacobian(|_| ConstraintJacobian::Dense(array![[1.0, 1.0]]))
            .hessian(|_, _| Array2::zeros((2, 2)))];
        let adapter = adapter_for(
            sphere(),
            None,
            Some(Box::new(|_| array![[2.0, 0.0], [0.0, 2.0]])),
            constraints,
            &[2.0, 2.0],
        )
        .unwrap();
        let sigma = 1.7;
        let values = adapter.hessian(&[0.5, 0.5], &[0.3], sigma).unwrap();
        assert_eq!(values.len(), 3);
        assert_relative_eq!(values[0], 2.0 * sigma);
        assert_relative_eq!(values[1], 0.0);
        assert_relative_eq!(values[2], 2.0 * sigma);
    }

    #[test]
    fn multiplier_vector_is_sliced_per_group() {
        // Two one-dimensional groups; each hessian contribution scales the
        // identity by its own multiplier, so the diagonal exposes the slicing.
        let mk = |idx: usize| {
            Constraint::equality(move |x: ArrayView1<f64>| array![x[idx]])
                .hessian(|_, lam| Array2::eye(2) * lam[0])
        };
        let adapter = adapter_for(
            sphere(),
            None,
            Some(Box::new(|_| Array2::zeros((2, 2)))),
            vec![mk(0), mk(1)],
            &[2.0, 2.0],
        )
        .unwrap();
        let values = adapter.hessian(&[0.0, 0.0], &[5.0, -3.0], 1.0).unwrap();
        // diag = 5.0 + (-3.0) = 2.0 on both entries
        assert_relative_eq!(values[0], 2.0);
        assert_relative_eq!(values[1], 0.0);
        assert_relative_eq!(values[2], 2.0);
    }

    #[test]
    fn partial_hessian_information_is_rejected_at_construction() {
        // Objective has a hessian, the constraint does not.
        let err = adapter_for(
            sphere(),
            None,
            Some(Box::new(|_| Array2::eye(2))),
            vec![Constraint::equality(|x| array![x[0] + x[1] - 1.0])],
            &[2.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        // And the mirror image: constraint has one, objective does not.
        let err = adapter_for(
            sphere(),
            None,
            None,
            vec![Constraint::equality(|x| array![x[0] + x[1] - 1.0])
                .hessian(|_, _| Array2::zeros((2, 2)))],
            &[2.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unconstrained_problem_has_empty_stacked_vector() {
        let adapter = adapter_for(sphere(), None, None, vec![], &[2.0, 2.0]).unwrap();
        assert_eq!(adapter.m(), 0);
        assert!(adapter.constraints(&[1.0, 1.0]).is_empty());
        assert_eq!(adapter.jacobian(&[1.0, 1.0]).unwrap().len(), 0);
    }

    #[test]
    fn finite_difference_gradient_fallback() {
        let mut adapter = adapter_for(sphere(), None, None, vec![], &[2.0, 2.0]).unwrap();
        let grad = adapter.gradient(&[1.0, -2.0]);
        assert_relative_eq!(grad[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(grad[1], -4.0, epsilon = 1e-6);
        assert_eq!(adapter.njev, 1);
    }

    #[test]
    fn fused_objective_is_evaluated_once_per_point() {
        let calls = Rc::new(Cell::new(0usize));
        let seen = calls.clone();
        let fused = ObjectiveEval::ValueAndGradient(Box::new(move |x| {
            seen.set(seen.get() + 1);
            (x[0] * x[0], array![2.0 * x[0], 0.0])
        }));
        let mut adapter = adapter_for(fused, None, None, vec![], &[2.0, 2.0]).unwrap();
        let x = [3.0, 0.0];
        let val = adapter.objective(&x);
        let grad = adapter.gradient(&x);
        assert_relative_eq!(val, 9.0);
        assert_relative_eq!(grad[0], 6.0);
        assert_eq!(calls.get(), 1);
        // A new point invalidates the cache.
        adapter.gradient(&[4.0, 0.0]);
        assert_eq!(calls.get(), 2);
        assert_eq!(adapter.nfev, 1);
        assert_eq!(adapter.njev, 2);
    }

    #[test]
    fn fused_objective_plus_separate_gradient_is_ambiguous() {
        let fused = ObjectiveEval::ValueAndGradient(Box::new(|x| (x[0], array![1.0, 0.0])));
        let err = adapter_for(
            fused,
            Some(Box::new(|_| array![1.0, 0.0])),
            None,
            vec![],
            &[2.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn intermediate_hook_only_records_the_iteration_count() {
        let mut adapter = adapter_for(sphere(), None, None, vec![], &[2.0, 2.0]).unwrap();
        adapter.record_iteration(7);
        assert_eq!(adapter.nit, 7);
        assert_eq!(adapter.nfev, 0);
        assert_eq!(adapter.njev, 0);
    }

    #[test]
    fn sparse_group_keeps_fused_constraint_kind() {
        let con = Constraint::new_fused(ConstraintKind::Inequality, |x| {
            let mut tri = sprs::TriMat::new((1, 2));
            tri.add_triplet(0, 0, 2.0 * x[0]);
            (array![x[0] * x[0]], ConstraintJacobian::Sparse(tri))
        });
        let adapter = adapter_for(sphere(), None, None, vec![con], &[2.0, 2.0]).unwrap();
        let values = adapter.jacobian(&[3.0, 0.0]).unwrap();
        assert_eq!(values, vec![6.0]);
    }
}
