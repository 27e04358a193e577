//! Constraint group specifications.
//!
//! Each [`Constraint`] is one user-supplied constraint group, possibly
//! vector-valued. Its output dimension is never declared up front; it is
//! discovered by evaluating the group once at the initial point
//! (see [`super::structure`]).

use ndarray::{Array1, Array2, ArrayView1};
use sprs::TriMat;

/// A constraint Jacobian as produced by a user evaluator.
///
/// The representation is classified once at structure-discovery time and the
/// resulting pattern is reused on every subsequent evaluation, so the hot
/// path never re-inspects the variant layout. A `Dense` block is treated as
/// fully populated: zero-valued entries stay structurally present. Only
/// `Sparse` evaluators may skip entries.
pub enum ConstraintJacobian {
    /// Fully populated `p × n` block, row-major flattened when stacked.
    Dense(Array2<f64>),
    /// Coordinate-format matrix; triplet order is preserved verbatim in the
    /// stacked value array.
    Sparse(TriMat<f64>),
}

/// Whether a constraint group is pinned to zero or only bounded below by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `g(x) = 0`
    Equality,
    /// `g(x) >= 0`
    Inequality,
}

pub type ConstraintFn = Box<dyn Fn(ArrayView1<f64>) -> Array1<f64>>;
pub type FusedConstraintFn = Box<dyn Fn(ArrayView1<f64>) -> (Array1<f64>, ConstraintJacobian)>;
pub type ConstraintJacobianFn = Box<dyn Fn(ArrayView1<f64>) -> ConstraintJacobian>;
/// `(x, lambda_slice) -> n x n` Hessian contribution, already weighted by the
/// group's multipliers.
pub type ConstraintHessianFn = Box<dyn Fn(ArrayView1<f64>, ArrayView1<f64>) -> Array2<f64>>;

/// How a group's values (and possibly its Jacobian) are produced.
pub(crate) enum ConstraintEval {
    Value(ConstraintFn),
    /// One call yields both the value and the Jacobian. Replaces a separate
    /// Jacobian evaluator; supplying both is rejected at discovery time.
    ValueAndJacobian(FusedConstraintFn),
}

/// One constraint group: evaluator, kind, and optional derivative evaluators.
///
/// Extra arguments to the evaluators are closure captures. Because each
/// group's closures own their captures by value, groups built in a loop can
/// never silently alias the last iteration's arguments.
pub struct Constraint {
    pub(crate) eval: ConstraintEval,
    pub(crate) kind: ConstraintKind,
    pub(crate) jacobian: Option<ConstraintJacobianFn>,
    pub(crate) hessian: Option<ConstraintHessianFn>,
}

impl Constraint {
    pub fn new<F>(kind: ConstraintKind, f: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> Array1<f64> + 'static,
    {
        Constraint {
            eval: ConstraintEval::Value(Box::new(f)),
            kind,
            jacobian: None,
            hessian: None,
        }
    }

    /// Equality group `g(x) = 0`.
    pub fn equality<F>(f: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> Array1<f64> + 'static,
    {
        Self::new(ConstraintKind::Equality, f)
    }

    /// Inequality group `g(x) >= 0`.
    pub fn inequality<F>(f: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> Array1<f64> + 'static,
    {
        Self::new(ConstraintKind::Inequality, f)
    }

    /// Group whose evaluator returns `(value, jacobian)` jointly.
    pub fn new_fused<F>(kind: ConstraintKind, f: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> (Array1<f64>, ConstraintJacobian) + 'static,
    {
        Constraint {
            eval: ConstraintEval::ValueAndJacobian(Box::new(f)),
            kind,
            jacobian: None,
            hessian: None,
        }
    }

    /// Attach a Jacobian evaluator. Without one, the group's Jacobian is
    /// approximated by forward differences and treated as fully dense.
    pub fn jacobian<F>(mut self, j: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> ConstraintJacobian + 'static,
    {
        self.jacobian = Some(Box::new(j));
        self
    }

    /// Attach a Hessian contribution evaluator `(x, lambda_slice) -> n x n`.
    ///
    /// If any group supplies one, the objective and every other group must
    /// too; partial Hessian information is rejected at construction.
    pub fn hessian<F>(mut self, h: F) -> Self
    where
        F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> Array2<f64> + 'static,
    {
        self.hessian = Some(Box::new(h));
        self
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Evaluate the group's value, discarding the Jacobian half of a fused
    /// evaluator.
    pub(crate) fn value(&self, x: ArrayView1<f64>) -> Array1<f64> {
        match &self.eval {
            ConstraintEval::Value(f) => f(x),
            ConstraintEval::ValueAndJacobian(f) => f(x).0,
        }
    }
}
