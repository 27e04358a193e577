//! Caller-facing entry point: a builder that assembles the adapter, runs
//! structure discovery and bound/option translation, then drives Ipopt.

use ndarray::{Array1, Array2, ArrayView1};

use crate::adapter::bounds::{constraint_bounds, variable_bounds};
use crate::adapter::problem::{GradientFn, ObjectiveEval, ObjectiveHessianFn, ProblemAdapter};
use crate::adapter::structure::ProblemStructure;
use crate::adapter::Constraint;
use crate::error::{Error, Result};
use crate::ipopt::nlp::Nlp;
use crate::options::{IpoptOptions, OptionValue};
use crate::result::{SolveResult, SolveStatus, SolverInfo};

/// Minimize `objective` starting from `x0`.
///
/// Extra arguments to the objective (and to every other user-supplied
/// function) are closure captures. Derivatives, bounds, constraints, and
/// solver options are attached through the returned builder:
///
/// ```no_run
/// use minimize_ipopt::{minimize, Constraint};
/// use ndarray::array;
///
/// let result = minimize(|x| x[0] * x[0] + x[1] * x[1], &[2.0, 2.0])
///     .gradient(|x| array![2.0 * x[0], 2.0 * x[1]])
///     .constraint(Constraint::equality(|x| array![x[0] + x[1] - 1.0]))
///     .run()
///     .unwrap();
/// assert!(result.success);
/// ```
pub fn minimize<F>(objective: F, x0: &[f64]) -> Minimize
where
    F: Fn(ArrayView1<f64>) -> f64 + 'static,
{
    Minimize::new(ObjectiveEval::Value(Box::new(objective)), x0)
}

/// Like [`minimize`], for an objective that returns `(value, gradient)`
/// jointly. The pair is cached so the solver's paired objective/gradient
/// calls at one point cost a single evaluation.
pub fn minimize_with_gradient<F>(objective: F, x0: &[f64]) -> Minimize
where
    F: Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + 'static,
{
    Minimize::new(ObjectiveEval::ValueAndGradient(Box::new(objective)), x0)
}

/// Problem builder returned by [`minimize`] / [`minimize_with_gradient`].
pub struct Minimize {
    objective: ObjectiveEval,
    x0: Vec<f64>,
    gradient: Option<GradientFn>,
    obj_hessian: Option<ObjectiveHessianFn>,
    hessp_requested: bool,
    bounds: Option<Vec<(f64, f64)>>,
    constraints: Vec<Constraint>,
    tol: Option<f64>,
    eps: f64,
    options: IpoptOptions,
}

impl Minimize {
    fn new(objective: ObjectiveEval, x0: &[f64]) -> Self {
        Minimize {
            objective,
            x0: x0.to_vec(),
            gradient: None,
            obj_hessian: None,
            hessp_requested: false,
            bounds: None,
            constraints: Vec::new(),
            tol: None,
            eps: 1e-8,
            options: IpoptOptions::new(),
        }
    }

    /// Analytic objective gradient. Without one (and without a fused
    /// objective) a forward-difference approximation with step [`Self::eps`]
    /// is used.
    pub fn gradient<F>(mut self, g: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> Array1<f64> + 'static,
    {
        self.gradient = Some(Box::new(g));
        self
    }

    /// Analytic objective Hessian. If supplied, every constraint group must
    /// supply its Hessian contribution too, and vice versa.
    pub fn hessian<F>(mut self, h: F) -> Self
    where
        F: Fn(ArrayView1<f64>) -> Array2<f64> + 'static,
    {
        self.obj_hessian = Some(Box::new(h));
        self
    }

    /// Hessian-vector products are not supported; [`Self::run`] rejects the
    /// problem with [`Error::Config`]. Supply a full Hessian instead.
    pub fn hessian_product<F>(mut self, _hessp: F) -> Self
    where
        F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> Array1<f64> + 'static,
    {
        self.hessp_requested = true;
        self
    }

    /// Per-variable `(lower, upper)` bounds. Absent means unbounded.
    pub fn bounds(mut self, bounds: &[(f64, f64)]) -> Self {
        self.bounds = Some(bounds.to_vec());
        self
    }

    /// Append one constraint group. Declaration order fixes the stacking
    /// order for the problem's lifetime.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Convergence tolerance (default 1e-8). A native `tol` option wins.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = Some(tol);
        self
    }

    /// Step size for finite-difference derivative fallbacks (default 1e-8).
    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Forward an option to Ipopt. `disp` and `maxiter` are translated to
    /// `print_level` and `max_iter`; native names win over aliases.
    pub fn option(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.options.set(name, value);
        self
    }

    /// Discover the problem structure, hand the adapter to Ipopt, and run
    /// the solve to completion. All configuration errors surface here,
    /// before the first solver callback.
    pub fn run(self) -> Result<SolveResult> {
        if self.hessp_requested {
            return Err(Error::Config(
                "hessian-vector products are not supported; supply a full hessian".into(),
            ));
        }
        if self.x0.is_empty() {
            return Err(Error::Config("initial point must be non-empty".into()));
        }

        let structure =
            ProblemStructure::discover(&self.constraints, ArrayView1::from(&self.x0))?;
        let (x_l, x_u) = variable_bounds(self.bounds.as_deref(), self.x0.len())?;
        let (g_l, g_u) = constraint_bounds(&self.constraints, &structure.dims);

        let mut adapter = ProblemAdapter::new(
            self.objective,
            self.gradient,
            self.obj_hessian,
            self.constraints,
            structure,
            self.eps,
        )?;

        let mut options = self.options;
        options.translate(self.tol, !adapter.has_hessian());

        let mut nlp = Nlp::new(&adapter, x_l, x_u, g_l, g_u)?;
        for (name, value) in options.iter() {
            nlp.add_option(name, value)?;
        }

        let raw = nlp.solve(&mut adapter, &self.x0);
        let status = SolveStatus::from_code(raw.status);
        Ok(SolveResult {
            x: Array1::from(raw.x),
            success: status.is_success(),
            status,
            status_code: raw.status,
            message: status.message(),
            fun: raw.obj_val,
            info: SolverInfo {
                status: raw.status,
                status_msg: status.message(),
                obj_val: raw.obj_val,
                g: Array1::from(raw.g),
                mult_g: Array1::from(raw.mult_g),
                mult_x_l: Array1::from(raw.mult_x_l),
                mult_x_u: Array1::from(raw.mult_x_u),
            },
            nfev: adapter.nfev,
            njev: adapter.njev,
            nit: adapter.nit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn hessian_vector_products_are_rejected_before_any_solve() {
        let err = minimize(|x| x[0] * x[0], &[1.0])
            .hessian_product(|_, v| v.to_owned())
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_initial_point_is_rejected() {
        let err = minimize(|_| 0.0, &[]).run().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn partial_hessian_information_fails_before_ipopt_is_created() {
        // Objective hessian without a constraint hessian: the error must
        // come from configuration checking, not from the solver.
        let err = minimize(|x| x[0] * x[0] + x[1] * x[1], &[2.0, 2.0])
            .hessian(|_| array![[2.0, 0.0], [0.0, 2.0]])
            .constraint(Constraint::equality(|x| array![x[0] + x[1] - 1.0]))
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
