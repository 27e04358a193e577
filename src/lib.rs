//! A multi-constraint `minimize` interface to the Ipopt interior-point
//! solver.
//!
//! The crate translates a generic problem description (objective, gradient,
//! a list of independently defined constraint groups with per-group
//! Jacobians/Hessians, variable bounds) into the flattened, sparsity-aware
//! layout Ipopt's C interface expects: one stacked constraint vector, one
//! stacked Jacobian described by parallel (row, col) index arrays plus a
//! value array in exactly that order, and a Lagrangian Hessian given as the
//! lower triangle of a dense symmetric matrix.
//!
//! Structure (constraint dimensions, sparsity pattern, bounds) is discovered
//! once, from a single evaluation pass at the initial point, and is immutable
//! for the problem's lifetime. Configuration problems are rejected eagerly,
//! before the first solver callback; solver nonconvergence is reported
//! through [`SolveResult::success`], not as an error.
//!
//! ```no_run
//! use minimize_ipopt::{minimize, Constraint};
//! use ndarray::array;
//!
//! // min x1^2 + x2^2  s.t.  x1 + x2 = 1
//! let result = minimize(|x| x[0] * x[0] + x[1] * x[1], &[2.0, 2.0])
//!     .gradient(|x| array![2.0 * x[0], 2.0 * x[1]])
//!     .constraint(Constraint::equality(|x| array![x[0] + x[1] - 1.0]))
//!     .run()
//!     .unwrap();
//! assert!(result.success);
//! ```

pub mod adapter;
pub mod error;
mod ipopt;
pub mod minimize;
pub mod options;
pub mod result;

pub use adapter::{Constraint, ConstraintJacobian, ConstraintKind, ProblemAdapter, SENTINEL_BOUND};
pub use error::Error;
pub use minimize::{minimize, minimize_with_gradient, Minimize};
pub use options::{IpoptOptions, OptionValue};
pub use result::{SolveResult, SolveStatus, SolverInfo};
