//! Translates a multi-constraint problem description into the flattened,
//! sparsity-aware layout Ipopt consumes.

pub mod bounds;
pub mod constraint;
pub mod finite_diff;
pub mod problem;
pub mod structure;

pub use bounds::SENTINEL_BOUND;
pub use constraint::{Constraint, ConstraintJacobian, ConstraintKind};
pub use problem::ProblemAdapter;
pub use structure::ProblemStructure;
