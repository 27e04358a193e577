//! Solver status codes and the packaged solve result.

use ndarray::Array1;
use serde::Serialize;

/// Ipopt's `ApplicationReturnStatus` codes.
///
/// Nonconvergence is not an error at this layer: every terminal status is
/// reported through [`SolveResult::success`] and these fields, and the caller
/// decides what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    SolveSucceeded,
    SolvedToAcceptableLevel,
    InfeasibleProblemDetected,
    SearchDirectionBecomesTooSmall,
    DivergingIterates,
    UserRequestedStop,
    FeasiblePointFound,
    MaximumIterationsExceeded,
    RestorationFailed,
    ErrorInStepComputation,
    MaximumCpuTimeExceeded,
    NotEnoughDegreesOfFreedom,
    InvalidProblemDefinition,
    InvalidOption,
    InvalidNumberDetected,
    UnrecoverableException,
    NonIpoptExceptionThrown,
    InsufficientMemory,
    InternalError,
    /// A status code this binding does not know about.
    Unknown,
}

impl SolveStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => SolveStatus::SolveSucceeded,
            1 => SolveStatus::SolvedToAcceptableLevel,
            2 => SolveStatus::InfeasibleProblemDetected,
            3 => SolveStatus::SearchDirectionBecomesTooSmall,
            4 => SolveStatus::DivergingIterates,
            5 => SolveStatus::UserRequestedStop,
            6 => SolveStatus::FeasiblePointFound,
            -1 => SolveStatus::MaximumIterationsExceeded,
            -2 => SolveStatus::RestorationFailed,
            -3 => SolveStatus::ErrorInStepComputation,
            -4 => SolveStatus::MaximumCpuTimeExceeded,
            -10 => SolveStatus::NotEnoughDegreesOfFreedom,
            -11 => SolveStatus::InvalidProblemDefinition,
            -12 => SolveStatus::InvalidOption,
            -13 => SolveStatus::InvalidNumberDetected,
            -100 => SolveStatus::UnrecoverableException,
            -101 => SolveStatus::NonIpoptExceptionThrown,
            -102 => SolveStatus::InsufficientMemory,
            -199 => SolveStatus::InternalError,
            _ => SolveStatus::Unknown,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::SolveSucceeded)
    }

    pub fn message(&self) -> &'static str {
        match self {
            SolveStatus::SolveSucceeded => {
                "Algorithm terminated successfully at a locally optimal point."
            }
            SolveStatus::SolvedToAcceptableLevel => {
                "Algorithm stopped at a point that satisfies the acceptable, \
                 but not the desired, tolerances."
            }
            SolveStatus::InfeasibleProblemDetected => {
                "Algorithm converged to a point of local infeasibility; the \
                 problem may be infeasible."
            }
            SolveStatus::SearchDirectionBecomesTooSmall => {
                "Search direction is becoming too small."
            }
            SolveStatus::DivergingIterates => {
                "Iterates are diverging; the problem might be unbounded."
            }
            SolveStatus::UserRequestedStop => {
                "Stopping optimization at the current point as requested."
            }
            SolveStatus::FeasiblePointFound => "Feasible point for square problem found.",
            SolveStatus::MaximumIterationsExceeded => "Maximum number of iterations exceeded.",
            SolveStatus::RestorationFailed => {
                "Restoration phase failed; algorithm does not know how to proceed."
            }
            SolveStatus::ErrorInStepComputation => "Error in step computation.",
            SolveStatus::MaximumCpuTimeExceeded => "Maximum CPU time exceeded.",
            SolveStatus::NotEnoughDegreesOfFreedom => "Problem has too few degrees of freedom.",
            SolveStatus::InvalidProblemDefinition => "Invalid problem definition.",
            SolveStatus::InvalidOption => "Invalid option encountered.",
            SolveStatus::InvalidNumberDetected => {
                "Invalid number in NLP function or derivative detected."
            }
            SolveStatus::UnrecoverableException => "Unrecoverable Ipopt exception encountered.",
            SolveStatus::NonIpoptExceptionThrown => "Unknown exception caught.",
            SolveStatus::InsufficientMemory => "Not enough memory.",
            SolveStatus::InternalError => "An unknown internal error occurred.",
            SolveStatus::Unknown => "Unrecognized ipopt return status.",
        }
    }
}

/// The raw status record: final constraint values, objective, and the
/// multiplier vectors exactly as the solver returned them.
#[derive(Debug, Clone, Serialize)]
pub struct SolverInfo {
    pub status: i32,
    pub status_msg: &'static str,
    pub obj_val: f64,
    /// Constraint values at the final point.
    pub g: Array1<f64>,
    /// Lagrange multipliers for the constraints.
    pub mult_g: Array1<f64>,
    /// Multipliers for the variable lower bounds.
    pub mult_x_l: Array1<f64>,
    /// Multipliers for the variable upper bounds.
    pub mult_x_u: Array1<f64>,
}

/// The packaged outcome of a solve.
#[derive(Debug, Clone, Serialize)]
pub struct SolveResult {
    /// Final point.
    pub x: Array1<f64>,
    /// Whether the solver reported full convergence.
    pub success: bool,
    pub status: SolveStatus,
    /// Raw numeric status code.
    pub status_code: i32,
    pub message: &'static str,
    /// Final objective value.
    pub fun: f64,
    pub info: SolverInfo,
    /// Objective evaluation count.
    pub nfev: usize,
    /// Gradient evaluation count.
    pub njev: usize,
    /// Iterations reported by the solver.
    pub nit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_code_zero_is_success() {
        assert!(SolveStatus::from_code(0).is_success());
        assert!(!SolveStatus::from_code(1).is_success());
        assert!(!SolveStatus::from_code(-1).is_success());
    }

    #[test]
    fn unknown_codes_do_not_panic() {
        let status = SolveStatus::from_code(12345);
        assert_eq!(status, SolveStatus::Unknown);
        assert!(!status.message().is_empty());
    }

    #[test]
    fn negative_codes_map_to_failures() {
        assert_eq!(
            SolveStatus::from_code(-1),
            SolveStatus::MaximumIterationsExceeded
        );
        assert_eq!(SolveStatus::from_code(-12), SolveStatus::InvalidOption);
    }
}
