//! Error types for problem configuration and solver setup.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed or unsupported problem specification. Always raised before
    /// the first solver callback runs, never mid-solve.
    #[error("invalid problem configuration: {0}")]
    Config(String),
    /// Ipopt refused an option at registration time.
    #[error("ipopt rejected option `{name}` = {value}")]
    OptionRejected { name: String, value: String },
    /// `CreateIpoptProblem` returned a null handle.
    #[error("failed to create the ipopt problem instance")]
    SolverCreation,
}

pub type Result<T> = std::result::Result<T, Error>;
