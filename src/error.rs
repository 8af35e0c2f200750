//! Error types for squad optimization.

use thiserror::Error;

/// Why an optimization run did not produce a squad.
///
/// Callers relaxing constraints should only do so on [`OptimizeError::Infeasible`];
/// [`OptimizeError::Solver`] means the search gave up before reaching an answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// Malformed players or constraints, detected before any search.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No selection satisfies every constraint simultaneously.
    #[error("infeasible: {0}")]
    Infeasible(String),

    /// The search stopped without a definite optimal or infeasible answer.
    #[error("solver error: {0}")]
    Solver(String),
}

pub type OptimizeResult<T> = std::result::Result<T, OptimizeError>;
