use thiserror::Error;

/// Errors surfaced by the core. Validation variants are raised before any
/// mutation; `InsufficientFunds` and `ConcurrentModification` can occur
/// mid-commit and the coordinator rolls back before returning them.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("actor is not allowed to perform this operation")]
    Forbidden,
    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
    #[error("{operation} not allowed while status is {status}")]
    InvalidState {
        operation: &'static str,
        status: String,
    },
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("customs fee outstanding")]
    CustomsUnpaid,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("concurrent modification, retry the operation")]
    ConcurrentModification,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn illegal_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn invalid_state(operation: &'static str, status: impl ToString) -> Self {
        Self::InvalidState {
            operation,
            status: status.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
