// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Per-file access failures are not errors at this level; they travel as
/// tracking warnings. Execution failures are normally captured in the
/// run outcome and only surface here through `?` on an executor call.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Input error: {0}")]
    Input(#[from] crate::domain::InputError),

    #[error("Execution error: {0}")]
    Execution(#[from] crate::port::ExecutionError),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
