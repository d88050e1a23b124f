//! Error handling for daf-store
//!
//! Wraps daf-core ExError with driver-specific helpers

use daf_core::errors::{ExError, ExErrorKind};
use rusqlite::ErrorCode;

/// Result type alias using ExError
pub use daf_core::errors::Result;

/// Create a backend error from rusqlite::Error
///
/// Constraint failures and interrupted/busy statements get their own kinds;
/// everything else the driver reports is `Backend`.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    match &err {
        rusqlite::Error::SqliteFailure(ffi_err, _) => {
            let kind = match ffi_err.code {
                ErrorCode::ConstraintViolation => ExErrorKind::ConstraintViolation,
                ErrorCode::OperationInterrupted
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked => ExErrorKind::Timeout,
                _ => ExErrorKind::Backend,
            };
            ExError::new(kind)
                .with_op("sqlite")
                .with_backend_code(ffi_err.extended_code)
                .with_message(err.to_string())
        }
        _ => ExError::new(ExErrorKind::Backend)
            .with_op("sqlite")
            .with_message(err.to_string()),
    }
}

/// Create an error for an operation attempted in the wrong connection state
pub fn invalid_state(op: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidState)
        .with_op(op.to_string())
        .with_message(reason.to_string())
}

/// Create an error for a parameter value that contradicts its declared type
pub fn invalid_binding(reason: String) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("bind_parameters")
        .with_message(reason)
}

/// Create an error for parameters the statement does not declare, or
/// declared slots nobody supplied
pub fn parameter_mismatch(reason: String) -> ExError {
    ExError::new(ExErrorKind::ParameterMismatch)
        .with_op("bind_parameters")
        .with_message(reason)
}

/// Create an error for a procedure name missing from the connection's registry
pub fn unknown_procedure(name: &str) -> ExError {
    ExError::new(ExErrorKind::UnknownProcedure)
        .with_op("resolve_procedure")
        .with_message(format!("Could not find stored procedure '{}'", name))
}
