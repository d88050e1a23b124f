//! DAF Core - driver-independent half of the data access facility
//!
//! This crate provides everything the command-execution facade needs that
//! does not touch a database driver:
//! - Structured error facility (`ExError`, `ExErrorKind`)
//! - Logging facility with canonical operation macros
//! - Command timeout configuration (`TimeoutSetting`, settings sources)
//! - Parameter and result-shape models (`Parameter`, `DataTable`, `DataView`)
//! - Diagnostic tracer for executed commands
//! - Response envelope used by front ends

pub mod config;
pub mod envelope;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod trace;

// Re-export commonly used types
pub use config::{TimeoutSetting, DEFAULT_TIMEOUT_SECS, TIMEOUT_KEY};
pub use envelope::ApiResult;
pub use errors::{ConfigError, ExError, ExErrorKind, Result};
pub use model::{
    DataColumn, DataTable, DataView, ParamDirection, ParamValue, Parameter, SqlType, Value,
};
pub use trace::{DiagnosticTracer, TraceSink};
