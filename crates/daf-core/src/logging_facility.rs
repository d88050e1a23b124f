//! Structured logging facility for DAF
//!
//! - Single initialization point via `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use daf_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! The facade owns the operation boundary: one start event per call, and
//! exactly one end or end_error event. Lower layers only emit
//! `tracing::debug!` / `tracing::warn!` detail.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
