//! Structured logging facility for reportmap
//!
//! - Single initialization point via `init(profile)` or `init_from_env()`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! Mapper operations and unit-of-work flushes own the op boundaries; lower
//! layers (factories, gateways, codecs) only emit `tracing::debug!`.
//!
//! # Usage
//!
//! ```rust
//! use reportmap_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, init_from_env, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
