//! The reconciliation driver.
//!
//! [`reconcile`] runs one manifest through the full pipeline: parse, index,
//! plan, back up, rewrite, re-validate, and only then commit. The working
//! file is replaced atomically and only after the rewritten text has been
//! parsed again and found consistent, so a failed run never leaves a
//! partially edited manifest behind.
//!
//! The stages are tracked by [`Stage`]; file access goes through the
//! [`FileSystem`] capability so tests can inject failures.

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod fs;
pub mod options;
pub mod report;
pub mod stage;
pub mod summary;
pub mod validate;

pub use driver::{inspect, reconcile, Driver, Inspection};
pub use error::{ReconcileError, ValidationError};
pub use fs::{FileSystem, StdFs};
pub use options::ReconcileOptions;
pub use stage::Stage;
pub use summary::Summary;
