//! Reconciliation planning.
//!
//! Given a parsed manifest and its [`IntegrityIndex`](mend_index::IntegrityIndex),
//! [`plan`] computes one [`EditPlan`]: which records and compile-list items to
//! delete so that every duplicate group keeps exactly one canonical entry,
//! and which records to insert so that requested files are compiled. The plan
//! is a plain value; nothing here touches text or disk.

#![warn(missing_docs)]

pub mod error;
pub mod ids;
pub mod options;
pub mod plan;
pub mod planner;

pub use error::{AmbiguousGroup, PlannerError};
pub use ids::IdAllocator;
pub use options::{PlanOptions, Registration};
pub use plan::{Collapse, EditPlan, NewEntry, Removals};
pub use planner::plan;
