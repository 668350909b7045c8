//! Lookup structures and integrity checks over a parsed [`Manifest`].
//!
//! [`IntegrityIndex::build`] is pure and deterministic: the planner runs it on
//! the original text and the engine runs it again on the rewritten text, and
//! both must agree on what a consistent manifest looks like.
//!
//! [`Manifest`]: mend_manifest::Manifest

#![warn(missing_docs)]

pub mod index;
pub mod invariant;
pub mod violation;

pub use index::{Dangling, DanglingKind, IdFinding, IntegrityIndex, Placement, Table};
pub use invariant::Invariant;
pub use violation::Violation;
