//! Applies an [`EditPlan`](mend_plan::EditPlan) to the text it was planned
//! against.
//!
//! Rewriting is span-based: every deletion is the exact byte range the parser
//! matched for a record or compile-list item (widened to its whole line when
//! nothing else shares that line), and every insertion is a new line rendered
//! with [`mend_manifest::render`]. All other bytes are copied through
//! unchanged.

#![warn(missing_docs)]

pub mod edit;
pub mod error;
pub mod mutator;

pub use edit::Edit;
pub use error::MutateError;
pub use mutator::{apply, Mutation};
