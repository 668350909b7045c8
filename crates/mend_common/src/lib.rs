//! Shared foundational types used across the mend workspace.
//!
//! This crate provides the opaque [`ObjectId`] token that names every manifest
//! record, the [`ContentHash`] used for backup verification and fresh id
//! derivation, and the common internal-error result type.

#![warn(missing_docs)]

pub mod hash;
pub mod object_id;
pub mod result;

pub use hash::ContentHash;
pub use object_id::ObjectId;
pub use result::{InternalError, MendResult};
