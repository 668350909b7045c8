//! Mutation failures. Each indicates a plan that does not fit its manifest.

use mend_common::ObjectId;
use mend_source::TextRange;

/// Why a plan could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutateError {
    /// Two edits touch the same bytes.
    #[error("edits overlap: {first:?} and {second:?}")]
    Overlap {
        /// The earlier edit.
        first: TextRange,
        /// The edit starting inside it.
        second: TextRange,
    },

    /// An insertion targets a phase the manifest does not have.
    #[error("insertion targets unknown sources phase `{id}`")]
    UnknownPhase {
        /// The phase id.
        id: ObjectId,
    },

    /// An insertion needs a section the manifest does not have.
    #[error("insertion needs a `{isa}` section")]
    MissingSection {
        /// The section's `isa` name.
        isa: &'static str,
    },
}
