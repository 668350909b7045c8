//! Errors surfaced by a reconciliation run.

use mend_common::InternalError;
use mend_index::Violation;
use mend_manifest::ParseError;
use mend_mutate::MutateError;
use mend_plan::{PlannerError, Removals};
use std::path::PathBuf;

/// The rewritten text was rejected; nothing was committed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The rewritten text no longer parses.
    #[error("rewritten manifest does not parse: {0}")]
    Reparse(#[source] ParseError),

    /// The rewritten text breaks at least one invariant.
    #[error("rewritten manifest breaks {} invariant(s); first: {}", .violations.len(), first_violation(.violations))]
    Invariants {
        /// Every violation found.
        violations: Vec<Violation>,
    },

    /// The rewrite removed a different number of records than planned.
    #[error("removed {actual:?} but the plan expected {expected:?}")]
    CountMismatch {
        /// What the plan said it would remove.
        expected: Removals,
        /// What disappeared from the text.
        actual: Removals,
    },
}

fn first_violation(violations: &[Violation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Why a run failed. The working file is unchanged in every case.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The manifest does not match the record grammar.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// The manifest.
        path: PathBuf,
        /// Where and why.
        source: ParseError,
    },

    /// No plan could be computed.
    #[error("cannot plan edits: {0}")]
    Planner(#[from] PlannerError),

    /// The plan could not be applied to the text.
    #[error("cannot apply edits: {0}")]
    Mutate(#[from] MutateError),

    /// The rewritten text was rejected.
    #[error("validation failed, {} left unchanged: {source}", .path.display())]
    Validation {
        /// The manifest.
        path: PathBuf,
        /// What was wrong with the rewrite.
        source: ValidationError,
    },

    /// Reading, backing up or committing failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The backup read back differs from the text it was written from.
    #[error("backup {} does not match the manifest it was written from", .path.display())]
    BackupMismatch {
        /// The backup file.
        path: PathBuf,
    },

    /// The driver reached a state it should not.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ReconcileError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ReconcileError::Io { path, source }
    }
}
