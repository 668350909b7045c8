//! Planner failures. None of them are retried: each needs a human decision.

use mend_common::ObjectId;
use mend_diagnostics::{Category, Diagnostic, DiagnosticCode, Label};
use mend_index::{Invariant, Table};
use mend_source::{FileId, Span, TextRange};
use serde::Serialize;
use std::fmt;

/// Records sharing one id but disagreeing on content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousGroup {
    /// The table the records live in.
    pub table: Table,
    /// The shared id.
    pub id: ObjectId,
    /// Each distinct content, in document order.
    pub variants: Vec<String>,
    /// Every occurrence.
    pub ranges: Vec<TextRange>,
}

impl fmt::Display for AmbiguousGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} id {} ({})",
            self.table,
            self.id,
            self.variants.join(" vs ")
        )
    }
}

/// Why no edit plan could be computed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    /// A duplicate group has no defensible canonical entry.
    #[error("{reason}: {group}")]
    Ambiguous {
        /// Always `"ambiguous group"`.
        reason: &'static str,
        /// The offending records.
        group: AmbiguousGroup,
    },

    /// References to missing records exist and pruning is disabled.
    #[error("{count} unresolved reference(s) and pruning is disabled; first breaks `{invariant}` ({})", ids_list(.ids))]
    Unresolved {
        /// Number of unresolved references.
        count: usize,
        /// The invariant the first one breaks.
        invariant: Invariant,
        /// Ids involved in the first one.
        ids: Vec<ObjectId>,
        /// Location of the first one.
        range: TextRange,
    },

    /// A file with the same name is already compiled from another directory.
    #[error("cannot register `{path}`: `{existing}` is already compiled under the same name")]
    NameClash {
        /// The requested path.
        path: String,
        /// The path already compiled.
        existing: String,
    },

    /// A section new records must go into does not exist.
    #[error("manifest has no `{isa}` section to insert into")]
    MissingSection {
        /// The section's `isa` name.
        isa: &'static str,
    },

    /// The configured target phase does not exist.
    #[error("sources phase `{id}` does not exist")]
    UnknownPhase {
        /// The configured id.
        id: ObjectId,
    },

    /// A registration path cannot name a file.
    #[error("cannot register `{path}`: {reason}")]
    InvalidRegistration {
        /// The requested path.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A build file chosen for removal is still referenced from a section
    /// the engine does not model.
    #[error("build file {id} is referenced {count} more time(s) outside the compile list; refusing to remove it")]
    ExternallyReferenced {
        /// The build file.
        id: ObjectId,
        /// Untracked references.
        count: usize,
    },

    /// No collision-free id could be derived.
    #[error("could not derive a fresh id for `{path}`")]
    IdSpaceExhausted {
        /// The path being registered.
        path: String,
    },
}

fn ids_list(ids: &[ObjectId]) -> String {
    ids.iter().map(ObjectId::as_str).collect::<Vec<_>>().join(", ")
}

impl PlannerError {
    /// The diagnostic code, `R001` through `R008`.
    pub fn code(&self) -> DiagnosticCode {
        let number = match self {
            PlannerError::Ambiguous { .. } => 1,
            PlannerError::Unresolved { .. } => 2,
            PlannerError::NameClash { .. } => 3,
            PlannerError::MissingSection { .. } => 4,
            PlannerError::UnknownPhase { .. } => 5,
            PlannerError::InvalidRegistration { .. } => 6,
            PlannerError::IdSpaceExhausted { .. } => 7,
            PlannerError::ExternallyReferenced { .. } => 8,
        };
        DiagnosticCode::new(Category::Plan, number)
    }

    /// Converts to an error diagnostic located in `file`.
    pub fn to_diagnostic(&self, file: FileId) -> Diagnostic {
        match self {
            PlannerError::Ambiguous { group, .. } => {
                let primary = group
                    .ranges
                    .first()
                    .map_or(Span::DUMMY, |r| Span::new(file, *r));
                let mut diag = Diagnostic::error(self.code(), self.to_string(), primary);
                for range in group.ranges.iter().skip(1) {
                    diag = diag.with_label(Label::secondary(
                        Span::new(file, *range),
                        "conflicting definition",
                    ));
                }
                diag.with_help("decide which record is correct and delete the other by hand")
            }
            PlannerError::Unresolved { range, .. } => {
                Diagnostic::error(self.code(), self.to_string(), Span::new(file, *range))
                    .with_help("enable `dedup.prune_dangling` or restore the missing records")
            }
            PlannerError::NameClash { .. } => {
                Diagnostic::error(self.code(), self.to_string(), Span::DUMMY)
                    .with_note("two files with one name cannot be compiled into one target")
            }
            _ => Diagnostic::error(self.code(), self.to_string(), Span::DUMMY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ambiguous() -> PlannerError {
        PlannerError::Ambiguous {
            reason: "ambiguous group",
            group: AmbiguousGroup {
                table: Table::FileReference,
                id: ObjectId::from("F1"),
                variants: vec!["path Time.swift".into(), "path Utils/Time.swift".into()],
                ranges: vec![TextRange::new(5, 9), TextRange::new(20, 30)],
            },
        }
    }

    #[test]
    fn ambiguous_display() {
        assert_eq!(
            ambiguous().to_string(),
            "ambiguous group: file reference id F1 (path Time.swift vs path Utils/Time.swift)"
        );
    }

    #[test]
    fn ambiguous_diagnostic_points_at_both() {
        let diag = ambiguous().to_diagnostic(FileId::from_raw(0));
        assert_eq!(diag.code.to_string(), "R001");
        assert_eq!(diag.primary_span.range, TextRange::new(5, 9));
        assert_eq!(diag.labels.len(), 1);
    }

    #[test]
    fn unresolved_display_lists_ids() {
        let err = PlannerError::Unresolved {
            count: 2,
            invariant: Invariant::PhaseEntryResolves,
            ids: vec!["S1".into(), "B9".into()],
            range: TextRange::new(0, 1),
        };
        assert_eq!(
            err.to_string(),
            "2 unresolved reference(s) and pruning is disabled; first breaks `phase-entry-resolves` (S1, B9)"
        );
    }
}
