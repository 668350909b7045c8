//! The named consistency rules a committed manifest must satisfy.

use mend_diagnostics::{Category, DiagnosticCode};
use serde::Serialize;
use std::fmt;

/// A consistency rule over the three tracked tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Invariant {
    /// Every build file's `fileRef` names an existing file reference.
    BuildFileResolves,
    /// Every phase item names an existing build file.
    PhaseEntryResolves,
    /// A file reference is compiled by at most one build file.
    OneBuildFilePerReference,
    /// A file name appears in the compile list at most once.
    CompiledOnce,
    /// Untouched phase items keep their relative order across an edit.
    OrderPreserved,
    /// An id is defined at most once per table.
    UniqueIds,
    /// Records sharing an id agree on their content.
    ConsistentIds,
}

impl Invariant {
    /// Every invariant, in reporting order.
    pub const ALL: [Invariant; 7] = [
        Invariant::BuildFileResolves,
        Invariant::PhaseEntryResolves,
        Invariant::OneBuildFilePerReference,
        Invariant::CompiledOnce,
        Invariant::OrderPreserved,
        Invariant::UniqueIds,
        Invariant::ConsistentIds,
    ];

    /// The stable kebab-case name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Invariant::BuildFileResolves => "build-file-resolves",
            Invariant::PhaseEntryResolves => "phase-entry-resolves",
            Invariant::OneBuildFilePerReference => "one-build-file-per-reference",
            Invariant::CompiledOnce => "compiled-once",
            Invariant::OrderPreserved => "order-preserved",
            Invariant::UniqueIds => "unique-ids",
            Invariant::ConsistentIds => "consistent-ids",
        }
    }

    /// The diagnostic code, `I001` through `I007`.
    pub fn code(self) -> DiagnosticCode {
        let number = match self {
            Invariant::BuildFileResolves => 1,
            Invariant::PhaseEntryResolves => 2,
            Invariant::OneBuildFilePerReference => 3,
            Invariant::CompiledOnce => 4,
            Invariant::OrderPreserved => 5,
            Invariant::UniqueIds => 6,
            Invariant::ConsistentIds => 7,
        };
        DiagnosticCode::new(Category::Integrity, number)
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
