//! A broken invariant with the ids and text ranges that break it.

use crate::invariant::Invariant;
use mend_common::ObjectId;
use mend_diagnostics::{Diagnostic, Label};
use mend_source::{FileId, Span, TextRange};
use serde::Serialize;
use std::fmt;

/// One invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The broken rule.
    pub invariant: Invariant,
    /// Human-readable description.
    pub message: String,
    /// Offending ids.
    pub ids: Vec<ObjectId>,
    /// Offending records or phase items. The first is the primary location.
    pub ranges: Vec<TextRange>,
}

impl Violation {
    /// Creates a violation with no ids or ranges.
    pub fn new(invariant: Invariant, message: impl Into<String>) -> Self {
        Self {
            invariant,
            message: message.into(),
            ids: Vec::new(),
            ranges: Vec::new(),
        }
    }

    /// Appends offending ids.
    pub fn with_ids(mut self, ids: impl IntoIterator<Item = ObjectId>) -> Self {
        self.ids.extend(ids);
        self
    }

    /// Appends offending ranges.
    pub fn with_ranges(mut self, ranges: impl IntoIterator<Item = TextRange>) -> Self {
        self.ranges.extend(ranges);
        self
    }

    /// Converts to an error diagnostic located in `file`.
    pub fn to_diagnostic(&self, file: FileId) -> Diagnostic {
        let primary = self
            .ranges
            .first()
            .map_or(Span::DUMMY, |r| Span::new(file, *r));
        let mut diag = Diagnostic::error(self.invariant.code(), &self.message, primary)
            .with_note(format!("violates `{}`", self.invariant));
        for range in self.ranges.iter().skip(1) {
            diag = diag.with_label(Label::secondary(Span::new(file, *range), "also here"));
        }
        if !self.ids.is_empty() {
            let ids: Vec<&str> = self.ids.iter().map(ObjectId::as_str).collect();
            diag = diag.with_note(format!("ids: {}", ids.join(", ")));
        }
        if let Some(help) = help_for(self.invariant) {
            diag = diag.with_help(help);
        }
        diag
    }
}

fn help_for(invariant: Invariant) -> Option<&'static str> {
    match invariant {
        Invariant::OneBuildFilePerReference | Invariant::CompiledOnce | Invariant::UniqueIds => {
            Some("run `mend fix` to keep one entry per file")
        }
        Invariant::BuildFileResolves | Invariant::PhaseEntryResolves => {
            Some("run `mend fix` to prune references to missing records")
        }
        Invariant::ConsistentIds => {
            Some("records disagree; edit the manifest by hand to keep the intended one")
        }
        Invariant::OrderPreserved => None,
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}
