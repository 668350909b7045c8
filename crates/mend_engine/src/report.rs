//! Conversion of run failures into diagnostics.

use crate::error::{ReconcileError, ValidationError};
use mend_common::ObjectId;
use mend_diagnostics::{Category, Diagnostic, DiagnosticCode};
use mend_manifest::{ParseError, ParseErrorKind};
use mend_source::{FileId, Span, TextRange};

const UNCHANGED: &str = "the working file was left unchanged";

/// The code of a parse failure, `P001` through `P008`.
pub fn parse_code(kind: &ParseErrorKind) -> DiagnosticCode {
    let number = match kind {
        ParseErrorKind::NotAManifest => 1,
        ParseErrorKind::UnterminatedSection { .. } => 2,
        ParseErrorKind::UnterminatedComment => 3,
        ParseErrorKind::UnterminatedString => 4,
        ParseErrorKind::UnexpectedEnd { .. } => 5,
        ParseErrorKind::Unexpected { .. } => 6,
        ParseErrorKind::MissingField { .. } => 7,
        ParseErrorKind::IsaMismatch { .. } => 8,
    };
    DiagnosticCode::new(Category::Parse, number)
}

/// A parse failure pointing at the record that failed to match.
pub fn parse_diagnostic(err: &ParseError, file: FileId) -> Diagnostic {
    let span = match err.record_start {
        Some(start) if start < err.offset => Span::new(file, TextRange::new(start, err.offset)),
        _ => Span::point(file, err.offset),
    };
    Diagnostic::error(parse_code(&err.kind), err.kind.to_string(), span)
        .with_note(format!("matching stopped at byte {}", err.offset))
}

fn validation(number: u16) -> DiagnosticCode {
    DiagnosticCode::new(Category::Validation, number)
}

fn ids_note(ids: &[ObjectId]) -> Option<String> {
    (!ids.is_empty()).then(|| {
        let ids: Vec<&str> = ids.iter().map(ObjectId::as_str).collect();
        format!("ids: {}", ids.join(", "))
    })
}

fn validation_diagnostics(err: &ValidationError) -> Vec<Diagnostic> {
    // Ranges found after a rewrite index the discarded text, not the file.
    match err {
        ValidationError::Reparse(source) => vec![Diagnostic::error(
            validation(1),
            format!("rewritten manifest does not parse: {}", source.kind),
            Span::DUMMY,
        )
        .with_note(format!("matching stopped at byte {} of the rewritten text", source.offset))
        .with_note(UNCHANGED)],
        ValidationError::Invariants { violations } => violations
            .iter()
            .map(|v| {
                let mut diag = Diagnostic::error(
                    validation(2),
                    format!("rewritten manifest breaks an invariant: {}", v.message),
                    Span::DUMMY,
                )
                .with_note(format!("violates `{}` ({})", v.invariant, v.invariant.code()));
                if let Some(ids) = ids_note(&v.ids) {
                    diag = diag.with_note(ids);
                }
                diag.with_note(UNCHANGED)
            })
            .collect(),
        ValidationError::CountMismatch { expected, actual } => vec![Diagnostic::error(
            validation(3),
            "rewrite removed a different number of records than planned",
            Span::DUMMY,
        )
        .with_note(format!(
            "expected {} file reference(s), {} build file(s), {} phase(s), {} phase item(s)",
            expected.file_references, expected.build_files, expected.phases, expected.phase_items
        ))
        .with_note(format!(
            "removed {} file reference(s), {} build file(s), {} phase(s), {} phase item(s)",
            actual.file_references, actual.build_files, actual.phases, actual.phase_items
        ))
        .with_note(UNCHANGED)],
    }
}

/// Every diagnostic describing `err`, located in `file` where possible.
pub fn diagnostics(err: &ReconcileError, file: FileId) -> Vec<Diagnostic> {
    match err {
        ReconcileError::Parse { source, .. } => vec![parse_diagnostic(source, file)],
        ReconcileError::Planner(source) => vec![source.to_diagnostic(file).with_note(UNCHANGED)],
        ReconcileError::Mutate(source) => vec![Diagnostic::error(
            validation(100),
            format!("cannot apply edits: {source}"),
            Span::DUMMY,
        )
        .with_note(UNCHANGED)],
        ReconcileError::Validation { source, .. } => validation_diagnostics(source),
        ReconcileError::Io { path, source } => vec![Diagnostic::error(
            DiagnosticCode::new(Category::FileSystem, 1),
            format!("cannot access {}: {source}", path.display()),
            Span::DUMMY,
        )
        .with_note(UNCHANGED)],
        ReconcileError::BackupMismatch { path } => vec![Diagnostic::error(
            DiagnosticCode::new(Category::FileSystem, 2),
            format!("backup {} does not match the manifest", path.display()),
            Span::DUMMY,
        )
        .with_note(UNCHANGED)
        .with_help("check free space and permissions next to the manifest")],
        ReconcileError::Internal(source) => vec![Diagnostic::error(
            validation(100),
            source.to_string(),
            Span::DUMMY,
        )
        .with_note(UNCHANGED)],
    }
}
