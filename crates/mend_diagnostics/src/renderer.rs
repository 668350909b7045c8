//! Diagnostic rendering for terminals and machines.

use crate::diagnostic::Diagnostic;
use crate::label::LabelStyle;
use crate::severity::Severity;
use mend_source::{SourceDb, Span};

/// Formats a diagnostic into a string.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String;
}

/// Renders diagnostics in a rustc-like layout.
///
/// ```text
/// warning[I003]: file reference BBB1 (Time.swift) has 2 build files
///   --> App.xcodeproj/project.pbxproj:12:3 (byte 412)
///    |
/// 12 |         AAA2 /* Time.swift in Sources */ = {isa = PBXBuildFile; ...
///    |         ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ removed
///    = note: build files: AAA1, AAA2
/// ```
pub struct TerminalRenderer {
    /// Whether to emit ANSI colour codes.
    pub color: bool,
    /// Maximum width of the quoted source line.
    pub width: u16,
}

impl TerminalRenderer {
    /// Creates a terminal renderer.
    pub fn new(color: bool, width: u16) -> Self {
        Self { color, width }
    }

    fn paint(&self, severity: Severity, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let code = match severity {
            Severity::Error => "1;31",
            Severity::Warning => "1;33",
            Severity::Note => "1;36",
            Severity::Help => "1;32",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn render_snippet(&self, out: &mut String, span: Span, message: &str, source_db: &SourceDb) {
        let (Some(file), Some(resolved)) = (source_db.get(span.file), source_db.resolve_span(span))
        else {
            return;
        };
        let line_content = file.line_text(span.range.start);
        let line_num = resolved.line.to_string();
        let padding = " ".repeat(line_num.len());
        let width = self.width as usize;
        let shown: String = line_content.chars().take(width).collect();

        out.push_str(&format!("  --> {resolved}\n"));
        out.push_str(&format!("{padding} |\n"));
        out.push_str(&format!("{line_num} | {shown}\n"));

        let col = resolved.col as usize;
        let remaining = shown.len().saturating_sub(col - 1).max(1);
        let carets = "^".repeat(span.range.len().clamp(1, remaining));
        let col_padding = " ".repeat(col.saturating_sub(1).min(shown.len()));
        let suffix = if message.is_empty() {
            String::new()
        } else {
            format!(" {message}")
        };
        out.push_str(&format!("{padding} | {col_padding}{carets}{suffix}\n"));
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let mut out = String::new();
        let header = format!("{}[{}]", diag.severity, diag.code);
        out.push_str(&format!(
            "{}: {}\n",
            self.paint(diag.severity, &header),
            diag.message
        ));

        if !diag.primary_span.is_dummy() {
            let primary_msg = diag
                .labels
                .iter()
                .find(|l| l.style == LabelStyle::Primary)
                .map(|l| l.message.as_str())
                .unwrap_or_default();
            self.render_snippet(&mut out, diag.primary_span, primary_msg, source_db);
        }

        for label in diag
            .labels
            .iter()
            .filter(|l| l.style == LabelStyle::Secondary && !l.span.is_dummy())
        {
            self.render_snippet(&mut out, label.span, &label.message, source_db);
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as one line of JSON, with the resolved location.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let location = source_db.resolve_span(diag.primary_span).map(|r| {
            serde_json::json!({
                "file": r.file_path.display().to_string(),
                "offset": r.offset,
                "line": r.line,
                "column": r.col,
            })
        });
        serde_json::json!({
            "severity": diag.severity,
            "code": diag.code.to_string(),
            "message": diag.message,
            "location": location,
            "notes": diag.notes,
            "help": diag.help,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};
    use crate::label::Label;
    use mend_source::TextRange;

    #[test]
    fn render_error_with_span() {
        let mut db = SourceDb::new();
        let file = db.add_source(
            "project.pbxproj",
            "\t\tAAA1 /* A.swift in Sources */ = {isa = PBXBuildFile\n".to_string(),
        );
        let span = Span::new(file, TextRange::new(2, 6));
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Parse, 2),
            "unterminated record",
            span,
        )
        .with_label(Label::primary(span, "record starts here"));

        let output = TerminalRenderer::new(false, 120).render(&diag, &db);
        assert!(output.contains("error[P002]: unterminated record"));
        assert!(output.contains("--> project.pbxproj:1:3 (byte 2)"));
        assert!(output.contains("^^^^ record starts here"));
    }

    #[test]
    fn render_notes_and_help_without_span() {
        let db = SourceDb::new();
        let diag = Diagnostic::warning(
            DiagnosticCode::new(Category::Integrity, 3),
            "duplicate build file",
            Span::DUMMY,
        )
        .with_note("ids: AAA1, AAA2")
        .with_help("run `mend fix`");
        let output = TerminalRenderer::new(false, 80).render(&diag, &db);
        assert!(output.starts_with("warning[I003]: duplicate build file\n"));
        assert!(!output.contains("-->"));
        assert!(output.contains("= note: ids: AAA1, AAA2"));
        assert!(output.contains("= help: run `mend fix`"));
    }

    #[test]
    fn color_wraps_header() {
        let db = SourceDb::new();
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::FileSystem, 1),
            "backup failed",
            Span::DUMMY,
        );
        let output = TerminalRenderer::new(true, 80).render(&diag, &db);
        assert!(output.starts_with("\x1b[1;31merror[F001]\x1b[0m"));
    }

    #[test]
    fn json_render_includes_location() {
        let mut db = SourceDb::new();
        let file = db.add_source("p.pbxproj", "x\nyz\n".to_string());
        let diag = Diagnostic::warning(
            DiagnosticCode::new(Category::Integrity, 1),
            "dangling",
            Span::new(file, TextRange::new(3, 4)),
        );
        let line = JsonRenderer.render(&diag, &db);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["code"], "I001");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["location"]["line"], 2);
        assert_eq!(value["location"]["column"], 2);
    }
}
