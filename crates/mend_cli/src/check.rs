//! `mend check`: read-only integrity report.

use mend_diagnostics::DiagnosticSink;
use mend_engine::{Driver, ReconcileOptions, StdFs};

use crate::pipeline::{
    announce, emit, emit_error, load_settings, resolve_manifest, source_db_with,
};
use crate::{CheckArgs, GlobalArgs, ReportFormat};

/// Runs the `mend check` command.
///
/// Returns exit code 0 if the manifest is consistent, 1 otherwise.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let settings = load_settings(global, &cwd)?;
    let manifest = resolve_manifest(args.manifest.as_deref(), &settings, &cwd)?;

    announce("Checking", &manifest, &settings, global);

    let driver = Driver::new(StdFs, ReconcileOptions::from_config(&settings.config));
    let inspection = match driver.inspect(&manifest) {
        Ok(inspection) => inspection,
        Err(err) => {
            emit_error(&err, &manifest, global);
            return Ok(1);
        }
    };

    let (source_db, file) = source_db_with(&manifest, inspection.text.clone());
    let sink = DiagnosticSink::new();
    sink.extend(inspection.violations.iter().map(|v| v.to_diagnostic(file)));
    let violations = sink.error_count();
    emit(&sink, &source_db, global);

    if !global.quiet && global.format == ReportFormat::Text {
        let m = &inspection.manifest;
        eprintln!(
            "   Result: {} violation(s) in {} file reference(s), {} build file(s), {} compiled entr{}",
            violations,
            m.file_references.len(),
            m.build_files.len(),
            m.phase_entries().count(),
            if m.phase_entries().count() == 1 { "y" } else { "ies" },
        );
    }

    Ok(if inspection.is_consistent() { 0 } else { 1 })
}
