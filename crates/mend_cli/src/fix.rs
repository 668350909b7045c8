//! `mend fix` and `mend add`: reconcile the manifest in place.

use std::path::Path;

use mend_config::RegisterSpec;
use mend_engine::{reconcile, ReconcileOptions, Summary};
use mend_plan::Registration;

use crate::pipeline::{announce, emit_error, load_settings, resolve_manifest, Settings};
use crate::{AddArgs, FixArgs, GlobalArgs, ReportFormat};

/// Runs the `mend fix` command.
pub fn run_fix(args: &FixArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let settings = load_settings(global, &cwd)?;
    let manifest = resolve_manifest(args.manifest.as_deref(), &settings, &cwd)?;
    let options = merge_options(&settings, &args.allow, &[], args.dry_run);
    announce("Fixing", &manifest, &settings, global);
    execute(&manifest, &options, global)
}

/// Runs the `mend add` command.
pub fn run_add(args: &AddArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let settings = load_settings(global, &cwd)?;
    let manifest = resolve_manifest(args.manifest.as_deref(), &settings, &cwd)?;
    let options = merge_options(&settings, &[], &args.files, args.dry_run);
    announce("Adding", &manifest, &settings, global);
    execute(&manifest, &options, global)
}

/// Overlays command-line flags on the configuration.
///
/// `--allow` entries extend the configured allow-list; `--file` entries are
/// registered after the configured ones.
fn merge_options(
    settings: &Settings,
    allow: &[String],
    files: &[String],
    dry_run: bool,
) -> ReconcileOptions {
    let mut options = ReconcileOptions::from_config(&settings.config);
    for dir in allow {
        let dir = dir.trim_end_matches('/');
        if !dir.is_empty() && !options.plan.allow.iter().any(|d| d == dir) {
            options.plan.allow.push(dir.to_string());
        }
    }
    for file in files {
        let spec = RegisterSpec::from_shorthand(file);
        options.plan.register.push(Registration {
            path: spec.path,
            name: spec.name,
        });
    }
    options.dry_run = dry_run;
    options
}

fn execute(
    manifest: &Path,
    options: &ReconcileOptions,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    match reconcile(manifest, options) {
        Ok(summary) => {
            report(&summary, global)?;
            Ok(0)
        }
        Err(err) => {
            emit_error(&err, manifest, global);
            Ok(1)
        }
    }
}

fn report(summary: &Summary, global: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    match global.format {
        ReportFormat::Text => {
            if !global.quiet {
                eprintln!("    Finished {summary}");
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string(summary)?),
    }
    Ok(())
}
