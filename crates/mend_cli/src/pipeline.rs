//! Shared helpers for CLI commands: configuration and manifest discovery,
//! and diagnostic output.

use std::path::{Path, PathBuf};

use mend_config::{find_config_file, MendConfig, CONFIG_FILE};
use mend_diagnostics::{DiagnosticRenderer, DiagnosticSink, JsonRenderer, TerminalRenderer};
use mend_engine::report;
use mend_engine::ReconcileError;
use mend_source::{FileId, SourceDb};
use tracing::debug;

use crate::{GlobalArgs, ReportFormat};

/// The manifest file inside an `.xcodeproj` bundle.
pub const MANIFEST_FILE: &str = "project.pbxproj";

/// A loaded configuration and the directory its relative paths start from.
pub struct Settings {
    /// The configuration, or defaults when no file was found.
    pub config: MendConfig,
    /// Directory holding `mend.toml`, or the working directory.
    pub base_dir: PathBuf,
    /// The file the configuration came from.
    pub source: Option<PathBuf>,
}

/// Loads `--config` if given, else the nearest `mend.toml` above `cwd`, else
/// defaults.
pub fn load_settings(
    global: &GlobalArgs,
    cwd: &Path,
) -> Result<Settings, Box<dyn std::error::Error>> {
    let explicit = global.config.as_ref().map(|p| {
        let p = PathBuf::from(p);
        if p.is_dir() {
            p.join(CONFIG_FILE)
        } else {
            p
        }
    });
    let source = match explicit {
        Some(path) => Some(path),
        None => find_config_file(cwd),
    };
    match source {
        Some(path) => {
            let config = mend_config::load_config(&path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            let base_dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf());
            debug!(config = %path.display(), "loaded configuration");
            Ok(Settings {
                config,
                base_dir,
                source: Some(path),
            })
        }
        None => {
            debug!(cwd = %cwd.display(), "no configuration file, using defaults");
            Ok(Settings {
                config: MendConfig::default(),
                base_dir: cwd.to_path_buf(),
                source: None,
            })
        }
    }
}

/// Turns `path` into a manifest file path: an `.xcodeproj` directory means
/// the manifest inside it.
fn manifest_in(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        path.join(MANIFEST_FILE)
    } else {
        path
    }
}

/// Finds the only `*.xcodeproj/project.pbxproj` directly under `dir`.
pub fn find_manifest(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_bundle = path.extension().is_some_and(|ext| ext == "xcodeproj");
        if is_bundle && path.join(MANIFEST_FILE).is_file() {
            found.push(path.join(MANIFEST_FILE));
        }
    }
    found.sort();
    match found.len() {
        0 => Err(format!(
            "no *.xcodeproj/{MANIFEST_FILE} in {}; pass the manifest path",
            dir.display()
        )
        .into()),
        1 => Ok(found.remove(0)),
        _ => {
            let names: Vec<String> = found.iter().map(|p| p.display().to_string()).collect();
            Err(format!(
                "several manifests found ({}); pass the one to use",
                names.join(", ")
            )
            .into())
        }
    }
}

/// Resolves the manifest from the command line, the configuration, or a
/// search of `cwd`, in that order.
pub fn resolve_manifest(
    explicit: Option<&Path>,
    settings: &Settings,
    cwd: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        return Ok(manifest_in(path.to_path_buf()));
    }
    if let Some(path) = &settings.config.manifest.path {
        return Ok(manifest_in(settings.base_dir.join(path)));
    }
    find_manifest(cwd)
}

/// Prints the cargo-style status line for `manifest`.
pub fn announce(verb: &str, manifest: &Path, settings: &Settings, global: &GlobalArgs) {
    if global.quiet || global.format != ReportFormat::Text {
        return;
    }
    eprintln!("{verb:>12} {}", manifest.display());
    if global.verbose {
        if let Some(source) = &settings.source {
            eprintln!("{:>12} {}", "Config", source.display());
        }
    }
}

/// Drains the sink, printing to stderr or as JSON lines to stdout.
pub fn emit(sink: &DiagnosticSink, source_db: &SourceDb, global: &GlobalArgs) {
    let diagnostics = sink.take_all();
    match global.format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(global.color, 100);
            for diag in &diagnostics {
                eprintln!("{}", renderer.render(diag, source_db));
            }
        }
        ReportFormat::Json => {
            for diag in &diagnostics {
                println!("{}", JsonRenderer.render(diag, source_db));
            }
        }
    }
}

/// Prints the diagnostics for a failed run against `manifest`.
pub fn emit_error(err: &ReconcileError, manifest: &Path, global: &GlobalArgs) {
    let mut source_db = SourceDb::new();
    let file = source_db
        .load_file(manifest)
        .unwrap_or_else(|_| source_db.add_source(manifest, String::new()));
    let sink = DiagnosticSink::new();
    sink.extend(report::diagnostics(err, file));
    emit(&sink, &source_db, global);
}

/// Adds already-read manifest text to a fresh database.
pub fn source_db_with(manifest: &Path, text: String) -> (SourceDb, FileId) {
    let mut source_db = SourceDb::new();
    let file = source_db.add_source(manifest, text);
    (source_db, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
            format: ReportFormat::Text,
        }
    }

    fn bundle(dir: &Path, name: &str) -> PathBuf {
        let bundle = dir.join(name);
        fs::create_dir_all(&bundle).unwrap();
        let manifest = bundle.join(MANIFEST_FILE);
        fs::write(&manifest, "{\n}\n").unwrap();
        manifest
    }

    #[test]
    fn finds_single_bundle() {
        let tmp = TempDir::new().unwrap();
        let manifest = bundle(tmp.path(), "App.xcodeproj");
        assert_eq!(find_manifest(tmp.path()).unwrap(), manifest);
    }

    #[test]
    fn several_bundles_are_ambiguous() {
        let tmp = TempDir::new().unwrap();
        bundle(tmp.path(), "App.xcodeproj");
        bundle(tmp.path(), "Widget.xcodeproj");
        let err = find_manifest(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("several manifests"));
    }

    #[test]
    fn no_bundle_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(find_manifest(tmp.path()).is_err());
    }

    #[test]
    fn explicit_bundle_directory_means_its_manifest() {
        let tmp = TempDir::new().unwrap();
        let manifest = bundle(tmp.path(), "App.xcodeproj");
        let settings = load_settings(&global(None), tmp.path()).unwrap();
        let resolved =
            resolve_manifest(Some(&tmp.path().join("App.xcodeproj")), &settings, tmp.path())
                .unwrap();
        assert_eq!(resolved, manifest);
    }

    #[test]
    fn configured_path_is_relative_to_config() {
        let tmp = TempDir::new().unwrap();
        let manifest = bundle(&tmp.path().join("ios"), "App.xcodeproj");
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[manifest]\npath = \"ios/App.xcodeproj/project.pbxproj\"\n",
        )
        .unwrap();
        let sub = tmp.path().join("scripts");
        fs::create_dir_all(&sub).unwrap();
        let settings = load_settings(&global(None), &sub).unwrap();
        assert_eq!(settings.source, Some(tmp.path().join(CONFIG_FILE)));
        assert_eq!(resolve_manifest(None, &settings, &sub).unwrap(), manifest);
    }

    #[test]
    fn explicit_config_wins_over_search() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[dedup]\nallow = [\"Utils\"]\n").unwrap();
        let other = tmp.path().join("other.toml");
        fs::write(&other, "[dedup]\nallow = [\"Models\"]\n").unwrap();
        let settings = load_settings(
            &global(Some(other.display().to_string())),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(settings.config.dedup.allow, vec!["Models"]);
    }

    #[test]
    fn invalid_config_names_the_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[backup]\nsuffix = \"\"\n").unwrap();
        let err = load_settings(&global(None), tmp.path()).err().unwrap();
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn defaults_without_config() {
        let tmp = TempDir::new().unwrap();
        let settings = load_settings(&global(None), tmp.path()).unwrap();
        assert!(settings.source.is_none());
        assert!(settings.config.dedup.prune_dangling);
    }
}
