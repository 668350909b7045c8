//! mend: checks and repairs the compile tables of a build manifest.
//!
//! `mend check` reports integrity violations without writing anything,
//! `mend fix` removes duplicate and dangling entries, and `mend add` makes
//! sure the given files are compiled exactly once. Every writing command
//! backs the manifest up first and commits only a re-validated rewrite.

#![warn(missing_docs)]

mod check;
mod fix;
mod pipeline;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// mend: keeps a build manifest's compile tables consistent.
#[derive(Parser, Debug)]
#[command(name = "mend", version, about = "Build manifest consistency engine")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `mend.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output format for diagnostics and reports.
    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report integrity violations without changing anything.
    Check(CheckArgs),
    /// Remove duplicate and dangling entries.
    Fix(FixArgs),
    /// Make sure files are compiled exactly once.
    Add(AddArgs),
}

/// Arguments for the `mend check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Manifest file or `.xcodeproj` directory. Defaults to the configured
    /// path, then to the only `*.xcodeproj` in the current directory.
    pub manifest: Option<PathBuf>,
}

/// Arguments for the `mend fix` subcommand.
#[derive(Parser, Debug)]
pub struct FixArgs {
    /// Manifest file or `.xcodeproj` directory.
    pub manifest: Option<PathBuf>,

    /// Subdirectories whose files win duplicate ties (e.g., `--allow Utils`).
    #[arg(long, num_args = 1..)]
    pub allow: Vec<String>,

    /// Run every check but write nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `mend add` subcommand.
#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Manifest file or `.xcodeproj` directory.
    pub manifest: Option<PathBuf>,

    /// Files to compile, as `PATH` or `PATH=NAME`.
    #[arg(short, long = "file", required = true, num_args = 1..)]
    pub files: Vec<String>,

    /// Run every check but write nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output, one object per line.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
    /// How diagnostics and reports are printed.
    pub format: ReportFormat,
}

fn init_tracing(global: &GlobalArgs) {
    let default = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(global.color)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
        format: cli.format,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global),
        Command::Fix(ref args) => fix::run_fix(args, &global),
        Command::Add(ref args) => fix::run_add(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_check_default() {
        let cli = Cli::parse_from(["mend", "check"]);
        match cli.command {
            Command::Check(ref args) => assert!(args.manifest.is_none()),
            _ => panic!("expected Check command"),
        }
        assert_eq!(cli.format, ReportFormat::Text);
    }

    #[test]
    fn parse_check_with_manifest() {
        let cli = Cli::parse_from(["mend", "check", "App.xcodeproj"]);
        match cli.command {
            Command::Check(ref args) => {
                assert_eq!(args.manifest, Some(PathBuf::from("App.xcodeproj")));
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_fix_with_args() {
        let cli = Cli::parse_from([
            "mend",
            "fix",
            "App.xcodeproj/project.pbxproj",
            "--allow",
            "Utils",
            "Models",
            "--dry-run",
        ]);
        match cli.command {
            Command::Fix(ref args) => {
                assert_eq!(
                    args.manifest.as_deref(),
                    Some(std::path::Path::new("App.xcodeproj/project.pbxproj"))
                );
                assert_eq!(args.allow, vec!["Utils", "Models"]);
                assert!(args.dry_run);
            }
            _ => panic!("expected Fix command"),
        }
    }

    #[test]
    fn parse_fix_default() {
        let cli = Cli::parse_from(["mend", "fix"]);
        match cli.command {
            Command::Fix(ref args) => {
                assert!(args.allow.is_empty());
                assert!(!args.dry_run);
            }
            _ => panic!("expected Fix command"),
        }
    }

    #[test]
    fn parse_add_files() {
        let cli = Cli::parse_from([
            "mend",
            "add",
            "--file",
            "Utils/Time.swift",
            "Views/Row.swift=Row.swift",
        ]);
        match cli.command {
            Command::Add(ref args) => {
                assert!(args.manifest.is_none());
                assert_eq!(args.files, vec!["Utils/Time.swift", "Views/Row.swift=Row.swift"]);
                assert!(!args.dry_run);
            }
            _ => panic!("expected Add command"),
        }
    }

    #[test]
    fn add_requires_a_file() {
        assert!(Cli::try_parse_from(["mend", "add"]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from([
            "mend", "--quiet", "--color", "never", "--format", "json", "check",
        ]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.format, ReportFormat::Json);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["mend", "fix", "--verbose", "--config", "ci/mend.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("ci/mend.toml"));
    }
}
