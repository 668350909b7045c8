//! Configuration types deserialized from `mend.toml`.

use serde::Deserialize;

/// The backup suffix used when none is configured.
pub const DEFAULT_BACKUP_SUFFIX: &str = ".backup";

/// The top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MendConfig {
    /// Where the manifest is and which phase receives new files.
    #[serde(default)]
    pub manifest: ManifestConfig,
    /// Duplicate-resolution policy.
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Backup settings.
    #[serde(default)]
    pub backup: BackupConfig,
    /// Files to register as compiled sources.
    #[serde(default)]
    pub register: Vec<RegisterSpec>,
}

/// Location of the manifest and the insertion target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestConfig {
    /// Manifest path, relative to the directory holding `mend.toml`.
    pub path: Option<String>,
    /// Id of the sources phase that receives appended files.
    pub phase: Option<String>,
}

/// Controls how duplicate groups are resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Subdirectories whose files win a duplicate tie over root-level files.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Whether references to missing records are removed.
    #[serde(default = "default_true")]
    pub prune_dangling: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            prune_dangling: true,
        }
    }
}

/// Backup file settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    /// Appended to the manifest file name to form the backup path.
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
        }
    }
}

/// One file to register.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterSpec {
    /// Path as it should appear in the file reference (e.g. `Utils/Time.swift`).
    pub path: String,
    /// Display name; defaults to the final path component.
    #[serde(default)]
    pub name: Option<String>,
}

impl RegisterSpec {
    /// Parses the `PATH[=NAME]` shorthand used on the command line.
    pub fn from_shorthand(s: &str) -> Self {
        match s.split_once('=') {
            Some((path, name)) if !name.is_empty() => Self {
                path: path.to_string(),
                name: Some(name.to_string()),
            },
            Some((path, _)) => Self {
                path: path.to_string(),
                name: None,
            },
            None => Self {
                path: s.to_string(),
                name: None,
            },
        }
    }

    /// The display name, falling back to the file name of `path`.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_suffix() -> String {
    DEFAULT_BACKUP_SUFFIX.to_string()
}
