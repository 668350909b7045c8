//! Configuration file discovery, loading and validation.

use crate::error::ConfigError;
use crate::types::MendConfig;
use std::path::{Path, PathBuf};

/// File name searched for when no explicit configuration is given.
pub const CONFIG_FILE: &str = "mend.toml";

/// Walks up from `start` looking for the nearest `mend.toml`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<MendConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates configuration text.
pub fn load_config_from_str(content: &str) -> Result<MendConfig, ConfigError> {
    let mut config: MendConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&mut config)?;
    Ok(config)
}

/// Rejects values the engine cannot act on and normalises allow-list entries.
fn validate_config(config: &mut MendConfig) -> Result<(), ConfigError> {
    let mut allow = Vec::with_capacity(config.dedup.allow.len());
    for (i, dir) in config.dedup.allow.iter().enumerate() {
        let field = format!("dedup.allow[{i}]");
        let trimmed = dir.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::invalid(field, "must name a subdirectory"));
        }
        if trimmed.starts_with('/') {
            return Err(ConfigError::invalid(field, "must be relative"));
        }
        if !allow.iter().any(|d: &String| d == trimmed) {
            allow.push(trimmed.to_string());
        }
    }
    config.dedup.allow = allow;

    let suffix = &config.backup.suffix;
    if suffix.is_empty() || suffix.contains('/') {
        return Err(ConfigError::invalid(
            "backup.suffix",
            "must be a non-empty file name suffix",
        ));
    }

    if let Some(phase) = &config.manifest.phase {
        if phase.trim().is_empty() || phase.contains(char::is_whitespace) {
            return Err(ConfigError::invalid("manifest.phase", "must be a record id"));
        }
    }

    for (i, spec) in config.register.iter().enumerate() {
        if spec.path.is_empty() || spec.path.ends_with('/') {
            return Err(ConfigError::invalid(
                format!("register[{i}].path"),
                "must name a file",
            ));
        }
        if spec.name.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::invalid(
                format!("register[{i}].name"),
                "must not be empty",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert!(config.manifest.path.is_none());
        assert!(config.dedup.allow.is_empty());
        assert!(config.dedup.prune_dangling);
        assert_eq!(config.backup.suffix, ".backup");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[manifest]
path = "App.xcodeproj/project.pbxproj"
phase = "80366E822EC0735E008403F4"

[dedup]
allow = ["Models", "Views/", "Services", "Models"]
prune_dangling = false

[backup]
suffix = ".orig"

[[register]]
path = "Utils/Time.swift"

[[register]]
path = "Views/SettingsView.swift"
name = "SettingsView.swift"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(
            config.manifest.path.as_deref(),
            Some("App.xcodeproj/project.pbxproj")
        );
        assert_eq!(
            config.manifest.phase.as_deref(),
            Some("80366E822EC0735E008403F4")
        );
        assert_eq!(config.dedup.allow, vec!["Models", "Views", "Services"]);
        assert!(!config.dedup.prune_dangling);
        assert_eq!(config.backup.suffix, ".orig");
        assert_eq!(config.register.len(), 2);
        assert_eq!(config.register[0].display_name(), "Time.swift");
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not toml {{{").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn absolute_allow_entry_rejected() {
        let err = load_config_from_str("[dedup]\nallow = [\"/Views\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "dedup.allow[0]"));
    }

    #[test]
    fn empty_allow_entry_rejected() {
        let err = load_config_from_str("[dedup]\nallow = [\"/\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn bad_suffix_rejected() {
        let err = load_config_from_str("[backup]\nsuffix = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "backup.suffix"));
    }

    #[test]
    fn directory_register_path_rejected() {
        let err = load_config_from_str("[[register]]\npath = \"Views/\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "register[0].path"));
    }

    #[test]
    fn find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        let nested = dir.path().join("App.xcodeproj");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(
            find_config_file(&nested),
            Some(dir.path().join(CONFIG_FILE))
        );
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/mend.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
