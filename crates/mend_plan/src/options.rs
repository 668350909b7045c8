//! Planner inputs supplied by the caller.

use mend_common::ObjectId;
use serde::{Deserialize, Serialize};

/// A file to start compiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Path relative to the group the file lives in, `/`-separated.
    pub path: String,
    /// Display name; defaults to the last path component.
    pub name: Option<String>,
}

impl Registration {
    /// A registration without an explicit display name.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }

    /// The display name.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| mend_manifest::model::compile_name(&self.path))
    }
}

/// Policy knobs for one planning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOptions {
    /// Preferred subdirectories for choosing the canonical entry of a
    /// duplicate group.
    pub allow: Vec<String>,
    /// Remove references to records that do not exist.
    pub prune_dangling: bool,
    /// Sources phase new files are appended to; the first one if unset.
    pub phase: Option<ObjectId>,
    /// Files to register.
    pub register: Vec<Registration>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            prune_dangling: true,
            phase: None,
            register: Vec::new(),
        }
    }
}

impl PlanOptions {
    /// Returns `true` if `path` lies in one of the allowed subdirectories.
    ///
    /// Root-level paths never match. An allowed entry matches any run of whole
    /// directory components, so `Utils` matches `App/Utils/Time.swift`.
    pub fn prefers(&self, path: &str) -> bool {
        let Some((dir, _)) = path.rsplit_once('/') else {
            return false;
        };
        let dir = format!("/{dir}/");
        self.allow
            .iter()
            .any(|allowed| dir.contains(&format!("/{}/", allowed.trim_matches('/'))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(dirs: &[&str]) -> PlanOptions {
        PlanOptions {
            allow: dirs.iter().map(|d| d.to_string()).collect(),
            ..PlanOptions::default()
        }
    }

    #[test]
    fn prefers_whole_components() {
        let opts = allow(&["Utils"]);
        assert!(opts.prefers("Utils/Time.swift"));
        assert!(opts.prefers("App/Utils/Time.swift"));
        assert!(!opts.prefers("Time.swift"));
        assert!(!opts.prefers("MyUtils/Time.swift"));
        assert!(!opts.prefers("Utilsx/Time.swift"));
    }

    #[test]
    fn nested_allow_entry() {
        let opts = allow(&["Core/Models"]);
        assert!(opts.prefers("Core/Models/User.swift"));
        assert!(!opts.prefers("Models/User.swift"));
    }

    #[test]
    fn empty_allow_prefers_nothing() {
        assert!(!PlanOptions::default().prefers("Utils/Time.swift"));
        assert!(PlanOptions::default().prune_dangling);
    }

    #[test]
    fn registration_display_name() {
        assert_eq!(Registration::new("Utils/Time.swift").display_name(), "Time.swift");
        let named = Registration {
            path: "a.swift".into(),
            name: Some("Alpha".into()),
        };
        assert_eq!(named.display_name(), "Alpha");
    }
}
