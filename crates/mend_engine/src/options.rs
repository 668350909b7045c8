//! Options for one reconciliation run.

use mend_common::ObjectId;
use mend_config::{MendConfig, DEFAULT_BACKUP_SUFFIX};
use mend_plan::{PlanOptions, Registration};

/// Everything [`reconcile`](crate::reconcile) needs besides the manifest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Planner policy and files to register.
    pub plan: PlanOptions,
    /// Appended to the manifest path to form the backup path.
    pub backup_suffix: String,
    /// Run every stage but write nothing.
    pub dry_run: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            plan: PlanOptions::default(),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            dry_run: false,
        }
    }
}

impl ReconcileOptions {
    /// Options taken from a loaded `mend.toml`.
    pub fn from_config(config: &MendConfig) -> Self {
        Self {
            plan: PlanOptions {
                allow: config.dedup.allow.clone(),
                prune_dangling: config.dedup.prune_dangling,
                phase: config.manifest.phase.as_deref().map(ObjectId::from),
                register: config
                    .register
                    .iter()
                    .map(|spec| Registration {
                        path: spec.path.clone(),
                        name: spec.name.clone(),
                    })
                    .collect(),
            },
            backup_suffix: config.backup.suffix.clone(),
            dry_run: false,
        }
    }
}
