//! The backup, rewrite, validate and commit sequence.

use crate::error::ReconcileError;
use crate::fs::{FileSystem, StdFs};
use crate::options::ReconcileOptions;
use crate::stage::Stage;
use crate::summary::Summary;
use crate::validate::validate;
use mend_common::{ContentHash, InternalError, MendResult};
use mend_index::{IntegrityIndex, Violation};
use mend_manifest::{parse, Manifest};
use mend_plan::EditPlan;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A parsed and indexed manifest, read without writing anything.
#[derive(Debug, Clone)]
pub struct Inspection {
    /// The manifest file.
    pub path: PathBuf,
    /// Its text.
    pub text: String,
    /// The parsed tables.
    pub manifest: Manifest,
    /// The index built over them.
    pub index: IntegrityIndex,
    /// Every broken invariant, in reporting order.
    pub violations: Vec<Violation>,
}

impl Inspection {
    /// Returns `true` if no invariant is broken.
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Hook run on the plan before it is applied.
pub type PlanFilter = Box<dyn Fn(&mut EditPlan)>;

/// Runs manifests through the reconciliation stages over a [`FileSystem`].
pub struct Driver<F> {
    fs: F,
    options: ReconcileOptions,
    plan_filter: Option<PlanFilter>,
    stage: Stage,
}

impl<F: FileSystem> Driver<F> {
    /// Creates a driver in the `Ready` stage.
    pub fn new(fs: F, options: ReconcileOptions) -> Self {
        Self {
            fs,
            options,
            plan_filter: None,
            stage: Stage::Ready,
        }
    }

    /// Installs a hook that may change the plan after it is computed.
    ///
    /// The rewritten text is still validated against the original manifest,
    /// so a hook that corrupts the plan makes the run fail instead of
    /// committing.
    pub fn with_plan_filter(mut self, filter: impl Fn(&mut EditPlan) + 'static) -> Self {
        self.plan_filter = Some(Box::new(filter));
        self
    }

    /// The stage the last run reached.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The options runs use.
    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// The file system runs go through.
    pub fn file_system(&self) -> &F {
        &self.fs
    }

    /// Where the backup of `path` is written.
    pub fn backup_path(&self, path: &Path) -> PathBuf {
        let mut backup = path.as_os_str().to_owned();
        backup.push(&self.options.backup_suffix);
        PathBuf::from(backup)
    }

    fn advance(&mut self, next: Stage) -> MendResult<()> {
        if !self.stage.can_advance_to(next) {
            return Err(InternalError::new(format!(
                "cannot move from stage {} to {next}",
                self.stage
            )));
        }
        debug!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
        Ok(())
    }

    fn read_manifest(&self, path: &Path) -> Result<(String, Manifest), ReconcileError> {
        let text = self.fs.read(path).map_err(ReconcileError::io(path))?;
        let manifest = parse(&text).map_err(|source| ReconcileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok((text, manifest))
    }

    /// Parses and indexes `path` and lists what is wrong with it.
    pub fn inspect(&self, path: &Path) -> Result<Inspection, ReconcileError> {
        let (text, manifest) = self.read_manifest(path)?;
        let index = IntegrityIndex::build(&manifest);
        let violations = index.violations(&manifest);
        debug!(
            path = %path.display(),
            file_references = manifest.file_references.len(),
            build_files = manifest.build_files.len(),
            compiled = manifest.phase_entries().count(),
            violations = violations.len(),
            "manifest inspected"
        );
        Ok(Inspection {
            path: path.to_path_buf(),
            text,
            manifest,
            index,
            violations,
        })
    }

    /// Reconciles `path` in place.
    ///
    /// On error the working file holds exactly what it held before the run
    /// and the driver is in the `Failed` stage.
    pub fn run(&mut self, path: &Path) -> Result<Summary, ReconcileError> {
        self.stage = Stage::Ready;
        info!(path = %path.display(), dry_run = self.options.dry_run, "reconciling manifest");
        match self.run_stages(path) {
            Ok(summary) => Ok(summary),
            Err(err) => {
                error!(
                    path = %path.display(),
                    stage = %self.stage,
                    %err,
                    "reconciliation failed, manifest unchanged"
                );
                if let Err(bug) = self.advance(Stage::Failed) {
                    warn!(%bug, "failure after a terminal stage");
                    self.stage = Stage::Failed;
                }
                Err(err)
            }
        }
    }

    fn run_stages(&mut self, path: &Path) -> Result<Summary, ReconcileError> {
        let (text, before) = self.read_manifest(path)?;
        let index = IntegrityIndex::build(&before);
        let mut plan = mend_plan::plan(&before, &index, &self.options.plan)?;
        if let Some(filter) = &self.plan_filter {
            filter(&mut plan);
        }

        let dry_run = self.options.dry_run;
        let mut summary = Summary {
            manifest: path.to_path_buf(),
            duplicate_groups: plan.duplicate_groups,
            entries_removed: plan.expected.build_files,
            phase_entries_removed: plan.expected.phase_items,
            other_records_removed: plan.expected.file_references + plan.expected.phases,
            entries_inserted: plan.insertions.len(),
            bytes_before: text.len(),
            bytes_after: text.len(),
            backup_path: None,
            committed: false,
            changed: false,
            dry_run,
        };

        if plan.is_empty() {
            info!(path = %path.display(), "manifest is consistent, nothing to write");
            self.advance(Stage::Validated)?;
            return Ok(summary);
        }

        if dry_run {
            debug!("dry run, backup skipped");
        } else {
            let backup = self.backup_path(path);
            self.write_backup(&backup, &text)?;
            summary.backup_path = Some(backup);
        }
        self.advance(Stage::BackedUp)?;

        let mutation = mend_mutate::apply(&before, &plan)?;
        debug!(
            deleted_spans = mutation.deleted.len(),
            insertion_points = mutation.insertion_points,
            "plan applied"
        );
        self.advance(Stage::Mutated)?;

        validate(&before, &plan, &mutation.text).map_err(|source| ReconcileError::Validation {
            path: path.to_path_buf(),
            source,
        })?;
        summary.bytes_after = mutation.text.len();
        summary.changed = !mutation.is_noop(&text);

        if summary.changed && !dry_run {
            self.fs
                .write_atomic(path, &mutation.text)
                .map_err(ReconcileError::io(path))?;
            summary.committed = true;
        }
        self.advance(Stage::Validated)?;
        info!(
            path = %path.display(),
            duplicate_groups = summary.duplicate_groups,
            removed = summary.entries_removed,
            inserted = summary.entries_inserted,
            bytes_before = summary.bytes_before,
            bytes_after = summary.bytes_after,
            committed = summary.committed,
            "manifest reconciled"
        );
        Ok(summary)
    }

    fn write_backup(&self, backup: &Path, text: &str) -> Result<(), ReconcileError> {
        self.fs
            .write_atomic(backup, text)
            .map_err(ReconcileError::io(backup))?;
        let copy = self.fs.read(backup).map_err(ReconcileError::io(backup))?;
        if ContentHash::from_bytes(copy.as_bytes()) != ContentHash::from_bytes(text.as_bytes()) {
            return Err(ReconcileError::BackupMismatch {
                path: backup.to_path_buf(),
            });
        }
        debug!(backup = %backup.display(), bytes = text.len(), "backup verified");
        Ok(())
    }
}

/// Reconciles the manifest at `path` on the real file system.
pub fn reconcile(path: &Path, options: &ReconcileOptions) -> Result<Summary, ReconcileError> {
    Driver::new(StdFs, options.clone()).run(path)
}

/// Reads and checks the manifest at `path` without writing anything.
pub fn inspect(path: &Path) -> Result<Inspection, ReconcileError> {
    Driver::new(StdFs, ReconcileOptions::default()).inspect(path)
}
