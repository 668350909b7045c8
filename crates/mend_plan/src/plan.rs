//! The edit plan value consumed by the mutator.

use mend_common::ObjectId;
use mend_index::Table;
use mend_manifest::Manifest;
use serde::Serialize;
use std::collections::BTreeSet;

/// Removal of one specific occurrence of a repeated record or phase item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Collapse {
    /// The table.
    pub table: Table,
    /// Index into that table, or the flat compile-list position for
    /// [`Table::PhaseItem`].
    pub index: usize,
}

/// One file to start compiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEntry {
    /// The registered path.
    pub path: String,
    /// Display name used in annotations.
    pub name: String,
    /// The file reference to compile.
    pub file_ref_id: ObjectId,
    /// `true` if the file reference record must be created.
    pub new_file_ref: bool,
    /// The build file to append to the compile list.
    pub build_file_id: ObjectId,
    /// `true` if the build file record must be created.
    pub new_build_file: bool,
    /// The sources phase to append to.
    pub phase_id: ObjectId,
}

/// How many existing records and items a plan deletes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Removals {
    /// File reference records.
    pub file_references: usize,
    /// Build file records.
    pub build_files: usize,
    /// Sources phase records.
    pub phases: usize,
    /// Compile-list items, including those inside removed phases.
    pub phase_items: usize,
}

impl Removals {
    /// Returns `true` if nothing is removed.
    pub fn is_empty(&self) -> bool {
        *self == Removals::default()
    }
}

/// Everything one run changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditPlan {
    /// Build files to delete, every occurrence.
    pub remove_build_file_ids: BTreeSet<ObjectId>,
    /// Build files whose compile-list items are deleted, every occurrence.
    pub remove_phase_ids: BTreeSet<ObjectId>,
    /// Individual repeated occurrences to delete.
    pub collapse: BTreeSet<Collapse>,
    /// Files to start compiling, in registration order.
    pub insertions: Vec<NewEntry>,
    /// Number of duplicate groups resolved.
    pub duplicate_groups: usize,
    /// What applying the plan to the planned manifest deletes.
    pub expected: Removals,
}

impl EditPlan {
    /// Returns `true` if the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.remove_build_file_ids.is_empty()
            && self.remove_phase_ids.is_empty()
            && self.collapse.is_empty()
            && self.insertions.is_empty()
    }

    fn collapses(&self, table: Table, index: usize) -> bool {
        self.collapse.contains(&Collapse { table, index })
    }

    /// Returns `true` if the record at `index` of the build-file table is
    /// deleted.
    pub fn removes_build_file(&self, manifest: &Manifest, index: usize) -> bool {
        manifest.build_files.get(index).is_some_and(|b| {
            self.remove_build_file_ids.contains(&b.id) || self.collapses(Table::BuildFile, index)
        })
    }

    /// Returns `true` if the record at `index` of the file-reference table is
    /// deleted.
    pub fn removes_file_reference(&self, index: usize) -> bool {
        self.collapses(Table::FileReference, index)
    }

    /// Returns `true` if the phase record at `index` is deleted.
    pub fn removes_phase(&self, index: usize) -> bool {
        self.collapses(Table::Phase, index)
    }

    /// Returns `true` if the compile-list item at flat `position`, inside
    /// phase `phase_index`, is deleted on its own. Items of a deleted phase
    /// are not reported here.
    pub fn removes_phase_item(
        &self,
        phase_index: usize,
        position: usize,
        build_file_id: &ObjectId,
    ) -> bool {
        !self.removes_phase(phase_index)
            && (self.remove_phase_ids.contains(build_file_id)
                || self.collapses(Table::PhaseItem, position))
    }

    /// Counts what this plan deletes from `manifest`.
    pub fn removal_counts(&self, manifest: &Manifest) -> Removals {
        let mut counts = Removals {
            file_references: (0..manifest.file_references.len())
                .filter(|&i| self.removes_file_reference(i))
                .count(),
            build_files: (0..manifest.build_files.len())
                .filter(|&i| self.removes_build_file(manifest, i))
                .count(),
            ..Removals::default()
        };
        let mut position = 0;
        for (phase_index, phase) in manifest.phases.iter().enumerate() {
            if self.removes_phase(phase_index) {
                counts.phases += 1;
                counts.phase_items += phase.files.len();
                position += phase.files.len();
                continue;
            }
            for entry in &phase.files {
                if self.removes_phase_item(phase_index, position, &entry.build_file_id) {
                    counts.phase_items += 1;
                }
                position += 1;
            }
        }
        counts
    }

    /// Number of records the plan creates: file references plus build files.
    pub fn records_inserted(&self) -> (usize, usize) {
        let refs = self.insertions.iter().filter(|e| e.new_file_ref).count();
        let builds = self.insertions.iter().filter(|e| e.new_build_file).count();
        (refs, builds)
    }
}
