//! Duplicate resolution and registration policy.

use crate::error::{AmbiguousGroup, PlannerError};
use crate::ids::IdAllocator;
use crate::options::PlanOptions;
use crate::plan::{Collapse, EditPlan, NewEntry};
use mend_common::ObjectId;
use mend_index::{DanglingKind, IntegrityIndex};
use mend_manifest::model::compile_name;
use mend_manifest::{FileReference, Manifest, SectionKind, SourcesPhase};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

/// Computes the edit plan for `manifest`.
///
/// Resolution runs in a fixed order so the result is deterministic: reject
/// conflicting ids, collapse identical repeats, prune dangling references,
/// give every shared file reference one build file, give every compile name
/// one compile-list entry, then register requested files.
///
/// Within a duplicate group the canonical entry is the first, in document
/// order, whose file lies in an allowed subdirectory; if none does, the
/// first entry in document order.
pub fn plan(
    manifest: &Manifest,
    index: &IntegrityIndex,
    options: &PlanOptions,
) -> Result<EditPlan, PlannerError> {
    let mut planner = Planner::new(manifest, index, options);
    planner.reject_conflicts()?;
    planner.collapse_repeats();
    planner.prune_dangling()?;
    planner.resolve_shared_references();
    planner.resolve_repeated_names();
    planner.check_external_references()?;
    planner.register()?;

    let mut plan = planner.plan;
    plan.expected = plan.removal_counts(manifest);
    info!(
        duplicate_groups = plan.duplicate_groups,
        build_files_removed = plan.expected.build_files,
        phase_items_removed = plan.expected.phase_items,
        insertions = plan.insertions.len(),
        "planned edits"
    );
    Ok(plan)
}

struct Planner<'a> {
    manifest: &'a Manifest,
    index: &'a IntegrityIndex,
    options: &'a PlanOptions,
    /// Phase index of every flat compile-list position.
    phase_of: Vec<usize>,
    plan: EditPlan,
}

impl<'a> Planner<'a> {
    fn new(manifest: &'a Manifest, index: &'a IntegrityIndex, options: &'a PlanOptions) -> Self {
        let phase_of = manifest
            .phases
            .iter()
            .enumerate()
            .flat_map(|(i, p)| std::iter::repeat(i).take(p.files.len()))
            .collect();
        Self {
            manifest,
            index,
            options,
            phase_of,
            plan: EditPlan::default(),
        }
    }

    fn position_removed(&self, position: usize, build_file_id: &ObjectId) -> bool {
        let Some(&phase) = self.phase_of.get(position) else {
            return true;
        };
        self.plan.removes_phase(phase)
            || self.plan.removes_phase_item(phase, position, build_file_id)
    }

    fn remove_build_file(&mut self, id: &ObjectId) {
        self.plan.remove_build_file_ids.insert(id.clone());
        self.plan.remove_phase_ids.insert(id.clone());
    }

    fn reject_conflicts(&self) -> Result<(), PlannerError> {
        match self.index.conflicts.first() {
            Some(finding) => Err(PlannerError::Ambiguous {
                reason: "ambiguous group",
                group: AmbiguousGroup {
                    table: finding.table,
                    id: finding.id.clone(),
                    variants: finding.variants.clone(),
                    ranges: finding.ranges.clone(),
                },
            }),
            None => Ok(()),
        }
    }

    fn collapse_repeats(&mut self) {
        for finding in &self.index.repeats {
            for &index in finding.indices.iter().skip(1) {
                self.plan.collapse.insert(Collapse {
                    table: finding.table,
                    index,
                });
            }
            debug!(table = %finding.table, id = %finding.id, copies = finding.indices.len(), "collapsing repeated id");
            self.plan.duplicate_groups += 1;
        }
    }

    fn prune_dangling(&mut self) -> Result<(), PlannerError> {
        let index = self.index;
        let Some(first) = index.dangling.first() else {
            return Ok(());
        };
        if !self.options.prune_dangling {
            return Err(PlannerError::Unresolved {
                count: index.dangling.len(),
                invariant: first.kind.invariant(),
                ids: vec![first.owner.clone(), first.target.clone()],
                range: first.range,
            });
        }
        for dangling in &index.dangling {
            debug!(owner = %dangling.owner, target = %dangling.target, "pruning dangling reference");
            match dangling.kind {
                DanglingKind::MissingFileReference => self.remove_build_file(&dangling.owner),
                DanglingKind::MissingBuildFile => {
                    self.plan.remove_phase_ids.insert(dangling.target.clone());
                }
            }
        }
        Ok(())
    }

    /// The index of the canonical candidate.
    fn canonical(&self, candidates: &[&ObjectId]) -> usize {
        if self.options.allow.is_empty() {
            return 0;
        }
        candidates
            .iter()
            .position(|id| {
                self.path_of(id)
                    .is_some_and(|path| self.options.prefers(path))
            })
            .unwrap_or(0)
    }

    fn path_of(&self, build_file_id: &ObjectId) -> Option<&'a str> {
        let build = self.manifest.build_file(build_file_id.as_str())?;
        let reference = self
            .manifest
            .file_reference(build.file_ref.as_ref()?.as_str())?;
        Some(reference.path.as_str())
    }

    fn keep_one(&mut self, group: &str, candidates: Vec<&ObjectId>) {
        let keep = self.canonical(&candidates);
        debug!(group, keep = %candidates[keep], candidates = candidates.len(), "resolved duplicate group");
        for (i, id) in candidates.into_iter().enumerate() {
            if i != keep {
                self.remove_build_file(id);
            }
        }
        self.plan.duplicate_groups += 1;
    }

    fn resolve_shared_references(&mut self) {
        let index = self.index;
        for (reference, builds) in index.shared_references() {
            let survivors: Vec<&ObjectId> = builds
                .iter()
                .filter(|id| !self.plan.remove_build_file_ids.contains(*id))
                .collect();
            if survivors.len() > 1 {
                self.keep_one(reference.as_str(), survivors);
            }
        }
    }

    fn resolve_repeated_names(&mut self) {
        let index = self.index;
        for (name, placements) in index.repeated_names() {
            let mut survivors: Vec<&ObjectId> = Vec::new();
            for placement in placements {
                if !self.position_removed(placement.position, &placement.build_file_id)
                    && !survivors.contains(&&placement.build_file_id)
                {
                    survivors.push(&placement.build_file_id);
                }
            }
            if survivors.len() > 1 {
                self.keep_one(name, survivors);
            }
        }
    }

    /// Build files referenced from outside the tracked tables (another kind
    /// of build phase, for instance) cannot be deleted without leaving that
    /// reference dangling.
    fn check_external_references(&self) -> Result<(), PlannerError> {
        let text = &self.manifest.raw_text;
        for id in &self.plan.remove_build_file_ids {
            let tracked = self
                .manifest
                .build_files
                .iter()
                .filter(|b| &b.id == id)
                .count()
                + self
                    .manifest
                    .phase_entries()
                    .filter(|e| &e.build_file_id == id)
                    .count();
            let total = token_occurrences(text, id.as_str());
            if total > tracked {
                return Err(PlannerError::ExternallyReferenced {
                    id: id.clone(),
                    count: total - tracked,
                });
            }
        }
        Ok(())
    }

    fn target_phase(&self) -> Result<&'a SourcesPhase, PlannerError> {
        match &self.options.phase {
            Some(id) => self
                .manifest
                .phase(id.as_str())
                .ok_or_else(|| PlannerError::UnknownPhase { id: id.clone() }),
            None => self
                .manifest
                .phases
                .first()
                .ok_or(PlannerError::MissingSection {
                    isa: SectionKind::SourcesBuildPhase.isa(),
                }),
        }
    }

    fn require_section(&self, kind: SectionKind) -> Result<(), PlannerError> {
        match self.manifest.section(kind) {
            Some(_) => Ok(()),
            None => Err(PlannerError::MissingSection { isa: kind.isa() }),
        }
    }

    /// A file reference that names the same file as `path`.
    ///
    /// Paths are group-relative, so a bare file name and a path with
    /// directories may name the same file; two paths that both carry
    /// directories and differ do not.
    fn same_file_reference(&self, path: &str) -> Option<&'a FileReference> {
        let ids = self.index.refs_by_name.get(compile_name(path))?;
        let candidates: Vec<&'a FileReference> = ids
            .iter()
            .filter_map(|id| self.manifest.file_reference(id.as_str()))
            .collect();
        candidates
            .iter()
            .find(|r| r.path == path)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|r| !r.path.contains('/') || !path.contains('/'))
            })
            .copied()
    }

    /// Build files that stay in the compile list after removals.
    fn compiled_build_files(&self) -> HashSet<&'a ObjectId> {
        self.manifest
            .phase_entries()
            .enumerate()
            .filter(|(pos, e)| !self.position_removed(*pos, &e.build_file_id))
            .map(|(_, e)| &e.build_file_id)
            .collect()
    }

    /// Compile name to the file reference compiled under it after removals.
    fn compiled_names(&self) -> BTreeMap<String, (ObjectId, String)> {
        let compiled = self.compiled_build_files();
        let mut names = BTreeMap::new();
        for build in &self.manifest.build_files {
            if !compiled.contains(&build.id) || self.plan.remove_build_file_ids.contains(&build.id) {
                continue;
            }
            let Some(reference) = build
                .file_ref
                .as_ref()
                .and_then(|id| self.manifest.file_reference(id.as_str()))
            else {
                continue;
            };
            names
                .entry(reference.compile_name().to_string())
                .or_insert_with(|| (reference.id.clone(), reference.path.clone()));
        }
        names
    }

    fn register(&mut self) -> Result<(), PlannerError> {
        if self.options.register.is_empty() {
            return Ok(());
        }
        let phase = self.target_phase()?;
        let compiled_builds = self.compiled_build_files();
        let mut compiled = self.compiled_names();
        let mut allocator = IdAllocator::new(&self.manifest.raw_text);
        let mut seen: BTreeSet<String> = BTreeSet::new();

        let options = self.options;
        for registration in &options.register {
            let path = normalize(&registration.path)?;
            if !seen.insert(path.clone()) {
                continue;
            }
            let name = compile_name(&path).to_string();
            let display = registration
                .name
                .clone()
                .unwrap_or_else(|| name.clone());

            let entry = match self.same_file_reference(&path) {
                Some(reference) => {
                    if let Some((owner, existing)) = compiled.get(&name) {
                        if owner != &reference.id {
                            return Err(PlannerError::NameClash {
                                path,
                                existing: existing.clone(),
                            });
                        }
                    }
                    let build = self
                        .index
                        .by_file_ref
                        .get(&reference.id)
                        .and_then(|builds| {
                            builds
                                .iter()
                                .find(|id| !self.plan.remove_build_file_ids.contains(*id))
                        });
                    match build {
                        Some(build) if compiled_builds.contains(build) => {
                            debug!(path = %path, build_file = %build, "already compiled");
                            None
                        }
                        Some(build) => Some(NewEntry {
                            path: path.clone(),
                            name: reference.display_name.clone(),
                            file_ref_id: reference.id.clone(),
                            new_file_ref: false,
                            build_file_id: build.clone(),
                            new_build_file: false,
                            phase_id: phase.id.clone(),
                        }),
                        None => {
                            self.require_section(SectionKind::BuildFile)?;
                            Some(NewEntry {
                                path: path.clone(),
                                name: reference.display_name.clone(),
                                file_ref_id: reference.id.clone(),
                                new_file_ref: false,
                                build_file_id: allocator.allocate(&path, "buildFile")?,
                                new_build_file: true,
                                phase_id: phase.id.clone(),
                            })
                        }
                    }
                }
                None => {
                    if let Some((_, existing)) = compiled.get(&name) {
                        return Err(PlannerError::NameClash {
                            path,
                            existing: existing.clone(),
                        });
                    }
                    self.require_section(SectionKind::FileReference)?;
                    self.require_section(SectionKind::BuildFile)?;
                    Some(NewEntry {
                        path: path.clone(),
                        name: display,
                        file_ref_id: allocator.allocate(&path, "fileRef")?,
                        new_file_ref: true,
                        build_file_id: allocator.allocate(&path, "buildFile")?,
                        new_build_file: true,
                        phase_id: phase.id.clone(),
                    })
                }
            };

            if let Some(entry) = entry {
                info!(path = %entry.path, file_ref = %entry.file_ref_id, build_file = %entry.build_file_id, "registering file");
                compiled.insert(name, (entry.file_ref_id.clone(), entry.path.clone()));
                self.plan.insertions.push(entry);
            }
        }
        Ok(())
    }
}

fn normalize(path: &str) -> Result<String, PlannerError> {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let reason = if trimmed.is_empty() {
        Some("path is empty")
    } else if trimmed.ends_with('/') {
        Some("path names a directory")
    } else if trimmed.starts_with('/') {
        Some("path must be relative to its group")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(PlannerError::InvalidRegistration {
            path: path.to_string(),
            reason,
        }),
        None => Ok(trimmed.to_string()),
    }
}

/// Counts occurrences of `token` not embedded in a longer word.
fn token_occurrences(text: &str, token: &str) -> usize {
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let bytes = text.as_bytes();
    text.match_indices(token)
        .filter(|(start, _)| {
            let end = start + token.len();
            let before = *start == 0 || !is_word(bytes[start - 1]);
            let after = end >= bytes.len() || !is_word(bytes[end]);
            before && after
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Registration;
    use crate::plan::Removals;
    use mend_index::Table;
    use mend_manifest::parse;

    fn text(build: &str, refs: &str, phase: &str) -> String {
        format!(
            "{{\n/* Begin PBXBuildFile section */\n{build}/* End PBXBuildFile section */\n\
             /* Begin PBXFileReference section */\n{refs}/* End PBXFileReference section */\n\
             /* Begin PBXSourcesBuildPhase section */\n\t\tS1 /* Sources */ = {{isa = PBXSourcesBuildPhase; files = (\n{phase}\t\t\t); }};\n/* End PBXSourcesBuildPhase section */\n}}\n"
        )
    }

    fn bf(id: &str, file_ref: &str) -> String {
        format!("\t\t{id} = {{isa = PBXBuildFile; fileRef = {file_ref}; }};\n")
    }

    fn fr(id: &str, path: &str) -> String {
        format!("\t\t{id} = {{isa = PBXFileReference; path = {path}; sourceTree = \"<group>\"; }};\n")
    }

    fn item(id: &str) -> String {
        format!("\t\t\t\t{id} /* x in Sources */,\n")
    }

    fn run(text: &str, options: &PlanOptions) -> Result<EditPlan, PlannerError> {
        let manifest = parse(text).unwrap();
        let index = IntegrityIndex::build(&manifest);
        plan(&manifest, &index, options)
    }

    fn ids(set: &BTreeSet<ObjectId>) -> Vec<&str> {
        set.iter().map(ObjectId::as_str).collect()
    }

    #[test]
    fn consistent_manifest_plans_nothing() {
        let t = text(&bf("B1", "F1"), &fr("F1", "Main.swift"), &item("B1"));
        let plan = run(&t, &PlanOptions::default()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.expected, Removals::default());
    }

    #[test]
    fn shared_reference_keeps_first() {
        let t = text(
            &(bf("AAA1", "F1") + &bf("AAA2", "F1")),
            &fr("F1", "Time.swift"),
            &(item("AAA1") + &item("AAA2")),
        );
        let plan = run(&t, &PlanOptions::default()).unwrap();
        assert_eq!(ids(&plan.remove_build_file_ids), ["AAA2"]);
        assert_eq!(ids(&plan.remove_phase_ids), ["AAA2"]);
        assert_eq!(plan.duplicate_groups, 1);
        assert_eq!(plan.expected.build_files, 1);
        assert_eq!(plan.expected.phase_items, 1);
    }

    #[test]
    fn allow_list_beats_document_order() {
        let t = text(
            &(bf("B1", "F1") + &bf("B2", "F2")),
            &(fr("F1", "Time.swift") + &fr("F2", "Utils/Time.swift")),
            &(item("B1") + &item("B2")),
        );
        let first = run(&t, &PlanOptions::default()).unwrap();
        assert_eq!(ids(&first.remove_build_file_ids), ["B2"]);

        let options = PlanOptions {
            allow: vec!["Utils".into()],
            ..PlanOptions::default()
        };
        let allowed = run(&t, &options).unwrap();
        assert_eq!(ids(&allowed.remove_build_file_ids), ["B1"]);
    }

    #[test]
    fn allow_list_without_match_falls_back_to_first() {
        let t = text(
            &(bf("B1", "F1") + &bf("B2", "F2")),
            &(fr("F1", "A/Time.swift") + &fr("F2", "B/Time.swift")),
            &(item("B1") + &item("B2")),
        );
        let options = PlanOptions {
            allow: vec!["Models".into()],
            ..PlanOptions::default()
        };
        let plan = run(&t, &options).unwrap();
        assert_eq!(ids(&plan.remove_build_file_ids), ["B2"]);
    }

    #[test]
    fn conflicting_ids_are_ambiguous() {
        let t = text(
            &bf("B1", "F1"),
            &(fr("F1", "Time.swift") + &fr("F1", "Utils/Time.swift")),
            &item("B1"),
        );
        let err = run(&t, &PlanOptions::default()).unwrap_err();
        match err {
            PlannerError::Ambiguous { reason, group } => {
                assert_eq!(reason, "ambiguous group");
                assert_eq!(group.table, Table::FileReference);
                assert_eq!(group.id.as_str(), "F1");
                assert_eq!(group.ranges.len(), 2);
            }
            other => panic!("expected ambiguous group, got {other:?}"),
        }
    }

    #[test]
    fn identical_repeats_collapse() {
        let t = text(
            &(bf("B1", "F1") + &bf("B1", "F1")),
            &fr("F1", "Main.swift"),
            &(item("B1") + &item("B1")),
        );
        let plan = run(&t, &PlanOptions::default()).unwrap();
        assert!(plan.remove_build_file_ids.is_empty());
        assert!(plan.collapse.contains(&Collapse {
            table: Table::BuildFile,
            index: 1
        }));
        assert!(plan.collapse.contains(&Collapse {
            table: Table::PhaseItem,
            index: 1
        }));
        assert_eq!(plan.expected.build_files, 1);
        assert_eq!(plan.expected.phase_items, 1);
    }

    #[test]
    fn dangling_pruned_or_refused() {
        let t = text(
            &(bf("B1", "F1") + &bf("B2", "F9")),
            &fr("F1", "Main.swift"),
            &(item("B1") + &item("B2") + &item("B7")),
        );
        let plan = run(&t, &PlanOptions::default()).unwrap();
        assert_eq!(ids(&plan.remove_build_file_ids), ["B2"]);
        assert_eq!(ids(&plan.remove_phase_ids), ["B2", "B7"]);
        assert_eq!(plan.expected.phase_items, 2);

        let strict = PlanOptions {
            prune_dangling: false,
            ..PlanOptions::default()
        };
        let err = run(&t, &strict).unwrap_err();
        assert!(matches!(err, PlannerError::Unresolved { count: 2, .. }));
    }

    #[test]
    fn externally_referenced_build_file_is_not_removed() {
        let mut t = text(
            &(bf("B1", "F1") + &bf("B2", "F1")),
            &fr("F1", "Time.swift"),
            &(item("B1") + &item("B2")),
        );
        t = t.replace(
            "/* Begin PBXSourcesBuildPhase",
            "/* Begin PBXResourcesBuildPhase section */\n\t\tR1 = {isa = PBXResourcesBuildPhase; files = (B2, ); };\n/* End PBXResourcesBuildPhase section */\n/* Begin PBXSourcesBuildPhase",
        );
        let err = run(&t, &PlanOptions::default()).unwrap_err();
        assert_eq!(
            err,
            PlannerError::ExternallyReferenced {
                id: "B2".into(),
                count: 1
            }
        );
    }

    #[test]
    fn register_new_file() {
        let t = text(&bf("B1", "F1"), &fr("F1", "Main.swift"), &item("B1"));
        let options = PlanOptions {
            register: vec![Registration::new("Utils/Time.swift")],
            ..PlanOptions::default()
        };
        let plan = run(&t, &options).unwrap();
        assert_eq!(plan.insertions.len(), 1);
        let entry = &plan.insertions[0];
        assert_eq!(entry.name, "Time.swift");
        assert!(entry.new_file_ref && entry.new_build_file);
        assert!(entry.file_ref_id.is_canonical_hex());
        assert_ne!(entry.file_ref_id, entry.build_file_id);
        assert_eq!(entry.phase_id.as_str(), "S1");
        assert_eq!(plan.records_inserted(), (1, 1));
    }

    #[test]
    fn register_tracked_file_is_noop() {
        let t = text(&bf("B1", "F1"), &fr("F1", "Utils/Time.swift"), &item("B1"));
        for path in ["Utils/Time.swift", "./Utils/Time.swift", "Time.swift"] {
            let options = PlanOptions {
                register: vec![Registration::new(path)],
                ..PlanOptions::default()
            };
            let plan = run(&t, &options).unwrap();
            assert!(plan.is_empty(), "{path} should already be tracked");
        }
    }

    #[test]
    fn register_uncompiled_reference_reuses_it() {
        let t = text("", &fr("F1", "Time.swift"), "");
        let options = PlanOptions {
            register: vec![Registration::new("Time.swift")],
            ..PlanOptions::default()
        };
        let plan = run(&t, &options).unwrap();
        let entry = &plan.insertions[0];
        assert_eq!(entry.file_ref_id.as_str(), "F1");
        assert!(!entry.new_file_ref);
        assert!(entry.new_build_file);
    }

    #[test]
    fn register_existing_build_file_outside_phase() {
        let t = text(&bf("B1", "F1"), &fr("F1", "Time.swift"), "");
        let options = PlanOptions {
            register: vec![Registration::new("Time.swift")],
            ..PlanOptions::default()
        };
        let plan = run(&t, &options).unwrap();
        let entry = &plan.insertions[0];
        assert_eq!(entry.build_file_id.as_str(), "B1");
        assert!(!entry.new_build_file);
    }

    #[test]
    fn register_name_clash() {
        let t = text(&bf("B1", "F1"), &fr("F1", "Models/Time.swift"), &item("B1"));
        let options = PlanOptions {
            register: vec![Registration::new("Utils/Time.swift")],
            ..PlanOptions::default()
        };
        let err = run(&t, &options).unwrap_err();
        assert_eq!(
            err,
            PlannerError::NameClash {
                path: "Utils/Time.swift".into(),
                existing: "Models/Time.swift".into()
            }
        );
    }

    #[test]
    fn register_same_path_twice_once() {
        let t = text(&bf("B1", "F1"), &fr("F1", "Main.swift"), &item("B1"));
        let options = PlanOptions {
            register: vec![Registration::new("A.swift"), Registration::new("./A.swift")],
            ..PlanOptions::default()
        };
        let plan = run(&t, &options).unwrap();
        assert_eq!(plan.insertions.len(), 1);
    }

    #[test]
    fn register_requires_phase() {
        let t = "{\n/* Begin PBXBuildFile section */\n/* End PBXBuildFile section */\n}\n";
        let options = PlanOptions {
            register: vec![Registration::new("A.swift")],
            ..PlanOptions::default()
        };
        let err = run(t, &options).unwrap_err();
        assert_eq!(
            err,
            PlannerError::MissingSection {
                isa: "PBXSourcesBuildPhase"
            }
        );

        let t = text("", "", "");
        let options = PlanOptions {
            phase: Some("NOPE".into()),
            ..options
        };
        assert!(matches!(
            run(&t, &options).unwrap_err(),
            PlannerError::UnknownPhase { .. }
        ));
    }

    #[test]
    fn invalid_registration_paths() {
        assert!(normalize("").is_err());
        assert!(normalize("Utils/").is_err());
        assert!(normalize("/abs/a.swift").is_err());
        assert_eq!(normalize(" ./a.swift ").unwrap(), "a.swift");
    }

    #[test]
    fn token_occurrences_respects_word_boundaries() {
        assert_eq!(token_occurrences("B1 B10 xB1 B1;", "B1"), 2);
    }
}
