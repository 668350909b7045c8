//! The integrity index.

use crate::invariant::Invariant;
use crate::violation::Violation;
use mend_common::ObjectId;
use mend_manifest::{BuildFileEntry, FileReference, Manifest};
use mend_source::TextRange;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Which table an id finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Table {
    /// File-reference-like records.
    FileReference,
    /// `PBXBuildFile` records.
    BuildFile,
    /// `PBXSourcesBuildPhase` records.
    Phase,
    /// Items of the concatenated compile list. Indices are flat positions.
    PhaseItem,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Table::FileReference => "file reference",
            Table::BuildFile => "build file",
            Table::Phase => "sources phase",
            Table::PhaseItem => "phase item",
        })
    }
}

/// One occurrence of a build file in the compile list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// The build file compiled at this position.
    pub build_file_id: ObjectId,
    /// Position in the concatenated compile list.
    pub position: usize,
}

/// Which reference failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DanglingKind {
    /// A build file's `fileRef` names no file reference.
    MissingFileReference,
    /// A phase item names no build file.
    MissingBuildFile,
}

impl DanglingKind {
    /// The invariant the reference breaks.
    pub fn invariant(self) -> Invariant {
        match self {
            DanglingKind::MissingFileReference => Invariant::BuildFileResolves,
            DanglingKind::MissingBuildFile => Invariant::PhaseEntryResolves,
        }
    }
}

/// A reference to an id no record defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dangling {
    /// What kind of reference it is.
    pub kind: DanglingKind,
    /// The record holding the reference: a build file or a phase.
    pub owner: ObjectId,
    /// The missing id.
    pub target: ObjectId,
    /// Compile-list position for phase items.
    pub position: Option<usize>,
    /// The referencing record or phase item.
    pub range: TextRange,
}

/// An id defined more than once within one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdFinding {
    /// The table.
    pub table: Table,
    /// The repeated id.
    pub id: ObjectId,
    /// Indices of every occurrence, in document order.
    pub indices: Vec<usize>,
    /// Ranges of every occurrence.
    pub ranges: Vec<TextRange>,
    /// Distinct contents, in first-seen order. One entry for identical
    /// repeats.
    pub variants: Vec<String>,
}

/// Lookup structures and findings for one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityIndex {
    /// File reference id to the distinct build files referencing it, in
    /// document order. Only resolving references are indexed.
    pub by_file_ref: BTreeMap<ObjectId, Vec<ObjectId>>,
    /// Compile name to every compile-list placement of a build file whose
    /// reference carries that name.
    pub by_path: BTreeMap<String, Vec<Placement>>,
    /// Compile name to the file references carrying it, in document order.
    pub refs_by_name: BTreeMap<String, Vec<ObjectId>>,
    /// Unresolved references, build files first.
    pub dangling: Vec<Dangling>,
    /// Ids repeated with identical content.
    pub repeats: Vec<IdFinding>,
    /// Ids repeated with differing content.
    pub conflicts: Vec<IdFinding>,
}

impl IntegrityIndex {
    /// Indexes a manifest.
    pub fn build(manifest: &Manifest) -> Self {
        let mut index = IntegrityIndex::default();

        index.scan_ids(
            Table::FileReference,
            manifest
                .file_references
                .iter()
                .map(|r| (&r.id, reference_content(r), r.range)),
        );
        index.scan_ids(
            Table::BuildFile,
            manifest
                .build_files
                .iter()
                .map(|b| (&b.id, build_file_content(b), b.range)),
        );
        index.scan_ids(
            Table::Phase,
            manifest.phases.iter().map(|p| {
                let ids: Vec<&str> = p.files.iter().map(|e| e.build_file_id.as_str()).collect();
                (&p.id, format!("files ({})", ids.join(", ")), p.range)
            }),
        );
        index.scan_ids(
            Table::PhaseItem,
            manifest
                .phase_entries()
                .map(|e| (&e.build_file_id, String::new(), e.range)),
        );

        let refs = first_by_id(manifest.file_references.iter().map(|r| (&r.id, r)));
        let builds = first_by_id(manifest.build_files.iter().map(|b| (&b.id, b)));

        for reference in unique(manifest.file_references.iter().map(|r| (&r.id, r))) {
            index
                .refs_by_name
                .entry(reference.compile_name().to_string())
                .or_default()
                .push(reference.id.clone());
        }

        for build in unique(manifest.build_files.iter().map(|b| (&b.id, b))) {
            let Some(target) = &build.file_ref else {
                continue;
            };
            if refs.contains_key(target.as_str()) {
                index
                    .by_file_ref
                    .entry(target.clone())
                    .or_default()
                    .push(build.id.clone());
            } else {
                index.dangling.push(Dangling {
                    kind: DanglingKind::MissingFileReference,
                    owner: build.id.clone(),
                    target: target.clone(),
                    position: None,
                    range: build.range,
                });
            }
        }

        let mut position = 0;
        for phase in &manifest.phases {
            for entry in &phase.files {
                match builds.get(entry.build_file_id.as_str()) {
                    None => index.dangling.push(Dangling {
                        kind: DanglingKind::MissingBuildFile,
                        owner: phase.id.clone(),
                        target: entry.build_file_id.clone(),
                        position: Some(position),
                        range: entry.range,
                    }),
                    Some(build) => {
                        let reference = build
                            .file_ref
                            .as_ref()
                            .and_then(|id| refs.get(id.as_str()));
                        if let Some(reference) = reference {
                            index
                                .by_path
                                .entry(reference.compile_name().to_string())
                                .or_default()
                                .push(Placement {
                                    build_file_id: entry.build_file_id.clone(),
                                    position,
                                });
                        }
                    }
                }
                position += 1;
            }
        }

        index
    }

    fn scan_ids<'a>(
        &mut self,
        table: Table,
        records: impl Iterator<Item = (&'a ObjectId, String, TextRange)>,
    ) {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<IdFinding> = Vec::new();
        for (i, (id, content, range)) in records.enumerate() {
            let slot = *slots.entry(id.as_str()).or_insert_with(|| {
                groups.push(IdFinding {
                    table,
                    id: id.clone(),
                    indices: Vec::new(),
                    ranges: Vec::new(),
                    variants: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            group.indices.push(i);
            group.ranges.push(range);
            if !group.variants.contains(&content) {
                group.variants.push(content);
            }
        }
        for group in groups.into_iter().filter(|g| g.indices.len() > 1) {
            if group.variants.len() > 1 {
                self.conflicts.push(group);
            } else {
                self.repeats.push(group);
            }
        }
    }

    /// File references compiled by more than one build file.
    pub fn shared_references(&self) -> impl Iterator<Item = (&ObjectId, &[ObjectId])> {
        self.by_file_ref
            .iter()
            .filter(|(_, builds)| builds.len() > 1)
            .map(|(id, builds)| (id, builds.as_slice()))
    }

    /// Compile names placed in the compile list more than once.
    pub fn repeated_names(&self) -> impl Iterator<Item = (&str, &[Placement])> {
        self.by_path
            .iter()
            .filter(|(_, placements)| placements.len() > 1)
            .map(|(name, placements)| (name.as_str(), placements.as_slice()))
    }

    /// Returns `true` if nothing in the manifest breaks a tracked invariant.
    pub fn is_consistent(&self) -> bool {
        self.dangling.is_empty()
            && self.repeats.is_empty()
            && self.conflicts.is_empty()
            && self.shared_references().next().is_none()
            && self.repeated_names().next().is_none()
    }

    /// Every finding as a [`Violation`], in a stable order: conflicting ids,
    /// repeated ids, dangling references, shared references, repeated names.
    pub fn violations(&self, manifest: &Manifest) -> Vec<Violation> {
        let mut out = Vec::new();

        for finding in &self.conflicts {
            out.push(
                Violation::new(
                    Invariant::ConsistentIds,
                    format!(
                        "{} id {} has {} conflicting definitions: {}",
                        finding.table,
                        finding.id,
                        finding.variants.len(),
                        finding.variants.join(" vs "),
                    ),
                )
                .with_ids([finding.id.clone()])
                .with_ranges(finding.ranges.iter().copied()),
            );
        }

        for finding in &self.repeats {
            out.push(
                Violation::new(
                    Invariant::UniqueIds,
                    format!(
                        "{} id {} occurs {} times",
                        finding.table,
                        finding.id,
                        finding.indices.len()
                    ),
                )
                .with_ids([finding.id.clone()])
                .with_ranges(finding.ranges.iter().skip(1).copied()),
            );
        }

        for dangling in &self.dangling {
            let message = match dangling.kind {
                DanglingKind::MissingFileReference => format!(
                    "build file {} references missing file reference {}",
                    dangling.owner, dangling.target
                ),
                DanglingKind::MissingBuildFile => format!(
                    "phase {} lists missing build file {} at position {}",
                    dangling.owner,
                    dangling.target,
                    dangling.position.unwrap_or_default()
                ),
            };
            out.push(
                Violation::new(dangling.kind.invariant(), message)
                    .with_ids([dangling.owner.clone(), dangling.target.clone()])
                    .with_ranges([dangling.range]),
            );
        }

        for (reference, builds) in self.shared_references() {
            let path = manifest
                .file_reference(reference.as_str())
                .map_or("", |r| r.path.as_str());
            let ranges = builds
                .iter()
                .skip(1)
                .filter_map(|id| manifest.build_file(id.as_str()))
                .map(|b| b.range);
            out.push(
                Violation::new(
                    Invariant::OneBuildFilePerReference,
                    format!(
                        "file reference {reference} (`{path}`) is compiled by {} build files",
                        builds.len()
                    ),
                )
                .with_ids(builds.iter().cloned())
                .with_ranges(ranges),
            );
        }

        let entries: Vec<_> = manifest.phase_entries().collect();
        for (name, placements) in self.repeated_names() {
            let ranges = placements
                .iter()
                .skip(1)
                .filter_map(|p| entries.get(p.position))
                .map(|e| e.range);
            let mut ids: Vec<ObjectId> = Vec::new();
            for placement in placements {
                if !ids.contains(&placement.build_file_id) {
                    ids.push(placement.build_file_id.clone());
                }
            }
            out.push(
                Violation::new(
                    Invariant::CompiledOnce,
                    format!(
                        "`{name}` appears {} times in the compile list",
                        placements.len()
                    ),
                )
                .with_ids(ids)
                .with_ranges(ranges),
            );
        }

        out
    }
}

fn reference_content(reference: &FileReference) -> String {
    format!("path {}", reference.path)
}

fn build_file_content(build: &BuildFileEntry) -> String {
    match &build.file_ref {
        Some(id) => format!("fileRef {id}"),
        None => "no fileRef".to_string(),
    }
}

fn first_by_id<'a, T>(
    records: impl Iterator<Item = (&'a ObjectId, &'a T)>,
) -> HashMap<&'a str, &'a T> {
    let mut map = HashMap::new();
    for (id, record) in records {
        map.entry(id.as_str()).or_insert(record);
    }
    map
}

fn unique<'a, T>(records: impl Iterator<Item = (&'a ObjectId, &'a T)>) -> Vec<&'a T> {
    let mut seen = std::collections::HashSet::new();
    records
        .filter(|(id, _)| seen.insert(id.as_str()))
        .map(|(_, record)| record)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mend_manifest::parse;

    fn manifest(build: &str, refs: &str, phase: &str) -> Manifest {
        let text = format!(
            "{{\n/* Begin PBXBuildFile section */\n{build}/* End PBXBuildFile section */\n\
             /* Begin PBXFileReference section */\n{refs}/* End PBXFileReference section */\n\
             /* Begin PBXSourcesBuildPhase section */\n\t\tS1 /* Sources */ = {{isa = PBXSourcesBuildPhase; files = (\n{phase}\t\t\t); }};\n/* End PBXSourcesBuildPhase section */\n}}\n"
        );
        parse(&text).unwrap()
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

    #[test]
    fn consistent_manifest_has_no_findings() {
        let m = manifest(
            &(bf("B1", "F1") + &bf("B2", "F2")),
            &(fr("F1", "Main.swift") + &fr("F2", "Utils/Time.swift")),
            &(item("B1") + &item("B2")),
        );
        let index = IntegrityIndex::build(&m);
        assert!(index.is_consistent());
        assert!(index.violations(&m).is_empty());
        assert_eq!(index.by_path["Time.swift"].len(), 1);
        assert_eq!(index.refs_by_name["Main.swift"], vec![ObjectId::from("F1")]);
    }

    #[test]
    fn shared_reference_detected() {
        let m = manifest(
            &(bf("AAA1", "F1") + &bf("AAA2", "F1")),
            &fr("F1", "Time.swift"),
            &(item("AAA1") + &item("AAA2")),
        );
        let index = IntegrityIndex::build(&m);
        let shared: Vec<_> = index.shared_references().collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].1, [ObjectId::from("AAA1"), ObjectId::from("AAA2")]);

        let placements = &index.by_path["Time.swift"];
        assert_eq!(placements[1].position, 1);

        let invariants: Vec<Invariant> = index.violations(&m).iter().map(|v| v.invariant).collect();
        assert_eq!(
            invariants,
            [Invariant::OneBuildFilePerReference, Invariant::CompiledOnce]
        );
    }

    #[test]
    fn same_name_different_directories() {
        let m = manifest(
            &(bf("B1", "F1") + &bf("B2", "F2")),
            &(fr("F1", "Time.swift") + &fr("F2", "Utils/Time.swift")),
            &(item("B1") + &item("B2")),
        );
        let index = IntegrityIndex::build(&m);
        assert_eq!(index.shared_references().count(), 0);
        let names: Vec<_> = index.repeated_names().map(|(n, _)| n).collect();
        assert_eq!(names, ["Time.swift"]);
    }

    #[test]
    fn dangling_references() {
        let m = manifest(&bf("B1", "F9"), &fr("F1", "Main.swift"), &(item("B1") + &item("B7")));
        let index = IntegrityIndex::build(&m);
        assert_eq!(index.dangling.len(), 2);
        assert_eq!(index.dangling[0].kind, DanglingKind::MissingFileReference);
        assert_eq!(index.dangling[0].target.as_str(), "F9");
        assert_eq!(index.dangling[1].kind, DanglingKind::MissingBuildFile);
        assert_eq!(index.dangling[1].position, Some(1));
        assert!(!index.is_consistent());
    }

    #[test]
    fn product_build_files_are_exempt() {
        let build = "\t\tB1 = {isa = PBXBuildFile; productRef = P1; };\n";
        let m = manifest(build, &fr("F1", "Main.swift"), &item("B1"));
        let index = IntegrityIndex::build(&m);
        assert!(index.is_consistent());
        assert!(index.by_path.is_empty());
    }

    #[test]
    fn repeats_and_conflicts_are_split() {
        let m = manifest(
            &(bf("B1", "F1") + &bf("B1", "F1") + &bf("B2", "F1") + &bf("B2", "F2")),
            &(fr("F1", "A.swift") + &fr("F2", "B.swift")),
            "",
        );
        let index = IntegrityIndex::build(&m);
        assert_eq!(index.repeats.len(), 1);
        assert_eq!(index.repeats[0].id.as_str(), "B1");
        assert_eq!(index.repeats[0].indices, [0, 1]);
        assert_eq!(index.conflicts.len(), 1);
        assert_eq!(index.conflicts[0].id.as_str(), "B2");
        assert_eq!(index.conflicts[0].variants, ["fileRef F1", "fileRef F2"]);
    }

    #[test]
    fn conflicting_reference_paths() {
        let m = manifest(
            &bf("B1", "F1"),
            &(fr("F1", "Time.swift") + &fr("F1", "Utils/Time.swift")),
            &item("B1"),
        );
        let index = IntegrityIndex::build(&m);
        assert_eq!(index.conflicts.len(), 1);
        assert_eq!(index.conflicts[0].table, Table::FileReference);
        let v = &index.violations(&m)[0];
        assert_eq!(v.invariant, Invariant::ConsistentIds);
        assert!(v.message.contains("path Time.swift vs path Utils/Time.swift"));
    }

    #[test]
    fn repeated_phase_item() {
        let m = manifest(&bf("B1", "F1"), &fr("F1", "A.swift"), &(item("B1") + &item("B1")));
        let index = IntegrityIndex::build(&m);
        assert_eq!(index.repeats.len(), 1);
        assert_eq!(index.repeats[0].table, Table::PhaseItem);
        assert_eq!(index.repeats[0].indices, [0, 1]);
        assert_eq!(index.by_path["A.swift"].len(), 2);
    }

    #[test]
    fn build_is_deterministic() {
        let m = manifest(
            &(bf("B2", "F1") + &bf("B1", "F1")),
            &fr("F1", "A.swift"),
            &(item("B2") + &item("B1")),
        );
        assert_eq!(IntegrityIndex::build(&m), IntegrityIndex::build(&m));
    }
}
