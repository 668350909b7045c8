//! The typed view of a parsed manifest.
//!
//! Tables are kept as vectors in document order rather than maps: a corrupted
//! manifest may define the same id more than once, and the integrity index
//! needs to see every occurrence. Lookup helpers return the first one.

use mend_common::ObjectId;
use mend_source::TextRange;
use serde::Serialize;
use std::collections::BTreeSet;

/// The sections the engine models. All other sections are opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SectionKind {
    /// `PBXBuildFile`: links a file reference to the phases that compile it.
    BuildFile,
    /// `PBXFileReference`: a file on disk.
    FileReference,
    /// `PBXVariantGroup`: a localized file, referenced like a file.
    VariantGroup,
    /// `XCVersionGroup`: a versioned bundle, referenced like a file.
    VersionGroup,
    /// `PBXSourcesBuildPhase`: the ordered compile list.
    SourcesBuildPhase,
}

impl SectionKind {
    /// All modeled kinds.
    pub const ALL: [SectionKind; 5] = [
        SectionKind::BuildFile,
        SectionKind::FileReference,
        SectionKind::VariantGroup,
        SectionKind::VersionGroup,
        SectionKind::SourcesBuildPhase,
    ];

    /// The `isa` value of records in this section.
    pub fn isa(self) -> &'static str {
        match self {
            SectionKind::BuildFile => "PBXBuildFile",
            SectionKind::FileReference => "PBXFileReference",
            SectionKind::VariantGroup => "PBXVariantGroup",
            SectionKind::VersionGroup => "XCVersionGroup",
            SectionKind::SourcesBuildPhase => "PBXSourcesBuildPhase",
        }
    }

    /// Maps an `isa` name to a modeled kind.
    pub fn from_isa(isa: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.isa() == isa)
    }
}

/// One `/* Begin X section */ ... /* End X section */` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// The modeled kind.
    pub kind: SectionKind,
    /// From the start of the begin marker to the end of the end marker.
    pub range: TextRange,
    /// Between the two markers.
    pub body: TextRange,
    /// Where a new record line goes: the start of the line after the begin
    /// marker.
    pub insert_at: usize,
}

/// What kind of record a [`FileReference`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefKind {
    /// A plain file reference.
    File,
    /// A variant (localization) group.
    VariantGroup,
    /// A version group.
    VersionGroup,
}

/// A record that build files may point at with `fileRef`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    /// The record id.
    pub id: ObjectId,
    /// The `path` field, or `name` when the record has no path.
    pub path: String,
    /// The annotation after the id, else the `name` field, else the path's
    /// last component.
    pub display_name: String,
    /// The record kind.
    pub kind: RefKind,
    /// The whole record, id through closing `;`.
    pub range: TextRange,
}

impl FileReference {
    /// The name the compiler sees: the last path component.
    pub fn compile_name(&self) -> &str {
        compile_name(&self.path)
    }
}

/// A `PBXBuildFile` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildFileEntry {
    /// The record id.
    pub id: ObjectId,
    /// The referenced file. `None` for package-product build files, which
    /// reference a product instead.
    pub file_ref: Option<ObjectId>,
    /// The annotation after the id, without its ` in Phase` suffix.
    pub display_name: String,
    /// The whole record.
    pub range: TextRange,
}

/// One item of a sources phase's `files` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseEntry {
    /// The build file this item compiles.
    pub build_file_id: ObjectId,
    /// The item's annotation, without its ` in Phase` suffix.
    pub display_name: String,
    /// The item and its trailing comma.
    pub range: TextRange,
}

/// A `PBXSourcesBuildPhase` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcesPhase {
    /// The record id.
    pub id: ObjectId,
    /// The phase annotation, conventionally `Sources`.
    pub name: String,
    /// The items of the `files` list in order.
    pub files: Vec<PhaseEntry>,
    /// Offset of the `)` closing the `files` list.
    pub files_close: usize,
    /// The whole record.
    pub range: TextRange,
}

/// A parsed manifest: the three tracked tables plus the raw text they index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// File-reference-like records in document order.
    pub file_references: Vec<FileReference>,
    /// Build-file records in document order.
    pub build_files: Vec<BuildFileEntry>,
    /// Sources phases in document order.
    pub phases: Vec<SourcesPhase>,
    /// Modeled sections in document order.
    pub sections: Vec<Section>,
    /// The text everything above was parsed from.
    #[serde(skip)]
    pub raw_text: String,
}

impl Manifest {
    /// An empty manifest over `raw_text`.
    pub fn empty(raw_text: impl Into<String>) -> Self {
        Self {
            file_references: Vec::new(),
            build_files: Vec::new(),
            phases: Vec::new(),
            sections: Vec::new(),
            raw_text: raw_text.into(),
        }
    }

    /// The first file reference with this id.
    pub fn file_reference(&self, id: &str) -> Option<&FileReference> {
        self.file_references.iter().find(|r| r.id.as_str() == id)
    }

    /// The first build file with this id.
    pub fn build_file(&self, id: &str) -> Option<&BuildFileEntry> {
        self.build_files.iter().find(|b| b.id.as_str() == id)
    }

    /// The phase with this id.
    pub fn phase(&self, id: &str) -> Option<&SourcesPhase> {
        self.phases.iter().find(|p| p.id.as_str() == id)
    }

    /// The first section of this kind.
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// All phase entries across every sources phase, in document order.
    ///
    /// Targets with several sources phases compile the concatenation, so
    /// this is the sequence the ordering and uniqueness rules apply to.
    pub fn phase_entries(&self) -> impl Iterator<Item = &PhaseEntry> {
        self.phases.iter().flat_map(|p| p.files.iter())
    }

    /// The build-file ids of [`phase_entries`](Self::phase_entries).
    pub fn phase_sequence(&self) -> Vec<ObjectId> {
        self.phase_entries()
            .map(|e| e.build_file_id.clone())
            .collect()
    }

    /// Every id defined in the tracked tables.
    pub fn defined_ids(&self) -> BTreeSet<&str> {
        self.file_references
            .iter()
            .map(|r| r.id.as_str())
            .chain(self.build_files.iter().map(|b| b.id.as_str()))
            .chain(self.phases.iter().map(|p| p.id.as_str()))
            .collect()
    }

    /// Size of the raw text in bytes.
    pub fn len(&self) -> usize {
        self.raw_text.len()
    }

    /// Returns `true` if the raw text is empty.
    pub fn is_empty(&self) -> bool {
        self.raw_text.is_empty()
    }
}

/// The last `/`-separated component of a path.
pub fn compile_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Strips the ` in Phase` suffix Xcode appends to build-file annotations.
pub(crate) fn strip_phase_suffix(annotation: &str) -> &str {
    match annotation.rsplit_once(" in ") {
        Some((name, _)) => name,
        None => annotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_kind_round_trips_isa() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_isa(kind.isa()), Some(kind));
        }
        assert_eq!(SectionKind::from_isa("PBXGroup"), None);
    }

    #[test]
    fn compile_name_is_basename() {
        assert_eq!(compile_name("Utils/Time.swift"), "Time.swift");
        assert_eq!(compile_name("Time.swift"), "Time.swift");
        assert_eq!(compile_name("a/b/c.m"), "c.m");
    }

    #[test]
    fn phase_suffix_stripped() {
        assert_eq!(strip_phase_suffix("Time.swift in Sources"), "Time.swift");
        assert_eq!(strip_phase_suffix("Time.swift"), "Time.swift");
        assert_eq!(strip_phase_suffix("Log in Out.swift in Sources"), "Log in Out.swift");
    }

    #[test]
    fn empty_manifest_lookups() {
        let m = Manifest::empty("{}");
        assert!(m.file_reference("X").is_none());
        assert!(m.section(SectionKind::BuildFile).is_none());
        assert_eq!(m.phase_sequence(), Vec::<ObjectId>::new());
        assert_eq!(m.len(), 2);
    }
}
