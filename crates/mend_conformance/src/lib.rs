//! Conformance test helpers for the mend pipeline.
//!
//! Provides a builder for realistic project manifests (tracked tables plus
//! the untracked sections a real project carries), helpers to place them on
//! disk, a fault-injecting [`FileSystem`], and text comparisons used to
//! assert minimal diffs.

#![warn(missing_docs)]

use mend_common::ObjectId;
use mend_engine::{FileSystem, StdFs};
use mend_manifest::model::compile_name;
use mend_manifest::render;
use std::cell::Cell;
use std::io;
use std::path::{Path, PathBuf};

/// Id of the sources phase created when items are added before any phase.
pub const DEFAULT_PHASE: &str = "SRC000000000000000000001";

struct PhaseSpec {
    id: String,
    items: Vec<String>,
}

/// Builds project manifest text record by record.
#[derive(Default)]
pub struct ProjectBuilder {
    file_refs: Vec<String>,
    file_ref_ids: Vec<String>,
    build_files: Vec<String>,
    phases: Vec<PhaseSpec>,
}

impl ProjectBuilder {
    /// An empty project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file reference for `path`.
    pub fn file(mut self, id: &str, path: &str) -> Self {
        self.file_refs
            .push(render::file_reference(&ObjectId::from(id), compile_name(path), path));
        self.file_ref_ids.push(format!("{id} /* {} */", compile_name(path)));
        self
    }

    /// Adds a build file pointing at `file_ref`, annotated with `name`.
    pub fn build(mut self, id: &str, file_ref: &str, name: &str) -> Self {
        self.build_files.push(render::build_file(
            &ObjectId::from(id),
            name,
            &ObjectId::from(file_ref),
            "Sources",
        ));
        self
    }

    /// Adds a verbatim line to the build-file section.
    pub fn raw_build_line(mut self, line: &str) -> Self {
        self.build_files.push(line.to_string());
        self
    }

    /// Starts a new sources phase; later items go to it.
    pub fn phase(mut self, id: &str) -> Self {
        self.phases.push(PhaseSpec {
            id: id.to_string(),
            items: Vec::new(),
        });
        self
    }

    /// Appends a compile-list item to the current phase.
    pub fn item(mut self, build_id: &str, name: &str) -> Self {
        if self.phases.is_empty() {
            self = self.phase(DEFAULT_PHASE);
        }
        let line = render::phase_entry(&ObjectId::from(build_id), name, "Sources");
        if let Some(phase) = self.phases.last_mut() {
            phase.items.push(line);
        }
        self
    }

    /// Adds a file reference, a build file and a compile-list item for one
    /// source file.
    pub fn source(self, file_ref: &str, build_id: &str, path: &str) -> Self {
        let name = compile_name(path).to_string();
        self.file(file_ref, path)
            .build(build_id, file_ref, &name)
            .item(build_id, &name)
    }

    /// The manifest text.
    pub fn text(&self) -> String {
        let mut out = String::from(
            "// !$*UTF8*$!\n{\n\tarchiveVersion = 1;\n\tclasses = {\n\t};\n\tobjectVersion = 56;\n\tobjects = {\n\n",
        );

        out.push_str("/* Begin PBXBuildFile section */\n");
        for line in &self.build_files {
            out.push_str(&format!("\t\t{line}\n"));
        }
        out.push_str("/* End PBXBuildFile section */\n\n");

        out.push_str("/* Begin PBXFileReference section */\n");
        for line in &self.file_refs {
            out.push_str(&format!("\t\t{line}\n"));
        }
        out.push_str("/* End PBXFileReference section */\n\n");

        out.push_str(
            "/* Begin PBXFrameworksBuildPhase section */\n\
             \t\tFWK000000000000000000001 /* Frameworks */ = {\n\
             \t\t\tisa = PBXFrameworksBuildPhase;\n\
             \t\t\tbuildActionMask = 2147483647;\n\
             \t\t\tfiles = (\n\
             \t\t\t);\n\
             \t\t\trunOnlyForDeploymentPostprocessing = 0;\n\
             \t\t};\n\
             /* End PBXFrameworksBuildPhase section */\n\n",
        );

        out.push_str("/* Begin PBXGroup section */\n\t\tGRP000000000000000000001 = {\n\t\t\tisa = PBXGroup;\n\t\t\tchildren = (\n");
        for child in &self.file_ref_ids {
            out.push_str(&format!("\t\t\t\t{child},\n"));
        }
        out.push_str("\t\t\t);\n\t\t\tsourceTree = \"<group>\";\n\t\t};\n/* End PBXGroup section */\n\n");

        out.push_str("/* Begin PBXNativeTarget section */\n\t\tTGT000000000000000000001 /* App */ = {\n\t\t\tisa = PBXNativeTarget;\n\t\t\tbuildPhases = (\n");
        for phase in &self.phases {
            out.push_str(&format!("\t\t\t\t{} /* Sources */,\n", phase.id));
        }
        out.push_str(
            "\t\t\t\tFWK000000000000000000001 /* Frameworks */,\n\
             \t\t\t);\n\
             \t\t\tname = App;\n\
             \t\t\tproductName = App;\n\
             \t\t\tproductType = \"com.apple.product-type.application\";\n\
             \t\t};\n\
             /* End PBXNativeTarget section */\n\n",
        );

        out.push_str("/* Begin PBXSourcesBuildPhase section */\n");
        for phase in &self.phases {
            out.push_str(&format!(
                "\t\t{} /* Sources */ = {{\n\t\t\tisa = PBXSourcesBuildPhase;\n\t\t\tbuildActionMask = 2147483647;\n\t\t\tfiles = (\n",
                phase.id
            ));
            for item in &phase.items {
                out.push_str(&format!("\t\t\t\t{item}\n"));
            }
            out.push_str("\t\t\t);\n\t\t\trunOnlyForDeploymentPostprocessing = 0;\n\t\t};\n");
        }
        out.push_str("/* End PBXSourcesBuildPhase section */\n");

        out.push_str("\t};\n\trootObject = PRJ000000000000000000001 /* Project object */;\n}\n");
        out
    }
}

/// Writes `text` as `App.xcodeproj/project.pbxproj` under `dir`.
pub fn write_project(dir: &Path, text: &str) -> io::Result<PathBuf> {
    let bundle = dir.join("App.xcodeproj");
    std::fs::create_dir_all(&bundle)?;
    let manifest = bundle.join("project.pbxproj");
    std::fs::write(&manifest, text)?;
    Ok(manifest)
}

/// Number of non-overlapping occurrences of `needle` in `text`.
pub fn occurrences(text: &str, needle: &str) -> usize {
    text.matches(needle).count()
}

/// The lines of `before` missing from `after`, if `after` is `before` with
/// whole lines deleted and nothing else changed.
pub fn deleted_lines(before: &str, after: &str) -> Option<Vec<String>> {
    let mut kept = after.split_inclusive('\n').peekable();
    let mut deleted = Vec::new();
    for line in before.split_inclusive('\n') {
        if kept.peek() == Some(&line) {
            kept.next();
        } else {
            deleted.push(line.trim().to_string());
        }
    }
    kept.next().is_none().then_some(deleted)
}

/// Where [`FaultyFs`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Writing the backup fails.
    BackupWrite,
    /// Reading the backup back returns different bytes.
    BackupReadBack,
    /// Replacing the working file fails.
    Commit,
}

/// The real file system with one injected failure.
pub struct FaultyFs {
    fault: Fault,
    backup_suffix: String,
    writes: Cell<usize>,
}

impl FaultyFs {
    /// Fails at `fault`; backups are recognised by `backup_suffix`.
    pub fn new(fault: Fault, backup_suffix: &str) -> Self {
        Self {
            fault,
            backup_suffix: backup_suffix.to_string(),
            writes: Cell::new(0),
        }
    }

    /// Number of writes that reached the disk.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    fn is_backup(&self, path: &Path) -> bool {
        path.to_string_lossy().ends_with(&self.backup_suffix)
    }
}

impl FileSystem for FaultyFs {
    fn read(&self, path: &Path) -> io::Result<String> {
        let text = StdFs.read(path)?;
        if self.fault == Fault::BackupReadBack && self.is_backup(path) {
            return Ok(text.replacen('\t', " ", 1));
        }
        Ok(text)
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()> {
        let failing = match self.fault {
            Fault::BackupWrite => self.is_backup(path),
            Fault::Commit => !self.is_backup(path),
            Fault::BackupReadBack => false,
        };
        if failing {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected write failure",
            ));
        }
        StdFs.write_atomic(path, contents)?;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
