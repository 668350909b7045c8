//! Plan application.

use crate::edit::{compose, deletions, indentation, line_start, Edit};
use crate::error::MutateError;
use mend_manifest::{render, Manifest, Section, SectionKind, SourcesPhase};
use mend_plan::EditPlan;
use mend_source::TextRange;
use std::collections::BTreeMap;
use tracing::debug;

const DEFAULT_RECORD_INDENT: &str = "\t\t";
const DEFAULT_ITEM_INDENT: &str = "\t\t\t\t";

/// The rewritten text and what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// The new manifest text.
    pub text: String,
    /// Deleted byte ranges of the original text, after line widening.
    pub deleted: Vec<TextRange>,
    /// Number of insertion points written.
    pub insertion_points: usize,
}

impl Mutation {
    /// Returns `true` if the text is unchanged.
    pub fn is_noop(&self, original: &str) -> bool {
        self.text == original
    }
}

/// Applies `plan` to the text `manifest` was parsed from.
pub fn apply(manifest: &Manifest, plan: &EditPlan) -> Result<Mutation, MutateError> {
    let text = manifest.raw_text.as_str();

    let mut ranges = Vec::new();
    for (i, reference) in manifest.file_references.iter().enumerate() {
        if plan.removes_file_reference(i) {
            ranges.push(reference.range);
        }
    }
    for (i, build) in manifest.build_files.iter().enumerate() {
        if plan.removes_build_file(manifest, i) {
            ranges.push(build.range);
        }
    }
    let mut position = 0;
    for (phase_index, phase) in manifest.phases.iter().enumerate() {
        if plan.removes_phase(phase_index) {
            ranges.push(phase.range);
            position += phase.files.len();
            continue;
        }
        for entry in &phase.files {
            if plan.removes_phase_item(phase_index, position, &entry.build_file_id) {
                ranges.push(entry.range);
            }
            position += 1;
        }
    }

    let mut edits = deletions(text, ranges);
    let deleted: Vec<TextRange> = edits.iter().map(|e| e.range).collect();

    let inserts = insertions(manifest, plan)?;
    let insertion_points = inserts.len();
    edits.extend(inserts);

    let new_text = compose(text, edits)?;
    debug!(
        deleted = deleted.len(),
        insertion_points,
        bytes_before = text.len(),
        bytes_after = new_text.len(),
        "applied edit plan"
    );
    Ok(Mutation {
        text: new_text,
        deleted,
        insertion_points,
    })
}

/// One [`Edit::insert`] per insertion point, lines in registration order.
fn insertions(manifest: &Manifest, plan: &EditPlan) -> Result<Vec<Edit>, MutateError> {
    let text = manifest.raw_text.as_str();
    let mut points: BTreeMap<usize, String> = BTreeMap::new();

    for entry in &plan.insertions {
        let phase = manifest
            .phase(entry.phase_id.as_str())
            .ok_or_else(|| MutateError::UnknownPhase {
                id: entry.phase_id.clone(),
            })?;

        if entry.new_file_ref {
            let section = section(manifest, SectionKind::FileReference)?;
            let record = render::file_reference(&entry.file_ref_id, &entry.name, &entry.path);
            add_record(text, manifest, section, &record, &mut points);
        }
        if entry.new_build_file {
            let section = section(manifest, SectionKind::BuildFile)?;
            let record =
                render::build_file(&entry.build_file_id, &entry.name, &entry.file_ref_id, &phase.name);
            add_record(text, manifest, section, &record, &mut points);
        }
        let item = render::phase_entry(&entry.build_file_id, &entry.name, &phase.name);
        add_item(text, phase, &item, &mut points);
    }

    Ok(points
        .into_iter()
        .map(|(offset, lines)| Edit::insert(offset, lines))
        .collect())
}

fn section(manifest: &Manifest, kind: SectionKind) -> Result<&Section, MutateError> {
    manifest
        .section(kind)
        .ok_or(MutateError::MissingSection { isa: kind.isa() })
}

/// Queues a record line at the top of `section`.
fn add_record(
    text: &str,
    manifest: &Manifest,
    section: &Section,
    record: &str,
    points: &mut BTreeMap<usize, String>,
) {
    let first = match section.kind {
        SectionKind::BuildFile => manifest.build_files.first().map(|b| b.range),
        _ => manifest
            .file_references
            .iter()
            .find(|r| section.body.contains_range(&r.range))
            .map(|r| r.range),
    };
    let indent = first
        .filter(|r| section.body.contains_range(r))
        .and_then(|r| indentation(text, r.start))
        .unwrap_or(DEFAULT_RECORD_INDENT);

    if section.insert_at <= section.body.end {
        points
            .entry(section.insert_at)
            .or_default()
            .push_str(&format!("{indent}{record}\n"));
    } else {
        // Section written on a single line.
        points
            .entry(section.body.start)
            .or_default()
            .push_str(&format!("\n{indent}{record}"));
    }
}

/// Queues a compile-list item at the end of `phase`'s `files` list.
fn add_item(text: &str, phase: &SourcesPhase, item: &str, points: &mut BTreeMap<usize, String>) {
    let close = phase.files_close;
    match indentation(text, close) {
        Some(close_indent) => {
            let indent = phase
                .files
                .first()
                .and_then(|e| indentation(text, e.range.start))
                .map(str::to_string)
                .unwrap_or_else(|| {
                    if close_indent.is_empty() {
                        DEFAULT_ITEM_INDENT.to_string()
                    } else {
                        format!("{close_indent}\t")
                    }
                });
            points
                .entry(line_start(text, close))
                .or_default()
                .push_str(&format!("{indent}{item}\n"));
        }
        None => {
            points
                .entry(close)
                .or_default()
                .push_str(&format!("{item} "));
        }
    }
}
