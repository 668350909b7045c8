//! The gate between a rewritten text and the working file.

use crate::error::ValidationError;
use mend_common::ObjectId;
use mend_index::{IntegrityIndex, Invariant, Violation};
use mend_manifest::{parse, Manifest};
use mend_plan::{EditPlan, Removals};
use std::collections::BTreeSet;
use tracing::debug;

/// Checks that `after_text` is what applying `plan` to `before` should give.
///
/// The text must parse, satisfy every invariant, keep the surviving compile
/// list in its original order with each new entry present, and have lost
/// exactly the records the plan expected to remove.
pub fn validate(
    before: &Manifest,
    plan: &EditPlan,
    after_text: &str,
) -> Result<Manifest, ValidationError> {
    let after = parse(after_text).map_err(ValidationError::Reparse)?;
    let index = IntegrityIndex::build(&after);

    let mut violations = index.violations(&after);
    violations.extend(order_violations(before, plan, &after));
    if !violations.is_empty() {
        return Err(ValidationError::Invariants { violations });
    }

    let actual = observed_removals(before, plan, &after);
    if actual != plan.expected {
        return Err(ValidationError::CountMismatch {
            expected: plan.expected,
            actual,
        });
    }

    debug!(
        records = after.file_references.len() + after.build_files.len(),
        compiled = after.phase_entries().count(),
        "rewritten manifest validated"
    );
    Ok(after)
}

/// The compile list of `before` without the items `plan` deletes.
fn surviving_sequence(before: &Manifest, plan: &EditPlan) -> Vec<ObjectId> {
    let mut kept = Vec::new();
    let mut position = 0;
    for (phase_index, phase) in before.phases.iter().enumerate() {
        if plan.removes_phase(phase_index) {
            position += phase.files.len();
            continue;
        }
        for entry in &phase.files {
            if !plan.removes_phase_item(phase_index, position, &entry.build_file_id) {
                kept.push(entry.build_file_id.clone());
            }
            position += 1;
        }
    }
    kept
}

fn order_violations(before: &Manifest, plan: &EditPlan, after: &Manifest) -> Vec<Violation> {
    let inserted: BTreeSet<&ObjectId> = plan.insertions.iter().map(|e| &e.build_file_id).collect();
    let after_sequence = after.phase_sequence();

    let mut violations = Vec::new();
    for id in &inserted {
        if !after_sequence.contains(*id) {
            violations.push(
                Violation::new(
                    Invariant::OrderPreserved,
                    format!("new entry {id} is missing from the compile list"),
                )
                .with_ids([(*id).clone()]),
            );
        }
    }

    let expected = surviving_sequence(before, plan);
    let observed: Vec<ObjectId> = after_sequence
        .into_iter()
        .filter(|id| !inserted.contains(id))
        .collect();
    if expected != observed {
        let first = expected
            .iter()
            .zip(&observed)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| expected.len().min(observed.len()));
        let ids: Vec<ObjectId> = expected
            .get(first)
            .into_iter()
            .chain(observed.get(first))
            .cloned()
            .collect();
        violations.push(
            Violation::new(
                Invariant::OrderPreserved,
                format!(
                    "compile list diverges at position {first}: {} surviving entries expected, {} found",
                    expected.len(),
                    observed.len()
                ),
            )
            .with_ids(ids),
        );
    }
    violations
}

/// What disappeared from the tracked tables, net of planned insertions.
///
/// A table that grew beyond the insertions is reported as having lost
/// `usize::MAX` records so it can never match a plan.
fn observed_removals(before: &Manifest, plan: &EditPlan, after: &Manifest) -> Removals {
    let (new_refs, new_builds) = plan.records_inserted();
    let lost = |before: usize, inserted: usize, after: usize| {
        (before + inserted).checked_sub(after).unwrap_or(usize::MAX)
    };
    Removals {
        file_references: lost(before.file_references.len(), new_refs, after.file_references.len()),
        build_files: lost(before.build_files.len(), new_builds, after.build_files.len()),
        phases: lost(before.phases.len(), 0, after.phases.len()),
        phase_items: lost(
            before.phase_entries().count(),
            plan.insertions.len(),
            after.phase_entries().count(),
        ),
    }
}
