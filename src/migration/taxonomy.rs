//! Stage 1: attribute sets, then attribute groups.

use super::baseline::BaselineSnapshot;
use super::identity::{EntityKind, IdentityMap, KeyIndex, build_identity_map};
use super::report::TableReport;
use super::stage::{MigrationContext, PendingRows, merge_keyed};
use crate::core::{IdentityKey, MigrateError, Record, Result, Value};
use crate::eav::{attribute_group, attribute_set};
use log::info;

/// Identity maps published by stage 1.
#[derive(Debug, Clone)]
pub struct TaxonomyMaps {
    pub sets: IdentityMap,
    pub groups: IdentityMap,
}

pub fn migrate_attribute_sets(
    ctx: &mut MigrationContext<'_>,
    baseline: &BaselineSnapshot,
) -> Result<(IdentityMap, TableReport)> {
    let target = ctx.open(attribute_set::TABLE)?;

    let mut pending = PendingRows::new(&target.name);
    for set in baseline.attribute_sets() {
        pending.push(IdentityKey::of(set, &attribute_set::KEY), set.clone());
    }

    let report = merge_keyed(ctx, &target, &attribute_set::KEY, pending)?;

    let written = KeyIndex::build(
        &ctx.destination_rows(&target)?,
        &attribute_set::KEY,
        attribute_set::ID,
    );
    let sets = build_identity_map(
        EntityKind::AttributeSet,
        baseline.attribute_sets(),
        attribute_set::ID,
        &attribute_set::KEY,
        &written,
    )?;

    info!(
        "'{}': {} rows written ({} merged, {} baseline-only)",
        target.name, report.written_rows, report.merged_rows, report.carried_rows
    );
    Ok((sets, report))
}

pub fn migrate_attribute_groups(
    ctx: &mut MigrationContext<'_>,
    baseline: &BaselineSnapshot,
    sets: &IdentityMap,
) -> Result<(IdentityMap, TableReport)> {
    // Resolve every baseline group's set before touching the table, so an
    // inconsistent baseline aborts without writing.
    let groups = baseline
        .attribute_groups()
        .iter()
        .map(|group| with_new_set(group, sets))
        .collect::<Result<Vec<_>>>()?;

    let target = ctx.open(attribute_group::TABLE)?;

    let mut pending = PendingRows::new(&target.name);
    for group in &groups {
        pending.push(IdentityKey::of(group, &attribute_group::KEY), group.clone());
    }

    let report = merge_keyed(ctx, &target, &attribute_group::KEY, pending)?;

    let written = KeyIndex::build(
        &ctx.destination_rows(&target)?,
        &attribute_group::KEY,
        attribute_group::ID,
    );
    // Keyed on (new set id, name): `groups` already carries the new set ids
    let group_map = build_identity_map(
        EntityKind::AttributeGroup,
        &groups,
        attribute_group::ID,
        &attribute_group::KEY,
        &written,
    )?;

    info!(
        "'{}': {} rows written ({} merged, {} baseline-only)",
        target.name, report.written_rows, report.merged_rows, report.carried_rows
    );
    Ok((group_map, report))
}

/// Copy of a baseline group pointing at its set's new id.
fn with_new_set(group: &Record, sets: &IdentityMap) -> Result<Record> {
    let old_set = group.get(attribute_group::SET_ID);
    let new_set = sets.resolve(old_set).ok_or_else(|| {
        MigrateError::InconsistentBaseline(format!(
            "baseline attribute group {} references attribute set {} which is not in the baseline",
            group.get(attribute_group::ID),
            old_set
        ))
    })?;
    let mut group = group.clone();
    group.set(attribute_group::SET_ID, Value::Integer(new_set));
    Ok(group)
}
