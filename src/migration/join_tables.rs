//! Stage 4: configured join and auxiliary tables.

use super::attributes::AttributeMaps;
use super::baseline::BaselineSnapshot;
use super::identity::{IdentityMap, resolve_attribute_cross_schema};
use super::report::{TableReport, UnresolvedReference};
use super::stage::{MigrationContext, PendingRows, TableTarget};
use super::taxonomy::TaxonomyMaps;
use crate::config::JoinTableSpec;
use crate::core::{Id, IdentityKey, Record, Result, RowIntent, Value};
use crate::eav::ATTRIBUTE_REFERENCE;
use log::{debug, info, warn};
use std::collections::HashSet;

/// Migrates one join table.
///
/// With a key, source rows are merged over the destination rows sharing
/// that key and the unmatched destination rows are carried over with
/// their references remapped. Without a key the source rows are copied
/// as they are and the destination's own rows are not kept.
pub fn migrate_join_table(
    ctx: &mut MigrationContext<'_>,
    spec: &JoinTableSpec,
    baseline: &BaselineSnapshot,
    taxonomy: &TaxonomyMaps,
    attributes: &AttributeMaps,
) -> Result<TableReport> {
    let target = ctx.open(&spec.name)?;
    let mut report = TableReport::new(&target.name);

    let existing = ctx.destination_rows(&target)?;
    let source_rows = ctx.source_rows(&target)?;
    report.source_rows = source_rows.len();

    if !spec.deduplicates() {
        let mut rows = Vec::with_capacity(source_rows.len());
        for source_row in &source_rows {
            let record = ctx.transform(&target, source_row, target.null_seed())?;
            rows.push(RowIntent::from_record(record, target.primary_key()));
        }
        report.written_rows = ctx.save(&target, rows)?;
        info!(
            "'{}': {} rows copied, {} destination rows replaced",
            target.name,
            report.written_rows,
            existing.len()
        );
        return Ok(report);
    }

    // only rows whose attribute survived can match or be carried
    let mut pending = PendingRows::new(&target.name);
    for row in existing {
        if let Some(row) = remap_attribute(&target, row, &attributes.attributes, &mut report) {
            pending.push(IdentityKey::of(&row, spec.key_fields.as_slice()), row);
        }
    }

    let mut rows = Vec::with_capacity(source_rows.len() + pending.remaining());
    for source_row in &source_rows {
        let seed = source_key(source_row, &spec.key_fields, baseline, attributes)
            .and_then(|key| pending.take(&key));
        let record = match seed {
            Some(existing) => {
                report.merged_rows += 1;
                let merged = ctx.transform(&target, source_row, target.seed_from(&existing))?;
                // fields the source did not supply still hold destination set ids
                let inherited: Vec<&str> = spec
                    .set_reference_fields
                    .iter()
                    .map(String::as_str)
                    .filter(|field| !source_row.contains(field))
                    .collect();
                remap_set_references(merged, &inherited, &taxonomy.sets)
            }
            None => ctx.transform(&target, source_row, target.null_seed())?,
        };
        rows.push(RowIntent::from_record(record, target.primary_key()));
    }

    let mut taken: HashSet<Id> = rows.iter().filter_map(RowIntent::explicit_id).collect();
    for row in pending.into_remaining() {
        let row = remap_set_references(row, spec.set_reference_fields.as_slice(), &taxonomy.sets);
        if let Some(intent) = place_carried(&target, spec, row, &mut taken) {
            report.carried_rows += 1;
            rows.push(intent);
        }
    }

    report.written_rows = ctx.save(&target, rows)?;
    info!(
        "'{}': {} rows written ({} merged, {} kept, {} dropped)",
        target.name,
        report.written_rows,
        report.merged_rows,
        report.carried_rows,
        report.dropped.len()
    );
    Ok(report)
}

/// Key of a source row, with its attribute reference resolved across
/// schemas. `None` when the reference does not resolve: such a row cannot
/// match any destination row.
fn source_key(
    row: &Record,
    key_fields: &[String],
    baseline: &BaselineSnapshot,
    attributes: &AttributeMaps,
) -> Option<IdentityKey> {
    let mut values = Vec::with_capacity(key_fields.len());
    for field in key_fields {
        let value = row.get(field);
        if field == ATTRIBUTE_REFERENCE && !value.is_null() {
            let resolved = resolve_attribute_cross_schema(baseline, &attributes.by_key, value)?;
            values.push(Value::Integer(resolved));
        } else {
            values.push(value.clone());
        }
    }
    Some(IdentityKey::new(values))
}

fn remap_set_references<S: AsRef<str>>(mut record: Record, fields: &[S], sets: &IdentityMap) -> Record {
    for field in fields {
        let field = field.as_ref();
        if let Some(new_id) = sets.resolve(record.get(field)) {
            record.set(field, Value::Integer(new_id));
        }
    }
    record
}

/// Rewrites a destination row's attribute reference to the migrated id, or
/// records the row as dropped when its attribute no longer exists.
fn remap_attribute(
    target: &TableTarget,
    mut row: Record,
    attributes: &IdentityMap,
    report: &mut TableReport,
) -> Option<Record> {
    let reference = row.get(ATTRIBUTE_REFERENCE).clone();
    if reference.is_null() {
        return Some(row);
    }
    if let Some(new_id) = attributes.resolve(&reference) {
        row.set(ATTRIBUTE_REFERENCE, Value::Integer(new_id));
        return Some(row);
    }

    let dropped = UnresolvedReference {
        table: target.name.clone(),
        row_id: target.primary_key().and_then(|pk| row.id(pk)),
        field: ATTRIBUTE_REFERENCE.to_string(),
        value: reference,
    };
    debug!(
        "'{}': dropping row {:?}, attribute {} has no migrated counterpart",
        dropped.table, dropped.row_id, dropped.value
    );
    report.dropped.push(dropped);
    None
}

/// Keeps a carried row's identifier unless a source row already took it.
/// When the identifier is part of the business key it cannot be replaced,
/// so the row is skipped instead.
fn place_carried(
    target: &TableTarget,
    spec: &JoinTableSpec,
    row: Record,
    taken: &mut HashSet<Id>,
) -> Option<RowIntent> {
    let Some(pk) = target.primary_key() else {
        return Some(RowIntent::Insert(row));
    };
    let Some(id) = row.id(pk) else {
        return Some(RowIntent::insert_new(row, Some(pk)));
    };
    if taken.insert(id) {
        return Some(RowIntent::from_record(row, Some(pk)));
    }
    if spec.key_fields.iter().any(|field| field == pk) {
        warn!(
            "'{}': destination row {} collides with a migrated row on its key, skipped",
            target.name, id
        );
        return None;
    }
    debug!("'{}': destination row {} renumbered", target.name, id);
    Some(RowIntent::insert_new(row, Some(pk)))
}
