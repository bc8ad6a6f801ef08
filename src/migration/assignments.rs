//! Stage 3: entity-attribute assignments.

use super::identity::IdentityMap;
use super::report::{TableReport, UnresolvedReference};
use super::stage::MigrationContext;
use super::taxonomy::TaxonomyMaps;
use crate::core::{Record, Result, RowIntent, Value};
use crate::eav::entity_attribute;
use log::{debug, info};

/// Source assignments are written as transformed; the destination's own
/// assignments are remapped onto the new taxonomy ids and appended with
/// fresh identifiers. A destination row with any unresolvable reference is
/// dropped.
pub fn migrate_entity_attributes(
    ctx: &mut MigrationContext<'_>,
    taxonomy: &TaxonomyMaps,
    attributes: &IdentityMap,
) -> Result<TableReport> {
    let target = ctx.open(entity_attribute::TABLE)?;
    let mut report = TableReport::new(&target.name);

    let existing = ctx.destination_rows(&target)?;
    let source_rows = ctx.source_rows(&target)?;
    report.source_rows = source_rows.len();

    let mut rows = Vec::with_capacity(source_rows.len() + existing.len());
    for source_row in &source_rows {
        let record = ctx.transform(&target, source_row, target.null_seed())?;
        rows.push(RowIntent::from_record(record, target.primary_key()));
    }

    let references = [
        (entity_attribute::ATTRIBUTE_ID, attributes),
        (entity_attribute::SET_ID, &taxonomy.sets),
        (entity_attribute::GROUP_ID, &taxonomy.groups),
    ];
    for row in existing {
        match remap_references(&row, &references) {
            Ok(remapped) => {
                report.carried_rows += 1;
                rows.push(RowIntent::insert_new(remapped, target.primary_key()));
            }
            Err((field, value)) => {
                let dropped = UnresolvedReference {
                    table: target.name.clone(),
                    row_id: target.primary_key().and_then(|pk| row.id(pk)),
                    field: field.to_string(),
                    value,
                };
                debug!(
                    "'{}': dropping assignment {:?}, {} {} has no migrated counterpart",
                    dropped.table, dropped.row_id, dropped.field, dropped.value
                );
                report.dropped.push(dropped);
            }
        }
    }

    report.written_rows = ctx.save(&target, rows)?;
    info!(
        "'{}': {} rows written ({} from source, {} kept, {} dropped)",
        target.name,
        report.written_rows,
        report.source_rows,
        report.carried_rows,
        report.dropped.len()
    );
    Ok(report)
}

/// Rewrites every reference through its map, or reports the first one
/// that does not resolve.
fn remap_references<'f>(
    row: &Record,
    references: &[(&'f str, &IdentityMap)],
) -> std::result::Result<Record, (&'f str, Value)> {
    let mut remapped = row.clone();
    for (field, map) in references {
        let old = row.get(field);
        match map.resolve(old) {
            Some(new_id) => remapped.set(*field, Value::Integer(new_id)),
            None => return Err((*field, old.clone())),
        }
    }
    Ok(remapped)
}
