//! Stage 2: attribute definitions.

use super::baseline::BaselineSnapshot;
use super::identity::{EntityKind, IdentityMap, KeyIndex, build_identity_map};
use super::report::TableReport;
use super::stage::{MigrationContext, PendingRows, merge_keyed};
use crate::core::{IdentityKey, Result};
use crate::eav::attribute;
use log::info;

/// What stage 2 publishes: the baseline id map plus the written table
/// indexed by (entity type, code), needed for cross-schema resolution.
#[derive(Debug, Clone)]
pub struct AttributeMaps {
    pub attributes: IdentityMap,
    pub by_key: KeyIndex,
}

/// Source attributes are seeded from the baseline row with the same
/// (entity type, code) so that destination-only columns survive; baseline
/// attributes the source lacks are appended as new rows.
pub fn migrate_attributes(
    ctx: &mut MigrationContext<'_>,
    baseline: &BaselineSnapshot,
) -> Result<(AttributeMaps, TableReport)> {
    let target = ctx.open(attribute::TABLE)?;

    let mut pending = PendingRows::new(&target.name);
    for row in baseline.attributes() {
        pending.push(IdentityKey::of(row, &attribute::KEY), row.clone());
    }

    let report = merge_keyed(ctx, &target, &attribute::KEY, pending)?;

    let by_key = KeyIndex::build(&ctx.destination_rows(&target)?, &attribute::KEY, attribute::ID);
    let attributes = build_identity_map(
        EntityKind::Attribute,
        baseline.attributes(),
        attribute::ID,
        &attribute::KEY,
        &by_key,
    )?;

    info!(
        "'{}': {} rows written ({} merged, {} baseline-only)",
        target.name, report.written_rows, report.merged_rows, report.carried_rows
    );
    Ok((AttributeMaps { attributes, by_key }, report))
}
