//! EAV taxonomy migration.
//!
//! Four stages run strictly in order, each publishing identity maps the
//! next one reads:
//!
//! 1. attribute sets, then attribute groups ([`taxonomy`])
//! 2. attributes ([`attributes`])
//! 3. entity-attribute assignments ([`assignments`])
//! 4. configured join tables ([`join_tables`])
//!
//! Every table is backed up right before its first write. A failed run is
//! undone with [`EavMigration::rollback`]; a successful one is confirmed
//! with [`EavMigration::delete_backups`].

pub mod assignments;
pub mod attributes;
pub mod baseline;
pub mod identity;
pub mod join_tables;
pub mod report;
pub mod stage;
pub mod taxonomy;

pub use attributes::AttributeMaps;
pub use baseline::BaselineSnapshot;
pub use identity::{EntityKind, IdentityMap, KeyIndex, resolve_attribute_cross_schema};
pub use report::{MigrationReport, TableReport, UnresolvedReference};
pub use stage::MigrationContext;
pub use taxonomy::TaxonomyMaps;

use crate::config::{MigrationConfig, TableMapper};
use crate::core::Result;
use crate::progress::{ProgressSink, SilentProgress};
use crate::storage::RecordStore;
use crate::transform::{FieldTransformer, MappingTransformer};
use log::info;
use tracing::info_span;

/// Identity maps and statistics of a completed run.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub sets: IdentityMap,
    pub groups: IdentityMap,
    pub attributes: IdentityMap,
    pub report: MigrationReport,
}

/// A migration run from `source` into `destination`.
///
/// # Examples
///
/// ```no_run
/// use eav_migrate::{EavMigration, InMemoryStore, MigrationConfig};
///
/// # fn main() -> eav_migrate::Result<()> {
/// let source = InMemoryStore::new();
/// let mut destination = InMemoryStore::new();
/// let config = MigrationConfig::new();
///
/// let mut migration = EavMigration::new(&source, &mut destination, &config);
/// match migration.perform() {
///     Ok(_) => migration.delete_backups()?,
///     Err(_) => migration.rollback()?,
/// }
/// # Ok(())
/// # }
/// ```
pub struct EavMigration<'a> {
    source: &'a dyn RecordStore,
    destination: &'a mut dyn RecordStore,
    config: &'a MigrationConfig,
    transformer: Box<dyn FieldTransformer + 'a>,
    progress: Box<dyn ProgressSink + 'a>,
}

impl<'a> EavMigration<'a> {
    /// Uses a [`MappingTransformer`] built from the configured rules and no
    /// progress reporting.
    pub fn new(
        source: &'a dyn RecordStore,
        destination: &'a mut dyn RecordStore,
        config: &'a MigrationConfig,
    ) -> Self {
        Self {
            source,
            destination,
            config,
            transformer: Box::new(MappingTransformer::new(config.transform.clone())),
            progress: Box::new(SilentProgress),
        }
    }

    pub fn with_transformer(mut self, transformer: impl FieldTransformer + 'a) -> Self {
        self.transformer = Box::new(transformer);
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// One step per migrated table.
    pub fn iterations_count(&self) -> usize {
        eav_table_count() + self.config.join_tables.len()
    }

    /// Destination tables touched by a run, in forward order.
    pub fn documents(&self) -> Vec<String> {
        self.config
            .source_tables()
            .into_iter()
            .map(|table| self.config.destination_table(table))
            .collect()
    }

    pub fn perform(&mut self) -> Result<MigrationOutcome> {
        self.config.validate()?;
        self.progress.start(self.iterations_count());
        let outcome = self.run_stages();
        self.progress.finish();

        if let Ok(outcome) = &outcome {
            info!(
                "EAV migration done: {} rows written, {} rows dropped",
                outcome.report.rows_written(),
                outcome.report.dropped().count()
            );
        }
        outcome
    }

    fn run_stages(&mut self) -> Result<MigrationOutcome> {
        let baseline = BaselineSnapshot::capture(self.source, &*self.destination, self.config)?;
        let mut ctx = MigrationContext::new(
            self.source,
            &mut *self.destination,
            self.config,
            self.transformer.as_ref(),
        );
        let mut report = MigrationReport::default();

        let sets = {
            let span = info_span!("eav.stage", stage = "attribute_sets");
            let _enter = span.enter();
            let (sets, sets_report) = taxonomy::migrate_attribute_sets(&mut ctx, &baseline)?;
            report.tables.push(sets_report);
            self.progress.advance();
            sets
        };

        let groups = {
            let span = info_span!("eav.stage", stage = "attribute_groups");
            let _enter = span.enter();
            let (groups, groups_report) = taxonomy::migrate_attribute_groups(&mut ctx, &baseline, &sets)?;
            report.tables.push(groups_report);
            self.progress.advance();
            groups
        };
        let taxonomy = TaxonomyMaps { sets, groups };

        let attributes = {
            let span = info_span!("eav.stage", stage = "attributes");
            let _enter = span.enter();
            let (maps, attributes_report) = attributes::migrate_attributes(&mut ctx, &baseline)?;
            report.tables.push(attributes_report);
            self.progress.advance();
            maps
        };

        {
            let span = info_span!("eav.stage", stage = "entity_attributes");
            let _enter = span.enter();
            let assignments_report =
                assignments::migrate_entity_attributes(&mut ctx, &taxonomy, &attributes.attributes)?;
            report.tables.push(assignments_report);
            self.progress.advance();
        }

        for spec in &self.config.join_tables {
            let span = info_span!("eav.stage", stage = "join_table", table = %spec.name);
            let _enter = span.enter();
            let table_report =
                join_tables::migrate_join_table(&mut ctx, spec, &baseline, &taxonomy, &attributes)?;
            report.tables.push(table_report);
            self.progress.advance();
        }

        Ok(MigrationOutcome {
            sets: taxonomy.sets,
            groups: taxonomy.groups,
            attributes: attributes.attributes,
            report,
        })
    }

    /// Restores every backed-up table, in forward order. Tables the run
    /// never reached have no backup and are left alone.
    pub fn rollback(&mut self) -> Result<()> {
        for table in self.documents() {
            self.destination.rollback(&table)?;
        }
        info!("EAV migration rolled back");
        Ok(())
    }

    /// Discards the backups once the run is confirmed.
    pub fn delete_backups(&mut self) -> Result<()> {
        for table in self.documents() {
            self.destination.delete_backup(&table)?;
        }
        info!("EAV migration backups deleted");
        Ok(())
    }
}

fn eav_table_count() -> usize {
    crate::eav::TAXONOMY_TABLES.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JoinTableSpec;
    use crate::core::MigrateError;
    use crate::storage::InMemoryStore;

    #[test]
    fn test_documents_follow_renames() {
        let source = InMemoryStore::new();
        let mut destination = InMemoryStore::new();
        let config = MigrationConfig::empty()
            .rename_table("eav_attribute_label", "eav_attribute_store_label")
            .join_table(JoinTableSpec::new("eav_attribute_label"));

        let migration = EavMigration::new(&source, &mut destination, &config);

        assert_eq!(migration.iterations_count(), 5);
        assert_eq!(
            migration.documents(),
            vec![
                "eav_attribute_set",
                "eav_attribute_group",
                "eav_attribute",
                "eav_entity_attribute",
                "eav_attribute_store_label",
            ]
        );
    }

    #[test]
    fn test_rollback_without_run_is_noop() {
        let source = InMemoryStore::new();
        let mut destination = InMemoryStore::new();
        let config = MigrationConfig::new();

        let mut migration = EavMigration::new(&source, &mut destination, &config);
        migration.rollback().unwrap();
        migration.delete_backups().unwrap();
    }

    #[test]
    fn test_perform_rejects_tables_sharing_a_destination() {
        let source = InMemoryStore::new();
        let mut destination = InMemoryStore::new();
        let config = MigrationConfig::empty()
            .rename_table("eav_attribute_label", "eav_attribute_store_label")
            .join_table(JoinTableSpec::new("eav_attribute_label"))
            .join_table(JoinTableSpec::new("eav_attribute_store_label"));

        let mut migration = EavMigration::new(&source, &mut destination, &config);
        let err = migration.perform().unwrap_err();
        drop(migration);

        assert!(matches!(err, MigrateError::Config(_)));
        assert_eq!(destination.backup_count(), 0);
    }
}
