//! Plumbing shared by the four stages: table access with the
//! backup / clear / write discipline, and the keyed merge of source rows
//! over destination rows.

use super::report::TableReport;
use crate::config::TableMapper;
use crate::core::{IdentityKey, Record, Result, RowIntent, TableSchema};
use crate::storage::RecordStore;
use crate::transform::FieldTransformer;
use log::{debug, warn};
use std::collections::HashMap;

/// Everything a stage reads from or writes to.
pub struct MigrationContext<'a> {
    pub source: &'a dyn RecordStore,
    pub destination: &'a mut dyn RecordStore,
    pub mapper: &'a dyn TableMapper,
    pub transformer: &'a dyn FieldTransformer,
}

/// A destination table opened for one stage.
#[derive(Debug, Clone)]
pub struct TableTarget {
    pub source: String,
    pub name: String,
    pub schema: TableSchema,
}

impl TableTarget {
    pub fn primary_key(&self) -> Option<&str> {
        self.schema.primary_key()
    }

    /// All-null destination record
    pub fn null_seed(&self) -> Record {
        self.schema.null_record()
    }

    /// A matched destination row minus its identifier
    pub fn seed_from(&self, row: &Record) -> Record {
        match self.primary_key() {
            Some(pk) => row.without(pk),
            None => row.clone(),
        }
    }
}

impl<'a> MigrationContext<'a> {
    pub fn new(
        source: &'a dyn RecordStore,
        destination: &'a mut dyn RecordStore,
        mapper: &'a dyn TableMapper,
        transformer: &'a dyn FieldTransformer,
    ) -> Self {
        Self {
            source,
            destination,
            mapper,
            transformer,
        }
    }

    /// Resolves the destination table and backs it up. Must precede any
    /// write to that table.
    pub fn open(&mut self, source_table: &str) -> Result<TableTarget> {
        let name = self.mapper.destination_table(source_table);
        let schema = self.destination.schema(&name)?;
        self.destination.backup(&name)?;
        Ok(TableTarget {
            source: source_table.to_string(),
            name,
            schema,
        })
    }

    pub fn source_rows(&self, target: &TableTarget) -> Result<Vec<Record>> {
        let expected = self.source.row_count(&target.source)?;
        let rows = self.source.rows(&target.source)?;
        debug!("read {}/{} rows from source '{}'", rows.len(), expected, target.source);
        Ok(rows)
    }

    pub fn destination_rows(&self, target: &TableTarget) -> Result<Vec<Record>> {
        self.destination.rows(&target.name)
    }

    pub fn transform(&self, target: &TableTarget, source_row: &Record, seed: Record) -> Result<Record> {
        self.transformer
            .transform(&target.source, &target.schema, source_row, seed)
    }

    /// Clears the table, then writes the full assembled row set.
    pub fn save(&mut self, target: &TableTarget, rows: Vec<RowIntent>) -> Result<usize> {
        self.destination.clear(&target.name)?;
        self.destination.write_rows(&target.name, rows)
    }
}

/// Destination rows waiting to be matched by identity key. Whatever is not
/// taken is carried over after the source rows.
pub struct PendingRows {
    table: String,
    rows: Vec<Option<Record>>,
    index: HashMap<IdentityKey, usize>,
}

impl PendingRows {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a row under `key`. A second row with the same key is discarded
    /// so the output never holds two rows for one identity.
    pub fn push(&mut self, key: IdentityKey, row: Record) {
        if self.index.contains_key(&key) {
            warn!("'{}': duplicate destination row for key {} discarded", self.table, key);
            return;
        }
        self.index.insert(key, self.rows.len());
        self.rows.push(Some(row));
    }

    pub fn take(&mut self, key: &IdentityKey) -> Option<Record> {
        let slot = self.index.remove(key)?;
        self.rows[slot].take()
    }

    pub fn remaining(&self) -> usize {
        self.index.len()
    }

    /// Unmatched rows, in their original order.
    pub fn into_remaining(self) -> impl Iterator<Item = Record> {
        self.rows.into_iter().flatten()
    }
}

/// Writes source rows merged over matching destination rows, then the
/// unmatched destination rows as new inserts.
///
/// Used by the taxonomy and attribute stages, whose source rows are keyed
/// by plain field values.
pub fn merge_keyed<S: AsRef<str>>(
    ctx: &mut MigrationContext<'_>,
    target: &TableTarget,
    key_fields: &[S],
    mut pending: PendingRows,
) -> Result<TableReport> {
    let mut report = TableReport::new(&target.name);
    let source_rows = ctx.source_rows(target)?;
    report.source_rows = source_rows.len();

    let mut rows = Vec::with_capacity(source_rows.len() + pending.remaining());
    for source_row in &source_rows {
        let key = IdentityKey::of(source_row, key_fields);
        let seed = match pending.take(&key) {
            Some(existing) => {
                report.merged_rows += 1;
                target.seed_from(&existing)
            }
            None => target.null_seed(),
        };
        let record = ctx.transform(target, source_row, seed)?;
        rows.push(RowIntent::from_record(record, target.primary_key()));
    }

    for existing in pending.into_remaining() {
        report.carried_rows += 1;
        rows.push(RowIntent::insert_new(existing, target.primary_key()));
    }

    report.written_rows = ctx.save(target, rows)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn key(name: &str) -> IdentityKey {
        IdentityKey::new(vec![Value::Integer(4), Value::from(name)])
    }

    #[test]
    fn test_pending_rows_take_and_remaining_order() {
        let mut pending = PendingRows::new("eav_attribute_set");
        pending.push(key("A"), Record::new().with("n", "A"));
        pending.push(key("B"), Record::new().with("n", "B"));
        pending.push(key("C"), Record::new().with("n", "C"));

        assert!(pending.take(&key("B")).is_some());
        assert!(pending.take(&key("B")).is_none());
        assert_eq!(pending.remaining(), 2);

        let names: Vec<_> = pending
            .into_remaining()
            .map(|row| row.get("n").to_string())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_pending_rows_collapse_duplicate_keys() {
        let mut pending = PendingRows::new("eav_attribute_label");
        pending.push(key("A"), Record::new().with("n", 1));
        pending.push(key("A"), Record::new().with("n", 2));
        assert_eq!(pending.remaining(), 1);
        assert_eq!(pending.take(&key("A")).unwrap().get("n"), &Value::Integer(1));
    }
}
