use super::{RecordStore, Table};
use crate::core::{MigrateError, Record, Result, RowIntent, TableSchema};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record store held entirely in memory.
///
/// Backups live next to the tables they copy, so a saved store carries its
/// own rollback state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryStore {
    tables: BTreeMap<String, Table>,
    #[serde(default)]
    backups: BTreeMap<String, Table>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table; fails if the name is taken
    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        let name = schema.name().to_string();

        if self.tables.contains_key(&name) {
            return Err(MigrateError::TableExists(name));
        }

        self.tables.insert(name, Table::new(schema));
        Ok(())
    }

    /// Appends rows without clearing, for loading fixtures.
    pub fn insert_rows(&mut self, table: &str, rows: Vec<RowIntent>) -> Result<usize> {
        let count = rows.len();
        self.get_table_mut(table)?.insert_all(rows)?;
        Ok(count)
    }

    /// Appends fully formed records, keeping any primary key they carry.
    pub fn insert_records(&mut self, table: &str, records: Vec<Record>) -> Result<usize> {
        let pk = self.get_table(table)?.schema().primary_key().map(str::to_string);
        let intents = records
            .into_iter()
            .map(|record| RowIntent::from_record(record, pk.as_deref()))
            .collect();
        self.insert_rows(table, intents)
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| MigrateError::TableNotFound(name.to_string()))
    }

    fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| MigrateError::TableNotFound(name.to_string()))
    }

    pub fn backup_count(&self) -> usize {
        self.backups.len()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Table::row_count).sum()
    }
}

impl RecordStore for InMemoryStore {
    fn schema(&self, table: &str) -> Result<TableSchema> {
        Ok(self.get_table(table)?.schema().clone())
    }

    fn rows(&self, table: &str) -> Result<Vec<Record>> {
        Ok(self.get_table(table)?.rows().to_vec())
    }

    fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.get_table(table)?.row_count())
    }

    fn write_rows(&mut self, table: &str, rows: Vec<RowIntent>) -> Result<usize> {
        let handle = self.get_table_mut(table)?;
        // Validate against an empty copy first so a rejected batch leaves the
        // table as it was.
        let mut replacement = handle.clone();
        replacement.clear();
        replacement.insert_all(rows)?;
        let written = replacement.row_count();
        *handle = replacement;
        debug!("wrote {} rows to '{}'", written, table);
        Ok(written)
    }

    fn clear(&mut self, table: &str) -> Result<()> {
        self.get_table_mut(table)?.clear();
        Ok(())
    }

    fn backup(&mut self, table: &str) -> Result<()> {
        if self.backups.contains_key(table) {
            debug!("backup of '{}' already present, keeping it", table);
            return Ok(());
        }
        let copy = self.get_table(table)?.clone();
        self.backups.insert(table.to_string(), copy);
        Ok(())
    }

    fn rollback(&mut self, table: &str) -> Result<()> {
        if let Some(copy) = self.backups.remove(table) {
            self.tables.insert(table.to_string(), copy);
            debug!("restored '{}' from backup", table);
        }
        Ok(())
    }

    fn delete_backup(&mut self, table: &str) -> Result<()> {
        self.backups.remove(table);
        Ok(())
    }

    fn has_backup(&self, table: &str) -> bool {
        self.backups.contains_key(table)
    }

    fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}
