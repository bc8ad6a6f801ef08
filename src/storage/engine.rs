use crate::core::{Record, Result, RowIntent, TableSchema};

/// Storage backend the migration reads from and writes to.
///
/// All calls are synchronous; failures are returned as-is and never
/// retried by the migration.
pub trait RecordStore {
    /// Get the schema for a table
    fn schema(&self, table: &str) -> Result<TableSchema>;

    /// All rows of a table, primary key included
    fn rows(&self, table: &str) -> Result<Vec<Record>>;

    /// Get table row count
    fn row_count(&self, table: &str) -> Result<usize>;

    /// Replace the table contents with `rows`
    fn write_rows(&mut self, table: &str, rows: Vec<RowIntent>) -> Result<usize>;

    /// Remove every row from a table
    fn clear(&mut self, table: &str) -> Result<()>;

    /// Preserve the current contents under a recoverable copy.
    /// Keeps the first copy if one already exists.
    fn backup(&mut self, table: &str) -> Result<()>;

    /// Restore the backed-up contents; no-op without a backup
    fn rollback(&mut self, table: &str) -> Result<()>;

    /// Discard the backup copy; no-op without a backup
    fn delete_backup(&mut self, table: &str) -> Result<()>;

    fn has_backup(&self, table: &str) -> bool;

    /// List all table names
    fn table_names(&self) -> Vec<String>;
}
