use crate::core::{Id, Value};
use serde::Serialize;

/// A row dropped because one of its references has no destination
/// counterpart. Row-scoped and never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedReference {
    pub table: String,
    pub row_id: Option<Id>,
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub source_rows: usize,
    /// Source rows seeded from a matching destination row
    pub merged_rows: usize,
    /// Destination rows carried over without a source counterpart
    pub carried_rows: usize,
    pub written_rows: usize,
    pub dropped: Vec<UnresolvedReference>,
}

impl TableReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|report| report.table == name)
    }

    pub fn dropped(&self) -> impl Iterator<Item = &UnresolvedReference> {
        self.tables.iter().flat_map(|report| report.dropped.iter())
    }

    pub fn rows_written(&self) -> usize {
        self.tables.iter().map(|report| report.written_rows).sum()
    }
}
