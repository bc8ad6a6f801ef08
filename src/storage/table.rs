use crate::core::{Id, MigrateError, Record, Result, RowIntent, TableSchema, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    #[serde(default)]
    rows: Vec<Record>,
    #[serde(default = "first_id")]
    next_id: Id,
}

fn first_id() -> Id {
    1
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            next_id: first_id(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Truncates the table and resets the identifier counter.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.next_id = first_id();
    }

    /// Appends `intents` and returns the identifiers written (empty for
    /// tables without a primary key).
    ///
    /// Explicit identifiers are claimed before any fresh one is handed out,
    /// so an `Insert` never takes an id an `Update` later in the batch asks
    /// for. Nothing is written if any row fails validation.
    pub fn insert_all(&mut self, intents: Vec<RowIntent>) -> Result<Vec<Id>> {
        let Some(pk) = self.schema.primary_key().map(str::to_string) else {
            let mut staged = Vec::with_capacity(intents.len());
            for intent in intents {
                if let RowIntent::Update(id, _) = intent {
                    return Err(MigrateError::ConstraintViolation(format!(
                        "Table '{}' has no primary key, cannot place row at id {}",
                        self.schema.name(),
                        id
                    )));
                }
                let record = self.complete_row(intent.record())?;
                staged.push(record);
            }
            self.rows.extend(staged);
            return Ok(Vec::new());
        };

        let mut taken: HashSet<Id> = self.rows.iter().filter_map(|row| row.id(&pk)).collect();
        let mut highest = taken.iter().copied().max().unwrap_or(0);

        for intent in &intents {
            if let Some(id) = intent.explicit_id() {
                if !taken.insert(id) {
                    return Err(MigrateError::ConstraintViolation(format!(
                        "Duplicate primary key {} in table '{}'",
                        id,
                        self.schema.name()
                    )));
                }
                highest = highest.max(id);
            }
        }

        let mut next_id = self.next_id.max(highest + 1);
        let mut staged = Vec::with_capacity(intents.len());
        let mut ids = Vec::with_capacity(intents.len());
        for intent in intents {
            let (id, record) = match intent {
                RowIntent::Update(id, record) => (id, record),
                RowIntent::Insert(record) => {
                    let id = next_id;
                    next_id += 1;
                    (id, record)
                }
            };
            let mut record = self.complete_row(&record)?;
            record.set(pk.clone(), Value::Integer(id));
            staged.push(record);
            ids.push(id);
        }

        self.rows.extend(staged);
        self.next_id = next_id;
        Ok(ids)
    }

    /// Fills absent columns with `Null` and validates every value, the
    /// primary key excepted (it is assigned by `insert_all`).
    fn complete_row(&self, record: &Record) -> Result<Record> {
        for (field, _) in record.fields() {
            if !self.schema.has_column(field) {
                return Err(MigrateError::ColumnNotFound(
                    field.to_string(),
                    self.schema.name().to_string(),
                ));
            }
        }

        let pk = self.schema.primary_key();
        let mut row = Record::new();
        for column in self.schema.columns() {
            let value = record.get(&column.name).clone();
            if Some(column.name.as_str()) != pk {
                column.validate(&value)?;
            }
            row.set(column.name.clone(), value);
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};

    fn sets_table() -> Table {
        Table::new(
            TableSchema::new(
                "eav_attribute_set",
                vec![
                    Column::new("attribute_set_id", DataType::Integer).not_null(),
                    Column::new("entity_type_id", DataType::Integer).not_null(),
                    Column::new("attribute_set_name", DataType::Text).not_null(),
                ],
            )
            .with_primary_key("attribute_set_id"),
        )
    }

    fn set(entity_type: i64, name: &str) -> Record {
        Record::new().with("entity_type_id", entity_type).with("attribute_set_name", name)
    }

    #[test]
    fn test_inserts_allocate_above_explicit_ids() {
        let mut table = sets_table();
        let ids = table
            .insert_all(vec![
                RowIntent::Insert(set(4, "Baseline")),
                RowIntent::Update(7, set(4, "Default")),
            ])
            .unwrap();
        assert_eq!(ids, vec![8, 7]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_duplicate_explicit_id_is_rejected_atomically() {
        let mut table = sets_table();
        let err = table
            .insert_all(vec![
                RowIntent::Update(3, set(4, "A")),
                RowIntent::Update(3, set(4, "B")),
            ])
            .unwrap_err();
        assert!(matches!(err, MigrateError::ConstraintViolation(_)));
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_unknown_column_and_null_violation() {
        let mut table = sets_table();
        let err = table
            .insert_all(vec![RowIntent::Insert(set(4, "A").with("foo", "bar"))])
            .unwrap_err();
        assert!(matches!(err, MigrateError::ColumnNotFound(_, _)));

        let err = table
            .insert_all(vec![RowIntent::Insert(Record::new().with("entity_type_id", 4))])
            .unwrap_err();
        assert!(matches!(err, MigrateError::ConstraintViolation(_)));
    }

    #[test]
    fn test_clear_resets_counter() {
        let mut table = sets_table();
        table.insert_all(vec![RowIntent::Insert(set(4, "A"))]).unwrap();
        table.clear();
        let ids = table.insert_all(vec![RowIntent::Insert(set(4, "B"))]).unwrap();
        assert_eq!(ids, vec![1]);
    }
}
