use super::{DataType, MigrateError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Auto-generated row identifier.
pub type Id = i64;

static NULL: Value = Value::Null;

/// One row of any table, addressed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly for fixtures.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns the field value, `Null` when absent.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn id(&self, field: &str) -> Option<Id> {
        self.get(field).as_i64()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of the record without `field`.
    pub fn without(&self, field: &str) -> Self {
        let mut copy = self.clone();
        copy.fields.remove(field);
        copy
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// How a row is handed to the store.
///
/// `Insert` asks the store for a fresh identifier; `Update` places the row
/// at an explicit identifier. The record never carries the primary key
/// itself, the store writes it from the intent.
#[derive(Debug, Clone, PartialEq)]
pub enum RowIntent {
    Insert(Record),
    Update(Id, Record),
}

impl RowIntent {
    /// Splits `record` on its primary key: a resolvable id becomes `Update`,
    /// a null (or absent) one becomes `Insert`.
    pub fn from_record(mut record: Record, primary_key: Option<&str>) -> Self {
        let Some(pk) = primary_key else {
            return Self::Insert(record);
        };
        match record.remove(pk).and_then(|value| value.as_i64()) {
            Some(id) => Self::Update(id, record),
            None => Self::Insert(record),
        }
    }

    /// Forces an insert-as-new, discarding any identifier.
    pub fn insert_new(record: Record, primary_key: Option<&str>) -> Self {
        match primary_key {
            Some(pk) => Self::Insert(record.without(pk)),
            None => Self::Insert(record),
        }
    }

    pub fn record(&self) -> &Record {
        match self {
            Self::Insert(record) | Self::Update(_, record) => record,
        }
    }

    pub fn explicit_id(&self) -> Option<Id> {
        match self {
            Self::Insert(_) => None,
            Self::Update(id, _) => Some(*id),
        }
    }
}

/// Business identity of a row: the ordered values of its key fields.
///
/// Compared value-by-value, so no delimiter can make two different tuples
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(Vec<Value>);

impl IdentityKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn of<S: AsRef<str>>(record: &Record, fields: &[S]) -> Self {
        Self(fields.iter().map(|field| record.get(field.as_ref()).clone()).collect())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            match value {
                Value::Text(s) => write!(f, "{:?}", s)?,
                other => write!(f, "{}", other)?,
            }
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if matches!(value, Value::Null) {
            if !self.nullable {
                return Err(MigrateError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(MigrateError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

/// Shape of a destination (or source) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    #[serde(default)]
    primary_key: Option<String>,
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            columns,
        }
    }

    /// Declares the auto-increment identifier column.
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// A record with every column set to `Null`.
    pub fn null_record(&self) -> Record {
        self.columns
            .iter()
            .map(|col| (col.name.clone(), Value::Null))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_intent_from_record() {
        let record = Record::new().with("attribute_set_id", 9).with("attribute_set_name", "Default");
        match RowIntent::from_record(record.clone(), Some("attribute_set_id")) {
            RowIntent::Update(id, rec) => {
                assert_eq!(id, 9);
                assert!(!rec.contains("attribute_set_id"));
            }
            other => panic!("expected update, got {:?}", other),
        }

        let cleared = record.with("attribute_set_id", Value::Null);
        assert!(matches!(
            RowIntent::from_record(cleared, Some("attribute_set_id")),
            RowIntent::Insert(_)
        ));
    }

    #[test]
    fn test_identity_key_is_collision_safe() {
        // "a-b" + "c" versus "a" + "b-c" used to collide when joined with '-'
        let left = Record::new().with("x", "a-b").with("y", "c");
        let right = Record::new().with("x", "a").with("y", "b-c");
        assert_ne!(IdentityKey::of(&left, &["x", "y"]), IdentityKey::of(&right, &["x", "y"]));
    }

    #[test]
    fn test_identity_key_display() {
        let key = IdentityKey::new(vec![Value::Integer(4), Value::from("Default")]);
        assert_eq!(key.to_string(), "(4, \"Default\")");
    }

    #[test]
    fn test_missing_field_reads_null() {
        let record = Record::new();
        assert!(record.get("anything").is_null());
    }
}
