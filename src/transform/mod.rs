//! Per-field transformation between source and destination record shapes.

use crate::core::{MigrateError, Record, Result, TableSchema, Value};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Turns a source row into a destination row.
///
/// `seed` is the starting destination record: either all-null or a matched
/// destination row whose fields must survive unless the source overwrites
/// them.
pub trait FieldTransformer {
    fn transform(
        &self,
        source_table: &str,
        destination: &TableSchema,
        source: &Record,
        seed: Record,
    ) -> Result<Record>;
}

impl<T: FieldTransformer + ?Sized> FieldTransformer for &T {
    fn transform(
        &self,
        source_table: &str,
        destination: &TableSchema,
        source: &Record,
        seed: Record,
    ) -> Result<Record> {
        (**self).transform(source_table, destination, source, seed)
    }
}

/// Declarative rules for one source table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRules {
    /// Source fields never copied
    #[serde(default)]
    pub ignore: BTreeSet<String>,
    /// Source field -> destination field
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Values for destination fields still `Null` after copying
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,
}

impl TableRules {
    pub fn ignore(mut self, field: impl Into<String>) -> Self {
        self.ignore.insert(field.into());
        self
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.insert(from.into(), to.into());
        self
    }

    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformRules {
    tables: BTreeMap<String, TableRules>,
}

impl TransformRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, source_table: impl Into<String>, rules: TableRules) -> Self {
        self.tables.insert(source_table.into(), rules);
        self
    }

    pub fn get(&self, source_table: &str) -> Option<&TableRules> {
        self.tables.get(source_table)
    }
}

/// Copies every source field that has a destination column, honoring the
/// configured rules and casting to the destination column type.
#[derive(Debug, Clone, Default)]
pub struct MappingTransformer {
    rules: TransformRules,
}

impl MappingTransformer {
    pub fn new(rules: TransformRules) -> Self {
        Self { rules }
    }
}

impl FieldTransformer for MappingTransformer {
    fn transform(
        &self,
        source_table: &str,
        destination: &TableSchema,
        source: &Record,
        mut seed: Record,
    ) -> Result<Record> {
        let rules = self.rules.get(source_table);

        for (field, value) in source.fields() {
            if rules.is_some_and(|r| r.ignore.contains(field)) {
                continue;
            }
            let target = rules
                .and_then(|r| r.rename.get(field))
                .map(String::as_str)
                .unwrap_or(field);
            let Some(column) = destination.get_column(target) else {
                trace!("{}.{} has no destination column, dropped", source_table, field);
                continue;
            };
            let converted = value.cast_to(&column.data_type).map_err(|e| {
                MigrateError::Transform(format!("{}.{} -> {}.{}: {}", source_table, field, destination.name(), target, e))
            })?;
            seed.set(target, converted);
        }

        if let Some(rules) = rules {
            for (field, value) in &rules.defaults {
                if destination.has_column(field) && seed.get(field).is_null() {
                    seed.set(field.clone(), value.clone());
                }
            }
        }

        Ok(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};

    fn destination() -> TableSchema {
        TableSchema::new(
            "eav_attribute",
            vec![
                Column::new("attribute_id", DataType::Integer),
                Column::new("entity_type_id", DataType::Integer),
                Column::new("attribute_code", DataType::Text),
                Column::new("frontend_input", DataType::Text),
                Column::new("is_user_defined", DataType::Integer),
            ],
        )
        .with_primary_key("attribute_id")
    }

    #[test]
    fn test_seed_fields_survive_unless_overwritten() {
        let source = Record::new().with("attribute_id", 12).with("attribute_code", "color");
        let seed = Record::new().with("frontend_input", "select").with("attribute_code", "old");

        let out = MappingTransformer::default()
            .transform("eav_attribute", &destination(), &source, seed)
            .unwrap();

        assert_eq!(out.get("attribute_code"), &Value::from("color"));
        assert_eq!(out.get("frontend_input"), &Value::from("select"));
        assert_eq!(out.id("attribute_id"), Some(12));
    }

    #[test]
    fn test_rules_ignore_rename_and_default() {
        let rules = TransformRules::new().table(
            "eav_attribute",
            TableRules::default()
                .ignore("attribute_model")
                .rename("input", "frontend_input")
                .default_value("is_user_defined", 0),
        );
        let source = Record::new()
            .with("attribute_model", "legacy")
            .with("input", "text")
            .with("unknown_column", 1);

        let out = MappingTransformer::new(rules)
            .transform("eav_attribute", &destination(), &source, destination().null_record())
            .unwrap();

        assert_eq!(out.get("frontend_input"), &Value::from("text"));
        assert_eq!(out.get("is_user_defined"), &Value::Integer(0));
        assert!(!out.contains("attribute_model"));
        assert!(!out.contains("unknown_column"));
    }

    #[test]
    fn test_uncastable_value_is_a_transform_error() {
        let source = Record::new().with("entity_type_id", "catalog");
        let err = MappingTransformer::default()
            .transform("eav_attribute", &destination(), &source, Record::new())
            .unwrap_err();
        assert!(matches!(err, MigrateError::Transform(_)));
    }
}
