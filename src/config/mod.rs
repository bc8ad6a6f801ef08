use crate::core::{MigrateError, Result};
use crate::eav;
use crate::transform::TransformRules;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Resolves a source table's logical name to its destination counterpart.
pub trait TableMapper {
    fn destination_table(&self, source_table: &str) -> String;
}

/// One many-to-many (or auxiliary) table migrated by the generic join pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTableSpec {
    /// Source table name
    pub name: String,

    /// Composite business key; empty means straight copy without dedup
    #[serde(default)]
    pub key_fields: Vec<String>,

    /// Fields holding an attribute set id that may need remapping
    #[serde(default)]
    pub set_reference_fields: Vec<String>,
}

impl JoinTableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_fields: Vec::new(),
            set_reference_fields: Vec::new(),
        }
    }

    pub fn key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_reference(mut self, field: impl Into<String>) -> Self {
        self.set_reference_fields.push(field.into());
        self
    }

    pub fn deduplicates(&self) -> bool {
        !self.key_fields.is_empty()
    }
}

/// Migration configuration
///
/// Loaded from JSON or assembled with the builder methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source table -> destination table, for tables renamed between versions
    #[serde(default)]
    pub table_renames: BTreeMap<String, String>,

    /// Join tables in write order
    #[serde(default = "default_join_tables")]
    pub join_tables: Vec<JoinTableSpec>,

    /// Field transformation rules, keyed by source table
    #[serde(default)]
    pub transform: TransformRules,
}

fn default_join_tables() -> Vec<JoinTableSpec> {
    vec![
        JoinTableSpec::new("eav_entity_type")
            .key(["entity_type_code"])
            .set_reference("default_attribute_set_id"),
        JoinTableSpec::new("eav_attribute_label").key(["attribute_id", "store_id"]),
        JoinTableSpec::new("catalog_eav_attribute").key(["attribute_id"]),
        JoinTableSpec::new("customer_eav_attribute").key(["attribute_id"]),
        JoinTableSpec::new("eav_attribute_option"),
    ]
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            table_renames: BTreeMap::new(),
            join_tables: default_join_tables(),
            transform: TransformRules::default(),
        }
    }
}

impl MigrationConfig {
    /// Configuration with the usual EAV join tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with no join tables at all
    pub fn empty() -> Self {
        Self {
            join_tables: Vec::new(),
            ..Self::default()
        }
    }

    /// Append a join table
    pub fn join_table(mut self, spec: JoinTableSpec) -> Self {
        self.join_tables.push(spec);
        self
    }

    /// Map a source table to a differently named destination table
    pub fn rename_table(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.table_renames.insert(source.into(), destination.into());
        self
    }

    /// Set the field transformation rules
    pub fn transform_rules(mut self, rules: TransformRules) -> Self {
        self.transform = rules;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MigrateError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| MigrateError::Config(format!("Failed to read '{}': {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut destinations: HashSet<String> = eav::TAXONOMY_TABLES
            .iter()
            .map(|table| self.destination_table(table))
            .collect();
        for spec in &self.join_tables {
            if eav::TAXONOMY_TABLES.contains(&spec.name.as_str()) {
                return Err(MigrateError::Config(format!(
                    "'{}' is migrated by a dedicated stage and cannot be a join table",
                    spec.name
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(MigrateError::Config(format!(
                    "Join table '{}' is listed twice",
                    spec.name
                )));
            }
            // each destination table is cleared and written exactly once
            let destination = self.destination_table(&spec.name);
            if !destinations.insert(destination.clone()) {
                return Err(MigrateError::Config(format!(
                    "Join table '{}' writes to '{}', which another table already writes",
                    spec.name, destination
                )));
            }
            let mut fields = HashSet::new();
            if let Some(dup) = spec.key_fields.iter().find(|f| !fields.insert(f.as_str())) {
                return Err(MigrateError::Config(format!(
                    "Key field '{}' repeated for join table '{}'",
                    dup, spec.name
                )));
            }
        }
        Ok(())
    }

    /// Every source table the migration touches, in forward order.
    pub fn source_tables(&self) -> Vec<&str> {
        eav::TAXONOMY_TABLES
            .iter()
            .copied()
            .chain(self.join_tables.iter().map(|spec| spec.name.as_str()))
            .collect()
    }
}

impl TableMapper for MigrationConfig {
    fn destination_table(&self, source_table: &str) -> String {
        self.table_renames
            .get(source_table)
            .cloned()
            .unwrap_or_else(|| source_table.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_join_tables() {
        let config = MigrationConfig::new();
        assert_eq!(config.join_tables.len(), 5);
        assert!(config.validate().is_ok());
        let option = config
            .join_tables
            .iter()
            .find(|spec| spec.name == "eav_attribute_option")
            .unwrap();
        assert!(!option.deduplicates());
    }

    #[test]
    fn test_builder_and_mapper() {
        let config = MigrationConfig::empty()
            .rename_table("eav_attribute_label", "eav_attribute_store_label")
            .join_table(JoinTableSpec::new("eav_attribute_label").key(["attribute_id", "store_id"]));

        assert_eq!(config.destination_table("eav_attribute_label"), "eav_attribute_store_label");
        assert_eq!(config.destination_table("eav_attribute"), "eav_attribute");
        assert_eq!(
            config.source_tables(),
            vec![
                "eav_attribute_set",
                "eav_attribute_group",
                "eav_attribute",
                "eav_entity_attribute",
                "eav_attribute_label",
            ]
        );
    }

    #[test]
    fn test_from_json_defaults_and_overrides() {
        let config = MigrationConfig::from_json_str(r#"{"table_renames": {"eav_attribute": "eav_attr"}}"#).unwrap();
        assert_eq!(config.join_tables.len(), 5);
        assert_eq!(config.destination_table("eav_attribute"), "eav_attr");

        let config = MigrationConfig::from_json_str(
            r#"{"join_tables": [{"name": "eav_attribute_label", "key_fields": ["attribute_id", "store_id"]}],
                "transform": {"eav_attribute": {"ignore": ["attribute_model"]}}}"#,
        )
        .unwrap();
        assert_eq!(config.join_tables.len(), 1);
        assert!(config.transform.get("eav_attribute").unwrap().ignore.contains("attribute_model"));
    }

    #[test]
    fn test_validation_rejects_taxonomy_and_duplicates() {
        let config = MigrationConfig::empty().join_table(JoinTableSpec::new("eav_attribute"));
        assert!(matches!(config.validate(), Err(MigrateError::Config(_))));

        let config = MigrationConfig::empty()
            .join_table(JoinTableSpec::new("eav_attribute_label"))
            .join_table(JoinTableSpec::new("eav_attribute_label"));
        assert!(matches!(config.validate(), Err(MigrateError::Config(_))));

        let config = MigrationConfig::empty()
            .join_table(JoinTableSpec::new("eav_attribute_label").key(["store_id", "store_id"]));
        assert!(matches!(config.validate(), Err(MigrateError::Config(_))));

        assert!(matches!(
            MigrationConfig::from_json_str("{not json"),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn test_validation_rejects_shared_destination_tables() {
        let config = MigrationConfig::empty()
            .rename_table("eav_attribute_label", "eav_attribute_store_label")
            .join_table(JoinTableSpec::new("eav_attribute_label"))
            .join_table(JoinTableSpec::new("eav_attribute_store_label"));
        assert!(matches!(config.validate(), Err(MigrateError::Config(_))));

        let config = MigrationConfig::empty()
            .rename_table("catalog_eav_attribute", "eav_attribute")
            .join_table(JoinTableSpec::new("catalog_eav_attribute"));
        assert!(matches!(config.validate(), Err(MigrateError::Config(_))));

        // a renamed taxonomy table frees its old name
        let config = MigrationConfig::empty()
            .rename_table("eav_attribute", "eav_attr")
            .rename_table("catalog_eav_attribute", "eav_attribute")
            .join_table(JoinTableSpec::new("catalog_eav_attribute"));
        assert!(config.validate().is_ok());

        let config = MigrationConfig::empty()
            .rename_table("eav_attribute_label", "eav_attribute_store_label")
            .join_table(JoinTableSpec::new("eav_attribute_label"));
        assert!(config.validate().is_ok());
    }
}
