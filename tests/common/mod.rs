//! Shared fixture: a small catalog taxonomy in an older source schema and
//! a destination that already holds its own system-defined rows.
#![allow(dead_code)]

use eav_migrate::core::{Column, DataType};
use eav_migrate::{InMemoryStore, JoinTableSpec, MigrationConfig, Record, TableSchema};

pub fn set(id: i64, entity_type: i64, name: &str) -> Record {
    Record::new()
        .with("attribute_set_id", id)
        .with("entity_type_id", entity_type)
        .with("attribute_set_name", name)
}

pub fn group(id: i64, set: i64, name: &str) -> Record {
    Record::new()
        .with("attribute_group_id", id)
        .with("attribute_set_id", set)
        .with("attribute_group_name", name)
}

pub fn attribute(id: i64, entity_type: i64, code: &str) -> Record {
    Record::new()
        .with("attribute_id", id)
        .with("entity_type_id", entity_type)
        .with("attribute_code", code)
}

pub fn assignment(id: i64, set: i64, group: i64, attribute: i64) -> Record {
    Record::new()
        .with("entity_attribute_id", id)
        .with("entity_type_id", 4)
        .with("attribute_set_id", set)
        .with("attribute_group_id", group)
        .with("attribute_id", attribute)
        .with("sort_order", 1)
}

pub fn label(id: i64, attribute: i64, store: i64, value: &str) -> Record {
    Record::new()
        .with("attribute_label_id", id)
        .with("attribute_id", attribute)
        .with("store_id", store)
        .with("value", value)
}

/// Schemas shared by both sides; the destination's attribute sets carry an
/// extra `foo` column.
pub fn create_tables(store: &mut InMemoryStore, destination: bool) {
    let mut set_columns = vec![
        Column::new("attribute_set_id", DataType::Integer),
        Column::new("entity_type_id", DataType::Integer).not_null(),
        Column::new("attribute_set_name", DataType::Text).not_null(),
    ];
    if destination {
        set_columns.push(Column::new("foo", DataType::Text));
    }
    let schemas = vec![
        TableSchema::new("eav_attribute_set", set_columns).with_primary_key("attribute_set_id"),
        TableSchema::new(
            "eav_attribute_group",
            vec![
                Column::new("attribute_group_id", DataType::Integer),
                Column::new("attribute_set_id", DataType::Integer).not_null(),
                Column::new("attribute_group_name", DataType::Text).not_null(),
            ],
        )
        .with_primary_key("attribute_group_id"),
        TableSchema::new(
            "eav_attribute",
            vec![
                Column::new("attribute_id", DataType::Integer),
                Column::new("entity_type_id", DataType::Integer).not_null(),
                Column::new("attribute_code", DataType::Text).not_null(),
            ],
        )
        .with_primary_key("attribute_id"),
        TableSchema::new(
            "eav_entity_attribute",
            vec![
                Column::new("entity_attribute_id", DataType::Integer),
                Column::new("entity_type_id", DataType::Integer).not_null(),
                Column::new("attribute_set_id", DataType::Integer).not_null(),
                Column::new("attribute_group_id", DataType::Integer).not_null(),
                Column::new("attribute_id", DataType::Integer).not_null(),
                Column::new("sort_order", DataType::Integer),
            ],
        )
        .with_primary_key("entity_attribute_id"),
        TableSchema::new(
            "eav_attribute_label",
            vec![
                Column::new("attribute_label_id", DataType::Integer),
                Column::new("attribute_id", DataType::Integer).not_null(),
                Column::new("store_id", DataType::Integer).not_null(),
                Column::new("value", DataType::Text),
            ],
        )
        .with_primary_key("attribute_label_id"),
    ];
    for schema in schemas {
        store.create_table(schema).unwrap();
    }
}

/// Source rows, all with ids starting at 1.
pub fn source_store() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    create_tables(&mut store, false);
    store
        .insert_records("eav_attribute_set", vec![set(1, 4, "Default"), set(2, 4, "Shoes")])
        .unwrap();
    store
        .insert_records("eav_attribute_group", vec![group(1, 1, "General"), group(2, 2, "General")])
        .unwrap();
    store
        .insert_records("eav_attribute", vec![attribute(1, 4, "name"), attribute(2, 4, "color")])
        .unwrap();
    store
        .insert_records(
            "eav_entity_attribute",
            vec![assignment(1, 1, 1, 1), assignment(2, 2, 2, 2)],
        )
        .unwrap();
    store
        .insert_records("eav_attribute_label", vec![label(1, 2, 1, "Colour")])
        .unwrap();
    store
}

/// Destination baseline:
/// - set 9 shares the source's (4, "Default") key, set 10 is destination-only
/// - group 30 shares (Default, "General"), group 31 is destination-only
/// - attribute 40 shares (4, "name"), attribute 41 is destination-only
/// - assignment 51 and label 61 point at attribute 77, which exists nowhere
pub fn destination_store() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    create_tables(&mut store, true);
    store
        .insert_records(
            "eav_attribute_set",
            vec![set(9, 4, "Default").with("foo", "bar"), set(10, 3, "Default")],
        )
        .unwrap();
    store
        .insert_records(
            "eav_attribute_group",
            vec![group(30, 9, "General"), group(31, 10, "Account")],
        )
        .unwrap();
    store
        .insert_records("eav_attribute", vec![attribute(40, 4, "name"), attribute(41, 3, "email")])
        .unwrap();
    store
        .insert_records(
            "eav_entity_attribute",
            vec![assignment(50, 10, 31, 41), assignment(51, 9, 30, 77)],
        )
        .unwrap();
    store
        .insert_records(
            "eav_attribute_label",
            vec![label(60, 41, 0, "Email"), label(61, 77, 0, "Ghost")],
        )
        .unwrap();
    store
}

pub fn config() -> MigrationConfig {
    MigrationConfig::empty()
        .join_table(JoinTableSpec::new("eav_attribute_label").key(["attribute_id", "store_id"]))
}
