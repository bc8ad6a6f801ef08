//! Table and column names of the EAV taxonomy.
//!
//! These are the source-side (logical) names; the destination names are
//! obtained through a [`crate::config::TableMapper`].

pub mod attribute_set {
    pub const TABLE: &str = "eav_attribute_set";
    pub const ID: &str = "attribute_set_id";
    pub const ENTITY_TYPE_ID: &str = "entity_type_id";
    pub const NAME: &str = "attribute_set_name";

    /// Identity key: (entity type, name)
    pub const KEY: [&str; 2] = [ENTITY_TYPE_ID, NAME];
}

pub mod attribute_group {
    pub const TABLE: &str = "eav_attribute_group";
    pub const ID: &str = "attribute_group_id";
    pub const SET_ID: &str = "attribute_set_id";
    pub const NAME: &str = "attribute_group_name";

    /// Identity key: (owning set, name)
    pub const KEY: [&str; 2] = [SET_ID, NAME];
}

pub mod attribute {
    pub const TABLE: &str = "eav_attribute";
    pub const ID: &str = "attribute_id";
    pub const ENTITY_TYPE_ID: &str = "entity_type_id";
    pub const CODE: &str = "attribute_code";

    /// Identity key: (entity type, business code)
    pub const KEY: [&str; 2] = [ENTITY_TYPE_ID, CODE];
}

pub mod entity_attribute {
    pub const TABLE: &str = "eav_entity_attribute";
    pub const ATTRIBUTE_ID: &str = "attribute_id";
    pub const SET_ID: &str = "attribute_set_id";
    pub const GROUP_ID: &str = "attribute_group_id";
}

/// Field that marks an embedded attribute reference in join tables.
pub const ATTRIBUTE_REFERENCE: &str = attribute::ID;

/// Tables migrated by stages 1-3, in write order.
pub const TAXONOMY_TABLES: [&str; 4] = [
    attribute_set::TABLE,
    attribute_group::TABLE,
    attribute::TABLE,
    entity_attribute::TABLE,
];
