use crate::config::TableMapper;
use crate::core::{Id, Record, Result};
use crate::eav::{attribute, attribute_group, attribute_set};
use crate::storage::RecordStore;
use log::debug;
use std::collections::HashMap;

/// Taxonomy rows as they were before the run touched anything.
///
/// Captured once at the start of a migration and never modified: the
/// source attributes (for cross-schema resolution) and the destination's
/// own sets, groups and attributes (the system-defined rows that must be
/// merged rather than duplicated).
#[derive(Debug, Clone, Default)]
pub struct BaselineSnapshot {
    source_attributes: HashMap<Id, Record>,
    attribute_sets: Vec<Record>,
    attribute_groups: Vec<Record>,
    attributes: Vec<Record>,
}

impl BaselineSnapshot {
    pub fn capture(
        source: &dyn RecordStore,
        destination: &dyn RecordStore,
        mapper: &dyn TableMapper,
    ) -> Result<Self> {
        let source_attributes = source.rows(attribute::TABLE)?;
        let snapshot = Self::from_parts(
            source_attributes,
            destination.rows(&mapper.destination_table(attribute_set::TABLE))?,
            destination.rows(&mapper.destination_table(attribute_group::TABLE))?,
            destination.rows(&mapper.destination_table(attribute::TABLE))?,
        );
        debug!(
            "baseline: {} source attributes, {} sets, {} groups, {} attributes",
            snapshot.source_attributes.len(),
            snapshot.attribute_sets.len(),
            snapshot.attribute_groups.len(),
            snapshot.attributes.len()
        );
        Ok(snapshot)
    }

    pub fn from_parts(
        source_attributes: Vec<Record>,
        attribute_sets: Vec<Record>,
        attribute_groups: Vec<Record>,
        attributes: Vec<Record>,
    ) -> Self {
        let source_attributes = source_attributes
            .into_iter()
            .filter_map(|row| row.id(attribute::ID).map(|id| (id, row)))
            .collect();
        Self {
            source_attributes,
            attribute_sets,
            attribute_groups,
            attributes,
        }
    }

    pub fn source_attribute(&self, id: Id) -> Option<&Record> {
        self.source_attributes.get(&id)
    }

    pub fn attribute_sets(&self) -> &[Record] {
        &self.attribute_sets
    }

    pub fn attribute_groups(&self) -> &[Record] {
        &self.attribute_groups
    }

    pub fn attributes(&self) -> &[Record] {
        &self.attributes
    }
}
