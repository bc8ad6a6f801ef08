//! Old-id -> new-id maps and cross-schema attribute resolution.

use super::baseline::BaselineSnapshot;
use crate::core::{Id, IdentityKey, MigrateError, Record, Result, Value};
use crate::eav;
use log::warn;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    AttributeSet,
    AttributeGroup,
    Attribute,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeSet => write!(f, "attribute set"),
            Self::AttributeGroup => write!(f, "attribute group"),
            Self::Attribute => write!(f, "attribute"),
        }
    }
}

/// Maps a baseline (pre-migration) destination id to the id the same
/// logical row has after its stage wrote the table.
///
/// Built once when a stage finishes and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMap {
    kind: EntityKind,
    entries: HashMap<Id, Id>,
}

impl IdentityMap {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn get(&self, old_id: Id) -> Option<Id> {
        self.entries.get(&old_id).copied()
    }

    /// Looks up a foreign-key value; `None` for null or unmapped ids.
    pub fn resolve(&self, value: &Value) -> Option<Id> {
        value.as_i64().and_then(|old_id| self.get(old_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, Id)> + '_ {
        self.entries.iter().map(|(old, new)| (*old, *new))
    }

    pub(crate) fn record(&mut self, old_id: Id, new_id: Id) {
        self.entries.insert(old_id, new_id);
    }
}

impl FromIterator<(Id, Id)> for IdentityMap {
    /// Collects into an attribute map; mostly useful in tests.
    fn from_iter<I: IntoIterator<Item = (Id, Id)>>(iter: I) -> Self {
        Self {
            kind: EntityKind::Attribute,
            entries: iter.into_iter().collect(),
        }
    }
}

/// A freshly written table indexed by identity key.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    ids: HashMap<IdentityKey, Id>,
}

impl KeyIndex {
    pub fn build<S: AsRef<str>>(rows: &[Record], key_fields: &[S], primary_key: &str) -> Self {
        let mut ids = HashMap::with_capacity(rows.len());
        for row in rows {
            let Some(id) = row.id(primary_key) else {
                continue;
            };
            let key = IdentityKey::of(row, key_fields);
            if ids.contains_key(&key) {
                warn!("identity key {} appears more than once, keeping the first row", key);
                continue;
            }
            ids.insert(key, id);
        }
        Self { ids }
    }

    pub fn id_of(&self, key: &IdentityKey) -> Option<Id> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Matches every baseline row to its newly written counterpart by identity
/// key. A baseline row with no counterpart means the write lost it, which
/// the baseline itself must explain: `InconsistentBaseline`.
pub(crate) fn build_identity_map<S: AsRef<str>>(
    kind: EntityKind,
    baseline: &[Record],
    id_field: &str,
    key_fields: &[S],
    written: &KeyIndex,
) -> Result<IdentityMap> {
    let mut map = IdentityMap::new(kind);
    for row in baseline {
        let old_id = row.id(id_field).ok_or_else(|| {
            MigrateError::InconsistentBaseline(format!("baseline {} without {}", kind, id_field))
        })?;
        let key = IdentityKey::of(row, key_fields);
        let new_id = written.id_of(&key).ok_or_else(|| {
            MigrateError::InconsistentBaseline(format!(
                "baseline {} {} with key {} is missing after migration",
                kind, old_id, key
            ))
        })?;
        map.record(old_id, new_id);
    }
    Ok(map)
}

/// Resolves a source attribute id to the destination's post-merge id.
///
/// First hop: the source attribute's (entity type, code) from the source
/// baseline. Second hop: that key in the freshly written attribute table.
/// `None` when either hop fails; callers drop the reference.
pub fn resolve_attribute_cross_schema(
    baseline: &BaselineSnapshot,
    attributes: &KeyIndex,
    source_attribute_id: &Value,
) -> Option<Id> {
    let source_attribute = baseline.source_attribute(source_attribute_id.as_i64()?)?;
    let key = IdentityKey::of(source_attribute, &eav::attribute::KEY);
    attributes.id_of(&key)
}
