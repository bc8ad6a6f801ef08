//! Store snapshots on disk: the whole [`InMemoryStore`], backups included,
//! as one JSON document.

use super::{InMemoryStore, RecordStore};
use crate::core::{MigrateError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub metadata: SnapshotMetadata,
    pub store: InMemoryStore,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub saved_at: DateTime<Utc>,
    pub row_count: usize,
    pub table_count: usize,
    pub backup_count: usize,
}

impl StoreSnapshot {
    pub fn new(store: InMemoryStore) -> Self {
        let metadata = SnapshotMetadata {
            saved_at: Utc::now(),
            row_count: store.total_rows(),
            table_count: store.table_names().len(),
            backup_count: store.backup_count(),
        };
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            metadata,
            store,
        }
    }
}

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Writes through a temp file in the same directory, then renames it
    /// over the target.
    pub fn save(&self, store: &InMemoryStore) -> Result<()> {
        let parent = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|e| MigrateError::IoError(format!("Failed to create snapshot directory: {}", e)))?;

        let snapshot = StoreSnapshot::new(store.clone());
        let temp = NamedTempFile::new_in(&parent)
            .map_err(|e| MigrateError::IoError(format!("Failed to create temp file: {}", e)))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, &snapshot)?;
            writer
                .flush()
                .map_err(|e| MigrateError::IoError(format!("Failed to flush snapshot: {}", e)))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| MigrateError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| MigrateError::IoError(format!("Failed to rename snapshot: {}", e)))?;
        Ok(())
    }

    /// Loads the store. Accepts either a full snapshot or a bare store
    /// document (`{"tables": {...}}`), which is how fixtures are usually
    /// written by hand.
    pub fn load(&self) -> Result<InMemoryStore> {
        let file = File::open(&self.snapshot_path).map_err(|e| {
            MigrateError::IoError(format!(
                "Failed to open '{}': {}",
                self.snapshot_path.display(),
                e
            ))
        })?;
        let document: serde_json::Value = serde_json::from_reader(BufReader::new(file))?;

        if document.get("store").is_some() {
            let snapshot: StoreSnapshot = serde_json::from_value(document)?;
            if snapshot.version > SNAPSHOT_FORMAT_VERSION {
                return Err(MigrateError::Storage(format!(
                    "Snapshot format {} is newer than supported {}",
                    snapshot.version, SNAPSHOT_FORMAT_VERSION
                )));
            }
            return Ok(snapshot.store);
        }

        Ok(serde_json::from_value(document)?)
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }
}
