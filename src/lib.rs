// ============================================================================
// eav-migrate Library
// ============================================================================

pub mod config;
pub mod core;
pub mod eav;
pub mod migration;
pub mod progress;
pub mod storage;
pub mod transform;

// Re-export main types for convenience
pub use config::{JoinTableSpec, MigrationConfig, TableMapper};
pub use core::{DataType, Id, IdentityKey, MigrateError, Record, Result, RowIntent, TableSchema, Value};
pub use migration::{
    EavMigration, IdentityMap, MigrationOutcome, MigrationReport, TableReport, UnresolvedReference,
};
pub use progress::{LogProgress, ProgressSink, SilentProgress};
pub use storage::{InMemoryStore, RecordStore, SnapshotManager};
pub use transform::{FieldTransformer, MappingTransformer, TableRules, TransformRules};
