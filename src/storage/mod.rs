pub mod engine;
pub mod memory;
pub mod persistence;
pub mod table;

pub use engine::RecordStore;
pub use memory::InMemoryStore;
pub use persistence::{SnapshotManager, StoreSnapshot};
pub use table::Table;
