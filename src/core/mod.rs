pub mod error;
pub mod types;
pub mod value;

pub use error::{MigrateError, Result};
pub use types::{Column, Id, IdentityKey, Record, RowIntent, TableSchema};
pub use value::{DataType, Value};
