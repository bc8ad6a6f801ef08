use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Inconsistent baseline: {0}")]
    InconsistentBaseline(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transform error: {0}")]
    Transform(String),
}

impl MigrateError {
    /// True for failures raised by the record store itself.
    ///
    /// These are surfaced to the caller untouched; recovery is always
    /// `rollback()` followed by a re-run.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::TableExists(_)
                | Self::TableNotFound(_)
                | Self::ColumnNotFound(_, _)
                | Self::TypeMismatch(_)
                | Self::ConstraintViolation(_)
                | Self::Storage(_)
                | Self::IoError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("JSON: {}", err))
    }
}
