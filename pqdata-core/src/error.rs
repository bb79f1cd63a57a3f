use std::path::PathBuf;

use pqdata_arrow::TableError;
use pqdata_object_storage::StorageError;

pub type Result<T> = std::result::Result<T, PqDataError>;

#[derive(Debug, thiserror::Error)]
pub enum PqDataError {
    #[error("Path {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("Key '{key}' not found in {}", .path.display())]
    KeyNotFound { key: String, path: PathBuf },
    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Malformed metadata in {}: {reason}", .path.display())]
    MalformedMetadata { path: PathBuf, reason: String },
    #[error("Key '{key}' in {} is stored both as .pq and .parquet", .path.display())]
    AmbiguousLeaf { key: String, path: PathBuf },
    #[error("{0} is not implemented, access entries by key instead")]
    NotImplemented(&'static str),
    #[error("Path {} already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error("Nesting below {} exceeds the maximum depth of {max_depth}", .path.display())]
    NestingTooDeep { path: PathBuf, max_depth: usize },
    #[error("Invalid key '{0}'")]
    InvalidKey(String),
    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

impl From<StorageError> for PqDataError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound(path) => PqDataError::NotFound(path),
            other => PqDataError::Storage(other),
        }
    }
}

impl PqDataError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PqDataError::MalformedMetadata {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
