use arrow::{datatypes::DataType, error::ArrowError};
use parquet::errors::ParquetError;
use pqdata_object_storage::StorageError;

pub type TableResult<T> = std::result::Result<T, TableError>;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid '{key}' table metadata: {source}")]
    InvalidMetadata {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Column '{column}' of type {data_type} cannot be read as a numeric array")]
    NonNumericColumn { column: String, data_type: DataType },
    #[error("Missing column '{0}'")]
    MissingColumn(String),
    #[error("Invalid sparse matrix: {0}")]
    InvalidSparse(String),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Unsupported array: {0}")]
    UnsupportedArray(String),
}

/// Non-fatal conditions found while decoding an array-mode table.
///
/// The decoded data is still returned; these are logged and handed back to
/// the caller next to the value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeWarning {
    #[error("Shapes for an array might not have been properly recorded and recovered: declared {declared:?}, decoded {realized:?}")]
    ShapeMismatch {
        declared: Vec<usize>,
        realized: Vec<usize>,
    },
    #[error("Unable to reconstruct sparse class {class}: {reason}. Falling back to COO")]
    ClassReconstruction { class: String, reason: String },
}
