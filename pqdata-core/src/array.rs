use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use pqdata_arrow::{decode_table, ArrayMetadata, Decoded, TableKind};
use pqdata_config::TABLE_EXTENSIONS;
use pqdata_object_storage::FileSystem;

use crate::error::{PqDataError, Result};

/// A single table file.
///
/// Only the footer is read on construction. Every data or schema access
/// reopens the file.
#[derive(Debug, Clone)]
pub struct ArrayAccessor {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    name: String,
    shape: (usize, usize),
}

impl ArrayAccessor {
    pub fn open(
        fs: Arc<dyn FileSystem>,
        path: impl Into<PathBuf>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let path = path.into();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TABLE_EXTENSIONS.iter().any(|e| *e == ext));
        if !supported {
            return Err(PqDataError::UnsupportedFormat(path));
        }

        let metadata = pqdata_arrow::read_metadata(fs.open(&path)?)?;
        tracing::debug!(
            "Opened table {} with {} rows and {} columns",
            path.display(),
            metadata.num_rows,
            metadata.num_columns
        );
        Ok(Self {
            fs,
            path,
            name: name.into(),
            shape: (metadata.num_rows, metadata.num_columns),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical name from the store root, e.g. `/obsm/X_pca`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows and columns as stored. For coordinate-encoded sparse tables this
    /// is the shape of the triple table, not of the matrix.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Decodes the full table.
    pub fn read(&self) -> Result<RecordBatch> {
        Ok(pqdata_arrow::read_table(self.fs.open(&self.path)?)?)
    }

    /// Decodes the table into an element. The kind is detected from the
    /// table metadata when not given.
    pub fn read_element(&self, kind: Option<TableKind>) -> Result<Decoded> {
        Ok(decode_table(self.read()?, kind)?)
    }

    pub fn schema(&self) -> Result<SchemaRef> {
        Ok(pqdata_arrow::read_schema(self.fs.open(&self.path)?)?)
    }

    /// Column names and types along with the cached shape.
    pub fn describe(&self) -> Result<String> {
        let schema = self.schema()?;
        let columns = schema
            .fields()
            .iter()
            .map(|field| format!("{}:{}", field.name(), field.data_type()))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "ParquetArray({}): shape ({},{}), type ({})",
            self.path.display(),
            self.shape.0,
            self.shape.1,
            columns
        ))
    }

    /// The `array` metadata of the table, if any.
    pub fn attrs(&self) -> Result<Option<ArrayMetadata>> {
        Ok(ArrayMetadata::from_schema(self.schema()?.as_ref())?)
    }
}
