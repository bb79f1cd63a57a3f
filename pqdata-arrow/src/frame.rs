use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, AsArray},
    datatypes::{DataType, Schema},
    record_batch::RecordBatch,
};

use crate::{
    error::{TableError, TableResult},
    kind::PANDAS_METADATA_KEY,
};

/// A row-labeled table.
///
/// The row labels live in a physical index column named by the `pandas`
/// metadata; range indexes carry no column and expose no labels.
#[derive(Debug, Clone)]
pub struct DataFrame {
    batch: RecordBatch,
    index_column: Option<String>,
}

impl DataFrame {
    pub fn new(batch: RecordBatch) -> TableResult<Self> {
        let index_column = pandas_index_columns(batch.schema_ref().metadata())?
            .into_iter()
            .find(|name| batch.schema_ref().index_of(name).is_ok());
        Ok(Self {
            batch,
            index_column,
        })
    }

    /// Uses `column` as row labels and records it in the `pandas` metadata so
    /// the labels survive a write.
    pub fn with_index(batch: RecordBatch, column: &str) -> TableResult<Self> {
        batch
            .schema_ref()
            .index_of(column)
            .map_err(|_| TableError::MissingColumn(column.to_string()))?;

        let mut metadata = batch.schema_ref().metadata().clone();
        metadata.insert(
            PANDAS_METADATA_KEY.to_string(),
            serde_json::json!({ "index_columns": [column] }).to_string(),
        );
        let schema = Arc::new(Schema::new_with_metadata(
            batch.schema_ref().fields().clone(),
            metadata,
        ));
        let batch = batch.with_schema(schema)?;
        Ok(Self {
            batch,
            index_column: Some(column.to_string()),
        })
    }

    /// Builds a frame from named columns and optional row labels.
    pub fn from_columns(
        columns: Vec<(&str, ArrayRef)>,
        index: Option<Vec<String>>,
    ) -> TableResult<Self> {
        const INDEX_COLUMN: &str = "__index_level_0__";

        let mut columns = columns;
        if let Some(labels) = &index {
            columns.push((
                INDEX_COLUMN,
                Arc::new(arrow::array::StringArray::from(labels.clone())) as ArrayRef,
            ));
        }
        let batch = RecordBatch::try_from_iter(columns)?;
        match index {
            Some(_) => Self::with_index(batch, INDEX_COLUMN),
            None => Self::new(batch),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of data columns; the index column is not counted.
    pub fn num_columns(&self) -> usize {
        self.column_names().len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .filter(|name| Some(*name) != self.index_column.as_deref())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    pub fn index_column(&self) -> Option<&str> {
        self.index_column.as_deref()
    }

    /// Row labels rendered as strings. Nulls render as empty strings.
    pub fn index_labels(&self) -> TableResult<Option<Vec<String>>> {
        let Some(column) = self
            .index_column
            .as_deref()
            .and_then(|name| self.batch.column_by_name(name))
        else {
            return Ok(None);
        };
        let labels = arrow::compute::cast(column, &DataType::Utf8)?;
        let labels = labels.as_string::<i32>();
        Ok(Some(
            (0..labels.len())
                .map(|i| {
                    if labels.is_null(i) {
                        String::new()
                    } else {
                        labels.value(i).to_string()
                    }
                })
                .collect(),
        ))
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }
}

/// Physical index column names recorded in the `pandas` metadata.
pub fn pandas_index_columns(metadata: &HashMap<String, String>) -> TableResult<Vec<String>> {
    let Some(raw) = metadata.get(PANDAS_METADATA_KEY) else {
        return Ok(vec![]);
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|source| TableError::InvalidMetadata {
            key: PANDAS_METADATA_KEY,
            source,
        })?;
    Ok(value
        .get("index_columns")
        .and_then(|columns| columns.as_array())
        .map(|columns| {
            columns
                .iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}
