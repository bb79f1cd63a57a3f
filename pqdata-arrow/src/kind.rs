use std::{collections::HashMap, fmt::Display, str::FromStr};

use arrow::datatypes::Schema;
use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableResult};

/// Schema metadata key flagging an array-mode table.
pub const ARRAY_METADATA_KEY: &str = "array";
/// Schema metadata key written by pandas. Its presence flags a data frame.
pub const PANDAS_METADATA_KEY: &str = "pandas";

/// Decoding strategy for a leaf table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    DataFrame,
    Array,
    /// Undecoded Arrow table.
    Raw,
}

impl TableKind {
    /// Picks a kind from the side-channel metadata only. Column names are
    /// never looked at here.
    pub fn detect(schema: &Schema) -> Self {
        let metadata = schema.metadata();
        if metadata.is_empty() {
            TableKind::DataFrame
        } else if metadata.contains_key(ARRAY_METADATA_KEY) {
            TableKind::Array
        } else if metadata.contains_key(PANDAS_METADATA_KEY) {
            TableKind::DataFrame
        } else {
            TableKind::Raw
        }
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dataframe" | "frame" => Ok(TableKind::DataFrame),
            "array" => Ok(TableKind::Array),
            "raw" | "table" => Ok(TableKind::Raw),
            other => Err(format!("Unknown table kind: {}", other)),
        }
    }
}

impl Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::DataFrame => write!(f, "dataframe"),
            TableKind::Array => write!(f, "array"),
            TableKind::Raw => write!(f, "raw"),
        }
    }
}

/// Fully qualified name of the in-memory class a table was written from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassName {
    pub module: String,
    pub name: String,
}

impl Display for ClassName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Contents of the `array` side-channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassName>,
}

impl ArrayMetadata {
    pub fn from_schema(schema: &Schema) -> TableResult<Option<Self>> {
        Self::from_metadata(schema.metadata())
    }

    pub fn from_metadata(metadata: &HashMap<String, String>) -> TableResult<Option<Self>> {
        metadata
            .get(ARRAY_METADATA_KEY)
            .map(|raw| {
                serde_json::from_str(raw).map_err(|source| TableError::InvalidMetadata {
                    key: ARRAY_METADATA_KEY,
                    source,
                })
            })
            .transpose()
    }

    pub fn to_json(&self) -> TableResult<String> {
        serde_json::to_string(self).map_err(|source| TableError::InvalidMetadata {
            key: ARRAY_METADATA_KEY,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::{DataType, Field};

    use super::*;

    fn schema_with(metadata: &[(&str, &str)]) -> Schema {
        Schema::new_with_metadata(
            vec![Field::new("0", DataType::Float64, false)],
            metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn detects_kind_from_metadata() {
        assert_eq!(TableKind::detect(&schema_with(&[])), TableKind::DataFrame);
        assert_eq!(
            TableKind::detect(&schema_with(&[("array", "{}")])),
            TableKind::Array
        );
        assert_eq!(
            TableKind::detect(&schema_with(&[("pandas", "{}")])),
            TableKind::DataFrame
        );
        assert_eq!(
            TableKind::detect(&schema_with(&[("origin", "elsewhere")])),
            TableKind::Raw
        );
    }

    #[test]
    fn column_names_do_not_influence_detection() {
        let schema = Schema::new(vec![
            Field::new("data", DataType::Float64, false),
            Field::new("row", DataType::Int64, false),
            Field::new("col", DataType::Int64, false),
        ]);
        assert_eq!(TableKind::detect(&schema), TableKind::DataFrame);
    }

    #[test]
    fn parses_array_metadata() {
        let schema = schema_with(&[(
            "array",
            r#"{"shape": [50, 20], "class": {"module": "scipy.sparse", "name": "csr_matrix"}}"#,
        )]);
        let metadata = ArrayMetadata::from_schema(&schema).unwrap().unwrap();
        assert_eq!(metadata.shape, Some(vec![50, 20]));
        assert_eq!(metadata.class.unwrap().to_string(), "scipy.sparse.csr_matrix");

        let invalid = schema_with(&[("array", "{not json")]);
        assert!(matches!(
            ArrayMetadata::from_schema(&invalid),
            Err(TableError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!("array".parse::<TableKind>().unwrap(), TableKind::Array);
        assert_eq!("DataFrame".parse::<TableKind>().unwrap(), TableKind::DataFrame);
        assert!("polars".parse::<TableKind>().is_err());
    }
}
