use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{ArrayRef, Float64Array, Int64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use ndarray::{ArrayD, Axis};

use crate::{
    element::Element,
    error::{TableError, TableResult},
    frame::DataFrame,
    kind::{ArrayMetadata, ARRAY_METADATA_KEY},
    sparse::SparseMatrix,
};

/// Encodes an element into the record batch written for it.
pub fn encode_element(element: &Element) -> TableResult<RecordBatch> {
    match element {
        Element::DataFrame(frame) => Ok(encode_dataframe(frame)),
        Element::Dense(array) => encode_dense(array),
        Element::Sparse(matrix) => encode_sparse(matrix),
        Element::Table(batch) => Ok(batch.clone()),
    }
}

/// Data frames are written as-is; their `pandas` metadata carries the index.
pub fn encode_dataframe(frame: &DataFrame) -> RecordBatch {
    frame.batch().clone()
}

/// One column per matrix column, named `"0".."n-1"`. 1-D arrays become a
/// single column and record their 1-D shape.
pub fn encode_dense(array: &ArrayD<f64>) -> TableResult<RecordBatch> {
    let columns: Vec<Vec<f64>> = match array.ndim() {
        1 => vec![array.iter().copied().collect()],
        2 => array
            .axis_iter(Axis(1))
            .map(|column| column.iter().copied().collect())
            .collect(),
        ndim => {
            return Err(TableError::UnsupportedArray(format!(
                "cannot store a {}-dimensional array as a table",
                ndim
            )))
        }
    };

    let fields: Vec<Field> = (0..columns.len())
        .map(|j| Field::new(j.to_string(), DataType::Float64, false))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .into_iter()
        .map(|values| Arc::new(Float64Array::from(values)) as ArrayRef)
        .collect();
    let metadata = ArrayMetadata {
        shape: Some(array.shape().to_vec()),
        class: None,
    };
    let schema = Schema::new_with_metadata(fields, array_metadata(&metadata)?);
    let options = RecordBatchOptions::new().with_row_count(Some(array.shape()[0]));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(schema),
        arrays,
        &options,
    )?)
}

/// Coordinate triples plus the shape and class of the matrix.
pub fn encode_sparse(matrix: &SparseMatrix) -> TableResult<RecordBatch> {
    let coo = matrix.to_coo();
    let (rows, cols) = coo.shape();
    let metadata = ArrayMetadata {
        shape: Some(vec![rows, cols]),
        class: Some(matrix.class().class_name()),
    };

    let schema = Schema::new_with_metadata(
        vec![
            Field::new("data", DataType::Float64, false),
            Field::new("row", DataType::Int64, false),
            Field::new("col", DataType::Int64, false),
        ],
        array_metadata(&metadata)?,
    );
    let row: Vec<i64> = coo.row().iter().map(|r| *r as i64).collect();
    let col: Vec<i64> = coo.col().iter().map(|c| *c as i64).collect();
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Float64Array::from(coo.data().to_vec())),
            Arc::new(Int64Array::from(row)),
            Arc::new(Int64Array::from(col)),
        ],
    )?)
}

fn array_metadata(metadata: &ArrayMetadata) -> TableResult<HashMap<String, String>> {
    Ok(HashMap::from([(
        ARRAY_METADATA_KEY.to_string(),
        metadata.to_json()?,
    )]))
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array1};

    use super::*;
    use crate::{element::decode_table, sparse::CooMatrix};

    #[test]
    fn dense_layout() {
        let matrix = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let batch = encode_dense(&matrix).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.schema_ref().field(2).name(), "2");
        assert_eq!(
            batch.schema_ref().metadata().get("array").map(String::as_str),
            Some(r#"{"shape":[2,3]}"#)
        );

        let decoded = decode_table(batch, None).unwrap();
        assert_eq!(decoded.element.as_dense().unwrap(), &matrix);
    }

    #[test]
    fn one_dimensional_arrays_keep_their_shape() {
        let vector = Array1::from(vec![1.0, 2.0, 3.0]).into_dyn();
        let decoded = decode_table(encode_dense(&vector).unwrap(), None).unwrap();
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.element.as_dense().unwrap(), &vector);
    }

    #[test]
    fn sparse_keeps_class_and_entries() {
        let coo = CooMatrix::try_new(vec![0, 2], vec![1, 3], vec![7.0, 8.0], Some((3, 5))).unwrap();
        let matrix = SparseMatrix::Csc(coo.to_csc());
        let decoded = decode_table(encode_sparse(&matrix).unwrap(), None).unwrap();
        match decoded.element {
            Element::Sparse(SparseMatrix::Csc(csc)) => {
                assert_eq!(csc.shape(), (3, 5));
                assert_eq!(csc.get(0, 1), 7.0);
                assert_eq!(csc.get(2, 3), 8.0);
            }
            other => panic!("expected CSC, got {:?}", other),
        }
    }

    #[test]
    fn zero_column_matrix_survives_parquet() {
        let empty = ArrayD::<f64>::zeros(ndarray::IxDyn(&[5, 0]));
        let batch = encode_dense(&empty).unwrap();
        assert_eq!(batch.num_rows(), 5);
        assert_eq!(batch.num_columns(), 0);

        let bytes = crate::codec::write_table(&batch).unwrap();
        let stored =
            crate::codec::read_table(pqdata_object_storage::FileHandle::Buffered(bytes)).unwrap();
        let decoded = decode_table(stored, None).unwrap();
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.element.shape(), vec![5, 0]);
    }

    #[test]
    fn rejects_three_dimensions() {
        let cube = ArrayD::<f64>::zeros(ndarray::IxDyn(&[2, 2, 2]));
        assert!(matches!(
            encode_dense(&cube),
            Err(TableError::UnsupportedArray(_))
        ));
    }
}
