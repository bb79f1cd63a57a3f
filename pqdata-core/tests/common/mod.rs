#![allow(dead_code)]

use std::{collections::HashMap, path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::Schema,
    record_batch::RecordBatch,
};
use ndarray::Array2;
use pqdata_arrow::{encode::encode_dense, write_table, DataFrame};

pub fn matrix(rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(i, j)| (i * cols + j) as f64)
}

pub fn write_batch(path: &Path, batch: &RecordBatch) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, write_table(batch).unwrap()).unwrap();
}

pub fn write_dense(path: &Path, rows: usize, cols: usize) {
    write_batch(path, &encode_dense(&matrix(rows, cols).into_dyn()).unwrap());
}

/// A frame with `rows` labeled rows and one numeric column.
pub fn frame(prefix: &str, rows: usize) -> DataFrame {
    DataFrame::from_columns(
        vec![(
            "n_counts",
            Arc::new(Int64Array::from((0..rows as i64).collect::<Vec<_>>())) as ArrayRef,
        )],
        Some((0..rows).map(|i| format!("{}{}", prefix, i)).collect()),
    )
    .unwrap()
}

pub fn write_frame(path: &Path, prefix: &str, rows: usize) {
    write_batch(path, frame(prefix, rows).batch());
}

pub fn with_metadata(batch: RecordBatch, metadata: &[(&str, &str)]) -> RecordBatch {
    let schema = Arc::new(Schema::new_with_metadata(
        batch.schema_ref().fields().clone(),
        metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    ));
    RecordBatch::try_new(schema, batch.columns().to_vec()).unwrap()
}

pub fn coordinates(row: Vec<i64>, col: Vec<i64>, data: Vec<f64>) -> RecordBatch {
    RecordBatch::try_from_iter(vec![
        ("data", Arc::new(Float64Array::from(data)) as ArrayRef),
        ("row", Arc::new(Int64Array::from(row)) as ArrayRef),
        ("col", Arc::new(Int64Array::from(col)) as ArrayRef),
    ])
    .unwrap()
}

pub fn labels(values: &[&str]) -> RecordBatch {
    RecordBatch::try_from_iter(vec![(
        "label",
        Arc::new(StringArray::from(values.to_vec())) as ArrayRef,
    )])
    .unwrap()
}
