use arrow::{
    array::{ArrayRef, AsArray, Float64Array},
    datatypes::{DataType, Float64Type},
    record_batch::RecordBatch,
};
use ndarray::Array2;

use crate::error::{TableError, TableResult};

/// Reads every column of `batch` as one column of a `rows x columns` matrix.
/// Nulls become NaN.
pub fn decode_dense(batch: &RecordBatch) -> TableResult<Array2<f64>> {
    let mut matrix = Array2::<f64>::zeros((batch.num_rows(), batch.num_columns()));
    for (j, (field, column)) in batch
        .schema_ref()
        .fields()
        .iter()
        .zip(batch.columns())
        .enumerate()
    {
        let values = numeric_column(field.name(), column)?;
        for (i, value) in values.iter().enumerate() {
            matrix[[i, j]] = value.unwrap_or(f64::NAN);
        }
    }
    Ok(matrix)
}

/// Casts a numeric or boolean column to `f64`.
pub(crate) fn numeric_column(name: &str, column: &ArrayRef) -> TableResult<Float64Array> {
    let data_type = column.data_type();
    if !(data_type.is_numeric() || matches!(data_type, DataType::Boolean | DataType::Null)) {
        return Err(TableError::NonNumericColumn {
            column: name.to_string(),
            data_type: data_type.clone(),
        });
    }
    let values = arrow::compute::cast(column, &DataType::Float64)?;
    Ok(values.as_primitive::<Float64Type>().clone())
}

/// Casts an integer column to indices. Negative or null entries are rejected.
pub(crate) fn index_column(name: &str, column: &ArrayRef) -> TableResult<Vec<usize>> {
    if !column.data_type().is_integer() {
        return Err(TableError::InvalidSparse(format!(
            "index column '{}' has non-integer type {}",
            name,
            column.data_type()
        )));
    }
    let values = arrow::compute::cast(column, &DataType::UInt64)?;
    values
        .as_primitive::<arrow::datatypes::UInt64Type>()
        .iter()
        .map(|value| {
            value.map(|v| v as usize).ok_or_else(|| {
                TableError::InvalidSparse(format!(
                    "index column '{}' contains null or negative entries",
                    name
                ))
            })
        })
        .collect()
}
