use std::collections::HashSet;

use arrow::{datatypes::Schema, record_batch::RecordBatch};
use ndarray::{Array2, ArrayD, Axis, IxDyn};

use crate::{
    dense::{decode_dense, index_column, numeric_column},
    error::{DecodeWarning, TableError, TableResult},
    frame::{pandas_index_columns, DataFrame},
    kind::{ArrayMetadata, TableKind},
    registry::SparseClass,
    sparse::{CooMatrix, SparseMatrix},
};

/// Column names of a coordinate-encoded sparse table.
pub const COORDINATE_COLUMNS: [&str; 3] = ["data", "row", "col"];

/// A decoded leaf table.
#[derive(Debug, Clone)]
pub enum Element {
    DataFrame(DataFrame),
    Dense(ArrayD<f64>),
    Sparse(SparseMatrix),
    Table(RecordBatch),
}

impl Element {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Element::DataFrame(frame) => vec![frame.num_rows(), frame.num_columns()],
            Element::Dense(array) => array.shape().to_vec(),
            Element::Sparse(matrix) => {
                let (rows, cols) = matrix.shape();
                vec![rows, cols]
            }
            Element::Table(batch) => vec![batch.num_rows(), batch.num_columns()],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Element::DataFrame(_) => "dataframe",
            Element::Dense(_) => "dense",
            Element::Sparse(_) => "sparse",
            Element::Table(_) => "table",
        }
    }

    pub fn as_dense(&self) -> Option<&ArrayD<f64>> {
        match self {
            Element::Dense(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&SparseMatrix> {
        match self {
            Element::Sparse(matrix) => Some(matrix),
            _ => None,
        }
    }

    pub fn as_dataframe(&self) -> Option<&DataFrame> {
        match self {
            Element::DataFrame(frame) => Some(frame),
            _ => None,
        }
    }
}

impl From<ArrayD<f64>> for Element {
    fn from(value: ArrayD<f64>) -> Self {
        Element::Dense(value)
    }
}

impl From<Array2<f64>> for Element {
    fn from(value: Array2<f64>) -> Self {
        Element::Dense(value.into_dyn())
    }
}

impl From<SparseMatrix> for Element {
    fn from(value: SparseMatrix) -> Self {
        Element::Sparse(value)
    }
}

impl From<DataFrame> for Element {
    fn from(value: DataFrame) -> Self {
        Element::DataFrame(value)
    }
}

/// A decoded element together with the non-fatal warnings raised on the way.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub element: Element,
    pub warnings: Vec<DecodeWarning>,
}

impl Decoded {
    fn new(element: Element) -> Self {
        Self {
            element,
            warnings: vec![],
        }
    }

    fn warn(&mut self, warning: DecodeWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Decodes a table. Without an explicit kind, the kind is detected from the
/// schema metadata.
pub fn decode_table(batch: RecordBatch, kind: Option<TableKind>) -> TableResult<Decoded> {
    let kind = kind.unwrap_or_else(|| TableKind::detect(batch.schema_ref()));
    match kind {
        TableKind::DataFrame => Ok(Decoded::new(Element::DataFrame(DataFrame::new(batch)?))),
        TableKind::Array => decode_array(batch),
        TableKind::Raw => Ok(Decoded::new(Element::Table(batch))),
    }
}

/// True when the columns are exactly `data`, `row` and `col`.
pub fn is_coordinate_table(schema: &Schema) -> bool {
    let names: HashSet<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    schema.fields().len() == COORDINATE_COLUMNS.len()
        && COORDINATE_COLUMNS.iter().all(|c| names.contains(c))
}

/// Array-mode decoding: coordinate tables become sparse matrices, anything
/// else a dense `f64` array.
pub fn decode_array(batch: RecordBatch) -> TableResult<Decoded> {
    let metadata = ArrayMetadata::from_schema(batch.schema_ref())?.unwrap_or_default();
    if is_coordinate_table(batch.schema_ref()) {
        decode_sparse(&batch, metadata)
    } else {
        decode_dense_array(batch, metadata)
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> TableResult<&'a arrow::array::ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| TableError::MissingColumn(name.to_string()))
}

fn decode_sparse(batch: &RecordBatch, metadata: ArrayMetadata) -> TableResult<Decoded> {
    let (shape, unusable_shape) = match metadata.shape {
        Some(declared) => match declared.as_slice() {
            [rows, cols] => (Some((*rows, *cols)), None),
            _ => (None, Some(declared)),
        },
        None => (None, None),
    };

    let row = index_column("row", column(batch, "row")?)?;
    let col = index_column("col", column(batch, "col")?)?;
    let data = numeric_column("data", column(batch, "data")?)?
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    let coo = CooMatrix::try_new(row, col, data, shape)?;

    let mut decoded = match metadata.class {
        Some(class) => match SparseClass::resolve(&class) {
            Ok(sparse_class) => Decoded::new(Element::Sparse(sparse_class.convert(coo))),
            Err(reason) => {
                let mut decoded = Decoded::new(Element::Sparse(SparseMatrix::Coo(coo)));
                decoded.warn(DecodeWarning::ClassReconstruction {
                    class: class.to_string(),
                    reason,
                });
                decoded
            }
        },
        None => Decoded::new(Element::Sparse(SparseMatrix::Coo(coo))),
    };

    if let Some(declared) = unusable_shape {
        let realized = decoded.element.shape();
        decoded.warn(DecodeWarning::ShapeMismatch { declared, realized });
    }
    Ok(decoded)
}

fn decode_dense_array(batch: RecordBatch, metadata: ArrayMetadata) -> TableResult<Decoded> {
    let index_columns = pandas_index_columns(batch.schema_ref().metadata())?;
    let batch = if index_columns.is_empty() {
        batch
    } else {
        let keep: Vec<usize> = batch
            .schema_ref()
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !index_columns.contains(f.name()))
            .map(|(i, _)| i)
            .collect();
        batch.project(&keep)?
    };

    let mut array = decode_dense(&batch)?.into_dyn();
    // A table without columns stores no row count; the declared shape has it.
    if let (0, Some(&[rows, 0])) = (batch.num_columns(), metadata.shape.as_deref()) {
        array = ArrayD::zeros(IxDyn(&[rows, 0]));
    }
    let mut warnings = vec![];
    if let Some(declared) = metadata.shape {
        if declared.len() == 1 && array.ndim() == 2 && array.shape()[1] == 1 {
            array = array.index_axis_move(Axis(1), 0);
        }
        if array.shape() != declared.as_slice() {
            warnings.push(DecodeWarning::ShapeMismatch {
                declared,
                realized: array.shape().to_vec(),
            });
        }
    }

    let mut decoded = Decoded::new(Element::Dense(array));
    for warning in warnings {
        decoded.warn(warning);
    }
    Ok(decoded)
}
