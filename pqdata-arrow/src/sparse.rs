//! Sparse matrices reconstructed from coordinate-encoded tables.
//!
//! Coordinate tables map onto [`CooMatrix`]; the compressed formats are
//! produced by conversion and sum duplicate coordinates on the way.

use ndarray::Array2;

use crate::{
    error::{TableError, TableResult},
    registry::SparseClass,
};

/// Coordinate format: parallel `row`, `col` and `data` vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct CooMatrix {
    shape: (usize, usize),
    row: Vec<usize>,
    col: Vec<usize>,
    data: Vec<f64>,
}

impl CooMatrix {
    /// Builds a COO matrix. Without an explicit shape, the shape is inferred
    /// from the largest indices.
    pub fn try_new(
        row: Vec<usize>,
        col: Vec<usize>,
        data: Vec<f64>,
        shape: Option<(usize, usize)>,
    ) -> TableResult<Self> {
        if row.len() != data.len() || col.len() != data.len() {
            return Err(TableError::InvalidSparse(format!(
                "row ({}), col ({}) and data ({}) lengths differ",
                row.len(),
                col.len(),
                data.len()
            )));
        }

        let inferred = (
            row.iter().max().map_or(0, |r| r + 1),
            col.iter().max().map_or(0, |c| c + 1),
        );
        let shape = match shape {
            Some(shape) if shape.0 < inferred.0 || shape.1 < inferred.1 => {
                return Err(TableError::InvalidSparse(format!(
                    "indices up to {:?} do not fit shape {:?}",
                    (inferred.0.saturating_sub(1), inferred.1.saturating_sub(1)),
                    shape
                )));
            }
            Some(shape) => shape,
            None => inferred,
        };

        Ok(Self {
            shape,
            row,
            col,
            data,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Number of stored entries, duplicates included.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn row(&self) -> &[usize] {
        &self.row
    }

    pub fn col(&self) -> &[usize] {
        &self.col
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.row
            .iter()
            .zip(self.col.iter())
            .zip(self.data.iter())
            .map(|((r, c), v)| (*r, *c, *v))
    }

    /// Value at `(row, col)`, duplicates summed.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.triplets()
            .filter(|(r, c, _)| *r == row && *c == col)
            .map(|(_, _, v)| v)
            .sum()
    }

    pub fn to_csr(&self) -> CsrMatrix {
        CsrMatrix {
            inner: Compressed::build(
                self.shape.0,
                self.shape.1,
                &self.row,
                &self.col,
                &self.data,
            ),
        }
    }

    pub fn to_csc(&self) -> CscMatrix {
        CscMatrix {
            inner: Compressed::build(
                self.shape.1,
                self.shape.0,
                &self.col,
                &self.row,
                &self.data,
            ),
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros(self.shape);
        for (r, c, v) in self.triplets() {
            dense[[r, c]] += v;
        }
        dense
    }
}

/// Shared storage of the compressed formats, indexed by (major, minor).
#[derive(Debug, Clone, PartialEq)]
struct Compressed {
    n_major: usize,
    n_minor: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl Compressed {
    fn build(
        n_major: usize,
        n_minor: usize,
        major: &[usize],
        minor: &[usize],
        values: &[f64],
    ) -> Self {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by_key(|&i| (major[i], minor[i]));

        let mut indptr = vec![0usize; n_major + 1];
        let mut indices = Vec::with_capacity(order.len());
        let mut data: Vec<f64> = Vec::with_capacity(order.len());
        let mut last = None;
        for i in order {
            let key = (major[i], minor[i]);
            if last == Some(key) {
                if let Some(value) = data.last_mut() {
                    *value += values[i];
                }
                continue;
            }
            last = Some(key);
            indices.push(minor[i]);
            data.push(values[i]);
            indptr[major[i] + 1] += 1;
        }
        for m in 0..n_major {
            indptr[m + 1] += indptr[m];
        }

        Self {
            n_major,
            n_minor,
            indptr,
            indices,
            data,
        }
    }

    fn get(&self, major: usize, minor: usize) -> f64 {
        if major >= self.n_major {
            return 0.0;
        }
        let (start, end) = (self.indptr[major], self.indptr[major + 1]);
        match self.indices[start..end].binary_search(&minor) {
            Ok(offset) => self.data[start + offset],
            Err(_) => 0.0,
        }
    }

    fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n_major).flat_map(move |major| {
            (self.indptr[major]..self.indptr[major + 1])
                .map(move |i| (major, self.indices[i], self.data[i]))
        })
    }
}

/// Compressed sparse row format.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    inner: Compressed,
}

impl CsrMatrix {
    pub fn shape(&self) -> (usize, usize) {
        (self.inner.n_major, self.inner.n_minor)
    }

    pub fn nnz(&self) -> usize {
        self.inner.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.inner.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.inner.indices
    }

    pub fn data(&self) -> &[f64] {
        &self.inner.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner.get(row, col)
    }

    pub fn to_coo(&self) -> CooMatrix {
        let (row, (col, data)): (Vec<usize>, (Vec<usize>, Vec<f64>)) = self
            .inner
            .entries()
            .map(|(r, c, v)| (r, (c, v)))
            .unzip();
        CooMatrix {
            shape: self.shape(),
            row,
            col,
            data,
        }
    }
}

/// Compressed sparse column format.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix {
    inner: Compressed,
}

impl CscMatrix {
    pub fn shape(&self) -> (usize, usize) {
        (self.inner.n_minor, self.inner.n_major)
    }

    pub fn nnz(&self) -> usize {
        self.inner.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.inner.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.inner.indices
    }

    pub fn data(&self) -> &[f64] {
        &self.inner.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner.get(col, row)
    }

    pub fn to_coo(&self) -> CooMatrix {
        let (row, (col, data)): (Vec<usize>, (Vec<usize>, Vec<f64>)) = self
            .inner
            .entries()
            .map(|(c, r, v)| (r, (c, v)))
            .unzip();
        CooMatrix {
            shape: self.shape(),
            row,
            col,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SparseMatrix {
    Coo(CooMatrix),
    Csr(CsrMatrix),
    Csc(CscMatrix),
}

impl SparseMatrix {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            SparseMatrix::Coo(m) => m.shape(),
            SparseMatrix::Csr(m) => m.shape(),
            SparseMatrix::Csc(m) => m.shape(),
        }
    }

    pub fn nnz(&self) -> usize {
        match self {
            SparseMatrix::Coo(m) => m.nnz(),
            SparseMatrix::Csr(m) => m.nnz(),
            SparseMatrix::Csc(m) => m.nnz(),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            SparseMatrix::Coo(m) => m.get(row, col),
            SparseMatrix::Csr(m) => m.get(row, col),
            SparseMatrix::Csc(m) => m.get(row, col),
        }
    }

    pub fn class(&self) -> SparseClass {
        match self {
            SparseMatrix::Coo(_) => SparseClass::Coo,
            SparseMatrix::Csr(_) => SparseClass::Csr,
            SparseMatrix::Csc(_) => SparseClass::Csc,
        }
    }

    pub fn to_coo(&self) -> CooMatrix {
        match self {
            SparseMatrix::Coo(m) => m.clone(),
            SparseMatrix::Csr(m) => m.to_coo(),
            SparseMatrix::Csc(m) => m.to_coo(),
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        self.to_coo().to_dense()
    }
}

impl From<CooMatrix> for SparseMatrix {
    fn from(value: CooMatrix) -> Self {
        SparseMatrix::Coo(value)
    }
}

impl From<CsrMatrix> for SparseMatrix {
    fn from(value: CsrMatrix) -> Self {
        SparseMatrix::Csr(value)
    }
}

impl From<CscMatrix> for SparseMatrix {
    fn from(value: CscMatrix) -> Self {
        SparseMatrix::Csc(value)
    }
}
