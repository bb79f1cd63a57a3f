//! Columnar leaf codec: parquet tables in and out, plus array-mode decoding
//! of tables into dense arrays, sparse matrices and data frames.

pub mod codec;
pub mod dense;
pub mod element;
pub mod encode;
pub mod error;
pub mod frame;
pub mod kind;
pub mod registry;
pub mod sparse;

pub use codec::{read_metadata, read_schema, read_table, write_table, TableMetadata};
pub use element::{decode_array, decode_table, Decoded, Element};
pub use encode::encode_element;
pub use error::{DecodeWarning, TableError, TableResult};
pub use frame::DataFrame;
pub use kind::{ArrayMetadata, ClassName, TableKind};
pub use registry::SparseClass;
pub use sparse::{CooMatrix, CscMatrix, CsrMatrix, SparseMatrix};
