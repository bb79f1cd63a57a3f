//! Hierarchical storage of annotated data matrices as directories of parquet
//! tables and structured-text metadata.
//!
//! [`open_storage`] gives lazy key-by-key access to a store through [`Group`].
//! [`read_anndata`] and [`read_mudata`] reconstruct a whole object eagerly,
//! [`write_anndata`] and [`write_mudata`] store one.

use std::{path::Path, sync::Arc};

use pqdata_arrow::{Decoded, TableKind};
use pqdata_object_storage::{FileSystem, LocalFileSystem};

pub mod anndata;
pub mod array;
pub mod error;
pub mod group;
pub mod manifest;
pub mod read;
pub mod sidecar;
pub mod write;

pub use anndata::{AnnData, AxisCollection, MuData, Uns, UnsValue};
pub use array::ArrayAccessor;
pub use error::{PqDataError, Result};
pub use group::{Entry, Group, NodeKind};
pub use manifest::Manifest;
pub use read::ReadOptions;
pub use sidecar::Mapping;

/// Opens a store on local disk.
pub fn open_storage(path: impl AsRef<Path>) -> Result<Group> {
    open_storage_with(Arc::new(LocalFileSystem), path)
}

/// Opens a store on any filesystem backend.
pub fn open_storage_with(fs: Arc<dyn FileSystem>, path: impl AsRef<Path>) -> Result<Group> {
    Group::open(fs, path.as_ref())
}

/// Decodes a single table file on local disk.
pub fn read_table(path: impl AsRef<Path>, kind: Option<TableKind>) -> Result<Decoded> {
    read::read_table(&LocalFileSystem, path.as_ref(), kind)
}

pub fn read_anndata(path: impl AsRef<Path>) -> Result<AnnData> {
    read_anndata_with(&LocalFileSystem, path)
}

pub fn read_anndata_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<AnnData> {
    read::read_anndata(fs, path.as_ref(), ReadOptions::default())
}

/// Reads a multi-modal container. Modalities follow the order recorded in
/// the manifest when it covers all of them.
pub fn read_mudata(path: impl AsRef<Path>) -> Result<MuData> {
    read_mudata_with(&LocalFileSystem, path)
}

pub fn read_mudata_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<MuData> {
    read::read_anndata(fs, path.as_ref(), ReadOptions::default())
}

pub fn write_anndata(data: &AnnData, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
    write_anndata_with(&LocalFileSystem, data, path, overwrite)
}

pub fn write_anndata_with(
    fs: &dyn FileSystem,
    data: &AnnData,
    path: impl AsRef<Path>,
    overwrite: bool,
) -> Result<()> {
    write::write_anndata(
        fs,
        data,
        path.as_ref(),
        overwrite,
        pqdata_config::CONFIG.max_nesting_depth,
    )
}

pub fn write_mudata(data: &MuData, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
    write_mudata_with(&LocalFileSystem, data, path, overwrite)
}

pub fn write_mudata_with(
    fs: &dyn FileSystem,
    data: &MuData,
    path: impl AsRef<Path>,
    overwrite: bool,
) -> Result<()> {
    write_anndata_with(fs, data, path, overwrite)
}
