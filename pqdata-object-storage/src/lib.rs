//! Virtual filesystem used by the pqdata navigator and read/write engines.
//!
//! Every backend exposes the same small synchronous surface: existence checks,
//! directory listings, opening a file as a [`FileHandle`], and the handful of
//! mutations the write path needs. Two backends are provided:
//! - [`LocalFileSystem`] for paths on local disk.
//! - [`ObjectStoreFileSystem`] for any [`object_store::ObjectStore`].

use std::{
    fmt::Debug,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use bytes::Bytes;

pub mod error;
pub mod local;
pub mod object;

pub use error::{StorageError, StorageResult};
pub use local::LocalFileSystem;
pub use object::{ObjectStoreFileSystem, RemoteObject};

/// A single entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Synchronous filesystem primitives.
///
/// Implementations must be safe for concurrent independent opens; no
/// coordination between writers is provided.
pub trait FileSystem: Debug + Send + Sync {
    fn exists(&self, path: &Path) -> StorageResult<bool>;

    fn is_dir(&self, path: &Path) -> StorageResult<bool>;

    /// Opens a file for reading. Fails with [`StorageError::NotFound`] when the
    /// path does not exist (anymore).
    fn open(&self, path: &Path) -> StorageResult<FileHandle>;

    /// Lists the immediate children of a directory, sorted by name.
    fn list(&self, path: &Path) -> StorageResult<Vec<DirEntry>>;

    fn write(&self, path: &Path, contents: Bytes) -> StorageResult<()>;

    fn create_dir_all(&self, path: &Path) -> StorageResult<()>;

    /// Removes a directory tree or a single file.
    fn remove_dir_all(&self, path: &Path) -> StorageResult<()>;
}

/// An opened file.
///
/// Local and remote files are read on demand, one range at a time.
#[derive(Debug)]
pub enum FileHandle {
    Local(std::fs::File),
    Buffered(Bytes),
    Remote(RemoteObject),
}

impl FileHandle {
    /// Size of the file in bytes.
    pub fn size(&self) -> std::io::Result<u64> {
        match self {
            FileHandle::Local(file) => Ok(file.metadata()?.len()),
            FileHandle::Buffered(bytes) => Ok(bytes.len() as u64),
            FileHandle::Remote(object) => Ok(object.size()),
        }
    }

    /// Returns a reader positioned at `start`.
    pub fn reader_at(&self, start: u64) -> std::io::Result<Box<dyn Read + Send>> {
        match self {
            FileHandle::Local(file) => {
                let mut file = file.try_clone()?;
                file.seek(SeekFrom::Start(start))?;
                Ok(Box::new(BufReader::new(file)))
            }
            FileHandle::Buffered(bytes) => {
                let start = usize::try_from(start)
                    .ok()
                    .filter(|start| *start <= bytes.len())
                    .ok_or_else(|| out_of_range(start, bytes.len() as u64))?;
                Ok(Box::new(std::io::Cursor::new(bytes.slice(start..))))
            }
            FileHandle::Remote(object) => Ok(Box::new(object.reader_at(start)?)),
        }
    }

    /// Reads exactly `length` bytes starting at `start`.
    pub fn read_range(&self, start: u64, length: usize) -> std::io::Result<Bytes> {
        match self {
            FileHandle::Local(file) => {
                let mut file = file.try_clone()?;
                file.seek(SeekFrom::Start(start))?;
                let mut buffer = vec![0u8; length];
                file.read_exact(&mut buffer)?;
                Ok(Bytes::from(buffer))
            }
            FileHandle::Buffered(bytes) => {
                let start = start as usize;
                let end = start
                    .checked_add(length)
                    .filter(|end| *end <= bytes.len())
                    .ok_or_else(|| out_of_range(start.saturating_add(length) as u64, bytes.len() as u64))?;
                Ok(bytes.slice(start..end))
            }
            FileHandle::Remote(object) => object.read_range(start, length),
        }
    }
}

pub(crate) fn out_of_range(requested: u64, size: u64) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("requested offset {} exceeds file size {}", requested, size),
    )
}
