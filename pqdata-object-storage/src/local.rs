use std::path::Path;

use bytes::Bytes;

use crate::{DirEntry, FileHandle, FileSystem, StorageError, StorageResult};

/// Filesystem backed by the local disk through `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> StorageResult<bool> {
        path.try_exists().map_err(|e| StorageError::io(path, e))
    }

    fn is_dir(&self, path: &Path) -> StorageResult<bool> {
        match std::fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn open(&self, path: &Path) -> StorageResult<FileHandle> {
        let file = std::fs::File::open(path).map_err(|e| StorageError::io(path, e))?;
        Ok(FileHandle::Local(file))
    }

    fn list(&self, path: &Path) -> StorageResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path).map_err(|e| StorageError::io(path, e))? {
            let entry = entry.map_err(|e| StorageError::io(path, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| StorageError::io(&entry.path(), e))?
                .is_dir();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn write(&self, path: &Path, contents: Bytes) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        std::fs::write(path, &contents).map_err(|e| StorageError::io(path, e))
    }

    fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        std::fs::create_dir_all(path).map_err(|e| StorageError::io(path, e))
    }

    fn remove_dir_all(&self, path: &Path) -> StorageResult<()> {
        if path.is_dir() {
            std::fs::remove_dir_all(path).map_err(|e| StorageError::io(path, e))
        } else {
            std::fs::remove_file(path).map_err(|e| StorageError::io(path, e))
        }
    }
}
