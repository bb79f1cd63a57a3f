use std::{
    io::Read,
    path::{Component, Path},
    sync::Arc,
};

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::ObjectStore;

use crate::{out_of_range, DirEntry, FileHandle, FileSystem, StorageError, StorageResult};

/// Filesystem view over an [`ObjectStore`].
///
/// Directories are implicit: a path is a directory when at least one object
/// lives below it. Calls drive the store futures on a private runtime, so this
/// type must not be used from inside another tokio runtime.
#[derive(Debug)]
pub struct ObjectStoreFileSystem {
    store: Arc<dyn ObjectStore>,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl ObjectStoreFileSystem {
    pub fn new(store: Arc<dyn ObjectStore>) -> StorageResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("pqdata-object-store")
            .enable_all()
            .build()
            .map_err(|e| {
                StorageError::InitializationError(format!(
                    "Failed to build object store runtime: {}",
                    e
                ))
            })?;
        Ok(Self {
            store,
            runtime: Arc::new(runtime),
        })
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    fn location(path: &Path) -> StorageResult<object_store::path::Path> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(
                    part.to_str()
                        .ok_or_else(|| StorageError::InvalidPath(path.to_path_buf()))?,
                ),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidPath(path.to_path_buf()))
                }
            }
        }
        Ok(object_store::path::Path::from_iter(parts))
    }

    async fn has_children(&self, location: &object_store::path::Path) -> StorageResult<bool> {
        let listing = self.store.list_with_delimiter(prefix(location)).await?;
        Ok(!listing.objects.is_empty() || !listing.common_prefixes.is_empty())
    }

    async fn is_object(&self, location: &object_store::path::Path) -> StorageResult<bool> {
        if location.as_ref().is_empty() {
            return Ok(false);
        }
        match self.store.head(location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// An object opened for ranged reads. Only the requested byte ranges are
/// fetched from the store.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    store: Arc<dyn ObjectStore>,
    runtime: Arc<tokio::runtime::Runtime>,
    location: object_store::path::Path,
    size: u64,
}

impl RemoteObject {
    pub fn location(&self) -> &object_store::path::Path {
        &self.location
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Fetches exactly `length` bytes starting at `start`.
    pub fn read_range(&self, start: u64, length: usize) -> std::io::Result<Bytes> {
        let end = start
            .checked_add(length as u64)
            .filter(|end| *end <= self.size)
            .ok_or_else(|| out_of_range(start.saturating_add(length as u64), self.size))?;
        if length == 0 {
            return Ok(Bytes::new());
        }
        tracing::trace!("Fetching bytes {}..{} of {}", start, end, self.location);
        self.runtime
            .block_on(
                self.store
                    .get_range(&self.location, start as usize..end as usize),
            )
            .map_err(std::io::Error::other)
    }

    /// A sequential reader starting at `start`. Bytes are fetched lazily in
    /// chunks of [`READ_CHUNK_SIZE`].
    pub fn reader_at(&self, start: u64) -> std::io::Result<RemoteReader> {
        if start > self.size {
            return Err(out_of_range(start, self.size));
        }
        Ok(RemoteReader {
            object: self.clone(),
            position: start,
            buffer: Bytes::new(),
        })
    }
}

pub const READ_CHUNK_SIZE: u64 = 64 * 1024;

#[derive(Debug)]
pub struct RemoteReader {
    object: RemoteObject,
    position: u64,
    buffer: Bytes,
}

impl Read for RemoteReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.buffer.is_empty() {
            let remaining = self.object.size.saturating_sub(self.position);
            if remaining == 0 || buf.is_empty() {
                return Ok(0);
            }
            let length = remaining.min(READ_CHUNK_SIZE) as usize;
            self.buffer = self.object.read_range(self.position, length)?;
            self.position += length as u64;
        }
        let n = buf.len().min(self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer.split_to(n));
        Ok(n)
    }
}

fn prefix(location: &object_store::path::Path) -> Option<&object_store::path::Path> {
    if location.as_ref().is_empty() {
        None
    } else {
        Some(location)
    }
}

impl FileSystem for ObjectStoreFileSystem {
    fn exists(&self, path: &Path) -> StorageResult<bool> {
        let location = Self::location(path)?;
        self.runtime.block_on(async {
            if self.is_object(&location).await? {
                return Ok(true);
            }
            self.has_children(&location).await
        })
    }

    fn is_dir(&self, path: &Path) -> StorageResult<bool> {
        let location = Self::location(path)?;
        self.runtime.block_on(async {
            if self.is_object(&location).await? {
                return Ok(false);
            }
            self.has_children(&location).await
        })
    }

    fn open(&self, path: &Path) -> StorageResult<FileHandle> {
        let location = Self::location(path)?;
        self.runtime.block_on(async {
            let meta = match self.store.head(&location).await {
                Ok(meta) => meta,
                Err(object_store::Error::NotFound { .. }) => {
                    return Err(StorageError::NotFound(path.to_path_buf()))
                }
                Err(e) => return Err(e.into()),
            };
            Ok(FileHandle::Remote(RemoteObject {
                store: self.store.clone(),
                runtime: self.runtime.clone(),
                location: meta.location,
                size: meta.size as u64,
            }))
        })
    }

    fn list(&self, path: &Path) -> StorageResult<Vec<DirEntry>> {
        let location = Self::location(path)?;
        let listing = self
            .runtime
            .block_on(self.store.list_with_delimiter(prefix(&location)))?;

        let mut entries = Vec::new();
        for common_prefix in &listing.common_prefixes {
            if let Some(name) = common_prefix.filename() {
                entries.push(DirEntry::dir(name));
            }
        }
        for object in &listing.objects {
            if let Some(name) = object.location.filename() {
                entries.push(DirEntry::file(name));
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn write(&self, path: &Path, contents: Bytes) -> StorageResult<()> {
        let location = Self::location(path)?;
        self.runtime
            .block_on(self.store.put(&location, contents.into()))?;
        Ok(())
    }

    fn create_dir_all(&self, _path: &Path) -> StorageResult<()> {
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> StorageResult<()> {
        let location = Self::location(path)?;
        self.runtime.block_on(async {
            if self.is_object(&location).await? {
                self.store.delete(&location).await?;
                return Ok(());
            }
            let objects: Vec<object_store::path::Path> = self
                .store
                .list(prefix(&location))
                .map_ok(|meta| meta.location)
                .try_collect()
                .await?;
            for object in objects {
                tracing::debug!("Deleting {}", object);
                self.store.delete(&object).await?;
            }
            Ok(())
        })
    }
}
