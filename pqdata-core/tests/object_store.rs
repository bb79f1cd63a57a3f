mod common;

use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use futures::stream::BoxStream;
use object_store::{
    memory::InMemory, path::Path, GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta,
    ObjectStore, PutMultipartOpts, PutOptions, PutPayload, PutResult,
};
use pqdata_arrow::Element;
use pqdata_core::{
    open_storage_with, read_anndata_with, write_anndata_with, AnnData, AxisCollection, Entry,
};
use pqdata_object_storage::{FileSystem, ObjectStoreFileSystem};
use serde_json::json;

use common::*;

fn memory_fs() -> Arc<ObjectStoreFileSystem> {
    Arc::new(ObjectStoreFileSystem::new(Arc::new(InMemory::new())).unwrap())
}

#[test]
fn round_trip_through_object_store() -> anyhow::Result<()> {
    let fs = memory_fs();
    let mut data = AnnData::with_x(matrix(6, 4));
    data.obs = Some(frame("cell", 6));
    data.insert(AxisCollection::Obsm, "X_umap", Element::from(matrix(6, 2)));

    write_anndata_with(fs.as_ref(), &data, "stores/small.pqdata", false)?;
    let read = read_anndata_with(fs.as_ref(), "stores/small.pqdata")?;
    assert_eq!(read.shape(), (6, 4));
    assert_eq!(
        read.collection(AxisCollection::Obsm).unwrap()["X_umap"].shape(),
        vec![6, 2]
    );
    Ok(())
}

#[test]
fn navigates_an_object_store() -> anyhow::Result<()> {
    let fs = memory_fs();
    write_anndata_with(fs.as_ref(), &AnnData::with_x(matrix(3, 2)), "store.pqdata", false)?;
    fs.write(
        std::path::Path::new("store.pqdata/obsm.json"),
        bytes::Bytes::from_static(br#"{"source": "memory"}"#),
    )?;

    let root = open_storage_with(fs.clone(), "store.pqdata")?;
    let x = root.get("X")?;
    assert_eq!(x.as_array().unwrap().shape(), (3, 2));

    // No obsm directory exists, so the sidecar itself is the value.
    let Entry::Value(value) = root.get("obsm")? else {
        panic!("expected a value");
    };
    assert_eq!(value, json!({"source": "memory"}));

    let mut keys: Vec<String> = root.keys()?.collect();
    keys.sort();
    assert_eq!(keys, vec!["X".to_string(), "obsm".to_string()]);
    Ok(())
}

/// In-memory store that counts the payload bytes served by reads.
#[derive(Debug, Default)]
struct CountingStore {
    inner: InMemory,
    fetched: AtomicUsize,
}

impl CountingStore {
    fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }
}

impl Display for CountingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CountingStore wrapping: {}", self.inner)
    }
}

#[async_trait::async_trait]
impl ObjectStore for CountingStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        let head = options.head;
        let result = self.inner.get_opts(location, options).await?;
        if !head {
            self.fetched.fetch_add(result.range.len(), Ordering::SeqCst);
        }
        Ok(result)
    }

    async fn head(&self, location: &Path) -> object_store::Result<ObjectMeta> {
        self.inner.head(location).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

#[test]
fn opening_a_table_fetches_only_the_footer() -> anyhow::Result<()> {
    let store = Arc::new(CountingStore::default());
    let fs = Arc::new(ObjectStoreFileSystem::new(store.clone())?);
    write_anndata_with(fs.as_ref(), &AnnData::with_x(matrix(2000, 20)), "big.pqdata", false)?;
    let total = fs.open(std::path::Path::new("big.pqdata/X.parquet"))?.size()? as usize;

    let root = open_storage_with(fs.clone(), "big.pqdata")?;
    let before = store.fetched();
    let entry = root.get("X")?;
    let x = entry.as_array().unwrap();
    assert_eq!(x.shape(), (2000, 20));
    x.describe()?;
    let opened = store.fetched() - before;
    assert!(opened > 0);
    assert!(opened < total / 4, "fetched {} of {} bytes", opened, total);

    assert_eq!(x.read()?.num_rows(), 2000);
    assert!(store.fetched() - before >= total / 2);
    Ok(())
}
