use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use pqdata_config::{MANIFEST_FILE_NAMES, SUPPORTED_EXTENSIONS, TABLE_EXTENSIONS};
use pqdata_object_storage::FileSystem;
use serde_json::Value;

use crate::{
    array::ArrayAccessor,
    error::{PqDataError, Result},
    manifest::Manifest,
    sidecar::{merge_sidecars, Mapping},
};

const MOD_GROUP: &str = "mod";
const MOD_ORDER_ALIAS: &str = "mod-order";

/// Role of a directory node, fixed when the node is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The directory the store was opened on.
    Root,
    Directory,
    /// The `mod` directory holding the modalities of a multi-modal container.
    MultiModalRoot,
}

/// What a key resolves to.
#[derive(Debug, Clone)]
pub enum Entry {
    Group(Group),
    Array(ArrayAccessor),
    Value(Value),
}

impl Entry {
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Entry::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayAccessor> {
        match self {
            Entry::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Lazy view over a directory of the store.
///
/// Nothing is read on construction besides an existence check. Keys are
/// resolved against the filesystem on every access.
#[derive(Debug, Clone)]
pub struct Group {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    origin: PathBuf,
    name: String,
    kind: NodeKind,
    contents: Option<Arc<Mapping>>,
}

impl Group {
    /// Opens the root of a store.
    pub fn open(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !fs.exists(&path)? {
            return Err(PqDataError::NotFound(path));
        }
        Ok(Self {
            fs,
            origin: path.clone(),
            path,
            name: "/".to_string(),
            kind: NodeKind::Root,
            contents: None,
        })
    }

    fn child(&self, key: &str, contents: Option<Arc<Mapping>>) -> Self {
        let kind = if key == MOD_GROUP {
            NodeKind::MultiModalRoot
        } else {
            NodeKind::Directory
        };
        Self {
            fs: self.fs.clone(),
            path: self.path.join(key),
            origin: self.origin.clone(),
            name: self.child_name(key),
            kind,
            contents,
        }
    }

    fn child_name(&self, key: &str) -> String {
        if self.name.ends_with('/') {
            format!("{}{}", self.name, key)
        } else {
            format!("{}/{}", self.name, key)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical name from the store root, e.g. `/mod/rna`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// In-memory values merged from sidecar files of this node.
    pub fn contents(&self) -> Option<&Mapping> {
        self.contents.as_deref()
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Resolves `key` to a sub-group, a table or a value.
    ///
    /// Sidecars `key.{json,yaml,yml,toml}` are merged first, seeded with this
    /// node's in-memory value for `key`. A directory named `key` then wins,
    /// followed by a `key.pq` or `key.parquet` table, followed by the merged
    /// sidecars and finally this node's in-memory value. `"/"` returns the
    /// store root.
    pub fn get(&self, key: &str) -> Result<Entry> {
        if key == "/" {
            return Ok(Entry::Group(Group::open(self.fs.clone(), self.origin.clone())?));
        }
        validate_key(key)?;

        let existing = self.contents.as_ref().and_then(|contents| contents.get(key));
        let seed = existing
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let merged = merge_sidecars(self.fs.as_ref(), &self.path, key, seed)?;

        let dir = self.path.join(key);
        if self.fs.is_dir(&dir)? {
            let contents = match &merged {
                Some(merged) => Some(merged.clone()),
                None => existing.and_then(Value::as_object).cloned(),
            };
            tracing::debug!("Resolved '{}' to directory {}", key, dir.display());
            return Ok(Entry::Group(self.child(key, contents.map(Arc::new))));
        }

        if let Some(table) = self.find_table(key)? {
            tracing::debug!("Resolved '{}' to table {}", key, table.display());
            return Ok(Entry::Array(ArrayAccessor::open(
                self.fs.clone(),
                table,
                self.child_name(key),
            )?));
        }

        if let Some(merged) = merged {
            return Ok(Entry::Value(Value::Object(merged)));
        }
        if let Some(value) = existing {
            return Ok(Entry::Value(value.clone()));
        }
        Err(PqDataError::KeyNotFound {
            key: key.to_string(),
            path: self.path.clone(),
        })
    }

    /// Resolves a slash separated path of keys, e.g. `mod/rna/obsm`.
    pub fn resolve(&self, path: &str) -> Result<Entry> {
        if path == "/" {
            return self.get("/");
        }
        let mut keys = path.split('/').filter(|key| !key.is_empty());
        let Some(first) = keys.next() else {
            return Ok(Entry::Group(self.clone()));
        };
        let mut entry = self.get(first)?;
        for key in keys {
            entry = match entry {
                Entry::Group(group) => group.get(key)?,
                Entry::Value(Value::Object(mapping)) => mapping
                    .get(key)
                    .cloned()
                    .map(Entry::Value)
                    .ok_or_else(|| PqDataError::KeyNotFound {
                        key: key.to_string(),
                        path: self.path.join(path),
                    })?,
                _ => {
                    return Err(PqDataError::KeyNotFound {
                        key: key.to_string(),
                        path: self.path.join(path),
                    })
                }
            };
        }
        Ok(entry)
    }

    fn find_table(&self, key: &str) -> Result<Option<PathBuf>> {
        let mut found = None;
        for ext in TABLE_EXTENSIONS {
            let candidate = self.path.join(format!("{}.{}", key, ext));
            if !self.fs.exists(&candidate)? {
                continue;
            }
            if found.is_some() {
                return Err(PqDataError::AmbiguousLeaf {
                    key: key.to_string(),
                    path: self.path.clone(),
                });
            }
            found = Some(candidate);
        }
        Ok(found)
    }

    /// Number of filesystem entries in the directory. Files sharing a stem
    /// are counted separately, so this may exceed the number of keys.
    pub fn len(&self) -> Result<usize> {
        Ok(self.fs.list(&self.path)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Distinct logical keys: directory names, file stems of supported
    /// files and in-memory keys. Manifest files are skipped at the root.
    pub fn keys(&self) -> Result<Keys> {
        let mut candidates: Vec<String> = self
            .fs
            .list(&self.path)?
            .into_iter()
            .filter(|entry| {
                !(self.kind == NodeKind::Root && MANIFEST_FILE_NAMES.contains(&entry.name))
            })
            .map(|entry| {
                if entry.is_dir {
                    entry.name
                } else {
                    strip_supported_extension(&entry.name).to_string()
                }
            })
            .collect();
        if let Some(contents) = &self.contents {
            candidates.extend(contents.keys().cloned());
        }
        Ok(Keys {
            candidates: candidates.into_iter(),
            seen: HashSet::new(),
        })
    }

    /// True if `key` exists as a directory, a file with a supported
    /// extension, or an in-memory value.
    pub fn contains(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        if self.fs.exists(&self.path.join(key))? {
            return Ok(true);
        }
        for ext in SUPPORTED_EXTENSIONS.iter() {
            if self.fs.exists(&self.path.join(format!("{}.{}", key, ext)))? {
                return Ok(true);
            }
        }
        Ok(self
            .contents
            .as_ref()
            .is_some_and(|contents| contents.contains_key(key)))
    }

    /// Not supported: entries are only materialized by key.
    pub fn values(&self) -> Result<std::vec::IntoIter<Entry>> {
        Err(PqDataError::NotImplemented("values()"))
    }

    /// Not supported: entries are only materialized by key.
    pub fn items(&self) -> Result<std::vec::IntoIter<(String, Entry)>> {
        Err(PqDataError::NotImplemented("items()"))
    }

    /// Node attributes.
    ///
    /// The root exposes its manifest. The `mod` group exposes the manifest of
    /// its parent with `mod.mod-order` mirroring `mod.order`. Plain
    /// directories have none.
    pub fn attrs(&self) -> Result<Mapping> {
        match self.kind {
            NodeKind::Root => Ok(Manifest::load(self.fs.as_ref(), &self.path)?.into_attributes()),
            NodeKind::MultiModalRoot => {
                let parent = self.path.parent().unwrap_or(Path::new(""));
                let mut attrs = Manifest::load(self.fs.as_ref(), parent)?.into_attributes();
                if let Some(Value::Object(modalities)) = attrs.get_mut(MOD_GROUP) {
                    if let Some(order) = modalities.get("order").cloned() {
                        modalities.insert(MOD_ORDER_ALIAS.to_string(), order);
                    }
                }
                Ok(attrs)
            }
            NodeKind::Directory => Ok(Mapping::new()),
        }
    }
}

/// Iterator over the distinct keys of a [`Group`].
#[derive(Debug)]
pub struct Keys {
    candidates: std::vec::IntoIter<String>,
    seen: HashSet<String>,
}

impl Iterator for Keys {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        for key in self.candidates.by_ref() {
            if self.seen.insert(key.clone()) {
                return Some(key);
            }
        }
        None
    }
}

fn strip_supported_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && SUPPORTED_EXTENSIONS.iter().any(|e| *e == ext) => {
            stem
        }
        _ => name,
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains('/') {
        return Err(PqDataError::InvalidKey(key.to_string()));
    }
    Ok(())
}
