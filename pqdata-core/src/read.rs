use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use pqdata_arrow::{decode_table, DataFrame, DecodeWarning, Decoded, Element, TableKind};
use pqdata_config::{CONFIG, TABLE_EXTENSIONS};
use pqdata_object_storage::FileSystem;

use crate::{
    anndata::{insert_at_path, AnnData, AxisCollection, Uns, UnsValue},
    error::{PqDataError, Result},
    manifest::Manifest,
    sidecar::read_textfile,
};

const RAW_DIR: &str = "raw";
const UNS: &str = "uns";
const MOD_DIR: &str = "mod";

/// Tuning of the read engine.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Deepest `raw`/`mod` nesting read before giving up.
    pub max_depth: usize,
    /// Read modalities on scoped threads.
    pub parallel: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_depth: CONFIG.max_nesting_depth,
            parallel: CONFIG.parallel_reads,
        }
    }
}

/// Decodes a single table file. The kind is detected from the table metadata
/// when not given.
pub fn read_table(fs: &dyn FileSystem, path: &Path, kind: Option<TableKind>) -> Result<Decoded> {
    if !is_table_file(path) {
        return Err(PqDataError::UnsupportedFormat(path.to_path_buf()));
    }
    let batch = pqdata_arrow::read_table(fs.open(path)?)?;
    Ok(decode_table(batch, kind)?)
}

/// Reconstructs the object stored below `path`.
pub fn read_anndata(fs: &dyn FileSystem, path: &Path, options: ReadOptions) -> Result<AnnData> {
    if !fs.is_dir(path)? {
        return Err(PqDataError::NotFound(path.to_path_buf()));
    }
    Reader { fs, options }.read_node(path, 0)
}

fn is_table_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TABLE_EXTENSIONS.iter().any(|e| *e == ext))
}

fn file_stem(name: &str) -> &str {
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

struct Reader<'a> {
    fs: &'a dyn FileSystem,
    options: ReadOptions,
}

impl Reader<'_> {
    fn read_node(&self, path: &Path, depth: usize) -> Result<AnnData> {
        if depth > self.options.max_depth {
            return Err(PqDataError::NestingTooDeep {
                path: path.to_path_buf(),
                max_depth: self.options.max_depth,
            });
        }
        tracing::debug!("Reading object at {} (depth {})", path.display(), depth);

        let manifest = Manifest::load(self.fs, path)?;
        let mut data = AnnData::new();

        data.obs = self.read_frame(&path.join("obs.parquet"))?;
        data.var = self.read_frame(&path.join("var.parquet"))?;

        let x_path = path.join("X.parquet");
        if self.fs.exists(&x_path)? {
            data.x = Some(self.decode(&x_path, Some(TableKind::Array), &mut data.warnings)?);
        }

        let raw_path = path.join(RAW_DIR);
        if self.fs.is_dir(&raw_path)? {
            data.raw = Some(Box::new(self.read_node(&raw_path, depth + 1)?));
        }

        for collection in AxisCollection::ALL {
            let dir = path.join(collection.as_str());
            if !self.fs.is_dir(&dir)? {
                continue;
            }
            for entry in self.fs.list(&dir)? {
                if entry.is_dir || !is_table_file(Path::new(&entry.name)) {
                    tracing::warn!(
                        "Skipping {} in {}: not a table file",
                        entry.name,
                        dir.display()
                    );
                    continue;
                }
                let element = self.decode(
                    &dir.join(&entry.name),
                    Some(TableKind::Array),
                    &mut data.warnings,
                )?;
                data.insert(collection, file_stem(&entry.name), element);
            }
        }

        data.uns = self.read_uns(path, &mut data.warnings)?;

        let mod_path = path.join(MOD_DIR);
        if self.fs.is_dir(&mod_path)? {
            data.modalities = Some(self.read_modalities(&mod_path, &manifest, depth)?);
            data.axis = manifest.mod_axis().cloned();
        }

        Ok(data)
    }

    fn read_frame(&self, path: &Path) -> Result<Option<DataFrame>> {
        if !self.fs.exists(path)? {
            return Ok(None);
        }
        let batch = pqdata_arrow::read_table(self.fs.open(path)?)?;
        Ok(Some(DataFrame::new(batch)?))
    }

    fn decode(
        &self,
        path: &Path,
        kind: Option<TableKind>,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<Element> {
        let decoded = read_table(self.fs, path, kind)?;
        warnings.extend(decoded.warnings);
        Ok(decoded.element)
    }

    fn read_uns(&self, path: &Path, warnings: &mut Vec<DecodeWarning>) -> Result<Uns> {
        let json_path = path.join(format!("{}.json", UNS));
        let mut uns = if self.fs.exists(&json_path)? {
            read_textfile(self.fs, &json_path)?
                .into_iter()
                .map(|(key, value)| (key, UnsValue::from_json(value)))
                .collect()
        } else {
            Uns::new()
        };

        let dir = path.join(UNS);
        if self.fs.is_dir(&dir)? {
            self.walk_uns(&dir, &mut vec![], &mut uns, warnings)?;
        }
        Ok(uns)
    }

    fn walk_uns(
        &self,
        dir: &Path,
        prefix: &mut Vec<String>,
        uns: &mut Uns,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<()> {
        for entry in self.fs.list(dir)? {
            let entry_path = dir.join(&entry.name);
            if entry.is_dir {
                prefix.push(entry.name);
                self.walk_uns(&entry_path, prefix, uns, warnings)?;
                prefix.pop();
                continue;
            }
            if !is_table_file(&entry_path) {
                tracing::warn!("Skipping {}: not a table file", entry_path.display());
                continue;
            }
            let element = self.decode(&entry_path, None, warnings)?;
            let mut key = prefix.clone();
            key.push(file_stem(&entry.name).to_string());
            insert_at_path(uns, &key, UnsValue::Element(element));
        }
        Ok(())
    }

    fn read_modalities(
        &self,
        mod_path: &Path,
        manifest: &Manifest,
        depth: usize,
    ) -> Result<IndexMap<String, AnnData>> {
        let names: Vec<String> = self
            .fs
            .list(mod_path)?
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.name)
            .collect();
        let paths: Vec<PathBuf> = names.iter().map(|name| mod_path.join(name)).collect();

        let results: Vec<Result<AnnData>> = if self.options.parallel && paths.len() > 1 {
            std::thread::scope(|scope| {
                let handles: Vec<_> = paths
                    .iter()
                    .map(|path| scope.spawn(move || self.read_node(path, depth + 1)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| match handle.join() {
                        Ok(result) => result,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            })
        } else {
            paths
                .iter()
                .map(|path| self.read_node(path, depth + 1))
                .collect()
        };

        let mut modalities = names
            .into_iter()
            .zip(results)
            .map(|(name, result)| result.map(|data| (name, data)))
            .collect::<Result<IndexMap<_, _>>>()?;

        if let Some(order) = manifest.mod_order() {
            if modalities.keys().all(|name| order.contains(name)) {
                modalities = order
                    .iter()
                    .filter_map(|name| modalities.swap_remove_entry(name))
                    .collect();
            } else {
                tracing::debug!(
                    "Manifest order does not cover every modality in {}, keeping listing order",
                    mod_path.display()
                );
            }
        }
        Ok(modalities)
    }
}
