use std::path::{Path, PathBuf};

use bytes::Bytes;
use pqdata_arrow::{encode::encode_dataframe, encode_element, write_table, DataFrame, Element};
use pqdata_object_storage::FileSystem;
use serde_json::Value;

use crate::{
    anndata::{AnnData, Uns, UnsValue},
    error::{PqDataError, Result},
    manifest::Manifest,
    sidecar::Mapping,
};

/// Writes `data` as a store rooted at `path`.
///
/// An existing `path` is an error unless `overwrite` is set, in which case it
/// is removed first.
pub fn write_anndata(
    fs: &dyn FileSystem,
    data: &AnnData,
    path: &Path,
    overwrite: bool,
    max_depth: usize,
) -> Result<()> {
    if fs.exists(path)? {
        if !overwrite {
            return Err(PqDataError::AlreadyExists(path.to_path_buf()));
        }
        tracing::info!("Overwriting {}", path.display());
        fs.remove_dir_all(path)?;
    }
    Writer { fs, max_depth }.write_node(data, path, 0)
}

struct Writer<'a> {
    fs: &'a dyn FileSystem,
    max_depth: usize,
}

impl Writer<'_> {
    fn write_node(&self, data: &AnnData, path: &Path, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(PqDataError::NestingTooDeep {
                path: path.to_path_buf(),
                max_depth: self.max_depth,
            });
        }
        self.fs.create_dir_all(path)?;

        if let Some(obs) = &data.obs {
            self.write_frame(obs, &path.join("obs.parquet"))?;
        }
        if let Some(var) = &data.var {
            self.write_frame(var, &path.join("var.parquet"))?;
        }
        if let Some(x) = &data.x {
            self.write_element(x, &path.join("X.parquet"))?;
        }
        if let Some(raw) = &data.raw {
            self.write_node(raw, &path.join("raw"), depth + 1)?;
        }

        for (collection, entries) in &data.collections {
            if entries.is_empty() {
                continue;
            }
            let dir = path.join(collection.as_str());
            self.fs.create_dir_all(&dir)?;
            for (name, element) in entries {
                self.write_element(element, &table_path(&dir, name)?)?;
            }
        }

        self.write_uns(&data.uns, path)?;

        if let Some(modalities) = &data.modalities {
            let mod_path = path.join("mod");
            self.fs.create_dir_all(&mod_path)?;
            for (name, modality) in modalities {
                validate_name(name)?;
                self.write_node(modality, &mod_path.join(name), depth + 1)?;
            }
            let manifest =
                Manifest::for_modalities(modalities.keys().cloned().collect(), data.axis.clone());
            self.fs.write(&path.join("pqdata.json"), manifest.to_bytes()?)?;
        }
        Ok(())
    }

    fn write_frame(&self, frame: &DataFrame, path: &Path) -> Result<()> {
        let bytes = write_table(&encode_dataframe(frame))?;
        self.fs.write(path, bytes)?;
        Ok(())
    }

    fn write_element(&self, element: &Element, path: &Path) -> Result<()> {
        tracing::debug!("Writing {} element to {}", element.kind_name(), path.display());
        let bytes = write_table(&encode_element(element)?)?;
        self.fs.write(path, bytes)?;
        Ok(())
    }

    /// Plain values go to `uns.json`, tables to `uns/<path>.parquet`.
    fn write_uns(&self, uns: &Uns, path: &Path) -> Result<()> {
        if uns.is_empty() {
            return Ok(());
        }
        let mut elements = Vec::new();
        let values = split_uns(uns, PathBuf::new(), &mut elements)?;

        if !values.is_empty() {
            let bytes = serde_json::to_vec_pretty(&values)
                .map_err(|e| PqDataError::malformed(path.join("uns.json"), e))?;
            self.fs.write(&path.join("uns.json"), Bytes::from(bytes))?;
        }

        let dir = path.join("uns");
        for (relative, element) in elements {
            let target = dir.join(&relative);
            let parent = target.parent().unwrap_or(&dir).to_path_buf();
            self.fs.create_dir_all(&parent)?;
            let name = relative
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| PqDataError::InvalidKey(relative.display().to_string()))?;
            self.write_element(element, &table_path(&parent, name)?)?;
        }
        Ok(())
    }
}

/// Separates the JSON representable part of `uns` from embedded elements,
/// which are collected along with their path below `uns`.
fn split_uns<'a>(
    uns: &'a Uns,
    prefix: PathBuf,
    elements: &mut Vec<(PathBuf, &'a Element)>,
) -> Result<Mapping> {
    let mut values = Mapping::new();
    for (key, value) in uns {
        match value {
            UnsValue::Value(value) => {
                values.insert(key.clone(), value.clone());
            }
            UnsValue::Element(element) => {
                validate_name(key)?;
                elements.push((prefix.join(key), element));
            }
            UnsValue::Mapping(mapping) => {
                validate_name(key)?;
                let nested = split_uns(mapping, prefix.join(key), elements)?;
                if !nested.is_empty() || mapping.is_empty() {
                    values.insert(key.clone(), Value::Object(nested));
                }
            }
        }
    }
    Ok(values)
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(PqDataError::InvalidKey(name.to_string()));
    }
    Ok(())
}

fn table_path(dir: &Path, name: &str) -> Result<PathBuf> {
    validate_name(name)?;
    Ok(dir.join(format!("{}.parquet", name)))
}
