use std::{io::Read, path::Path, str::FromStr};

use pqdata_config::TEXT_EXTENSIONS;
use pqdata_object_storage::FileSystem;
use serde_json::Value;

use crate::error::{PqDataError, Result};

/// Nested mapping loaded from a structured-text file.
pub type Mapping = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Json,
    Yaml,
    Toml,
}

impl FromStr for TextFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(TextFormat::Json),
            "yaml" | "yml" => Ok(TextFormat::Yaml),
            "toml" => Ok(TextFormat::Toml),
            other => Err(format!("Unsupported text format: {}", other)),
        }
    }
}

impl TextFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .ok_or_else(|| PqDataError::UnsupportedFormat(path.to_path_buf()))
    }

    pub fn parse(&self, text: &str) -> std::result::Result<Value, String> {
        match self {
            TextFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            TextFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            TextFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Reads a JSON, YAML or TOML file. The top level must be a mapping.
pub fn read_textfile(fs: &dyn FileSystem, path: &Path) -> Result<Mapping> {
    let format = TextFormat::from_path(path)?;
    let mut text = String::new();
    fs.open(path)?
        .reader_at(0)
        .and_then(|mut reader| reader.read_to_string(&mut text))
        .map_err(|e| PqDataError::malformed(path, e))?;

    match format
        .parse(&text)
        .map_err(|reason| PqDataError::malformed(path, reason))?
    {
        Value::Object(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(PqDataError::malformed(
            path,
            format!("expected a mapping at the top level, found {}", other),
        )),
    }
}

/// Merges every `<stem>.{json,yaml,yml,toml}` found in `dir` into `seed`,
/// in that order, so later files win on overlapping top-level fields.
///
/// Returns `None` when no such file exists.
pub fn merge_sidecars(
    fs: &dyn FileSystem,
    dir: &Path,
    stem: &str,
    seed: Mapping,
) -> Result<Option<Mapping>> {
    let mut merged = seed;
    let mut found = false;
    for ext in TEXT_EXTENSIONS {
        let path = dir.join(format!("{}.{}", stem, ext));
        if !fs.exists(&path)? {
            continue;
        }
        tracing::debug!("Merging sidecar {}", path.display());
        merged.extend(read_textfile(fs, &path)?);
        found = true;
    }
    Ok(found.then_some(merged))
}
