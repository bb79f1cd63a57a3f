use std::path::{Path, PathBuf};

use bytes::Bytes;
use pqdata_config::MANIFEST_STEM;
use pqdata_object_storage::FileSystem;
use serde_json::Value;

use crate::{
    error::{PqDataError, Result},
    sidecar::{merge_sidecars, Mapping},
};

const MOD_KEY: &str = "mod";
const ORDER_KEY: &str = "order";
const AXIS_KEY: &str = "axis";

/// Serialization metadata stored next to a node as `pqdata.{json,yaml,yml,toml}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    attributes: Mapping,
}

impl Manifest {
    /// Loads the manifest of `dir`. A missing manifest is empty.
    pub fn load(fs: &dyn FileSystem, dir: &Path) -> Result<Self> {
        let attributes = merge_sidecars(fs, dir, MANIFEST_STEM, Mapping::new())?.unwrap_or_default();
        let manifest = Self {
            path: dir.to_path_buf(),
            attributes,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Manifest describing a multi-modal container.
    pub fn for_modalities(order: Vec<String>, axis: Option<Value>) -> Self {
        let mut modalities = Mapping::new();
        modalities.insert(ORDER_KEY.to_string(), Value::from(order));
        if let Some(axis) = axis {
            modalities.insert(AXIS_KEY.to_string(), axis);
        }
        let mut attributes = Mapping::new();
        attributes.insert(MOD_KEY.to_string(), Value::Object(modalities));
        Self {
            path: PathBuf::new(),
            attributes,
        }
    }

    pub fn attributes(&self) -> &Mapping {
        &self.attributes
    }

    pub fn into_attributes(self) -> Mapping {
        self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Declared iteration order of the modalities.
    pub fn mod_order(&self) -> Option<Vec<String>> {
        self.modalities()?
            .get(ORDER_KEY)?
            .as_array()
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| name.as_str().map(str::to_string))
                    .collect()
            })
    }

    /// Shared axis of the modalities.
    pub fn mod_axis(&self) -> Option<&Value> {
        self.modalities()?.get(AXIS_KEY)
    }

    fn modalities(&self) -> Option<&Mapping> {
        self.attributes.get(MOD_KEY)?.as_object()
    }

    fn validate(&self) -> Result<()> {
        let Some(modalities) = self.attributes.get(MOD_KEY) else {
            return Ok(());
        };
        let Some(modalities) = modalities.as_object() else {
            return Err(PqDataError::malformed(
                &self.path,
                "'mod' must be a mapping",
            ));
        };
        match modalities.get(ORDER_KEY) {
            None => Ok(()),
            Some(Value::Array(names)) if names.iter().all(Value::is_string) => Ok(()),
            Some(_) => Err(PqDataError::malformed(
                &self.path,
                "'mod.order' must be a list of names",
            )),
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        serde_json::to_vec_pretty(&self.attributes)
            .map(Bytes::from)
            .map_err(|e| PqDataError::malformed(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use pqdata_object_storage::LocalFileSystem;

    use super::*;

    #[test]
    fn missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::load(&LocalFileSystem, dir.path()).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.mod_order(), None);
        assert_eq!(manifest.mod_axis(), None);
    }

    #[test]
    fn reads_order_and_axis() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pqdata.json"),
            r#"{"mod": {"order": ["rna", "atac"], "axis": 0}}"#,
        )
        .unwrap();
        let manifest = Manifest::load(&LocalFileSystem, dir.path()).unwrap();
        assert_eq!(
            manifest.mod_order(),
            Some(vec!["rna".to_string(), "atac".to_string()])
        );
        assert_eq!(manifest.mod_axis(), Some(&Value::from(0)));
    }

    #[test]
    fn yaml_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pqdata.yaml"),
            "mod:\n  order: [b, a]\n",
        )
        .unwrap();
        let manifest = Manifest::load(&LocalFileSystem, dir.path()).unwrap();
        assert_eq!(
            manifest.mod_order(),
            Some(vec!["b".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn rejects_malformed_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pqdata.json"), r#"{"mod": {"order": "a"}}"#).unwrap();
        assert!(matches!(
            Manifest::load(&LocalFileSystem, dir.path()),
            Err(PqDataError::MalformedMetadata { .. })
        ));

        std::fs::write(dir.path().join("pqdata.json"), "{not json").unwrap();
        assert!(matches!(
            Manifest::load(&LocalFileSystem, dir.path()),
            Err(PqDataError::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn modalities_manifest() {
        let manifest = Manifest::for_modalities(vec!["x".into()], Some(Value::from(1)));
        assert_eq!(manifest.mod_order(), Some(vec!["x".to_string()]));
        let bytes = manifest.to_bytes().unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["mod"]["axis"], 1);
    }
}
