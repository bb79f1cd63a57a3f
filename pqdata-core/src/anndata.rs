use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use indexmap::IndexMap;
use pqdata_arrow::{DataFrame, DecodeWarning, Element};
use serde_json::Value;

/// Named collections of elements aligned to one or both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AxisCollection {
    Obsm,
    Varm,
    Obsp,
    Varp,
    Layers,
    Obsmap,
    Varmap,
}

impl AxisCollection {
    pub const ALL: [AxisCollection; 7] = [
        AxisCollection::Obsm,
        AxisCollection::Varm,
        AxisCollection::Obsp,
        AxisCollection::Varp,
        AxisCollection::Layers,
        AxisCollection::Obsmap,
        AxisCollection::Varmap,
    ];

    /// Directory name of the collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisCollection::Obsm => "obsm",
            AxisCollection::Varm => "varm",
            AxisCollection::Obsp => "obsp",
            AxisCollection::Varp => "varp",
            AxisCollection::Layers => "layers",
            AxisCollection::Obsmap => "obsmap",
            AxisCollection::Varmap => "varmap",
        }
    }
}

impl FromStr for AxisCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AxisCollection::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| format!("Unknown collection: {}", s))
    }
}

impl Display for AxisCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node of the free-form `uns` metadata tree.
#[derive(Debug, Clone)]
pub enum UnsValue {
    Value(Value),
    Element(Element),
    Mapping(Uns),
}

pub type Uns = IndexMap<String, UnsValue>;

impl UnsValue {
    /// JSON objects become nested mappings so tables can be inserted below them.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(mapping) => UnsValue::Mapping(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key, UnsValue::from_json(value)))
                    .collect(),
            ),
            other => UnsValue::Value(other),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            UnsValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            UnsValue::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Uns> {
        match self {
            UnsValue::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }
}

impl From<Value> for UnsValue {
    fn from(value: Value) -> Self {
        UnsValue::from_json(value)
    }
}

impl From<Element> for UnsValue {
    fn from(value: Element) -> Self {
        UnsValue::Element(value)
    }
}

/// Inserts `value` at `path` below `uns`, creating intermediate mappings.
/// Intermediate entries that are not mappings are replaced.
pub fn insert_at_path(uns: &mut Uns, path: &[String], value: UnsValue) {
    let Some((last, levels)) = path.split_last() else {
        return;
    };
    let mut current = uns;
    for level in levels {
        let entry = current
            .entry(level.clone())
            .or_insert_with(|| UnsValue::Mapping(Uns::new()));
        if !matches!(entry, UnsValue::Mapping(_)) {
            tracing::warn!("Replacing uns entry '{}' with a mapping", level);
            *entry = UnsValue::Mapping(Uns::new());
        }
        current = match entry {
            UnsValue::Mapping(mapping) => mapping,
            _ => return,
        };
    }
    current.insert(last.clone(), value);
}

/// An annotated data matrix, optionally composed of named modalities.
///
/// `raw` and the modalities are full objects of the same type.
#[derive(Debug, Clone, Default)]
pub struct AnnData {
    pub x: Option<Element>,
    pub obs: Option<DataFrame>,
    pub var: Option<DataFrame>,
    pub collections: BTreeMap<AxisCollection, IndexMap<String, Element>>,
    pub uns: Uns,
    pub raw: Option<Box<AnnData>>,
    pub modalities: Option<IndexMap<String, AnnData>>,
    pub axis: Option<Value>,
    /// Non-fatal decoding warnings raised while reading this object.
    pub warnings: Vec<DecodeWarning>,
}

/// Multi-modal containers share the representation of a single object.
pub type MuData = AnnData;

impl AnnData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_x(x: impl Into<Element>) -> Self {
        Self {
            x: Some(x.into()),
            ..Self::default()
        }
    }

    pub fn from_modalities(modalities: IndexMap<String, AnnData>, axis: Option<Value>) -> Self {
        Self {
            modalities: Some(modalities),
            axis,
            ..Self::default()
        }
    }

    pub fn collection(&self, collection: AxisCollection) -> Option<&IndexMap<String, Element>> {
        self.collections.get(&collection)
    }

    pub fn insert(&mut self, collection: AxisCollection, name: impl Into<String>, element: Element) {
        self.collections
            .entry(collection)
            .or_default()
            .insert(name.into(), element);
    }

    pub fn modality(&self, name: &str) -> Option<&AnnData> {
        self.modalities.as_ref()?.get(name)
    }

    pub fn modality_names(&self) -> Vec<&str> {
        self.modalities
            .as_ref()
            .map(|modalities| modalities.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_multimodal(&self) -> bool {
        self.modalities.is_some()
    }

    /// `(n_obs, n_vars)`.
    ///
    /// Taken from `obs`/`var` when present, otherwise from `X`. A container
    /// without either combines its modalities: along the shared axis
    /// (observations unless `axis` is 1) the largest count is taken, the
    /// other axis is summed.
    pub fn shape(&self) -> (usize, usize) {
        let x_shape = self.x.as_ref().map(|x| x.shape());
        let from_x = |i: usize| x_shape.as_ref().and_then(|shape| shape.get(i).copied());

        let n_obs = self
            .obs
            .as_ref()
            .map(DataFrame::num_rows)
            .or_else(|| from_x(0));
        let n_vars = self
            .var
            .as_ref()
            .map(DataFrame::num_rows)
            .or_else(|| from_x(1));

        let modality_shapes: Vec<(usize, usize)> = self
            .modalities
            .iter()
            .flat_map(|modalities| modalities.values().map(AnnData::shape))
            .collect();
        let shared_vars = self.axis.as_ref().and_then(Value::as_u64) == Some(1);
        let combine = |counts: Vec<usize>, shared: bool| {
            if shared {
                counts.into_iter().max().unwrap_or(0)
            } else {
                counts.into_iter().sum()
            }
        };

        (
            n_obs.unwrap_or_else(|| {
                combine(modality_shapes.iter().map(|s| s.0).collect(), !shared_vars)
            }),
            n_vars.unwrap_or_else(|| {
                combine(modality_shapes.iter().map(|s| s.1).collect(), shared_vars)
            }),
        )
    }

    pub fn n_obs(&self) -> usize {
        self.shape().0
    }

    pub fn n_vars(&self) -> usize {
        self.shape().1
    }
}
