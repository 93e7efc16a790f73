use crate::core::models::attributes::AttributeColumn;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Periodicity, either for all three axes at once or per axis.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum PbcSpec {
    All(bool),
    Axes([bool; 3]),
}

impl Default for PbcSpec {
    fn default() -> Self {
        PbcSpec::All(false)
    }
}

impl PbcSpec {
    pub fn to_array(self) -> [bool; 3] {
        match self {
            PbcSpec::All(periodic) => [periodic; 3],
            PbcSpec::Axes(axes) => axes,
        }
    }
}

/// Definition of one species, keyed by label in `species-props`.
///
/// A species without `element` or `elements` is a pure species of the element named
/// by its label prefix.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SpeciesProps {
    pub element: Option<String>,
    /// Element and occupancy pairs, in definition order.
    pub elements: Option<Vec<(String, f64)>>,
    pub radius_style: Option<String>,
    pub color_style: Option<String>,
    pub shape: Option<String>,
    pub scale: Option<f64>,
    pub color: Option<[f64; 4]>,
}

/// Values of a custom per-site attribute.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum AttributeData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl From<AttributeData> for AttributeColumn {
    fn from(data: AttributeData) -> Self {
        match data {
            AttributeData::Int(v) => AttributeColumn::Int(v),
            AttributeData::Float(v) => AttributeColumn::Float(v),
            AttributeData::Bool(v) => AttributeColumn::Bool(v),
            AttributeData::Str(v) => AttributeColumn::Str(v),
        }
    }
}

/// A structure description: sites, species definitions, cell and display defaults.
///
/// ```toml
/// label = "zsm"
/// species = ["Si", "O", "O"]
/// positions = [[0.0, 0.0, 0.0], [1.6, 0.0, 0.0], [-1.6, 0.0, 0.0]]
/// cell = [[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]]
/// repeat = [2, 1, 1]
///
/// [species-props.Si]
/// elements = [["Si", 0.75], ["Al", 0.25]]
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct StructureFile {
    pub label: String,
    /// Species label of every site.
    pub species: Vec<String>,
    /// Rest pose positions, one per site, in global coordinates.
    pub positions: Vec<[f64; 3]>,
    /// Trajectory frames following the rest pose.
    #[serde(default)]
    pub frames: Vec<Vec<[f64; 3]>>,
    #[serde(default)]
    pub defer_frames: bool,
    #[serde(default)]
    pub frame_start: i32,
    #[serde(default)]
    pub location: [f64; 3],
    pub cell: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub pbc: PbcSpec,
    pub repeat: Option<[usize; 3]>,
    pub radius_style: Option<String>,
    pub color_style: Option<String>,
    pub shape: Option<String>,
    pub scale: Option<f64>,
    pub model_style: Option<String>,
    #[serde(default)]
    pub species_props: BTreeMap<String, SpeciesProps>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeData>,
}

impl StructureFile {
    pub fn load(path: &Path) -> Result<Self, StructureLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| StructureLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| StructureLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}

#[derive(Debug, Error)]
pub enum StructureLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}
