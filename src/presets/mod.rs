//! Preset catalog: named bundles of tag filters ("Hospital", "Shelter").
//!
//! The catalog is a flat JSON object keyed by preset id (for example
//! `amenity/shelter`), each entry carrying a display name, a tag map where
//! the value `*` means any value, and a geometry list that restricts the
//! element types a match may produce. It is loaded once per session and
//! read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::ffs::{Condition, ConditionKind, ElementType, Expression, Pattern, TypeSet};

/// Geometry kinds a preset may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    Point,
    Vertex,
    Line,
    Area,
    Relation,
}

impl Geometry {
    /// The element types this geometry can materialize as.
    fn types(self) -> TypeSet {
        match self {
            Geometry::Point | Geometry::Vertex => TypeSet::only(ElementType::Node),
            Geometry::Line => TypeSet::only(ElementType::Way),
            Geometry::Area => {
                TypeSet::only(ElementType::Way).union(TypeSet::only(ElementType::Relation))
            }
            Geometry::Relation => TypeSet::only(ElementType::Relation),
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub geometry: Vec<Geometry>,
}

/// A preset resolved into compiler input.
#[derive(Debug, Clone)]
pub struct ResolvedPreset {
    /// The preset's tag filters, AND-folded in tag key order. None when
    /// the preset declares no tags.
    pub expr: Option<Expression>,
    /// Element types the preset's geometry allows.
    pub types: TypeSet,
}

/// The full catalog, keyed by preset id. BTreeMap keeps lookups and tag
/// iteration deterministic.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct PresetCatalog {
    presets: BTreeMap<String, Preset>,
}

impl PresetCatalog {
    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Presets: Failed to read catalog file {:?}", path))?;
        let catalog = Self::from_json(&raw)
            .with_context(|| format!("Presets: Failed to parse catalog file {:?}", path))?;
        tracing::info!("Loaded {} presets from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Look a display name up case-sensitively. When two presets share a
    /// name, the first in key order wins.
    pub fn resolve(&self, name: &str) -> Option<ResolvedPreset> {
        let preset = self.presets.values().find(|p| p.name == name)?;
        Some(resolve_preset(preset))
    }
}

fn resolve_preset(preset: &Preset) -> ResolvedPreset {
    let mut expr: Option<Expression> = None;
    for (key, value) in &preset.tags {
        let leaf = tag_leaf(key, value);
        expr = Some(match expr {
            Some(acc) => Expression::and(acc, leaf),
            None => leaf,
        });
    }

    let types = if preset.geometry.is_empty() {
        TypeSet::ALL
    } else {
        preset
            .geometry
            .iter()
            .fold(TypeSet::NONE, |acc, g| acc.union(g.types()))
    };

    ResolvedPreset { expr, types }
}

fn tag_leaf(key: &str, value: &str) -> Expression {
    let (kind, value) = if value == "*" {
        (ConditionKind::HasKey, String::new())
    } else {
        (ConditionKind::Equals, value.to_string())
    };
    Expression::Condition(Condition {
        key: Pattern::Literal(key.to_string()),
        kind,
        value: Pattern::Literal(value),
        case_insensitive: false,
    })
}

// The catalog is fetched once and cached for the whole session; compile
// calls that need it before the install observe None and fail fast.
static SESSION_CATALOG: OnceCell<PresetCatalog> = OnceCell::new();

/// Install the session catalog. Returns false when one is already in place.
pub fn install_session_catalog(catalog: PresetCatalog) -> bool {
    SESSION_CATALOG.set(catalog).is_ok()
}

/// The installed session catalog, if any.
pub fn session_catalog() -> Option<&'static PresetCatalog> {
    SESSION_CATALOG.get()
}
