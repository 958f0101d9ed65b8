//! Read-only jurisdiction reference data.
//!
//! A [`JurisdictionCatalog`] owns the ordered bounding boxes the resolver
//! walks, the default jurisdiction returned when nothing matches, and the
//! metro/district tables used for validation and listing.

use std::collections::BTreeMap;
use std::path::Path;

use civic_map_jurisdiction_models::{BoundingBox, Jurisdiction, JurisdictionKind};
use serde::Deserialize;

use crate::CatalogError;

/// Bundled South African catalog, embedded at compile time.
const SOUTH_AFRICA_TOML: &str = include_str!("../catalogs/south_africa.toml");

/// On-disk catalog layout.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    default: Jurisdiction,
    #[serde(default)]
    metros: Vec<MetroDef>,
    #[serde(default)]
    districts: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    locals: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    boxes: Vec<BoxDef>,
}

#[derive(Debug, Deserialize)]
struct MetroDef {
    name: String,
    province: String,
}

#[derive(Debug, Deserialize)]
struct BoxDef {
    name: String,
    kind: JurisdictionKind,
    province: String,
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
}

impl From<BoxDef> for BoundingBox {
    fn from(def: BoxDef) -> Self {
        Self {
            min_lat: def.min_lat,
            max_lat: def.max_lat,
            min_lng: def.min_lng,
            max_lng: def.max_lng,
            jurisdiction: Jurisdiction::new(def.name, def.kind, def.province),
        }
    }
}

/// Immutable jurisdiction reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct JurisdictionCatalog {
    boxes: Vec<BoundingBox>,
    default: Jurisdiction,
    /// Every known jurisdiction, metros first, then districts and locals by
    /// province.
    known: Vec<Jurisdiction>,
}

impl JurisdictionCatalog {
    /// Builds a catalog from an ordered box list and a default.
    ///
    /// No reference tables are attached, so box jurisdictions are not
    /// checked against them; use this for synthetic catalogs.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Invalid`] if any box is malformed.
    pub fn new(boxes: Vec<BoundingBox>, default: Jurisdiction) -> Result<Self, CatalogError> {
        let catalog = Self {
            boxes,
            default,
            known: Vec::new(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Returns the bundled South African catalog.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (this is a compile-time
    /// guarantee since the file is embedded and covered by tests).
    #[must_use]
    pub fn south_africa() -> Self {
        Self::from_toml_str(SOUTH_AFRICA_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse south_africa.toml: {e}"))
    }

    /// Parses and validates a catalog from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the TOML is malformed or the catalog
    /// violates an invariant.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(toml_str)?;

        let mut known: Vec<Jurisdiction> = file
            .metros
            .into_iter()
            .map(|m| Jurisdiction::new(m.name, JurisdictionKind::Metro, m.province))
            .collect();
        for (kind, table) in [
            (JurisdictionKind::District, file.districts),
            (JurisdictionKind::Local, file.locals),
        ] {
            for (province, names) in table {
                known.extend(
                    names
                        .into_iter()
                        .map(|name| Jurisdiction::new(name, kind, province.clone())),
                );
            }
        }

        let catalog = Self {
            boxes: file.boxes.into_iter().map(BoundingBox::from).collect(),
            default: file.default,
            known,
        };
        catalog.validate()?;

        log::debug!(
            "Loaded jurisdiction catalog: {} boxes, {} known jurisdictions, default {}",
            catalog.boxes.len(),
            catalog.known.len(),
            catalog.default
        );

        Ok(catalog)
    }

    /// Reads a catalog TOML file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or is invalid.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.default.name.trim().is_empty() {
            return Err(CatalogError::Invalid {
                message: "default jurisdiction has an empty name".to_string(),
            });
        }

        for (idx, b) in self.boxes.iter().enumerate() {
            if !b.is_well_formed() {
                return Err(CatalogError::Invalid {
                    message: format!(
                        "box #{idx} for {} has inverted or NaN bounds",
                        b.jurisdiction.name
                    ),
                });
            }
        }

        if self.known.is_empty() {
            return Ok(());
        }

        if !self.known.contains(&self.default) {
            return Err(CatalogError::Invalid {
                message: format!("default jurisdiction {} is not in the catalog", self.default),
            });
        }

        for (idx, b) in self.boxes.iter().enumerate() {
            if !self.known.contains(&b.jurisdiction) {
                return Err(CatalogError::Invalid {
                    message: format!("box #{idx} names unknown jurisdiction {}", b.jurisdiction),
                });
            }
        }

        Ok(())
    }

    /// Bounding boxes in priority order.
    #[must_use]
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Jurisdiction returned when no box contains a coordinate.
    #[must_use]
    pub const fn default_jurisdiction(&self) -> &Jurisdiction {
        &self.default
    }

    /// Every jurisdiction listed in the reference tables.
    #[must_use]
    pub fn jurisdictions(&self) -> &[Jurisdiction] {
        &self.known
    }

    /// Jurisdictions of the given kind, in catalog order.
    pub fn of_kind(&self, kind: JurisdictionKind) -> impl Iterator<Item = &Jurisdiction> {
        self.known.iter().filter(move |j| j.kind == kind)
    }

    /// Districts grouped by province, provinces sorted by name.
    #[must_use]
    pub fn districts_by_province(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut map: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for j in self.of_kind(JurisdictionKind::District) {
            map.entry(j.province.as_str()).or_default().push(j.name.as_str());
        }
        map
    }

    /// Sorted, de-duplicated province names.
    #[must_use]
    pub fn provinces(&self) -> Vec<&str> {
        let mut provinces: Vec<&str> = self.known.iter().map(|j| j.province.as_str()).collect();
        provinces.sort_unstable();
        provinces.dedup();
        provinces
    }

    /// Looks up a jurisdiction by exact name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Jurisdiction> {
        self.known
            .iter()
            .chain(self.boxes.iter().map(|b| &b.jurisdiction))
            .chain(std::iter::once(&self.default))
            .find(|j| j.name == name)
    }

    /// Case-insensitive substring search over jurisdiction and province
    /// names. An empty query returns everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Jurisdiction> {
        let needle = query.trim().to_lowercase();
        self.known
            .iter()
            .filter(|j| {
                needle.is_empty()
                    || j.name.to_lowercase().contains(&needle)
                    || j.province.to_lowercase().contains(&needle)
            })
            .collect()
    }
}
