#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate, jurisdiction and bounding-box reference types.
//!
//! A jurisdiction is the administrative area (metro, district or local
//! municipality) that incidents are scoped to. Bounding boxes are coarse
//! axis-aligned approximations of a jurisdiction's extent and are only ever
//! tested for point containment.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS-84 point in decimal degrees.
///
/// No range validation is performed; out-of-range values are carried as-is
/// and simply fail every containment test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude in decimal degrees (negative south of the equator).
    pub latitude: f64,
    /// Longitude in decimal degrees (negative west of Greenwich).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from a latitude/longitude pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Administrative level of a [`Jurisdiction`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JurisdictionKind {
    /// Metropolitan municipality (category A).
    Metro,
    /// District municipality (category C).
    District,
    /// Local municipality (category B).
    Local,
}

/// An administrative area incidents are attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jurisdiction {
    /// Municipality name (e.g. "City of Johannesburg").
    pub name: String,
    /// Administrative level.
    pub kind: JurisdictionKind,
    /// Province the municipality belongs to (e.g. "Gauteng").
    pub province: String,
}

impl Jurisdiction {
    /// Creates a jurisdiction.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: JurisdictionKind, province: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            province: province.into(),
        }
    }
}

impl std::fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.kind, self.province)
    }
}

/// An axis-aligned latitude/longitude rectangle standing in for a
/// jurisdiction's extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub min_lat: f64,
    /// Northern latitude boundary.
    pub max_lat: f64,
    /// Western longitude boundary.
    pub min_lng: f64,
    /// Eastern longitude boundary.
    pub max_lng: f64,
    /// Jurisdiction this box resolves to.
    pub jurisdiction: Jurisdiction,
}

impl BoundingBox {
    /// Returns `true` if `coord` lies inside the box. Bounds are inclusive.
    ///
    /// `NaN` components never match.
    #[must_use]
    pub fn contains(&self, coord: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coord.latitude)
            && (self.min_lng..=self.max_lng).contains(&coord.longitude)
    }

    /// Returns `true` if both axes are well-formed (`min <= max`, no `NaN`).
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.min_lat <= self.max_lat && self.min_lng <= self.max_lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jhb_box() -> BoundingBox {
        BoundingBox {
            min_lat: -26.8,
            max_lat: -25.8,
            min_lng: 27.5,
            max_lng: 28.8,
            jurisdiction: Jurisdiction::new(
                "City of Johannesburg",
                JurisdictionKind::Metro,
                "Gauteng",
            ),
        }
    }

    #[test]
    fn contains_is_inclusive_on_every_edge() {
        let b = jhb_box();
        assert!(b.contains(Coordinate::new(-26.8, 27.5)));
        assert!(b.contains(Coordinate::new(-25.8, 28.8)));
        assert!(b.contains(Coordinate::new(-26.2, 28.0)));
        assert!(!b.contains(Coordinate::new(-25.79, 28.0)));
        assert!(!b.contains(Coordinate::new(-26.2, 28.81)));
    }

    #[test]
    fn nan_never_matches() {
        let b = jhb_box();
        assert!(!b.contains(Coordinate::new(f64::NAN, 28.0)));
        assert!(!b.contains(Coordinate::new(-26.2, f64::NAN)));
    }

    #[test]
    fn kind_uses_lowercase_names() {
        assert_eq!(JurisdictionKind::Metro.to_string(), "metro");
        assert_eq!(
            "district".parse::<JurisdictionKind>().unwrap(),
            JurisdictionKind::District
        );
        assert_eq!(
            serde_json::to_string(&JurisdictionKind::Local).unwrap(),
            "\"local\""
        );
    }

    #[test]
    fn inverted_box_is_not_well_formed() {
        let mut b = jhb_box();
        assert!(b.is_well_formed());
        b.min_lat = -25.0;
        assert!(!b.is_well_formed());
    }
}
