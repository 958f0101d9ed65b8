//! Coordinate to jurisdiction resolution.
//!
//! Boxes are tested in catalog order and the first containing box wins.
//! Priority order, not geometric precision, decides overlaps: a point inside
//! both a metro box and a provincial fallback resolves to whichever is
//! listed first.

use std::sync::Arc;

use civic_map_jurisdiction_models::{Coordinate, Jurisdiction};
use serde::Serialize;

use crate::JurisdictionCatalog;

/// Outcome of a resolution, including whether the default was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// The resolved jurisdiction.
    pub jurisdiction: Jurisdiction,
    /// `false` when no box matched and the catalog default was returned.
    pub matched: bool,
}

/// Resolves coordinates against an injected [`JurisdictionCatalog`].
#[derive(Debug, Clone)]
pub struct LocationResolver {
    catalog: Arc<JurisdictionCatalog>,
}

impl LocationResolver {
    /// Creates a resolver over `catalog`.
    #[must_use]
    pub const fn new(catalog: Arc<JurisdictionCatalog>) -> Self {
        Self { catalog }
    }

    /// The catalog this resolver reads.
    #[must_use]
    pub fn catalog(&self) -> &JurisdictionCatalog {
        &self.catalog
    }

    /// Returns the jurisdiction for `coord`.
    ///
    /// Total: any input, including `NaN` and out-of-range values, yields a
    /// jurisdiction (the catalog default when no box matches).
    #[must_use]
    pub fn resolve(&self, coord: Coordinate) -> Jurisdiction {
        self.resolve_detailed(coord).jurisdiction
    }

    /// Like [`Self::resolve`], but reports whether a box actually matched.
    #[must_use]
    pub fn resolve_detailed(&self, coord: Coordinate) -> Resolution {
        if let Some(b) = self.catalog.boxes().iter().find(|b| b.contains(coord)) {
            return Resolution {
                jurisdiction: b.jurisdiction.clone(),
                matched: true,
            };
        }

        log::debug!(
            "No jurisdiction box contains ({}, {}), falling back to {}",
            coord.latitude,
            coord.longitude,
            self.catalog.default_jurisdiction()
        );

        Resolution {
            jurisdiction: self.catalog.default_jurisdiction().clone(),
            matched: false,
        }
    }

    /// Resolves an optional coordinate.
    ///
    /// An unavailable coordinate (permission denied, no fix) stays
    /// unresolved rather than defaulted, so downstream filtering does not
    /// narrow to an area the user is not in.
    #[must_use]
    pub fn resolve_optional(&self, coord: Option<Coordinate>) -> Option<Jurisdiction> {
        coord.map(|c| self.resolve(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_map_jurisdiction_models::{BoundingBox, JurisdictionKind};

    fn bundled() -> LocationResolver {
        LocationResolver::new(Arc::new(JurisdictionCatalog::south_africa()))
    }

    fn jurisdiction(name: &str, kind: JurisdictionKind, province: &str) -> Jurisdiction {
        Jurisdiction::new(name, kind, province)
    }

    #[test]
    fn johannesburg_resolves_to_metro() {
        let resolver = bundled();
        assert_eq!(
            resolver.resolve(Coordinate::new(-26.2, 28.0)),
            jurisdiction("City of Johannesburg", JurisdictionKind::Metro, "Gauteng")
        );
    }

    #[test]
    fn null_island_resolves_to_default() {
        let resolver = bundled();
        let resolution = resolver.resolve_detailed(Coordinate::new(0.0, 0.0));
        assert!(!resolution.matched);
        assert_eq!(
            resolution.jurisdiction,
            jurisdiction("Mangaung", JurisdictionKind::Metro, "Free State")
        );
    }

    #[test]
    fn resolve_is_total() {
        let resolver = bundled();
        let default = resolver.catalog().default_jurisdiction().clone();
        for coord in [
            Coordinate::new(f64::NAN, f64::NAN),
            Coordinate::new(f64::INFINITY, f64::NEG_INFINITY),
            Coordinate::new(1000.0, -1000.0),
            Coordinate::new(90.0, 180.0),
            Coordinate::new(-90.0, -180.0),
        ] {
            assert_eq!(resolver.resolve(coord), default);
        }
    }

    #[test]
    fn known_cities_resolve() {
        let resolver = bundled();
        let cases = [
            ((-33.92, 18.42), "City of Cape Town"),
            ((-29.86, 31.02), "eThekwini"),
            ((-33.96, 25.6), "Nelson Mandela Bay"),
            ((-33.0, 27.9), "Buffalo City"),
            ((-29.1, 26.2), "Mangaung"),
            ((-33.96, 22.46), "Garden Route"),
            ((-24.5, 29.45), "Waterberg"),
            ((-26.7, 27.1), "Waterberg"),
            ((-31.5, 29.5), "King Cetshwayo"),
            ((-26.7, 25.0), "Dr Kenneth Kaunda"),
        ];
        for ((lat, lng), expected) in cases {
            let resolution = resolver.resolve_detailed(Coordinate::new(lat, lng));
            assert!(resolution.matched, "({lat}, {lng}) did not match");
            assert_eq!(resolution.jurisdiction.name, expected, "({lat}, {lng})");
        }
    }

    #[test]
    fn johannesburg_wins_over_overlapping_tshwane() {
        // (-26.0, 28.0) sits in both the Johannesburg and Tshwane boxes.
        let resolver = bundled();
        assert_eq!(
            resolver.resolve(Coordinate::new(-26.0, 28.0)).name,
            "City of Johannesburg"
        );
    }

    #[test]
    fn earlier_box_wins_on_overlap() {
        let outer = jurisdiction("Outer", JurisdictionKind::District, "P");
        let inner = jurisdiction("Inner", JurisdictionKind::Metro, "P");
        let boxes = vec![
            BoundingBox {
                min_lat: -10.0,
                max_lat: 10.0,
                min_lng: -10.0,
                max_lng: 10.0,
                jurisdiction: outer.clone(),
            },
            BoundingBox {
                min_lat: -1.0,
                max_lat: 1.0,
                min_lng: -1.0,
                max_lng: 1.0,
                jurisdiction: inner.clone(),
            },
        ];
        let default = jurisdiction("Fallback", JurisdictionKind::Local, "P");
        let catalog = JurisdictionCatalog::new(boxes.clone(), default.clone()).unwrap();
        let resolver = LocationResolver::new(Arc::new(catalog));
        assert_eq!(resolver.resolve(Coordinate::new(0.0, 0.0)), outer);

        let reversed = JurisdictionCatalog::new(boxes.into_iter().rev().collect(), default).unwrap();
        let resolver = LocationResolver::new(Arc::new(reversed));
        assert_eq!(resolver.resolve(Coordinate::new(0.0, 0.0)), inner);
    }

    #[test]
    fn empty_catalog_always_defaults() {
        let default = jurisdiction("Only", JurisdictionKind::Local, "P");
        let catalog = JurisdictionCatalog::new(Vec::new(), default.clone()).unwrap();
        let resolver = LocationResolver::new(Arc::new(catalog));
        assert_eq!(resolver.resolve(Coordinate::new(-26.2, 28.0)), default);
    }

    #[test]
    fn missing_coordinate_stays_unresolved() {
        let resolver = bundled();
        assert_eq!(resolver.resolve_optional(None), None);
        assert_eq!(
            resolver
                .resolve_optional(Some(Coordinate::new(-26.2, 28.0)))
                .map(|j| j.name),
            Some("City of Johannesburg".to_string())
        );
    }
}
