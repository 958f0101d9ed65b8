#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types and write parameters.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the relational store. They are distinct from the feed's [`Incident`] and
//! from the REST types in `civic_map_server_models`; enum columns are kept
//! as raw strings here and only interpreted by [`IncidentRow::into_incident`].

use chrono::{DateTime, Utc};
use civic_map_incident_models::{
    Incident, IncidentPriority, IncidentStatus, IncidentType, Severity,
};
use civic_map_jurisdiction_models::Coordinate;
use serde::{Deserialize, Serialize};

/// Location text for rows with neither an address nor a title.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// An incident row joined with its municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRow {
    /// UUID as text.
    pub id: String,
    /// Raw `incident_type` column.
    pub incident_type: String,
    /// Raw `priority` column.
    pub priority: Option<String>,
    /// Raw `status` column.
    pub status: String,
    /// Short title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Address or coordinate text.
    pub location_address: Option<String>,
    /// Reported latitude.
    pub location_lat: Option<f64>,
    /// Reported longitude.
    pub location_lng: Option<f64>,
    /// Joined `municipalities.name`.
    pub municipality_name: Option<String>,
    /// Joined `municipalities.province`.
    pub province: Option<String>,
    /// Staff ETA.
    pub estimated_resolution_time: Option<DateTime<Utc>>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Resolution time.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl IncidentRow {
    /// Interprets the raw columns into a feed [`Incident`].
    ///
    /// Unknown enum strings never fail the row: the type falls back to
    /// `other`, the status to `pending`, and an unrecognised priority is
    /// dropped so the displayed severity becomes 1. A row without address
    /// text shows its title, or [`UNKNOWN_LOCATION`] if that is blank too.
    #[must_use]
    pub fn into_incident(self) -> Incident {
        let incident_type = self.incident_type.parse().unwrap_or_else(|_| {
            log::warn!(
                "Incident {} has unknown type '{}', treating as other",
                self.id,
                self.incident_type
            );
            IncidentType::Other
        });

        let status = self.status.parse().unwrap_or_else(|_| {
            log::warn!(
                "Incident {} has unknown status '{}', treating as pending",
                self.id,
                self.status
            );
            IncidentStatus::Pending
        });

        let priority = self.priority.as_deref().and_then(|p| {
            p.parse::<IncidentPriority>()
                .inspect_err(|_| {
                    log::warn!("Incident {} has unknown priority '{p}'", self.id);
                })
                .ok()
        });

        let coordinates = match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        };

        let location = [self.location_address.as_deref(), Some(self.title.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|text| !text.is_empty())
            .unwrap_or(UNKNOWN_LOCATION)
            .to_string();

        Incident {
            id: self.id,
            incident_type,
            severity: Severity::from_priority(priority),
            priority,
            status,
            title: self.title,
            description: self.description,
            location: Some(location),
            jurisdiction_name: self.municipality_name,
            province: self.province,
            coordinates,
            eta: self.estimated_resolution_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
            resolved_at: self.resolved_at,
        }
    }
}

/// A validated citizen submission ready to insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    /// Submitting user.
    pub reporter_id: String,
    /// Store id of the municipality the incident is filed against.
    pub municipality_id: String,
    /// Incident category.
    pub incident_type: IncidentType,
    /// Priority derived from the submitted severity.
    pub priority: IncidentPriority,
    /// Initial status, normally `pending`.
    pub status: IncidentStatus,
    /// Generated title.
    pub title: String,
    /// Reporter's description.
    pub description: String,
    /// Reported position.
    pub coordinates: Option<Coordinate>,
    /// Location text shown in lists.
    pub location_address: String,
    /// Attachment references.
    pub images: Vec<String>,
}

/// A staff status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// New status.
    pub status: IncidentStatus,
    /// Optional public update message.
    pub message: Option<String>,
    /// Optional new ETA.
    pub eta: Option<DateTime<Utc>>,
    /// Staff member making the change.
    pub user_id: String,
}

/// A `municipalities` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunicipalityRow {
    /// UUID as text.
    pub id: String,
    /// Municipality name, matching the catalog.
    pub name: String,
    /// Short code.
    pub code: String,
    /// `metro`, `district` or `local`.
    pub kind: String,
    /// Province name.
    pub province: String,
}

/// Cheap summary of the incidents table used to detect changes by polling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFingerprint {
    /// Row count.
    pub count: i64,
    /// Latest `updated_at`.
    pub max_updated_at: Option<DateTime<Utc>>,
    /// Latest `created_at`.
    pub max_created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn row() -> IncidentRow {
        IncidentRow {
            id: "7b0d".to_string(),
            incident_type: "water".to_string(),
            priority: Some("high".to_string()),
            status: "in_progress".to_string(),
            title: "Water Issue - Burst pipe".to_string(),
            description: "Main burst on Long Street".to_string(),
            location_address: Some("-33.920000, 18.420000 (City of Cape Town)".to_string()),
            location_lat: Some(-33.92),
            location_lng: Some(18.42),
            municipality_name: Some("City of Cape Town".to_string()),
            province: Some("Western Cape".to_string()),
            estimated_resolution_time: None,
            created_at: Utc.with_ymd_and_hms(2025, 4, 2, 9, 30, 0).unwrap(),
            updated_at: None,
            resolved_at: None,
        }
    }

    #[test]
    fn known_columns_convert() {
        let incident = row().into_incident();
        assert_eq!(incident.incident_type, IncidentType::Water);
        assert_eq!(incident.status, IncidentStatus::InProgress);
        assert_eq!(incident.priority, Some(IncidentPriority::High));
        assert_eq!(incident.severity, Severity::High);
        assert_eq!(incident.coordinates, Some(Coordinate::new(-33.92, 18.42)));
        assert_eq!(incident.jurisdiction_name.as_deref(), Some("City of Cape Town"));
    }

    #[test]
    fn unknown_strings_fall_back() {
        let incident = IncidentRow {
            incident_type: "sinkhole".to_string(),
            priority: Some("urgent".to_string()),
            status: "escalated".to_string(),
            ..row()
        }
        .into_incident();
        assert_eq!(incident.incident_type, IncidentType::Other);
        assert_eq!(incident.status, IncidentStatus::Pending);
        assert_eq!(incident.priority, None);
        assert_eq!(incident.severity, Severity::Minor);
    }

    #[test]
    fn missing_address_falls_back_to_title_then_placeholder() {
        let incident = row().into_incident();
        assert_eq!(
            incident.location.as_deref(),
            Some("-33.920000, 18.420000 (City of Cape Town)")
        );

        let incident = IncidentRow {
            location_address: None,
            ..row()
        }
        .into_incident();
        assert_eq!(incident.location.as_deref(), Some("Water Issue - Burst pipe"));

        let incident = IncidentRow {
            location_address: Some("  ".to_string()),
            title: String::new(),
            ..row()
        }
        .into_incident();
        assert_eq!(incident.location.as_deref(), Some(UNKNOWN_LOCATION));
    }

    #[test]
    fn half_a_coordinate_is_no_coordinate() {
        let incident = IncidentRow {
            location_lng: None,
            ..row()
        }
        .into_incident();
        assert_eq!(incident.coordinates, None);
    }
}
