#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the civic map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the store row types to allow independent evolution of the API
//! contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_map_incident_models::{
    CategoryFilter, Incident, IncidentPriority, IncidentStatus, IncidentType, Severity,
};
use civic_map_jurisdiction_models::{Coordinate, Jurisdiction};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// An incident type with its display label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncidentType {
    /// Wire value (`water`, `roads`, ...).
    pub value: IncidentType,
    /// Display label.
    pub label: String,
}

/// A severity level as offered on the report form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSeverity {
    /// Numeric value (1-5).
    pub value: Severity,
    /// Level name.
    pub name: String,
    /// Priority a submission at this severity is stored with.
    pub priority: IncidentPriority,
}

/// The incident taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCategories {
    /// Reportable incident types.
    pub types: Vec<ApiIncidentType>,
    /// Citizen severity scale.
    pub severities: Vec<ApiSeverity>,
    /// Back-office priorities.
    pub priorities: Vec<IncidentPriority>,
    /// Lifecycle statuses.
    pub statuses: Vec<IncidentStatus>,
    /// Category choices offered on the map view.
    pub map_filters: Vec<CategoryFilter>,
}

impl ApiCategories {
    /// Builds the full taxonomy.
    #[must_use]
    pub fn all() -> Self {
        Self {
            types: IncidentType::all()
                .iter()
                .map(|&t| ApiIncidentType {
                    value: t,
                    label: t.label().to_string(),
                })
                .collect(),
            severities: Severity::all()
                .iter()
                .map(|&s| ApiSeverity {
                    value: s,
                    name: s.to_string(),
                    priority: IncidentPriority::from_severity(s),
                })
                .collect(),
            priorities: IncidentPriority::all().to_vec(),
            statuses: IncidentStatus::all().to_vec(),
            map_filters: CategoryFilter::map_choices().to_vec(),
        }
    }
}

/// The jurisdiction catalog, grouped the way the report form shows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiJurisdictions {
    /// Metropolitan municipalities.
    pub metros: Vec<String>,
    /// District municipalities keyed by province.
    pub districts_by_province: BTreeMap<String, Vec<String>>,
    /// Jurisdiction used when no box matches.
    pub default: Jurisdiction,
}

/// Query parameters for the resolve endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResolveParams {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl From<ResolveParams> for Coordinate {
    fn from(p: ResolveParams) -> Self {
        Self::new(p.lat, p.lng)
    }
}

/// Query parameters for the incidents endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentQueryParams {
    /// Viewer latitude.
    pub lat: Option<f64>,
    /// Viewer longitude.
    pub lng: Option<f64>,
    /// Category selection, `all` when omitted.
    pub category: Option<CategoryFilter>,
}

impl IncidentQueryParams {
    /// The viewer's position, only when both halves were given.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.lat.zip(self.lng).map(|(lat, lng)| Coordinate::new(lat, lng))
    }
}

/// Freshness of the server's incident feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFeedStatus {
    /// `loading`, `fresh` or `stale`.
    pub state: String,
    /// When the snapshot was last replaced.
    pub updated_at: Option<DateTime<Utc>>,
    /// Last read failure, present only when stale.
    pub error: Option<String>,
    /// Incidents in the current snapshot.
    pub incident_count: usize,
}

/// Response from the incidents endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncidentList {
    /// Filtered incidents, newest first.
    pub incidents: Vec<Incident>,
    /// Jurisdiction the list was narrowed to, `None` when no position was
    /// given.
    pub jurisdiction: Option<Jurisdiction>,
    /// Whether the position fell inside a known box.
    pub matched: Option<bool>,
    /// Category applied.
    pub category: CategoryFilter,
    /// Feed freshness at the time of the read.
    pub feed: ApiFeedStatus,
}

/// Body of a citizen submission.
///
/// Required fields are optional here so validation can name the first one
/// that is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncidentRequest {
    /// Submitting user.
    #[serde(default)]
    pub reporter_id: String,
    /// Incident type (`water`, `electricity`, `roads`, `waste`, `other`).
    #[serde(rename = "type")]
    pub incident_type: Option<String>,
    /// Severity 1-5.
    pub severity: Option<u8>,
    /// Short cause used in the title.
    pub cause: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Reporter agreed to the terms.
    #[serde(default)]
    pub consent: bool,
    /// Reporter's position.
    pub coordinates: Option<Coordinate>,
    /// Location text overriding the generated one.
    pub location: Option<String>,
    /// Uploaded attachment reference.
    pub attachment: Option<String>,
    /// Municipality to file against, bypassing resolution.
    pub municipality_id: Option<String>,
}

/// Response to a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCreatedIncident {
    /// New incident id.
    pub id: String,
    /// Generated title.
    pub title: String,
    /// Stored priority.
    pub priority: IncidentPriority,
    /// Municipality the incident was filed against.
    pub municipality_id: String,
}

/// Body of a staff status update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    /// New status.
    pub status: IncidentStatus,
    /// Public update message.
    pub message: Option<String>,
    /// New estimated resolution time.
    pub eta: Option<DateTime<Utc>>,
    /// Staff member making the change.
    pub user_id: String,
}

/// Body of a voice report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceReportRequest {
    /// Speech-to-text transcript.
    #[serde(default)]
    pub transcript: String,
}

/// Error body returned with every 4xx/5xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps a message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
