#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Municipal incident taxonomy types.
//!
//! Defines the incident categories citizens can report, the priority and
//! status enums the municipal back office works with, and the 1-5 severity
//! scale shown to citizens. The same taxonomy is used by the store, the
//! filter pipeline, the REST API and the voice-report classifier.

use chrono::{DateTime, Utc};
use civic_map_jurisdiction_models::{Coordinate, Jurisdiction};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Severity level of an incident, from 1 (minor) to 5 (critical).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    /// Level 1: low impact
    Minor = 1,
    /// Level 2: some inconvenience
    Low = 2,
    /// Level 3: moderate impact
    Medium = 3,
    /// Level 4: significant disruption
    High = 4,
    /// Level 5: emergency
    Critical = 5,
}

impl Severity {
    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-5.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Minor),
            2 => Ok(Self::Low),
            3 => Ok(Self::Medium),
            4 => Ok(Self::High),
            5 => Ok(Self::Critical),
            _ => Err(InvalidSeverityError { value }),
        }
    }

    /// Severity displayed for a stored priority.
    ///
    /// Incidents without a recognised priority are shown as minor.
    #[must_use]
    pub const fn from_priority(priority: Option<IncidentPriority>) -> Self {
        match priority {
            None | Some(IncidentPriority::Low) => Self::Minor,
            Some(IncidentPriority::Medium) => Self::Medium,
            Some(IncidentPriority::High) => Self::High,
            Some(IncidentPriority::Critical) => Self::Critical,
        }
    }

    /// Returns all severity levels in ascending order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Minor,
            Self::Low,
            Self::Medium,
            Self::High,
            Self::Critical,
        ]
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.value()
    }
}

impl TryFrom<u8> for Severity {
    type Error = InvalidSeverityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Error returned when attempting to create a [`Severity`] from an invalid
/// numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity value {}: expected 1-5", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// Kind of municipal service problem being reported.
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
pub enum IncidentType {
    /// Burst pipes, outages, leaks, water quality
    Water,
    /// Power outages, damaged lines, streetlights
    Electricity,
    /// Potholes, damaged signage, blocked roads
    Roads,
    /// Missed collections, illegal dumping
    Waste,
    /// Anything not fitting the other categories
    Other,
}

impl IncidentType {
    /// Human-readable label used in titles and menus.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Water => "Water",
            Self::Electricity => "Electricity",
            Self::Roads => "Roads",
            Self::Waste => "Waste",
            Self::Other => "Other",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Water,
            Self::Electricity,
            Self::Roads,
            Self::Waste,
            Self::Other,
        ]
    }
}

/// Back-office triage priority.
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
pub enum IncidentPriority {
    /// Minor cosmetic or non-urgent issues
    Low,
    /// Standard maintenance issues
    Medium,
    /// Service disruptions affecting many people
    High,
    /// Safety hazards, major infrastructure failures, emergencies
    Critical,
}

impl IncidentPriority {
    /// Priority stored for a citizen-submitted severity.
    #[must_use]
    pub const fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Minor | Severity::Low => Self::Low,
            Severity::Medium => Self::Medium,
            Severity::High => Self::High,
            Severity::Critical => Self::Critical,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }
}

/// Lifecycle status of an incident.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncidentStatus {
    /// Submitted, not yet picked up
    Pending,
    /// Assigned and being worked on
    InProgress,
    /// Fixed
    Resolved,
    /// Closed without further action
    Closed,
}

impl IncidentStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::InProgress, Self::Resolved, Self::Closed]
    }
}

/// Category selection applied by the filter pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CategoryFilter {
    /// No category narrowing.
    #[default]
    All,
    /// Only incidents of the given type.
    Type(IncidentType),
}

impl CategoryFilter {
    /// Returns `true` if an incident of `incident_type` passes this filter.
    #[must_use]
    pub fn matches(self, incident_type: IncidentType) -> bool {
        match self {
            Self::All => true,
            Self::Type(t) => t == incident_type,
        }
    }

    /// The category choices offered on the map view.
    #[must_use]
    pub const fn map_choices() -> &'static [Self] {
        &[
            Self::All,
            Self::Type(IncidentType::Water),
            Self::Type(IncidentType::Electricity),
            Self::Type(IncidentType::Roads),
        ]
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Type(t) => write!(f, "{t}"),
        }
    }
}

impl std::str::FromStr for CategoryFilter {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.to_ascii_lowercase().parse().map(Self::Type)
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.to_string()
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A reported incident as held in the feed cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Store identifier.
    pub id: String,
    /// Incident category.
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Citizen-facing severity, derived from the stored priority.
    pub severity: Severity,
    /// Stored triage priority, `None` if the store value was unrecognised.
    pub priority: Option<IncidentPriority>,
    /// Lifecycle status.
    pub status: IncidentStatus,
    /// Short title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Address or coordinate text shown in lists.
    pub location: Option<String>,
    /// Name of the municipality the incident was filed against.
    pub jurisdiction_name: Option<String>,
    /// Province of that municipality.
    pub province: Option<String>,
    /// Reported position, if the reporter shared one.
    pub coordinates: Option<Coordinate>,
    /// Estimated resolution time set by staff.
    pub eta: Option<DateTime<Utc>>,
    /// When the incident was submitted.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
    /// When staff marked the incident resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Per-session view filter.
///
/// Owned by whoever renders the list; resetting it touches nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Selected category.
    pub selected_category: CategoryFilter,
    /// Jurisdiction resolved from the viewer's location, `None` if unknown.
    pub resolved_jurisdiction: Option<Jurisdiction>,
}

impl FilterState {
    /// Clears the selection back to "all incidents, location unknown".
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
