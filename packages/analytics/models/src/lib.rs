#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident analytics result types for the staff dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional time window applied before summarising.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    /// Only incidents created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only incidents created before this instant.
    pub until: Option<DateTime<Utc>>,
}

impl SummaryParams {
    /// Whether `created_at` falls inside the window.
    #[must_use]
    pub fn contains(&self, created_at: DateTime<Utc>) -> bool {
        self.since.is_none_or(|since| created_at >= since)
            && self.until.is_none_or(|until| created_at < until)
    }
}

/// Count of incidents sharing a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Type, priority or status name.
    pub name: String,
    /// Number of incidents.
    pub count: u64,
}

/// Incidents created in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// `YYYY-MM`.
    pub period: String,
    /// Incidents created in that month.
    pub count: u64,
}

/// Dashboard summary over a set of incidents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSummary {
    /// Incidents considered.
    pub total: u64,
    /// Still pending.
    pub pending: u64,
    /// Being worked on.
    pub in_progress: u64,
    /// Resolved.
    pub resolved: u64,
    /// Closed without resolution.
    pub closed: u64,
    /// Mean hours from creation to resolution, one decimal, `0.0` when
    /// nothing has been resolved.
    pub avg_resolution_hours: f64,
    /// Counts per incident type, sorted by name.
    pub by_type: Vec<CategoryCount>,
    /// Counts per priority, sorted by name.
    pub by_priority: Vec<CategoryCount>,
    /// Monthly creation counts, oldest first.
    pub trend: Vec<TrendPoint>,
}
