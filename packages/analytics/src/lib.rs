#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident analytics for the staff dashboard.
//!
//! Everything here is computed from a feed snapshot in memory; nothing
//! queries the store.

use std::collections::BTreeMap;

use civic_map_analytics_models::{CategoryCount, IncidentSummary, SummaryParams, TrendPoint};
use civic_map_incident_models::{Incident, IncidentStatus};

/// Label used for incidents whose stored priority was unrecognised.
pub const UNKNOWN_PRIORITY: &str = "unknown";

fn counts(map: BTreeMap<String, u64>) -> Vec<CategoryCount> {
    map.into_iter()
        .map(|(name, count)| CategoryCount { name, count })
        .collect()
}

/// Rounds to one decimal place.
#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean hours between creation and resolution over incidents that have a
/// resolution time, rounded to one decimal. `0.0` when none do.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_resolution_hours<'a>(incidents: impl IntoIterator<Item = &'a Incident>) -> f64 {
    let (sum_secs, n) = incidents
        .into_iter()
        .filter_map(|i| i.resolved_at.map(|r| (r - i.created_at).num_seconds()))
        .fold((0_i64, 0_u32), |(sum, n), secs| (sum + secs, n + 1));

    if n == 0 {
        return 0.0;
    }

    round_one_decimal(sum_secs as f64 / 3600.0 / f64::from(n))
}

/// Summarises `incidents` within the `params` window.
#[must_use]
pub fn summarize(incidents: &[Incident], params: &SummaryParams) -> IncidentSummary {
    let selected: Vec<&Incident> = incidents
        .iter()
        .filter(|i| params.contains(i.created_at))
        .collect();

    let mut summary = IncidentSummary {
        total: selected.len() as u64,
        avg_resolution_hours: average_resolution_hours(selected.iter().copied()),
        ..IncidentSummary::default()
    };

    let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_priority: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_month: BTreeMap<String, u64> = BTreeMap::new();

    for incident in &selected {
        match incident.status {
            IncidentStatus::Pending => summary.pending += 1,
            IncidentStatus::InProgress => summary.in_progress += 1,
            IncidentStatus::Resolved => summary.resolved += 1,
            IncidentStatus::Closed => summary.closed += 1,
        }

        *by_type.entry(incident.incident_type.to_string()).or_default() += 1;
        *by_priority
            .entry(
                incident
                    .priority
                    .map_or_else(|| UNKNOWN_PRIORITY.to_string(), |p| p.to_string()),
            )
            .or_default() += 1;
        *by_month
            .entry(incident.created_at.format("%Y-%m").to_string())
            .or_default() += 1;
    }

    summary.by_type = counts(by_type);
    summary.by_priority = counts(by_priority);
    summary.trend = by_month
        .into_iter()
        .map(|(period, count)| TrendPoint { period, count })
        .collect();

    log::debug!(
        "Summarised {} of {} incident(s), avg resolution {}h",
        summary.total,
        incidents.len(),
        summary.avg_resolution_hours
    );

    summary
}
