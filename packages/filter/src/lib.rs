#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident filter pipeline.
//!
//! Two pure stages applied in a fixed order: jurisdiction proximity, then
//! category. Both stages preserve input order and never mutate their input.
//! An incident missing the field a stage tests is simply excluded by that
//! stage.

use civic_map_incident_models::{CategoryFilter, FilterState, Incident};
use civic_map_jurisdiction_models::Jurisdiction;

/// Returns `true` if `incident` is near `jurisdiction`.
///
/// Near means filed against the same municipality, or anywhere in the same
/// province, so sparse local data still shows provincial incidents.
#[must_use]
pub fn is_near(incident: &Incident, jurisdiction: &Jurisdiction) -> bool {
    incident.jurisdiction_name.as_deref() == Some(jurisdiction.name.as_str())
        || incident.province.as_deref() == Some(jurisdiction.province.as_str())
}

/// Stage 1: keeps incidents near `jurisdiction`.
///
/// An unresolved jurisdiction (`None`) passes everything through.
pub fn by_jurisdiction<'a>(
    incidents: impl IntoIterator<Item = &'a Incident>,
    jurisdiction: Option<&'a Jurisdiction>,
) -> impl Iterator<Item = &'a Incident> {
    incidents
        .into_iter()
        .filter(move |i| jurisdiction.is_none_or(|j| is_near(i, j)))
}

/// Stage 2: keeps incidents matching `category`.
pub fn by_category<'a>(
    incidents: impl IntoIterator<Item = &'a Incident>,
    category: CategoryFilter,
) -> impl Iterator<Item = &'a Incident> {
    incidents
        .into_iter()
        .filter(move |i| category.matches(i.incident_type))
}

/// Runs both stages and returns a new list.
#[must_use]
pub fn filter(
    incidents: &[Incident],
    jurisdiction: Option<&Jurisdiction>,
    category: CategoryFilter,
) -> Vec<Incident> {
    by_category(by_jurisdiction(incidents, jurisdiction), category)
        .cloned()
        .collect()
}

/// Runs the pipeline with the selections held in a [`FilterState`].
#[must_use]
pub fn apply(incidents: &[Incident], state: &FilterState) -> Vec<Incident> {
    filter(
        incidents,
        state.resolved_jurisdiction.as_ref(),
        state.selected_category,
    )
}
