//! Citizen submission validation.
//!
//! Turns a [`NewIncidentRequest`] into a [`NewIncident`] ready for the
//! store: required fields are checked in form order, the priority is
//! derived from the severity, and the municipality is taken from the
//! request or resolved from the reporter's position.

use civic_map_database_models::NewIncident;
use civic_map_feed::{FeedError, IncidentStore};
use civic_map_incident_models::{IncidentPriority, IncidentStatus, IncidentType, Severity};
use civic_map_jurisdiction::{LocationResolver, Resolution};
use civic_map_jurisdiction_models::Coordinate;
use civic_map_server_models::NewIncidentRequest;
use thiserror::Error;

const DEFAULT_CAUSE: &str = "Reported by citizen";
const LOCATION_UNAVAILABLE: &str = "Location unavailable";

/// A submission the reporter has to fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent or blank.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },

    /// A field is present but not acceptable.
    #[error("Invalid {field}: {message}")]
    Invalid {
        /// Wire name of the field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The reporter did not agree to the terms.
    #[error("Consent is required to submit a report")]
    ConsentRequired,

    /// Neither an explicit municipality nor a resolvable position.
    #[error("municipality could not be determined")]
    UnknownMunicipality,
}

/// Errors from [`prepare`].
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The request is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The municipality lookup failed.
    #[error(transparent)]
    Store(#[from] FeedError),
}

/// Generated incident title, e.g. `"Water Issue - Burst pipe"`.
#[must_use]
pub fn title(incident_type: IncidentType, cause: Option<&str>) -> String {
    let cause = cause
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CAUSE);
    format!("{} Issue - {cause}", incident_type.label())
}

/// Location text shown in lists.
///
/// An explicit location wins. Otherwise the coordinate with six decimals
/// and the name of the jurisdiction it resolved to.
#[must_use]
pub fn location_text(
    explicit: Option<&str>,
    coordinates: Option<Coordinate>,
    jurisdiction_name: Option<&str>,
) -> String {
    if let Some(text) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return text.to_string();
    }

    match (coordinates, jurisdiction_name) {
        (Some(c), Some(name)) => format!("{:.6}, {:.6} ({name})", c.latitude, c.longitude),
        (Some(c), None) => format!("{:.6}, {:.6}", c.latitude, c.longitude),
        (None, _) => LOCATION_UNAVAILABLE.to_string(),
    }
}

fn required_text<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField { field })
}

/// Checks the fields the reporter fills in, in form order, and returns the
/// parsed type and severity.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate(req: &NewIncidentRequest) -> Result<(IncidentType, Severity), ValidationError> {
    let raw_type = required_text(req.incident_type.as_deref(), "type")?;
    let incident_type: IncidentType = raw_type
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| ValidationError::Invalid {
            field: "type",
            message: format!("unknown incident type '{raw_type}'"),
        })?;

    let raw_severity = req
        .severity
        .ok_or(ValidationError::MissingField { field: "severity" })?;
    let severity = Severity::from_value(raw_severity).map_err(|e| ValidationError::Invalid {
        field: "severity",
        message: e.to_string(),
    })?;

    required_text(req.description.as_deref(), "description")?;

    if !req.consent {
        return Err(ValidationError::ConsentRequired);
    }

    required_text(Some(req.reporter_id.as_str()), "reporterId")?;

    Ok((incident_type, severity))
}

/// Validates `req` and builds the row to insert.
///
/// # Errors
///
/// Returns [`SubmissionError::Validation`] if the request is invalid or no
/// municipality can be determined, and [`SubmissionError::Store`] if the
/// municipality lookup fails.
pub async fn prepare(
    req: &NewIncidentRequest,
    resolver: &LocationResolver,
    store: &dyn IncidentStore,
) -> Result<NewIncident, SubmissionError> {
    let (incident_type, severity) = validate(req)?;

    let resolution: Option<Resolution> = req.coordinates.map(|c| resolver.resolve_detailed(c));

    let explicit_id = req
        .municipality_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    if let Some(id) = explicit_id
        && uuid::Uuid::parse_str(id).is_err()
    {
        return Err(ValidationError::Invalid {
            field: "municipalityId",
            message: format!("'{id}' is not a UUID"),
        }
        .into());
    }

    let municipality_id = match (explicit_id, &resolution) {
        (Some(id), _) => id.to_string(),
        (None, Some(resolution)) => {
            if !resolution.matched {
                log::warn!(
                    "Submission position outside every known box, filing against default {}",
                    resolution.jurisdiction.name
                );
            }
            store
                .find_municipality_id(&resolution.jurisdiction.name)
                .await?
                .ok_or(ValidationError::UnknownMunicipality)?
        }
        (None, None) => return Err(ValidationError::UnknownMunicipality.into()),
    };

    let description = req.description.as_deref().unwrap_or_default().trim();

    Ok(NewIncident {
        reporter_id: req.reporter_id.trim().to_string(),
        municipality_id,
        incident_type,
        priority: IncidentPriority::from_severity(severity),
        status: IncidentStatus::Pending,
        title: title(incident_type, req.cause.as_deref()),
        description: description.to_string(),
        coordinates: req.coordinates,
        location_address: location_text(
            req.location.as_deref(),
            req.coordinates,
            resolution.as_ref().map(|r| r.jurisdiction.name.as_str()),
        ),
        images: req
            .attachment
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(ToString::to_string)
            .collect(),
    })
}
