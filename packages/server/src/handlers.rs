//! HTTP handler functions for the civic map API.

use actix_web::{HttpResponse, web};
use civic_map_ai::classify_transcript;
use civic_map_analytics_models::SummaryParams;
use civic_map_database_models::StatusChange;
use civic_map_feed::FeedStatus;
use civic_map_incident_models::{CategoryFilter, FilterState};
use civic_map_jurisdiction_models::JurisdictionKind;
use civic_map_server_models::{
    ApiCategories, ApiCreatedIncident, ApiError, ApiFeedStatus, ApiHealth, ApiIncidentList,
    ApiJurisdictions, IncidentQueryParams, NewIncidentRequest, ResolveParams,
    StatusUpdateRequest, VoiceReportRequest,
};

use crate::AppState;
use crate::submission::{self, SubmissionError};

fn error(mut builder: actix_web::HttpResponseBuilder, message: impl Into<String>) -> HttpResponse {
    builder.json(ApiError::new(message))
}

/// Converts the cache's status into its API shape.
fn feed_status(status: &FeedStatus, incident_count: usize) -> ApiFeedStatus {
    let (state, error) = match status {
        FeedStatus::Loading => ("loading", None),
        FeedStatus::Fresh { .. } => ("fresh", None),
        FeedStatus::Stale { error, .. } => ("stale", Some(error.clone())),
    };

    ApiFeedStatus {
        state: state.to_string(),
        updated_at: status.last_updated(),
        error,
        incident_count,
    }
}

fn current_feed_status(state: &AppState) -> ApiFeedStatus {
    feed_status(&state.feed.status(), state.feed.current().len())
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/categories`
///
/// Returns the incident taxonomy: types with labels, the severity scale,
/// priorities, statuses and the map's category choices.
pub async fn categories() -> HttpResponse {
    HttpResponse::Ok().json(ApiCategories::all())
}

/// `GET /api/jurisdictions`
pub async fn jurisdictions(state: web::Data<AppState>) -> HttpResponse {
    let catalog = state.resolver.catalog();

    HttpResponse::Ok().json(ApiJurisdictions {
        metros: catalog
            .of_kind(JurisdictionKind::Metro)
            .map(|j| j.name.clone())
            .collect(),
        districts_by_province: catalog
            .districts_by_province()
            .into_iter()
            .map(|(province, districts)| {
                (
                    province.to_string(),
                    districts.into_iter().map(ToString::to_string).collect(),
                )
            })
            .collect(),
        default: catalog.default_jurisdiction().clone(),
    })
}

/// `GET /api/resolve?lat=..&lng=..`
pub async fn resolve(
    state: web::Data<AppState>,
    params: web::Query<ResolveParams>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.resolver.resolve_detailed(params.into_inner().into()))
}

/// `GET /api/incidents`
///
/// Filters the current feed snapshot to the viewer's jurisdiction (when
/// both coordinates are given) and the selected category.
pub async fn incidents(
    state: web::Data<AppState>,
    params: web::Query<IncidentQueryParams>,
) -> HttpResponse {
    let snapshot = state.feed.current();
    let status = state.feed.status();

    let resolution = params
        .coordinate()
        .map(|c| state.resolver.resolve_detailed(c));

    let filter = FilterState {
        selected_category: params.category.unwrap_or(CategoryFilter::All),
        resolved_jurisdiction: resolution.as_ref().map(|r| r.jurisdiction.clone()),
    };

    let incidents = civic_map_filter::apply(&snapshot, &filter);

    log::debug!(
        "Serving {} of {} incident(s) for {:?} / {}",
        incidents.len(),
        snapshot.len(),
        filter.resolved_jurisdiction.as_ref().map(|j| j.name.as_str()),
        filter.selected_category
    );

    HttpResponse::Ok().json(ApiIncidentList {
        incidents,
        matched: resolution.as_ref().map(|r| r.matched),
        jurisdiction: filter.resolved_jurisdiction,
        category: filter.selected_category,
        feed: feed_status(&status, snapshot.len()),
    })
}

/// `POST /api/incidents`
pub async fn create_incident(
    state: web::Data<AppState>,
    body: web::Json<NewIncidentRequest>,
) -> HttpResponse {
    let row = match submission::prepare(&body, &state.resolver, state.store.as_ref()).await {
        Ok(row) => row,
        Err(SubmissionError::Validation(e)) => {
            log::debug!("Rejected submission: {e}");
            return error(HttpResponse::BadRequest(), e.to_string());
        }
        Err(SubmissionError::Store(e)) => {
            log::error!("Failed to look up municipality: {e}");
            return error(
                HttpResponse::InternalServerError(),
                "Failed to look up municipality",
            );
        }
    };

    match state.store.insert(&row).await {
        Ok(id) => {
            log::info!("Created incident {id}: {}", row.title);
            HttpResponse::Created().json(ApiCreatedIncident {
                id,
                title: row.title,
                priority: row.priority,
                municipality_id: row.municipality_id,
            })
        }
        Err(e) => {
            log::error!("Failed to insert incident: {e}");
            error(HttpResponse::InternalServerError(), "Failed to create incident")
        }
    }
}

/// `PATCH /api/incidents/{id}/status`
pub async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    if uuid::Uuid::parse_str(&id).is_err() {
        return error(HttpResponse::BadRequest(), format!("Invalid incident id: {id}"));
    }

    let body = body.into_inner();
    let user_id = body.user_id.trim();
    if user_id.is_empty() {
        return error(HttpResponse::BadRequest(), "Missing required field: userId");
    }

    let change = StatusChange {
        status: body.status,
        message: body.message.filter(|m| !m.trim().is_empty()),
        eta: body.eta,
        user_id: user_id.to_string(),
    };

    match state.store.update_status(&id, &change).await {
        Ok(true) => {
            log::info!("Incident {id} set to {} by {}", change.status, change.user_id);
            HttpResponse::NoContent().finish()
        }
        Ok(false) => error(HttpResponse::NotFound(), format!("Incident {id} not found")),
        Err(e) => {
            log::error!("Failed to update incident {id}: {e}");
            error(
                HttpResponse::InternalServerError(),
                "Failed to update incident",
            )
        }
    }
}

/// `POST /api/incidents/refresh`
///
/// Forces a bulk read. Responds with the resulting feed status, as 503
/// when the read failed.
pub async fn refresh(state: web::Data<AppState>) -> HttpResponse {
    match state.feed.refresh().await {
        Ok(count) => {
            log::info!("Manual refresh loaded {count} incident(s)");
            HttpResponse::Ok().json(current_feed_status(&state))
        }
        Err(e) => {
            log::error!("Manual refresh failed: {e}");
            HttpResponse::ServiceUnavailable().json(current_feed_status(&state))
        }
    }
}

/// `GET /api/feed`
pub async fn feed(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(current_feed_status(&state))
}

/// `GET /api/analytics`
pub async fn analytics(
    state: web::Data<AppState>,
    params: web::Query<SummaryParams>,
) -> HttpResponse {
    let snapshot = state.feed.current();
    HttpResponse::Ok().json(civic_map_analytics::summarize(&snapshot, &params))
}

/// `POST /api/voice-report`
///
/// Classifies a transcript with the configured model. 503 when no model is
/// configured, 502 when the model's answer is unusable.
pub async fn voice_report(
    state: web::Data<AppState>,
    body: web::Json<VoiceReportRequest>,
) -> HttpResponse {
    let Some(provider) = state.ai.as_deref() else {
        return error(
            HttpResponse::ServiceUnavailable(),
            "Voice reports are not configured",
        );
    };

    if body.transcript.trim().is_empty() {
        return error(HttpResponse::BadRequest(), "No transcript provided");
    }

    match classify_transcript(provider, &body.transcript).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            log::error!("Voice report classification failed: {e}");
            error(HttpResponse::BadGateway(), e.to_string())
        }
    }
}
