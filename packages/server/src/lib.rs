#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the civic map application.
//!
//! Serves the REST API citizens and municipal staff use: jurisdiction
//! lookup, the filtered realtime incident list, report submission, status
//! updates, dashboard analytics and voice-report classification. Incident
//! reads are served from an in-memory feed cache that is refreshed
//! whenever the backing store signals a change.

pub mod config;
mod handlers;
pub mod interactive;
pub mod seed;
pub mod submission;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use civic_map_ai::LlmProvider;
use civic_map_database::{db, run_migrations};
use civic_map_feed::{
    IncidentFeedCache, IncidentStore, InMemoryIncidentStore, PostgresIncidentStore,
};
use civic_map_jurisdiction::{JurisdictionCatalog, LocationResolver};
use switchy_database::Database;

use crate::config::{ServerConfig, StoreKind};

/// Shared application state.
pub struct AppState {
    /// Realtime snapshot of every incident.
    pub feed: Arc<IncidentFeedCache>,
    /// Store that submissions and status updates are written to.
    pub store: Arc<dyn IncidentStore>,
    /// Coordinate to jurisdiction resolver over the loaded catalog.
    pub resolver: LocationResolver,
    /// Voice-report classifier, `None` when no AI credentials are set.
    pub ai: Option<Arc<dyn LlmProvider>>,
}

impl AppState {
    /// Starts a feed over `store` and assembles the state.
    pub async fn new(
        store: Arc<dyn IncidentStore>,
        catalog: JurisdictionCatalog,
        ai: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let feed = IncidentFeedCache::start(Arc::clone(&store)).await;

        Self {
            feed: Arc::new(feed),
            store,
            resolver: LocationResolver::new(Arc::new(catalog)),
            ai,
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/categories", web::get().to(handlers::categories))
            .route("/jurisdictions", web::get().to(handlers::jurisdictions))
            .route("/resolve", web::get().to(handlers::resolve))
            .route("/incidents", web::get().to(handlers::incidents))
            .route("/incidents", web::post().to(handlers::create_incident))
            .route("/incidents/refresh", web::post().to(handlers::refresh))
            .route(
                "/incidents/{id}/status",
                web::patch().to(handlers::update_status),
            )
            .route("/feed", web::get().to(handlers::feed))
            .route("/analytics", web::get().to(handlers::analytics))
            .route("/voice-report", web::post().to(handlers::voice_report)),
    );
}

/// Connects the configured store.
///
/// For Postgres this connects, runs migrations, seeds the catalog
/// municipalities and starts change polling.
///
/// # Panics
///
/// Panics if the database connection, migrations or seeding fail.
pub async fn open_store(
    config: &ServerConfig,
    catalog: &JurisdictionCatalog,
) -> Arc<dyn IncidentStore> {
    match config.store {
        StoreKind::Memory => {
            log::info!("Using in-memory incident store");
            Arc::new(InMemoryIncidentStore::with_municipalities(
                catalog.jurisdictions().to_vec(),
            ))
        }
        StoreKind::Postgres => {
            log::info!("Connecting to database...");
            let db_conn = db::connect_from_env()
                .await
                .expect("Failed to connect to database");

            log::info!("Running migrations...");
            run_migrations(db_conn.as_ref())
                .await
                .expect("Failed to run migrations");

            let db: Arc<dyn Database> = Arc::from(db_conn);

            seed::seed_municipalities(db.as_ref(), catalog)
                .await
                .expect("Failed to seed municipalities");

            let store = PostgresIncidentStore::new(db);
            store.start_polling(config.poll_interval);
            Arc::new(store)
        }
    }
}

fn open_ai_provider() -> Option<Arc<dyn LlmProvider>> {
    match civic_map_ai::create_provider_from_env() {
        Ok(provider) => {
            log::info!("Voice reports enabled with {}", provider.model());
            Some(Arc::from(provider))
        }
        Err(e) => {
            log::warn!("Voice reports disabled: {e}");
            None
        }
    }
}

/// Starts the civic map API server.
///
/// Loads the jurisdiction catalog, opens the configured incident store,
/// starts the feed cache and starts the Actix-Web HTTP server. This is a
/// regular async function; the caller provides the async runtime (e.g. via
/// `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the catalog cannot be loaded or the store cannot be opened.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = ServerConfig::from_env();

    let catalog = config
        .load_catalog()
        .expect("Failed to load jurisdiction catalog");

    let store = open_store(&config, &catalog).await;

    let state = web::Data::new(AppState::new(store, catalog, open_ai_provider()).await);

    let feed = Arc::clone(&state.feed);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await;

    feed.shutdown();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use civic_map_ai::AiError;
    use civic_map_ai::providers::CompletionRequest;
    use civic_map_feed::FeedStatus;
    use civic_map_incident_models::{IncidentStatus, IncidentType};
    use civic_map_jurisdiction_models::{Coordinate, JurisdictionKind};
    use civic_map_server_models::{
        ApiCreatedIncident, ApiFeedStatus, ApiIncidentList, NewIncidentRequest,
    };
    use std::time::Duration;

    struct FixedProvider(&'static str);

    #[async_trait::async_trait]
    impl LlmProvider for FixedProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, AiError> {
            Ok(self.0.to_string())
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    async fn state_with(
        ai: Option<Arc<dyn LlmProvider>>,
    ) -> (web::Data<AppState>, Arc<InMemoryIncidentStore>) {
        let catalog = JurisdictionCatalog::south_africa();
        let store = Arc::new(InMemoryIncidentStore::with_municipalities(
            catalog.jurisdictions().to_vec(),
        ));
        let dyn_store: Arc<dyn IncidentStore> = store.clone();
        let state = AppState::new(dyn_store, catalog, ai).await;
        (web::Data::new(state), store)
    }

    async fn wait_for_count(state: &AppState, count: usize) {
        for _ in 0..200 {
            if state.feed.current().len() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("feed never reached {count} incident(s)");
    }

    fn submission(lat: f64, lng: f64, incident_type: &str) -> NewIncidentRequest {
        NewIncidentRequest {
            reporter_id: "citizen-1".to_string(),
            incident_type: Some(incident_type.to_string()),
            severity: Some(3),
            cause: Some("Test".to_string()),
            description: Some("Something is broken".to_string()),
            consent: true,
            coordinates: Some(Coordinate::new(lat, lng)),
            ..NewIncidentRequest::default()
        }
    }

    #[actix_web::test]
    async fn submitted_incident_appears_in_filtered_list() {
        let (state, _store) = state_with(None).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/incidents")
            .set_json(submission(-33.92, 18.42, "water"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: ApiCreatedIncident = test::read_body_json(resp).await;
        assert_eq!(created.title, "Water Issue - Test");

        let req = test::TestRequest::post()
            .uri("/api/incidents")
            .set_json(submission(-26.2, 28.0, "roads"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );

        wait_for_count(&state, 2).await;

        let req = test::TestRequest::get()
            .uri("/api/incidents?lat=-33.92&lng=18.42&category=water")
            .to_request();
        let list: ApiIncidentList = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.incidents.len(), 1);
        assert_eq!(list.incidents[0].id, created.id);
        assert_eq!(list.incidents[0].incident_type, IncidentType::Water);
        assert_eq!(list.matched, Some(true));
        assert_eq!(
            list.jurisdiction.map(|j| (j.name, j.kind)),
            Some(("City of Cape Town".to_string(), JurisdictionKind::Metro))
        );
        assert_eq!(list.feed.state, "fresh");

        let req = test::TestRequest::get().uri("/api/incidents").to_request();
        let list: ApiIncidentList = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.incidents.len(), 2);
        assert!(list.jurisdiction.is_none());
    }

    #[actix_web::test]
    async fn invalid_submission_is_bad_request() {
        let (state, store) = state_with(None).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let mut body = submission(-33.92, 18.42, "water");
        body.consent = false;
        let req = test::TestRequest::post()
            .uri("/api/incidents")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Consent is required to submit a report");
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn missing_reporter_is_a_json_validation_error() {
        let (state, store) = state_with(None).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/incidents")
            .set_json(serde_json::json!({
                "type": "water",
                "severity": 3,
                "description": "Burst pipe",
                "consent": true,
                "coordinates": { "latitude": -33.92, "longitude": 18.42 },
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Missing required field: reporterId");
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn status_update_resolves_and_unknown_id_is_not_found() {
        let (state, store) = state_with(None).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/incidents")
            .set_json(submission(-26.2, 28.0, "electricity"))
            .to_request();
        let created: ApiCreatedIncident = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/api/incidents/{}/status", created.id))
            .set_json(serde_json::json!({
                "status": "resolved",
                "message": "Line repaired",
                "userId": "staff-7"
            }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );
        assert_eq!(store.updates_for(&created.id).len(), 1);

        wait_for_count(&state, 1).await;
        for _ in 0..200 {
            if state.feed.current()[0].status == IncidentStatus::Resolved {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let incident = state.feed.current()[0].clone();
        assert_eq!(incident.status, IncidentStatus::Resolved);
        assert!(incident.resolved_at.is_some());

        let req = test::TestRequest::patch()
            .uri(&format!(
                "/api/incidents/{}/status",
                uuid::Uuid::new_v4()
            ))
            .set_json(serde_json::json!({ "status": "closed", "userId": "staff-7" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = test::TestRequest::patch()
            .uri("/api/incidents/not-a-uuid/status")
            .set_json(serde_json::json!({ "status": "closed", "userId": "staff-7" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn resolve_reports_default_fallback() {
        let (state, _store) = state_with(None).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/resolve?lat=0&lng=0")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["jurisdiction"]["name"], "Mangaung");
        assert_eq!(body["matched"], false);
    }

    #[actix_web::test]
    async fn feed_and_refresh_report_status() {
        let (state, _store) = state_with(None).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/incidents/refresh")
            .to_request();
        let status: ApiFeedStatus = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status.state, "fresh");
        assert_eq!(status.incident_count, 0);

        let req = test::TestRequest::get().uri("/api/feed").to_request();
        let status: ApiFeedStatus = test::call_and_read_body_json(&app, req).await;
        assert!(status.updated_at.is_some());
    }

    #[actix_web::test]
    async fn voice_report_needs_a_provider() {
        let (state, _store) = state_with(None).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/voice-report")
            .set_json(serde_json::json!({ "transcript": "pothole on Main Rd" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[actix_web::test]
    async fn voice_report_classifies_or_fails_upstream() {
        let good: Arc<dyn LlmProvider> = Arc::new(FixedProvider(
            r#"{"title":"Pothole","description":"Deep pothole","type":"roads","priority":"high"}"#,
        ));
        let (state, _store) = state_with(Some(good)).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/voice-report")
            .set_json(serde_json::json!({ "transcript": "pothole on Main Rd" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["type"], "roads");
        assert_eq!(body["priority"], "high");

        let req = test::TestRequest::post()
            .uri("/api/voice-report")
            .set_json(serde_json::json!({ "transcript": "  " }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let bad: Arc<dyn LlmProvider> = Arc::new(FixedProvider("not json"));
        let (state, _store) = state_with(Some(bad)).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/voice-report")
            .set_json(serde_json::json!({ "transcript": "pothole on Main Rd" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let err: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Invalid response format from AI");
    }

    #[actix_web::test]
    async fn analytics_summarizes_snapshot() {
        let (state, _store) = state_with(None).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        for (lat, lng, t) in [(-33.92, 18.42, "water"), (-26.2, 28.0, "water")] {
            let req = test::TestRequest::post()
                .uri("/api/incidents")
                .set_json(submission(lat, lng, t))
                .to_request();
            test::call_service(&app, req).await;
        }
        wait_for_count(&state, 2).await;
        assert!(matches!(state.feed.status(), FeedStatus::Fresh { .. }));

        let req = test::TestRequest::get().uri("/api/analytics").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["pending"], 2);
        assert_eq!(body["byType"][0]["name"], "water");
        assert_eq!(body["byType"][0]["count"], 2);
    }
}
