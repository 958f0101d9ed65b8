//! Postgres-backed incident store.
//!
//! Change detection polls [`queries::change_fingerprint`] on a fixed
//! interval and broadcasts when the fingerprint moves. Writes made through
//! this store notify immediately without waiting for the next poll.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use civic_map_database::queries;
use civic_map_database_models::{ChangeFingerprint, NewIncident, StatusChange};
use civic_map_incident_models::Incident;
use switchy_database::Database;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::{ChangeNotification, FeedError, IncidentStore};

const CHANNEL_CAPACITY: usize = 64;

/// Default interval between change-detection polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Incident store over the `incidents` and `municipalities` tables.
pub struct PostgresIncidentStore {
    db: Arc<dyn Database>,
    tx: broadcast::Sender<ChangeNotification>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PostgresIncidentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresIncidentStore")
            .field("receivers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

impl PostgresIncidentStore {
    /// Wraps a connection. No polling happens until
    /// [`Self::start_polling`] is called.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            db,
            tx,
            poller: Mutex::new(None),
        }
    }

    /// Starts the change poller, replacing any poller already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_polling(&self, interval: Duration) {
        let db = Arc::clone(&self.db);
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last: Option<ChangeFingerprint> = None;

            loop {
                ticker.tick().await;

                let fingerprint = match queries::change_fingerprint(db.as_ref()).await {
                    Ok(fp) => fp,
                    Err(e) => {
                        log::warn!("Incident change poll failed: {e}");
                        continue;
                    }
                };

                if last.is_some_and(|prev| prev != fingerprint) {
                    log::debug!(
                        "Incidents changed (count={}), notifying {} subscriber(s)",
                        fingerprint.count,
                        tx.receiver_count()
                    );
                    let _ = tx.send(ChangeNotification);
                }
                last = Some(fingerprint);
            }
        });

        let previous = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }

        log::info!("Polling for incident changes every {}s", interval.as_secs());
    }

    /// Stops the change poller if it is running.
    pub fn stop_polling(&self) {
        if let Some(handle) = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    fn notify(&self) {
        let _ = self.tx.send(ChangeNotification);
    }
}

impl Drop for PostgresIncidentStore {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

#[async_trait]
impl IncidentStore for PostgresIncidentStore {
    async fn fetch_all(&self) -> Result<Vec<Incident>, FeedError> {
        let rows = queries::fetch_incidents(self.db.as_ref()).await?;
        Ok(rows.into_iter().map(|row| row.into_incident()).collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.tx.subscribe()
    }

    async fn find_municipality_id(&self, name: &str) -> Result<Option<String>, FeedError> {
        Ok(queries::find_municipality_id(self.db.as_ref(), name).await?)
    }

    async fn insert(&self, incident: &NewIncident) -> Result<String, FeedError> {
        let id = queries::insert_incident(self.db.as_ref(), incident, Utc::now()).await?;
        log::info!(
            "Inserted {} incident {id} for municipality {}",
            incident.incident_type,
            incident.municipality_id
        );
        self.notify();
        Ok(id)
    }

    async fn update_status(&self, id: &str, change: &StatusChange) -> Result<bool, FeedError> {
        let updated =
            queries::update_incident_status(self.db.as_ref(), id, change, Utc::now()).await?;
        if updated {
            log::info!("Incident {id} moved to {}", change.status);
            self.notify();
        }
        Ok(updated)
    }
}
