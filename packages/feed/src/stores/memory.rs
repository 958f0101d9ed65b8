//! Process-local incident store.
//!
//! Every mutation broadcasts a [`ChangeNotification`], so a cache started
//! over this store behaves the same way it does over Postgres.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use civic_map_database_models::{NewIncident, StatusChange};
use civic_map_incident_models::{Incident, IncidentStatus, Severity};
use civic_map_jurisdiction_models::Jurisdiction;
use tokio::sync::broadcast;

use crate::{ChangeNotification, FeedError, IncidentStore};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct MemoryState {
    incidents: Vec<Incident>,
    municipalities: Vec<(String, Jurisdiction)>,
    updates: Vec<(String, StatusChange)>,
}

/// Incident store held entirely in memory.
#[derive(Debug)]
pub struct InMemoryIncidentStore {
    state: RwLock<MemoryState>,
    tx: broadcast::Sender<ChangeNotification>,
}

impl Default for InMemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIncidentStore {
    /// Creates an empty store with no municipalities.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(MemoryState::default()),
            tx,
        }
    }

    /// Creates a store whose municipality table holds `municipalities`,
    /// each given a fresh id.
    #[must_use]
    pub fn with_municipalities(municipalities: impl IntoIterator<Item = Jurisdiction>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().unwrap_or_else(PoisonError::into_inner);
            state.municipalities = municipalities
                .into_iter()
                .map(|j| (uuid::Uuid::new_v4().to_string(), j))
                .collect();
        }
        store
    }

    fn notify(&self) {
        // No receivers is not an error: nobody is watching yet.
        let _ = self.tx.send(ChangeNotification);
    }

    /// Inserts or replaces an incident by id and notifies subscribers.
    pub fn put(&self, incident: Incident) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = state.incidents.iter_mut().find(|i| i.id == incident.id) {
                *existing = incident;
            } else {
                state.incidents.push(incident);
            }
        }
        self.notify();
    }

    /// Deletes an incident and notifies subscribers. Returns `false` if no
    /// incident has `id`.
    pub fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let before = state.incidents.len();
            state.incidents.retain(|i| i.id != id);
            state.incidents.len() != before
        };
        if removed {
            self.notify();
        }
        removed
    }

    /// Status changes recorded for `id` that carried a message, oldest
    /// first.
    #[must_use]
    pub fn updates_for(&self, id: &str) -> Vec<StatusChange> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .updates
            .iter()
            .filter(|(incident_id, _)| incident_id == id)
            .map(|(_, change)| change.clone())
            .collect()
    }

    /// Number of incidents held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .incidents
            .len()
    }

    /// Whether the store holds no incidents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn fetch_all(&self) -> Result<Vec<Incident>, FeedError> {
        let mut incidents = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .incidents
            .clone();
        incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(incidents)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.tx.subscribe()
    }

    async fn find_municipality_id(&self, name: &str) -> Result<Option<String>, FeedError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state
            .municipalities
            .iter()
            .find(|(_, j)| j.name == name)
            .map(|(id, _)| id.clone()))
    }

    async fn insert(&self, incident: &NewIncident) -> Result<String, FeedError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let municipality = state
                .municipalities
                .iter()
                .find(|(mid, _)| *mid == incident.municipality_id)
                .map(|(_, j)| j.clone())
                .ok_or_else(|| FeedError::Store {
                    message: format!("Unknown municipality id {}", incident.municipality_id),
                })?;

            state.incidents.push(Incident {
                id: id.clone(),
                incident_type: incident.incident_type,
                severity: Severity::from_priority(Some(incident.priority)),
                priority: Some(incident.priority),
                status: incident.status,
                title: incident.title.clone(),
                description: incident.description.clone(),
                location: Some(incident.location_address.clone()),
                jurisdiction_name: Some(municipality.name),
                province: Some(municipality.province),
                coordinates: incident.coordinates,
                eta: None,
                created_at: now,
                updated_at: Some(now),
                resolved_at: None,
            });
        }

        log::debug!("Inserted incident {id} into memory store");
        self.notify();
        Ok(id)
    }

    async fn update_status(&self, id: &str, change: &StatusChange) -> Result<bool, FeedError> {
        let now = Utc::now();

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let Some(incident) = state.incidents.iter_mut().find(|i| i.id == id) else {
                return Ok(false);
            };

            incident.status = change.status;
            incident.updated_at = Some(now);
            if change.status == IncidentStatus::Resolved {
                incident.resolved_at = Some(now);
            }
            if change.eta.is_some() {
                incident.eta = change.eta;
            }

            if change.message.as_deref().is_some_and(|m| !m.trim().is_empty()) {
                state.updates.push((id.to_string(), change.clone()));
            }
        }

        self.notify();
        Ok(true)
    }
}
