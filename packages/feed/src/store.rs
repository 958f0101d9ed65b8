//! The [`IncidentStore`] trait implemented by every backing store.

use async_trait::async_trait;
use civic_map_database_models::{NewIncident, StatusChange};
use civic_map_incident_models::Incident;
use tokio::sync::broadcast;

use crate::FeedError;

/// Signals that the incidents collection changed.
///
/// Carries no payload: the only obligation on a subscriber is to re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeNotification;

/// Authoritative incident storage.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Bulk read of every incident, newest first, with the municipality
    /// name and province joined in.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the read fails.
    async fn fetch_all(&self) -> Result<Vec<Incident>, FeedError>;

    /// Subscribes to change notifications for any incident row.
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification>;

    /// Looks up the store id of a municipality by name.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the lookup fails.
    async fn find_municipality_id(&self, name: &str) -> Result<Option<String>, FeedError>;

    /// Inserts a submission and returns the new incident id.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the insert fails.
    async fn insert(&self, incident: &NewIncident) -> Result<String, FeedError>;

    /// Applies a staff status change. Returns `false` if `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the update fails.
    async fn update_status(&self, id: &str, change: &StatusChange) -> Result<bool, FeedError>;
}
