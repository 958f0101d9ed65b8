//! In-memory incident feed.
//!
//! The cache never patches: every change notification triggers a full
//! bulk read whose result replaces the snapshot wholesale. Refreshes are
//! serialized, so a snapshot is always the exact content of one read. A
//! failed read leaves the previous snapshot in place and flips the status
//! to [`FeedStatus::Stale`]; the next notification or a manual
//! [`IncidentFeedCache::refresh`] is the recovery path.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use civic_map_incident_models::Incident;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::{ChangeNotification, FeedError, IncidentStore};

/// Freshness of the cached snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FeedStatus {
    /// No read has completed yet.
    Loading,
    /// The last read succeeded.
    Fresh {
        /// When the snapshot was replaced.
        updated_at: DateTime<Utc>,
    },
    /// The last read failed; the snapshot is from an earlier read, if any.
    Stale {
        /// When the snapshot was last replaced, `None` if never.
        last_updated: Option<DateTime<Utc>>,
        /// The failure.
        error: String,
    },
}

impl FeedStatus {
    /// When the snapshot was last successfully replaced.
    #[must_use]
    pub const fn last_updated(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Loading => None,
            Self::Fresh { updated_at } => Some(*updated_at),
            Self::Stale { last_updated, .. } => *last_updated,
        }
    }

    /// Whether the last read succeeded.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }
}

/// Handle returned by [`IncidentFeedCache::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&Arc<[Incident]>) + Send + Sync>;

struct Inner {
    store: Arc<dyn IncidentStore>,
    snapshot: RwLock<Arc<[Incident]>>,
    status: RwLock<FeedStatus>,
    refresh_lock: tokio::sync::Mutex<()>,
    watch_tx: watch::Sender<Arc<[Incident]>>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl Inner {
    async fn refresh(&self) -> Result<usize, FeedError> {
        let _guard = self.refresh_lock.lock().await;

        match self.store.fetch_all().await {
            Ok(incidents) => {
                let snapshot: Arc<[Incident]> = incidents.into();
                let count = snapshot.len();

                *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) =
                    Arc::clone(&snapshot);
                *self.status.write().unwrap_or_else(PoisonError::into_inner) =
                    FeedStatus::Fresh {
                        updated_at: Utc::now(),
                    };
                self.watch_tx.send_replace(Arc::clone(&snapshot));

                let listeners: Vec<Listener> = self
                    .listeners
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .map(|(_, l)| Arc::clone(l))
                    .collect();
                for listener in listeners {
                    let result = std::panic::catch_unwind(AssertUnwindSafe(|| listener(&snapshot)));
                    if result.is_err() {
                        log::error!("Incident feed listener panicked");
                    }
                }

                log::debug!("Incident feed refreshed with {count} incident(s)");
                Ok(count)
            }
            Err(e) => {
                log::warn!("Incident feed refresh failed, keeping last-known incidents: {e}");
                let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
                *status = FeedStatus::Stale {
                    last_updated: status.last_updated(),
                    error: e.to_string(),
                };
                Err(e)
            }
        }
    }

    async fn listen(self: Arc<Self>, mut rx: broadcast::Receiver<ChangeNotification>) {
        loop {
            match rx.recv().await {
                Ok(ChangeNotification) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Feed listener lagged by {skipped} notification(s)");
                }
                Err(RecvError::Closed) => {
                    log::debug!("Incident store closed its change channel");
                    return;
                }
            }

            // One read covers everything queued so far.
            while let Ok(ChangeNotification) | Err(broadcast::error::TryRecvError::Lagged(_)) =
                rx.try_recv()
            {}

            let _ = self.refresh().await;
        }
    }
}

/// Client-side cache of every incident in a store.
pub struct IncidentFeedCache {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for IncidentFeedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentFeedCache")
            .field("incidents", &self.current().len())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl IncidentFeedCache {
    /// Starts a session: subscribes to `store`, performs the initial bulk
    /// read, and spawns the listener task.
    ///
    /// A failed initial read does not fail the session; the cache starts
    /// empty and [`FeedStatus::Stale`]. Must be called from within a tokio
    /// runtime.
    pub async fn start(store: Arc<dyn IncidentStore>) -> Self {
        // Subscribe before reading so a change landing during the initial
        // read still triggers a refresh.
        let rx = store.subscribe();
        let empty: Arc<[Incident]> = Arc::from(Vec::new());
        let (watch_tx, _) = watch::channel(Arc::clone(&empty));

        let inner = Arc::new(Inner {
            store,
            snapshot: RwLock::new(empty),
            status: RwLock::new(FeedStatus::Loading),
            refresh_lock: tokio::sync::Mutex::new(()),
            watch_tx,
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        });

        if let Ok(count) = inner.refresh().await {
            log::info!("Incident feed started with {count} incident(s)");
        }

        let task = tokio::spawn(Arc::clone(&inner).listen(rx));

        Self {
            inner,
            task: Mutex::new(Some(task)),
        }
    }

    /// The current snapshot, newest first.
    #[must_use]
    pub fn current(&self) -> Arc<[Incident]> {
        Arc::clone(&self.inner.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Freshness of [`Self::current`].
    #[must_use]
    pub fn status(&self) -> FeedStatus {
        self.inner
            .status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-reads the store now and returns the new incident count.
    ///
    /// # Errors
    ///
    /// Returns the store's [`FeedError`]; the previous snapshot is kept.
    pub async fn refresh(&self) -> Result<usize, FeedError> {
        self.inner.refresh().await
    }

    /// A receiver that observes every replaced snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<[Incident]>> {
        self.inner.watch_tx.subscribe()
    }

    /// Registers `listener` to be called with each new snapshot.
    pub fn on_change(
        &self,
        listener: impl Fn(&Arc<[Incident]>) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Whether the listener task is still running.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Stops listening and drops the store subscription. The last snapshot
    /// stays readable.
    pub fn shutdown(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
            log::debug!("Incident feed listener stopped");
        }
    }
}

impl Drop for IncidentFeedCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone as _;
    use civic_map_database_models::{NewIncident, StatusChange};
    use civic_map_incident_models::{IncidentStatus, IncidentType, Severity};

    use crate::InMemoryIncidentStore;

    fn incident(id: &str) -> Incident {
        Incident {
            id: id.to_string(),
            incident_type: IncidentType::Electricity,
            severity: Severity::Medium,
            priority: None,
            status: IncidentStatus::Pending,
            title: "Electricity Issue - Outage".to_string(),
            description: String::new(),
            location: None,
            jurisdiction_name: Some("eThekwini".to_string()),
            province: Some("KwaZulu-Natal".to_string()),
            coordinates: None,
            eta: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap(),
            updated_at: None,
            resolved_at: None,
        }
    }

    /// Store that answers reads from a script and counts them.
    struct ScriptedStore {
        reads: Mutex<VecDeque<Result<Vec<Incident>, String>>>,
        fetches: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
        tx: broadcast::Sender<ChangeNotification>,
    }

    impl ScriptedStore {
        fn new(reads: Vec<Result<Vec<Incident>, String>>) -> Arc<Self> {
            Self::with_capacity(reads, 16, Duration::ZERO)
        }

        fn with_capacity(
            reads: Vec<Result<Vec<Incident>, String>>,
            capacity: usize,
            delay: Duration,
        ) -> Arc<Self> {
            let (tx, _) = broadcast::channel(capacity);
            Arc::new(Self {
                reads: Mutex::new(reads.into()),
                fetches: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay,
                tx,
            })
        }

        fn notify(&self) {
            let _ = self.tx.send(ChangeNotification);
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IncidentStore for ScriptedStore {
        async fn fetch_all(&self) -> Result<Vec<Incident>, FeedError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.fetches.fetch_add(1, Ordering::SeqCst);

            let next = self.reads.lock().unwrap().pop_front();
            match next {
                Some(Ok(incidents)) => Ok(incidents),
                Some(Err(message)) => Err(FeedError::Store { message }),
                None => Ok(Vec::new()),
            }
        }

        fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
            self.tx.subscribe()
        }

        async fn find_municipality_id(&self, _name: &str) -> Result<Option<String>, FeedError> {
            Ok(None)
        }

        async fn insert(&self, _incident: &NewIncident) -> Result<String, FeedError> {
            Err(FeedError::Store {
                message: "read-only".to_string(),
            })
        }

        async fn update_status(
            &self,
            _id: &str,
            _change: &StatusChange,
        ) -> Result<bool, FeedError> {
            Ok(false)
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    fn ids(snapshot: &[Incident]) -> Vec<&str> {
        snapshot.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn start_populates_from_one_bulk_read() {
        let store = ScriptedStore::new(vec![Ok(vec![incident("a"), incident("b")])]);
        let cache = IncidentFeedCache::start(store.clone()).await;

        assert_eq!(ids(&cache.current()), vec!["a", "b"]);
        assert!(cache.status().is_fresh());
        assert_eq!(store.fetches(), 1);
        assert!(cache.is_listening());
    }

    #[tokio::test]
    async fn notification_replaces_snapshot_wholesale() {
        let store = ScriptedStore::new(vec![
            Ok(vec![incident("a"), incident("b")]),
            Ok(vec![incident("c")]),
        ]);
        let cache = IncidentFeedCache::start(store.clone()).await;
        let mut rx = cache.watch();

        store.notify();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(ids(&cache.current()), vec!["c"]);
    }

    #[tokio::test]
    async fn failure_keeps_contents_then_recovers() {
        let store = ScriptedStore::new(vec![
            Ok(vec![incident("a")]),
            Err("connection reset".to_string()),
            Ok(vec![incident("b")]),
        ]);
        let cache = IncidentFeedCache::start(store.clone()).await;
        let FeedStatus::Fresh { updated_at } = cache.status() else {
            panic!("expected fresh status");
        };

        store.notify();
        wait_until(|| matches!(cache.status(), FeedStatus::Stale { .. })).await;

        assert_eq!(ids(&cache.current()), vec!["a"]);
        assert_eq!(
            cache.status(),
            FeedStatus::Stale {
                last_updated: Some(updated_at),
                error: "Store error: connection reset".to_string(),
            }
        );

        store.notify();
        wait_until(|| cache.status().is_fresh()).await;
        assert_eq!(ids(&cache.current()), vec!["b"]);
    }

    #[tokio::test]
    async fn failed_initial_read_starts_empty_and_stale() {
        let store = ScriptedStore::new(vec![Err("timeout".to_string())]);
        let cache = IncidentFeedCache::start(store).await;

        assert!(cache.current().is_empty());
        assert!(matches!(
            cache.status(),
            FeedStatus::Stale {
                last_updated: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn manual_refresh_reports_failure() {
        let store = ScriptedStore::new(vec![Ok(vec![incident("a")]), Err("boom".to_string())]);
        let cache = IncidentFeedCache::start(store).await;

        assert!(cache.refresh().await.is_err());
        assert_eq!(ids(&cache.current()), vec!["a"]);
        assert_eq!(cache.refresh().await.unwrap(), 0);
        assert!(cache.current().is_empty());
    }

    #[tokio::test]
    async fn shutdown_stops_listening() {
        let store = ScriptedStore::new(vec![Ok(vec![incident("a")])]);
        let cache = IncidentFeedCache::start(store.clone()).await;

        cache.shutdown();
        wait_until(|| store.tx.receiver_count() == 0).await;
        assert!(!cache.is_listening());

        store.notify();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.fetches(), 1);
        assert_eq!(ids(&cache.current()), vec!["a"]);
    }

    #[tokio::test]
    async fn dropping_the_cache_cancels_the_subscription() {
        let store = ScriptedStore::new(vec![Ok(Vec::new())]);
        let cache = IncidentFeedCache::start(store.clone()).await;
        assert_eq!(store.tx.receiver_count(), 1);

        drop(cache);
        wait_until(|| store.tx.receiver_count() == 0).await;
    }

    #[tokio::test]
    async fn lagged_receiver_still_refreshes() {
        let store = ScriptedStore::with_capacity(
            vec![Ok(Vec::new()), Ok(vec![incident("z")])],
            1,
            Duration::ZERO,
        );
        let cache = IncidentFeedCache::start(store.clone()).await;

        for _ in 0..8 {
            store.notify();
        }

        wait_until(|| !cache.current().is_empty()).await;
        assert_eq!(ids(&cache.current()), vec!["z"]);
    }

    #[tokio::test]
    async fn refreshes_are_serialized() {
        let store = ScriptedStore::with_capacity(Vec::new(), 16, Duration::from_millis(20));
        let cache = Arc::new(IncidentFeedCache::start(store.clone()).await);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.refresh().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(store.fetches(), 5);
    }

    #[tokio::test]
    async fn listeners_see_each_new_snapshot() {
        let store = ScriptedStore::new(vec![Ok(Vec::new()), Ok(vec![incident("a")])]);
        let cache = IncidentFeedCache::start(store).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = cache.on_change(move |snapshot| {
            sink.lock().unwrap().push(snapshot.len());
        });

        cache.refresh().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1]);

        assert!(cache.remove_listener(id));
        cache.refresh().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn panicking_listener_does_not_stop_the_feed() {
        let store = Arc::new(InMemoryIncidentStore::new());
        let cache = IncidentFeedCache::start(store.clone()).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        cache.on_change(|_| panic!("listener failure"));
        cache.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.put(incident("a"));
        wait_until(|| calls.load(Ordering::SeqCst) == 1).await;
        assert!(cache.is_listening());

        store.put(incident("b"));
        wait_until(|| calls.load(Ordering::SeqCst) >= 2).await;
        assert_eq!(cache.current().len(), 2);
        assert!(cache.is_listening());
        assert!(cache.status().is_fresh());
    }

    #[tokio::test]
    async fn in_memory_store_drives_the_cache() {
        let store = Arc::new(InMemoryIncidentStore::new());
        let cache = IncidentFeedCache::start(store.clone()).await;
        assert!(cache.current().is_empty());

        store.put(incident("a"));
        wait_until(|| cache.current().len() == 1).await;

        store.remove("a");
        wait_until(|| cache.current().is_empty()).await;
    }
}
