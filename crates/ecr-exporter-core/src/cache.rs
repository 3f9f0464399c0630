//! Time-bounded caches for registry API responses.
//!
//! Two stores absorb the cost and rate-limit risk of hitting the registry
//! API on every scrape: a single-slot cache for the repository list and a
//! keyed, capacity-bounded cache for per-repository image lists. All
//! mutation is whole-value replacement per key, so readers never observe a
//! partially updated entry, and refreshes hold a per-slot or per-key lock so
//! concurrent scrapes share one in-flight gateway call instead of
//! duplicating it.

use crate::clock::Clock;
use crate::error::GatewayError;
use crate::gateway::RegistryGateway;
use crate::model::{Image, Repository};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// A cached value stamped with its storage time.
///
/// Valid while `now - stored_at < ttl`.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
}

impl<T> CacheEntry<T> {
    const fn new(value: T, stored_at: Instant) -> Self {
        Self { value, stored_at }
    }

    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.stored_at) < ttl
    }
}

/// Single-slot, time-bounded store for the registry's repository list.
///
/// The slot is replaced wholesale on refresh, never merged; a failed refresh
/// leaves the previous entry untouched.
pub struct RepositoryCache {
    gateway: Arc<dyn RegistryGateway>,
    registry_id: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<CacheEntry<Vec<Repository>>>>,
}

impl RepositoryCache {
    /// Creates an empty cache bound to one registry.
    pub fn new(
        gateway: Arc<dyn RegistryGateway>,
        registry_id: impl Into<String>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            registry_id: registry_id.into(),
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached repository list if present and unexpired.
    pub async fn get(&self) -> Option<Vec<Repository>> {
        let slot = self.slot.lock().await;
        slot.as_ref()
            .filter(|entry| entry.is_fresh(self.clock.now(), self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Fetches the repository list and replaces the slot.
    ///
    /// # Errors
    ///
    /// Propagates the gateway error; the previous entry, expired or not, is
    /// left in place.
    pub async fn refresh(&self) -> Result<Vec<Repository>, GatewayError> {
        let mut slot = self.slot.lock().await;
        self.refresh_slot(&mut slot).await
    }

    /// Returns the cached repository list, refreshing it first on a miss.
    ///
    /// The slot lock is held across the refresh: concurrent callers wait for
    /// the one in-flight gateway call and then read its result.
    ///
    /// # Errors
    ///
    /// Propagates the gateway error on a failed refresh; with a cold cache
    /// there is no stale fallback.
    pub async fn get_or_refresh(&self) -> Result<Vec<Repository>, GatewayError> {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref() {
            if entry.is_fresh(self.clock.now(), self.ttl) {
                tracing::debug!("fetched repositories from cache");
                return Ok(entry.value.clone());
            }
        }
        self.refresh_slot(&mut slot).await
    }

    async fn refresh_slot(
        &self,
        slot: &mut Option<CacheEntry<Vec<Repository>>>,
    ) -> Result<Vec<Repository>, GatewayError> {
        tracing::info!("refreshing repository cache");
        let repositories = self.gateway.list_repositories(&self.registry_id).await?;
        tracing::debug!(count = repositories.len(), "caching repositories");
        *slot = Some(CacheEntry::new(repositories.clone(), self.clock.now()));
        Ok(repositories)
    }
}

/// Keyed, time-bounded store for per-repository image lists.
///
/// Entries are independent: refreshing one repository's images never touches
/// another's. When more than `capacity` distinct names are tracked, the
/// least-recently-inserted key is evicted; overwriting an existing key
/// renews its insertion recency.
pub struct ImageCache {
    gateway: Arc<dyn RegistryGateway>,
    registry_id: String,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<ImageCacheInner>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

#[derive(Default)]
struct ImageCacheInner {
    entries: HashMap<String, CacheEntry<Vec<Image>>>,
    insertion_order: VecDeque<String>,
}

impl ImageCacheInner {
    /// Inserts or overwrites one entry, returning the keys evicted to stay
    /// within `capacity`.
    fn insert(
        &mut self,
        name: &str,
        entry: CacheEntry<Vec<Image>>,
        capacity: usize,
    ) -> Vec<String> {
        if self.entries.insert(name.to_string(), entry).is_some() {
            self.insertion_order.retain(|key| key != name);
        }
        self.insertion_order.push_back(name.to_string());

        let mut evicted = Vec::new();
        while self.entries.len() > capacity {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(repository = %oldest, "evicted image cache entry");
            evicted.push(oldest);
        }
        evicted
    }
}

impl ImageCache {
    /// Creates an empty cache bound to one registry.
    pub fn new(
        gateway: Arc<dyn RegistryGateway>,
        registry_id: impl Into<String>,
        ttl: Duration,
        capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            registry_id: registry_id.into(),
            ttl,
            capacity,
            clock,
            inner: Mutex::new(ImageCacheInner::default()),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached image list for one repository, if unexpired.
    pub async fn get(&self, repository_name: &str) -> Option<Vec<Image>> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(repository_name)
            .filter(|entry| entry.is_fresh(self.clock.now(), self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Fetches one repository's images and overwrites its slot, leaving all
    /// other keys untouched.
    ///
    /// # Errors
    ///
    /// Propagates the gateway error; the key's previous entry stays in
    /// place.
    pub async fn refresh(&self, repository_name: &str) -> Result<Vec<Image>, GatewayError> {
        let lock = self.refresh_lock(repository_name).await;
        let _guard = lock.lock().await;
        self.refresh_key(repository_name).await
    }

    /// Returns cached images for one repository, refreshing only that key on
    /// a miss.
    ///
    /// Concurrent callers for the same repository share one in-flight
    /// refresh; refreshes of different repositories do not serialize against
    /// each other.
    ///
    /// # Errors
    ///
    /// Propagates the gateway error on a failed refresh.
    pub async fn get_or_refresh(&self, repository_name: &str) -> Result<Vec<Image>, GatewayError> {
        if let Some(images) = self.get(repository_name).await {
            tracing::debug!(repository = repository_name, "fetched images from cache");
            return Ok(images);
        }

        let lock = self.refresh_lock(repository_name).await;
        let _guard = lock.lock().await;

        // Another caller may have refreshed this key while we waited.
        if let Some(images) = self.get(repository_name).await {
            return Ok(images);
        }
        self.refresh_key(repository_name).await
    }

    /// Refreshes every given repository's slot, one at a time.
    ///
    /// # Errors
    ///
    /// Stops at the first gateway failure; keys refreshed before it keep
    /// their new entries.
    pub async fn refresh_all(&self, repositories: &[Repository]) -> Result<(), GatewayError> {
        tracing::info!(count = repositories.len(), "refreshing image cache");
        for repository in repositories {
            self.refresh(&repository.name).await?;
        }
        Ok(())
    }

    async fn refresh_key(&self, repository_name: &str) -> Result<Vec<Image>, GatewayError> {
        let images = self
            .gateway
            .list_images(&self.registry_id, repository_name)
            .await?;
        tracing::debug!(
            repository = repository_name,
            count = images.len(),
            "refreshed image cache entry"
        );
        let evicted = {
            let mut inner = self.inner.lock().await;
            inner.insert(
                repository_name,
                CacheEntry::new(images.clone(), self.clock.now()),
                self.capacity,
            )
        };
        if !evicted.is_empty() {
            // Evicted keys must not leave their refresh locks behind, or the
            // lock map grows past the cache's own capacity bound.
            let mut locks = self.refresh_locks.lock().await;
            for key in &evicted {
                locks.remove(key);
            }
        }
        Ok(images)
    }

    async fn refresh_lock(&self, repository_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(repository_name.to_string())
            .or_default()
            .clone()
    }

    #[cfg(test)]
    async fn refresh_lock_count(&self) -> usize {
        self.refresh_locks.lock().await.len()
    }
}
