//! Scrape-driven collection pipeline.

use crate::cache::{ImageCache, RepositoryCache};
use crate::clock::{Clock, SystemClock};
use crate::config::ExporterConfig;
use crate::error::{ExporterError, Result};
use crate::gateway::RegistryGateway;
use crate::metrics::MetricBatch;
use prometheus::proto::MetricFamily;
use std::sync::Arc;

/// Collects ECR statistics into Prometheus metric families on each scrape.
///
/// Owns the two caches and the resolved registry id; the gateway is an
/// injected collaborator. All refreshes are lazy and scrape-triggered.
pub struct EcrCollector {
    registry_id: String,
    repository_cache: RepositoryCache,
    image_cache: ImageCache,
}

impl EcrCollector {
    /// Constructs the collector, resolving the registry id once.
    ///
    /// Uses the configured registry id when present, otherwise asks the
    /// gateway.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::RegistryResolution`] when the id cannot be
    /// resolved; the collector is not built.
    pub async fn new(gateway: Arc<dyn RegistryGateway>, config: &ExporterConfig) -> Result<Self> {
        Self::with_clock(gateway, config, Arc::new(SystemClock)).await
    }

    /// Same as [`Self::new`], with an injected clock so tests can drive
    /// cache expiry deterministically.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::RegistryResolution`] when the id cannot be
    /// resolved.
    pub async fn with_clock(
        gateway: Arc<dyn RegistryGateway>,
        config: &ExporterConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let registry_id = match &config.registry_id {
            Some(id) => id.clone(),
            None => gateway
                .describe_registry()
                .await
                .map_err(|source| ExporterError::RegistryResolution { source })?,
        };
        tracing::info!(registry_id = %registry_id, "resolved registry id");

        Ok(Self {
            repository_cache: RepositoryCache::new(
                Arc::clone(&gateway),
                &registry_id,
                config.repository_ttl,
                Arc::clone(&clock),
            ),
            image_cache: ImageCache::new(
                gateway,
                &registry_id,
                config.image_ttl,
                config.image_cache_capacity,
                clock,
            ),
            registry_id,
        })
    }

    /// Returns the resolved registry id.
    #[must_use]
    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }

    /// Runs one scrape.
    ///
    /// Reads the repository snapshot exactly once (refreshing on a miss),
    /// resolves each repository's images through the image cache (a miss
    /// refreshes only that repository's key), and folds everything into the
    /// four metric families in fixed order. A repository with zero images
    /// still appears in the count and info families.
    ///
    /// # Errors
    ///
    /// Any gateway failure fails the whole scrape; there is no partial
    /// result and no stale fallback on a cold cache.
    pub async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let repositories = self.repository_cache.get_or_refresh().await?;

        let batch = MetricBatch::new(&self.registry_id)?;
        batch.record_repositories(&repositories);

        for repository in &repositories {
            let images = self.image_cache.get_or_refresh(&repository.name).await?;
            batch.record_images(&repository.name, &images);
        }

        Ok(batch.into_families())
    }

    /// Pre-warms both caches: the repository list first, then every listed
    /// repository's images.
    ///
    /// # Errors
    ///
    /// Propagates the first gateway failure; entries refreshed before it are
    /// kept.
    pub async fn refresh_caches(&self) -> Result<()> {
        let repositories = self.repository_cache.refresh().await?;
        self.image_cache.refresh_all(&repositories).await?;
        Ok(())
    }
}
