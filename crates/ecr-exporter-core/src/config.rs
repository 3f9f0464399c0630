//! Exporter configuration.

use std::time::Duration;

/// Configuration for the gateway, caches, and collector.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Explicit registry (AWS account) id. Resolved once through the API at
    /// construction time when `None`.
    pub registry_id: Option<String>,

    /// AWS region override. The SDK's default chain applies when `None`.
    pub region: Option<String>,

    /// Gateway connect timeout.
    pub connect_timeout: Duration,

    /// Gateway read timeout.
    pub read_timeout: Duration,

    /// Retry attempts beyond the first, per gateway call.
    pub max_retries: u32,

    /// Result bound per gateway call. Pagination past this bound is out of
    /// scope; a full page logs a truncation warning.
    pub max_results: i32,

    /// Time-to-live for the repository list slot.
    pub repository_ttl: Duration,

    /// Time-to-live for each repository's image list.
    pub image_ttl: Duration,

    /// Distinct repository names tracked by the image cache before the
    /// least-recently-inserted key is evicted.
    pub image_cache_capacity: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            registry_id: None,
            region: None,
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(10),
            max_retries: 2,
            max_results: 1000,
            repository_ttl: Duration::from_secs(24 * 60 * 60),
            image_ttl: Duration::from_secs(24 * 60 * 60),
            image_cache_capacity: 1000,
        }
    }
}

impl ExporterConfig {
    /// Sets an explicit registry id, skipping API resolution.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecr_exporter_core::ExporterConfig;
    ///
    /// let config = ExporterConfig::default().with_registry_id("123456789012");
    /// assert_eq!(config.registry_id.as_deref(), Some("123456789012"));
    /// ```
    #[must_use]
    pub fn with_registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.registry_id = Some(registry_id.into());
        self
    }

    /// Sets the AWS region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the repository list time-to-live.
    #[must_use]
    pub const fn with_repository_ttl(mut self, ttl: Duration) -> Self {
        self.repository_ttl = ttl;
        self
    }

    /// Sets the per-repository image list time-to-live.
    #[must_use]
    pub const fn with_image_ttl(mut self, ttl: Duration) -> Self {
        self.image_ttl = ttl;
        self
    }

    /// Sets the image cache capacity.
    #[must_use]
    pub const fn with_image_cache_capacity(mut self, capacity: usize) -> Self {
        self.image_cache_capacity = capacity;
        self
    }
}
