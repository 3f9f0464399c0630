//! # ECR Exporter Core
//!
//! Caching collection pipeline that turns AWS ECR API responses into
//! Prometheus metric families.
//!
//! Every scrape reads one consistent repository snapshot from a single-slot
//! TTL cache, resolves each repository's image list through a keyed TTL
//! cache, and folds the result into four metric families. Cache misses are
//! absorbed lazily: the missing entry is refreshed through the API gateway
//! while everything else is served from cache, which keeps the rate-limit
//! cost of a scrape bounded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ecr_exporter_core::{EcrCollector, EcrGateway, ExporterConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExporterConfig::default();
//!     let gateway = Arc::new(EcrGateway::connect(&config).await);
//!     let collector = EcrCollector::new(gateway, &config).await?;
//!
//!     let families = collector.collect().await?;
//!     println!("collected {} metric families", families.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      EcrCollector                         │
//! │  ┌──────────────────┐        ┌─────────────────────────┐  │
//! │  │ RepositoryCache  │        │       ImageCache        │  │
//! │  │  (single slot)   │        │  (keyed by repository)  │  │
//! │  └────────┬─────────┘        └───────────┬─────────────┘  │
//! └───────────┼──────────────────────────────┼────────────────┘
//!             ▼                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                RegistryGateway (AWS ECR API)              │
//! └───────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod cache;
mod clock;
mod collector;
mod config;
mod error;
mod gateway;
mod metrics;
mod model;

pub use cache::{CacheEntry, ImageCache, RepositoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::EcrCollector;
pub use config::ExporterConfig;
pub use error::{ExporterError, GatewayError, Result};
pub use gateway::{EcrGateway, RegistryGateway};
pub use metrics::{
    MetricBatch, IMAGE_SCAN_SEVERITY, IMAGE_SIZE, REPOSITORY_COUNT, REPOSITORY_INFO,
};
pub use model::{Image, Repository, TagMutability};
