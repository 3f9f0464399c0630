//! Error types for the exporter core.

use thiserror::Error;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Errors from the registry API gateway.
///
/// These are not locally recoverable; they propagate to the scrape caller
/// and fail that scrape.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The registry API rejected or failed a call (auth failure, throttling,
    /// not-found, transport failure after retries).
    #[error("ECR {operation} failed: {message}")]
    Api {
        /// API operation name.
        operation: &'static str,
        /// Rendered error from the SDK.
        message: String,
    },

    /// A call exceeded its connect or read timeout.
    #[error("ECR {operation} timed out")]
    Timeout {
        /// API operation name.
        operation: &'static str,
    },

    /// The registry description carried no registry id.
    #[error("DescribeRegistry returned no registry id")]
    MissingRegistryId,
}

/// Errors surfaced by the collector.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Registry id resolution failed at construction time. Fatal: the
    /// collector cannot be built.
    #[error("failed to resolve registry id: {source}")]
    RegistryResolution {
        /// Underlying gateway error.
        #[source]
        source: GatewayError,
    },

    /// A gateway call failed during a scrape.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Metric family construction failed.
    #[error("metric assembly failed: {source}")]
    Metrics {
        /// Underlying prometheus error.
        #[from]
        source: prometheus::Error,
    },
}
