//! HTTP exposition of collected ECR metrics.
//!
//! Serves `/metrics` (one collection pass per scrape, encoded in the
//! Prometheus text format) and `/healthz`. A failed collection returns 500
//! with the error text; the exporter itself keeps running.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use ecr_exporter_core::EcrCollector;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

/// Errors from serving the metrics endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("metrics server failed: {source}")]
    Serve {
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Builds the exposition router with `/metrics` and `/healthz`.
#[must_use]
pub fn router(collector: Arc<EcrCollector>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(collector)
}

/// Binds `addr` and serves the exposition router until the process stops.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound and
/// [`ServerError::Serve`] if the server exits with an error.
pub async fn serve(addr: SocketAddr, collector: Arc<EcrCollector>) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    tracing::info!(%addr, "serving metrics");
    axum::serve(listener, router(collector))
        .await
        .map_err(|source| ServerError::Serve { source })
}

async fn metrics(State(collector): State<Arc<EcrCollector>>) -> Response {
    let mut families = match collector.collect().await {
        Ok(families) => families,
        Err(error) => {
            tracing::error!(%error, "scrape failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response();
        }
    };

    // The text encoder rejects families without samples, and the wire format
    // does not carry them anyway.
    families.retain(|family| !family.get_metric().is_empty());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&families, &mut buffer) {
        tracing::error!(%error, "metric encoding failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

async fn healthz() -> &'static str {
    "ok"
}
