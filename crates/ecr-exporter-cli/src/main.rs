//! ECR exporter binary: argument parsing, logging, and serving.

use anyhow::Result;
use clap::Parser;
use ecr_exporter_core::{EcrCollector, EcrGateway, ExporterConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prometheus exporter for AWS ECR repository and image statistics.
#[derive(Debug, Parser)]
#[command(name = "ecr-exporter", version)]
struct Args {
    /// Registry (AWS account) id; discovered through the API when omitted.
    #[arg(long, env = "ECR_REGISTRY_ID")]
    registry_id: Option<String>,

    /// AWS region override; the SDK's default chain applies when omitted.
    #[arg(long, env = "ECR_EXPORTER_REGION")]
    region: Option<String>,

    /// Address to expose /metrics on.
    #[arg(long, env = "ECR_EXPORTER_LISTEN", default_value = "0.0.0.0:9185")]
    listen: SocketAddr,

    /// Fill both caches before serving the first scrape.
    #[arg(long)]
    warm_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = ExporterConfig::default();
    config.registry_id = args.registry_id;
    config.region = args.region;

    let gateway = Arc::new(EcrGateway::connect(&config).await);
    let collector = Arc::new(EcrCollector::new(gateway, &config).await?);
    tracing::info!(registry_id = collector.registry_id(), "exporter ready");

    if args.warm_cache {
        collector.refresh_caches().await?;
    }

    ecr_exporter_server::serve(args.listen, collector).await?;
    Ok(())
}
