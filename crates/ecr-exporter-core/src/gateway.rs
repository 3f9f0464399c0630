//! Registry API gateway over the AWS ECR SDK.
//!
//! Stateless wrapper around the remote registry calls: fixed connect/read
//! timeouts, a bounded retry count, and conversion of the SDK's nested,
//! optional-field-laden responses into the flat snapshot model. No caching
//! and no business logic live here.

use crate::config::ExporterConfig;
use crate::error::GatewayError;
use crate::model::{Image, Repository, TagMutability};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ecr::error::{DisplayErrorContext, SdkError};
use aws_sdk_ecr::types::{DescribeImagesFilter, ImageDetail, TagStatus};
use aws_sdk_ecr::Client;
use std::collections::BTreeMap;

/// Remote registry API boundary.
///
/// Implementations must be stateless from the caller's point of view: every
/// call reflects the registry at that moment, and errors propagate
/// unmodified as [`GatewayError`].
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Resolves the default registry id for the current credentials.
    async fn describe_registry(&self) -> Result<String, GatewayError>;

    /// Lists the registry's repositories, bounded to one result page.
    async fn list_repositories(&self, registry_id: &str)
        -> Result<Vec<Repository>, GatewayError>;

    /// Lists one repository's tagged images, bounded to one result page.
    async fn list_images(
        &self,
        registry_id: &str,
        repository_name: &str,
    ) -> Result<Vec<Image>, GatewayError>;
}

/// [`RegistryGateway`] backed by the AWS ECR API.
#[derive(Debug, Clone)]
pub struct EcrGateway {
    client: Client,
    max_results: i32,
}

impl EcrGateway {
    /// Builds a gateway from the default AWS credential chain, applying the
    /// configured timeouts, retry count, and optional region override.
    pub async fn connect(config: &ExporterConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build();
        let retries = RetryConfig::standard().with_max_attempts(config.max_retries + 1);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .timeout_config(timeouts)
            .retry_config(retries);
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let aws_config = loader.load().await;

        Self {
            client: Client::new(&aws_config),
            max_results: config.max_results,
        }
    }

    /// Wraps an already-built client, e.g. one pointed at a stub endpoint.
    #[must_use]
    pub const fn new(client: Client, max_results: i32) -> Self {
        Self {
            client,
            max_results,
        }
    }

    fn warn_if_truncated(&self, operation: &'static str, returned: usize) {
        if returned >= self.max_results.unsigned_abs() as usize {
            tracing::warn!(
                operation,
                returned,
                max_results = self.max_results,
                "result page is full, listing may be truncated"
            );
        }
    }
}

#[async_trait]
impl RegistryGateway for EcrGateway {
    async fn describe_registry(&self) -> Result<String, GatewayError> {
        let output = self
            .client
            .describe_registry()
            .send()
            .await
            .map_err(|err| sdk_error("DescribeRegistry", err))?;

        output
            .registry_id()
            .map(ToString::to_string)
            .ok_or(GatewayError::MissingRegistryId)
    }

    async fn list_repositories(
        &self,
        registry_id: &str,
    ) -> Result<Vec<Repository>, GatewayError> {
        let output = self
            .client
            .describe_repositories()
            .registry_id(registry_id)
            .max_results(self.max_results)
            .send()
            .await
            .map_err(|err| sdk_error("DescribeRepositories", err))?;

        let repositories: Vec<Repository> = output
            .repositories()
            .iter()
            .map(repository_from_api)
            .collect();
        self.warn_if_truncated("DescribeRepositories", repositories.len());
        Ok(repositories)
    }

    async fn list_images(
        &self,
        registry_id: &str,
        repository_name: &str,
    ) -> Result<Vec<Image>, GatewayError> {
        let filter = DescribeImagesFilter::builder()
            .tag_status(TagStatus::Tagged)
            .build();
        let output = self
            .client
            .describe_images()
            .registry_id(registry_id)
            .repository_name(repository_name)
            .filter(filter)
            .max_results(self.max_results)
            .send()
            .await
            .map_err(|err| sdk_error("DescribeImages", err))?;

        let images: Vec<Image> = output
            .image_details()
            .iter()
            .map(|detail| image_from_api(repository_name, detail))
            .collect();
        self.warn_if_truncated("DescribeImages", images.len());
        Ok(images)
    }
}

/// Maps an SDK error onto [`GatewayError`], distinguishing timeouts.
fn sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> GatewayError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) => GatewayError::Timeout { operation },
        SdkError::DispatchFailure(failure) if failure.is_timeout() => {
            GatewayError::Timeout { operation }
        }
        _ => GatewayError::Api {
            operation,
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}

fn repository_from_api(repo: &aws_sdk_ecr::types::Repository) -> Repository {
    Repository {
        name: repo.repository_name().unwrap_or_default().to_string(),
        registry_id: repo.registry_id().unwrap_or_default().to_string(),
        uri: repo.repository_uri().unwrap_or_default().to_string(),
        tag_mutability: repo
            .image_tag_mutability()
            .map_or(TagMutability::Mutable, |m| {
                TagMutability::from_api(m.as_str())
            }),
        scan_on_push: repo
            .image_scanning_configuration()
            .is_some_and(|c| c.scan_on_push()),
        encryption_type: repo
            .encryption_configuration()
            .map(|c| c.encryption_type().as_str().to_string())
            .unwrap_or_default(),
    }
}

fn image_from_api(repository_name: &str, detail: &ImageDetail) -> Image {
    // An empty severity map means "no findings recorded", which must read as
    // absent scan data, not as zero findings per severity.
    let scan_severity_counts = detail
        .image_scan_findings_summary()
        .and_then(|summary| summary.finding_severity_counts())
        .filter(|counts| !counts.is_empty())
        .map(|counts| {
            counts
                .iter()
                .map(|(severity, count)| (severity.as_str().to_string(), i64::from(*count)))
                .collect::<BTreeMap<String, i64>>()
        });

    Image {
        digest: detail.image_digest().unwrap_or_default().to_string(),
        repository: repository_name.to_string(),
        tags: detail.image_tags().to_vec(),
        size_bytes: detail.image_size_in_bytes().unwrap_or_default(),
        scan_severity_counts,
    }
}
