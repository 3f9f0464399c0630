//! Assembly of API snapshots into Prometheus metric families.
//!
//! One [`MetricBatch`] is built per scrape and returns the four families in
//! a fixed order, each always present even when it carries zero samples.

use crate::model::{Image, Repository};
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{IntGaugeVec, Opts};

/// Family name for the repository count gauge.
pub const REPOSITORY_COUNT: &str = "ecr_repository_count";

/// Family name for the per-repository info gauge.
///
/// The original exporter publishes this through an info-style family, which
/// appears on the wire with the `_info` suffix and a constant value of 1.
pub const REPOSITORY_INFO: &str = "ecr_repository_info";

/// Family name for the per-tag image size gauge.
pub const IMAGE_SIZE: &str = "ecr_image_size_in_bytes";

/// Family name for the per-tag scan severity count gauge.
pub const IMAGE_SCAN_SEVERITY: &str = "ecr_image_scan_severity_count";

/// Builder for one scrape's worth of metric families.
pub struct MetricBatch {
    registry_id: String,
    repository_count: IntGaugeVec,
    repository_info: IntGaugeVec,
    image_size: IntGaugeVec,
    image_scan: IntGaugeVec,
}

impl MetricBatch {
    /// Creates empty families for one scrape.
    ///
    /// # Errors
    ///
    /// Returns the underlying prometheus error if a family descriptor is
    /// rejected.
    pub fn new(registry_id: &str) -> Result<Self, prometheus::Error> {
        Ok(Self {
            registry_id: registry_id.to_string(),
            repository_count: IntGaugeVec::new(
                Opts::new(REPOSITORY_COUNT, "Total count of all ECR repositories"),
                &["registry_id"],
            )?,
            repository_info: IntGaugeVec::new(
                Opts::new(REPOSITORY_INFO, "ECR repository information"),
                &[
                    "name",
                    "registry_id",
                    "repository_uri",
                    "tag_mutability",
                    "scan_on_push",
                    "encryption_type",
                ],
            )?,
            image_size: IntGaugeVec::new(
                Opts::new(IMAGE_SIZE, "The size of an image in bytes"),
                &["name", "tag", "digest", "registry_id"],
            )?,
            image_scan: IntGaugeVec::new(
                Opts::new(IMAGE_SCAN_SEVERITY, "ECR image scan summary results"),
                &["name", "tag", "digest", "registry_id", "severity"],
            )?,
        })
    }

    /// Records the repository snapshot: one count sample and one info sample
    /// per repository, field-for-field.
    pub fn record_repositories(&self, repositories: &[Repository]) {
        self.repository_count
            .with_label_values(&[&self.registry_id])
            .set(repositories.len() as i64);

        for repository in repositories {
            self.repository_info
                .with_label_values(&[
                    &repository.name,
                    &repository.registry_id,
                    &repository.uri,
                    repository.tag_mutability.as_str(),
                    if repository.scan_on_push { "true" } else { "false" },
                    &repository.encryption_type,
                ])
                .set(1);
        }
    }

    /// Records one repository's images: one size sample per (image, tag),
    /// and one scan sample per (image, tag, severity) when scan data is
    /// present.
    ///
    /// Untagged images contribute no samples at all; absent scan data emits
    /// nothing, not zeros.
    pub fn record_images(&self, repository_name: &str, images: &[Image]) {
        for image in images {
            for tag in &image.tags {
                self.image_size
                    .with_label_values(&[repository_name, tag, &image.digest, &self.registry_id])
                    .set(image.size_bytes);

                if let Some(counts) = &image.scan_severity_counts {
                    for (severity, count) in counts {
                        self.image_scan
                            .with_label_values(&[
                                repository_name,
                                tag,
                                &image.digest,
                                &self.registry_id,
                                severity,
                            ])
                            .set(*count);
                    }
                }
            }
        }
    }

    /// Consumes the batch, returning the four families in fixed order:
    /// repository count, repository info, image size, image scan severity.
    #[must_use]
    pub fn into_families(self) -> Vec<MetricFamily> {
        let mut families = Vec::with_capacity(4);
        families.extend(self.repository_count.collect());
        families.extend(self.repository_info.collect());
        families.extend(self.image_size.collect());
        families.extend(self.image_scan.collect());
        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TagMutability;
    use prometheus::proto::Metric;
    use std::collections::BTreeMap;

    fn label_value(metric: &Metric, name: &str) -> String {
        metric
            .get_label()
            .iter()
            .find(|pair| pair.get_name() == name)
            .map(|pair| pair.get_value().to_string())
            .unwrap_or_default()
    }

    fn sample_with_label<'a>(metrics: &'a [Metric], name: &str, value: &str) -> &'a Metric {
        metrics
            .iter()
            .find(|metric| label_value(metric, name) == value)
            .unwrap()
    }

    fn repo(name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            registry_id: "123456789012".to_string(),
            uri: format!("u/{name}"),
            tag_mutability: TagMutability::Mutable,
            scan_on_push: true,
            encryption_type: "AES256".to_string(),
        }
    }

    #[test]
    fn test_empty_batch_still_yields_four_families_in_order() {
        let batch = MetricBatch::new("123456789012").unwrap();
        let families = batch.into_families();

        let names: Vec<&str> = families.iter().map(MetricFamily::get_name).collect();
        assert_eq!(
            names,
            vec![
                REPOSITORY_COUNT,
                REPOSITORY_INFO,
                IMAGE_SIZE,
                IMAGE_SCAN_SEVERITY
            ]
        );
    }

    #[test]
    fn test_repository_count_and_info_samples() {
        let batch = MetricBatch::new("123456789012").unwrap();
        batch.record_repositories(&[repo("app"), repo("web")]);
        let families = batch.into_families();

        let count = &families[0].get_metric()[0];
        assert_eq!(count.get_gauge().get_value() as i64, 2);
        assert_eq!(label_value(count, "registry_id"), "123456789012");

        let info = families[1].get_metric();
        assert_eq!(info.len(), 2);
        let app = sample_with_label(info, "name", "app");
        assert_eq!(app.get_gauge().get_value() as i64, 1);
        assert_eq!(label_value(app, "repository_uri"), "u/app");
        assert_eq!(label_value(app, "tag_mutability"), "mutable");
        assert_eq!(label_value(app, "scan_on_push"), "true");
        assert_eq!(label_value(app, "encryption_type"), "AES256");
    }

    #[test]
    fn test_zero_repositories_emits_count_of_zero() {
        let batch = MetricBatch::new("123456789012").unwrap();
        batch.record_repositories(&[]);
        let families = batch.into_families();

        assert_eq!(families[0].get_metric()[0].get_gauge().get_value() as i64, 0);
        assert!(families[1].get_metric().is_empty());
    }

    #[test]
    fn test_one_size_sample_per_tag() {
        let batch = MetricBatch::new("123456789012").unwrap();
        batch.record_images(
            "app",
            &[Image {
                digest: "sha256:1".to_string(),
                repository: "app".to_string(),
                tags: vec!["v1".to_string(), "latest".to_string()],
                size_bytes: 4096,
                scan_severity_counts: None,
            }],
        );
        let families = batch.into_families();

        let sizes = families[2].get_metric();
        assert_eq!(sizes.len(), 2);
        for tag in ["v1", "latest"] {
            let sample = sample_with_label(sizes, "tag", tag);
            assert_eq!(sample.get_gauge().get_value() as i64, 4096);
            assert_eq!(label_value(sample, "name"), "app");
            assert_eq!(label_value(sample, "digest"), "sha256:1");
        }
        assert!(families[3].get_metric().is_empty());
    }

    #[test]
    fn test_scan_samples_per_tag_and_severity() {
        let mut counts = BTreeMap::new();
        counts.insert("HIGH".to_string(), 2);

        let batch = MetricBatch::new("123456789012").unwrap();
        batch.record_images(
            "app",
            &[Image {
                digest: "sha256:1".to_string(),
                repository: "app".to_string(),
                tags: vec!["v1".to_string(), "latest".to_string()],
                size_bytes: 4096,
                scan_severity_counts: Some(counts),
            }],
        );
        let families = batch.into_families();

        let scans = families[3].get_metric();
        assert_eq!(scans.len(), 2);
        for tag in ["v1", "latest"] {
            let sample = sample_with_label(scans, "tag", tag);
            assert_eq!(sample.get_gauge().get_value() as i64, 2);
            assert_eq!(label_value(sample, "severity"), "HIGH");
        }
    }

    #[test]
    fn test_untagged_image_emits_nothing() {
        let mut counts = BTreeMap::new();
        counts.insert("CRITICAL".to_string(), 9);

        let batch = MetricBatch::new("123456789012").unwrap();
        batch.record_images(
            "app",
            &[Image {
                digest: "sha256:1".to_string(),
                repository: "app".to_string(),
                tags: Vec::new(),
                size_bytes: 4096,
                scan_severity_counts: Some(counts),
            }],
        );
        let families = batch.into_families();

        assert!(families[2].get_metric().is_empty());
        assert!(families[3].get_metric().is_empty());
    }

    #[test]
    fn test_severity_labels_pass_through_verbatim() {
        let mut counts = BTreeMap::new();
        counts.insert("UNDEFINED".to_string(), 1);
        counts.insert("informational".to_string(), 3);

        let batch = MetricBatch::new("123456789012").unwrap();
        batch.record_images(
            "app",
            &[Image {
                digest: "sha256:1".to_string(),
                repository: "app".to_string(),
                tags: vec!["v1".to_string()],
                size_bytes: 1,
                scan_severity_counts: Some(counts),
            }],
        );
        let families = batch.into_families();

        let scans = families[3].get_metric();
        assert_eq!(scans.len(), 2);
        assert_eq!(
            sample_with_label(scans, "severity", "UNDEFINED")
                .get_gauge()
                .get_value() as i64,
            1
        );
        assert_eq!(
            sample_with_label(scans, "severity", "informational")
                .get_gauge()
                .get_value() as i64,
            3
        );
    }
}
