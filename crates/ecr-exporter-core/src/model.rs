//! Snapshot types for registry API responses.
//!
//! These are immutable copies of what the API returned at fetch time; the
//! caches store and replace them wholesale.

use std::collections::BTreeMap;

/// Tag mutability setting of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMutability {
    /// Tags may be moved to a new digest by a later push.
    Mutable,

    /// Tags are write-once.
    Immutable,
}

impl TagMutability {
    /// Parses the API's mutability string.
    ///
    /// Unknown values fall back to [`Self::Mutable`], the registry default.
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        if value.eq_ignore_ascii_case("IMMUTABLE") {
            Self::Immutable
        } else {
            Self::Mutable
        }
    }

    /// Returns the lower-cased label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mutable => "mutable",
            Self::Immutable => "immutable",
        }
    }
}

impl std::fmt::Display for TagMutability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ECR repository as described by the registry API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Repository name, unique within a registry.
    pub name: String,

    /// Owning registry (AWS account) id.
    pub registry_id: String,

    /// Full repository URI.
    pub uri: String,

    /// Tag mutability setting.
    pub tag_mutability: TagMutability,

    /// Whether images are scanned on push.
    pub scan_on_push: bool,

    /// Encryption type, e.g. "AES256" or "KMS".
    pub encryption_type: String,
}

/// An image within one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Content digest, e.g. "sha256:...".
    pub digest: String,

    /// Name of the owning repository.
    pub repository: String,

    /// Tags pointing at this digest. May be empty; untagged images carry no
    /// per-image metrics.
    pub tags: Vec<String>,

    /// Image size in bytes.
    pub size_bytes: i64,

    /// Scan finding counts keyed by severity label.
    ///
    /// `None` when no scan has run for this image. An image whose scan
    /// produced an empty severity map is also `None`: absence of findings
    /// emits nothing, never zeros.
    pub scan_severity_counts: Option<BTreeMap<String, i64>>,
}
