//! Object store boundary.
//!
//! The store is laid out as `{language}/{sample}/{file}`. Languages and
//! samples are discovered as common prefixes, and individual files are
//! addressed through [`ObjectKey`]. Everything the core needs from the store
//! goes through [`ObjectStoreGateway`], so the rest of the crate can be
//! exercised against a mock.

use crate::error::BrowserError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Metadata object name inside a sample prefix
pub const METADATA_FILENAME: &str = "metadata.json";

/// First-level grouping key (a language)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partition(String);

/// Second-level grouping key, unique within a [`Partition`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(Partition);
string_id!(SampleId);

/// The audio renditions stored for every sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Original,
    Denoised,
    DenoisedNormalized,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Original,
        ArtifactKind::Denoised,
        ArtifactKind::DenoisedNormalized,
    ];

    pub fn filename(&self) -> &'static str {
        match self {
            ArtifactKind::Original => "original.wav",
            ArtifactKind::Denoised => "denoised.wav",
            ArtifactKind::DenoisedNormalized => "denoised_normalized.wav",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Original => "original",
            ArtifactKind::Denoised => "denoised",
            ArtifactKind::DenoisedNormalized => "denoised_normalized",
        }
    }
}

/// Full key of one object: `{partition}/{sample}/{filename}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Build a key, rejecting components that would escape their level
    pub fn new(
        partition: &Partition,
        sample: &SampleId,
        filename: &str,
    ) -> Result<Self, BrowserError> {
        for component in [partition.as_str(), sample.as_str(), filename] {
            if component.is_empty() || component.contains('/') {
                return Err(BrowserError::MalformedKey(format!(
                    "{}/{}/{}",
                    partition, sample, filename
                )));
            }
        }

        Ok(Self(format!("{}/{}/{}", partition, sample, filename)))
    }

    pub fn metadata(partition: &Partition, sample: &SampleId) -> Result<Self, BrowserError> {
        Self::new(partition, sample, METADATA_FILENAME)
    }

    pub fn artifact(
        partition: &Partition,
        sample: &SampleId,
        kind: ArtifactKind,
    ) -> Result<Self, BrowserError> {
        Self::new(partition, sample, kind.filename())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time-limited link to one object, usable without credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Contract the core relies on from the remote store
///
/// List operations fail with [`BrowserError::StoreUnavailable`]. A missing
/// object is an expected outcome and comes back as `Ok(None)`. Signing does
/// not check that the object exists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStoreGateway: Send + Sync {
    /// First-level prefixes, in store order
    async fn list_partitions(&self) -> Result<Vec<Partition>, BrowserError>;

    /// Second-level prefixes under `partition`, in store order
    async fn list_samples(&self, partition: &Partition) -> Result<Vec<SampleId>, BrowserError>;

    /// Object body, or `None` when there is no such object
    async fn get_object(&self, key: &ObjectKey) -> Result<Option<Vec<u8>>, BrowserError>;

    /// Presigned GET link valid for `expires_in`
    async fn sign_url(&self, key: &ObjectKey, expires_in: Duration)
        -> Result<SignedUrl, BrowserError>;
}

/// `"hindi/"` -> `hindi`
pub(crate) fn partition_from_prefix(prefix: &str) -> Option<Partition> {
    let name = prefix.strip_suffix('/').unwrap_or(prefix);
    (!name.is_empty()).then(|| Partition::new(name))
}

/// `"hindi/abc123/"` -> `abc123`
pub(crate) fn sample_from_prefix(prefix: &str) -> Option<SampleId> {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    prefix
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(SampleId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let partition = Partition::from("hindi");
        let sample = SampleId::from("sample_0042");

        let key = ObjectKey::metadata(&partition, &sample).unwrap();
        assert_eq!(key.as_str(), "hindi/sample_0042/metadata.json");

        let key = ObjectKey::artifact(&partition, &sample, ArtifactKind::DenoisedNormalized).unwrap();
        assert_eq!(key.as_str(), "hindi/sample_0042/denoised_normalized.wav");
    }

    #[test]
    fn test_object_key_rejects_bad_components() {
        let sample = SampleId::from("s1");
        assert!(matches!(
            ObjectKey::metadata(&Partition::from(""), &sample),
            Err(BrowserError::MalformedKey(_))
        ));
        assert!(ObjectKey::metadata(&Partition::from("hindi/extra"), &sample).is_err());
        assert!(ObjectKey::new(&Partition::from("hindi"), &sample, "").is_err());
    }

    #[test]
    fn test_artifact_filenames() {
        let names: Vec<_> = ArtifactKind::ALL.iter().map(|k| k.filename()).collect();
        assert_eq!(
            names,
            vec!["original.wav", "denoised.wav", "denoised_normalized.wav"]
        );
    }

    #[test]
    fn test_prefix_parsing() {
        assert_eq!(partition_from_prefix("hindi/"), Some(Partition::from("hindi")));
        assert_eq!(partition_from_prefix("/"), None);
        assert_eq!(sample_from_prefix("hindi/abc123/"), Some(SampleId::from("abc123")));
        assert_eq!(sample_from_prefix("hindi//"), None);
        assert_eq!(sample_from_prefix(""), None);
    }
}
