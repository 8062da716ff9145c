use crate::error::BrowserError;
use crate::gateway::{ArtifactKind, ObjectKey, ObjectStoreGateway, Partition, SampleId, SignedUrl};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Shown where a sample has no transcript
pub const NOT_AVAILABLE: &str = "N/A";

/// Parsed `metadata.json` of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Verbatim transcript of the recording, usually a string
    #[serde(default)]
    pub verbatim: Option<serde_json::Value>,
    /// Every other field, kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SampleMetadata {
    /// Transcript for display; non-string values are shown as JSON text
    pub fn verbatim_or_na(&self) -> String {
        match &self.verbatim {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(serde_json::Value::Null) | None => NOT_AVAILABLE.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Why a sample's metadata could not be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    ObjectMissing,
    MalformedMetadata,
    StoreError,
}

/// Metadata of a sample, or the routine reason it is not there
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataResolution {
    Present(SampleMetadata),
    Missing(MissingReason),
}

impl MetadataResolution {
    pub fn metadata(&self) -> Option<&SampleMetadata> {
        match self {
            MetadataResolution::Present(metadata) => Some(metadata),
            MetadataResolution::Missing(_) => None,
        }
    }

    pub fn verbatim(&self) -> String {
        self.metadata()
            .map(SampleMetadata::verbatim_or_na)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

/// Signed link to one artifact, or absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactUrl {
    Signed(SignedUrl),
    Absent,
}

impl ArtifactUrl {
    pub fn signed(&self) -> Option<&SignedUrl> {
        match self {
            ArtifactUrl::Signed(url) => Some(url),
            ArtifactUrl::Absent => None,
        }
    }

    pub fn into_signed(self) -> Option<SignedUrl> {
        match self {
            ArtifactUrl::Signed(url) => Some(url),
            ArtifactUrl::Absent => None,
        }
    }
}

/// The three artifact links of a sample, resolved independently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub original: ArtifactUrl,
    pub denoised: ArtifactUrl,
    pub denoised_normalized: ArtifactUrl,
}

impl ArtifactSet {
    pub fn get(&self, kind: ArtifactKind) -> &ArtifactUrl {
        match kind {
            ArtifactKind::Original => &self.original,
            ArtifactKind::Denoised => &self.denoised,
            ArtifactKind::DenoisedNormalized => &self.denoised_normalized,
        }
    }
}

/// Everything displayed for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSample {
    pub sample: SampleId,
    pub metadata: MetadataResolution,
    pub artifacts: ArtifactSet,
}

/// Per-sample lookups that never fail the caller
///
/// Every failure is logged and turned into `Missing`/`Absent`, so one broken
/// sample cannot keep the rest of a page from rendering.
pub struct SampleResolver {
    gateway: Arc<dyn ObjectStoreGateway>,
    url_expiry: Duration,
}

impl SampleResolver {
    pub fn new(gateway: Arc<dyn ObjectStoreGateway>, url_expiry: Duration) -> Self {
        Self {
            gateway,
            url_expiry,
        }
    }

    #[instrument(skip(self), fields(partition = %partition, sample = %sample))]
    pub async fn resolve_metadata(
        &self,
        partition: &Partition,
        sample: &SampleId,
    ) -> MetadataResolution {
        let key = match ObjectKey::metadata(partition, sample) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Cannot address metadata");
                return MetadataResolution::Missing(MissingReason::ObjectMissing);
            }
        };

        let body = match self.gateway.get_object(&key).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!(key = %key, "No metadata object");
                return MetadataResolution::Missing(MissingReason::ObjectMissing);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to fetch metadata");
                return MetadataResolution::Missing(MissingReason::StoreError);
            }
        };

        match parse_metadata(&key, &body) {
            Ok(metadata) => MetadataResolution::Present(metadata),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable metadata");
                MetadataResolution::Missing(MissingReason::MalformedMetadata)
            }
        }
    }

    #[instrument(skip(self), fields(partition = %partition, sample = %sample, kind = kind.as_str()))]
    pub async fn resolve_artifact_url(
        &self,
        partition: &Partition,
        sample: &SampleId,
        kind: ArtifactKind,
    ) -> ArtifactUrl {
        let signed = match ObjectKey::artifact(partition, sample, kind) {
            Ok(key) => self.gateway.sign_url(&key, self.url_expiry).await,
            Err(e) => Err(e),
        };

        match signed {
            Ok(url) => ArtifactUrl::Signed(url),
            Err(e) => {
                debug!(error = %e, "Artifact URL unavailable");
                metrics::counter!("browser_artifacts_absent_total", "kind" => kind.as_str())
                    .increment(1);
                ArtifactUrl::Absent
            }
        }
    }

    /// All three artifact kinds, signed concurrently
    pub async fn resolve_artifacts(&self, partition: &Partition, sample: &SampleId) -> ArtifactSet {
        let (original, denoised, denoised_normalized) = futures::join!(
            self.resolve_artifact_url(partition, sample, ArtifactKind::Original),
            self.resolve_artifact_url(partition, sample, ArtifactKind::Denoised),
            self.resolve_artifact_url(partition, sample, ArtifactKind::DenoisedNormalized),
        );

        ArtifactSet {
            original,
            denoised,
            denoised_normalized,
        }
    }

    /// Metadata and artifacts of one sample, fetched concurrently
    pub async fn resolve_sample(&self, partition: &Partition, sample: &SampleId) -> ResolvedSample {
        let (metadata, artifacts) = futures::join!(
            self.resolve_metadata(partition, sample),
            self.resolve_artifacts(partition, sample),
        );

        ResolvedSample {
            sample: sample.clone(),
            metadata,
            artifacts,
        }
    }
}

fn parse_metadata(key: &ObjectKey, body: &[u8]) -> Result<SampleMetadata, BrowserError> {
    serde_json::from_slice(body).map_err(|e| BrowserError::MalformedMetadata {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockObjectStoreGateway;
    use chrono::Utc;

    fn signed(key: &ObjectKey) -> SignedUrl {
        SignedUrl {
            url: format!("https://indicvoices.s3.amazonaws.com/{}?X-Amz-Signature=abc", key),
            expires_at: Utc::now(),
        }
    }

    fn resolver(gateway: MockObjectStoreGateway) -> SampleResolver {
        SampleResolver::new(Arc::new(gateway), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_metadata_present() {
        let mut gateway = MockObjectStoreGateway::new();
        gateway
            .expect_get_object()
            .withf(|key| key.as_str() == "hindi/s1/metadata.json")
            .returning(|_| {
                Ok(Some(
                    br#"{"verbatim": "namaste duniya", "speaker_id": "spk_7", "duration": 4.2}"#
                        .to_vec(),
                ))
            });

        let resolution = resolver(gateway)
            .resolve_metadata(&Partition::from("hindi"), &SampleId::from("s1"))
            .await;

        let metadata = resolution.metadata().unwrap();
        assert_eq!(
            metadata.verbatim,
            Some(serde_json::Value::from("namaste duniya"))
        );
        assert_eq!(metadata.extra["speaker_id"], "spk_7");
        assert_eq!(resolution.verbatim(), "namaste duniya");
    }

    #[tokio::test]
    async fn test_metadata_missing_malformed_and_failed() {
        let mut gateway = MockObjectStoreGateway::new();
        gateway
            .expect_get_object()
            .withf(|key| key.as_str().starts_with("hindi/absent/"))
            .returning(|_| Ok(None));
        gateway
            .expect_get_object()
            .withf(|key| key.as_str().starts_with("hindi/garbled/"))
            .returning(|_| Ok(Some(b"{not json".to_vec())));
        gateway
            .expect_get_object()
            .withf(|key| key.as_str().starts_with("hindi/offline/"))
            .returning(|_| Err(BrowserError::store_unavailable("get_object", "timed out")));

        let resolver = resolver(gateway);
        let hindi = Partition::from("hindi");

        let absent = resolver.resolve_metadata(&hindi, &SampleId::from("absent")).await;
        assert_eq!(absent, MetadataResolution::Missing(MissingReason::ObjectMissing));
        assert_eq!(absent.verbatim(), NOT_AVAILABLE);

        let garbled = resolver.resolve_metadata(&hindi, &SampleId::from("garbled")).await;
        assert_eq!(
            garbled,
            MetadataResolution::Missing(MissingReason::MalformedMetadata)
        );

        let offline = resolver.resolve_metadata(&hindi, &SampleId::from("offline")).await;
        assert_eq!(offline, MetadataResolution::Missing(MissingReason::StoreError));
    }

    #[tokio::test]
    async fn test_metadata_without_verbatim_shows_na() {
        let mut gateway = MockObjectStoreGateway::new();
        gateway
            .expect_get_object()
            .returning(|_| Ok(Some(br#"{"speaker_id": "spk_1"}"#.to_vec())));

        let resolution = resolver(gateway)
            .resolve_metadata(&Partition::from("tamil"), &SampleId::from("s9"))
            .await;

        assert!(resolution.metadata().is_some());
        assert_eq!(resolution.verbatim(), NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_non_string_verbatim_is_still_present() {
        let mut gateway = MockObjectStoreGateway::new();
        gateway
            .expect_get_object()
            .withf(|key| key.as_str().starts_with("kannada/numeric/"))
            .returning(|_| Ok(Some(br#"{"verbatim": 42, "speaker_id": "spk_1"}"#.to_vec())));
        gateway
            .expect_get_object()
            .withf(|key| key.as_str().starts_with("kannada/listed/"))
            .returning(|_| Ok(Some(br#"{"verbatim": ["ondu", "eradu"]}"#.to_vec())));
        gateway
            .expect_get_object()
            .withf(|key| key.as_str().starts_with("kannada/null/"))
            .returning(|_| Ok(Some(br#"{"verbatim": null}"#.to_vec())));

        let resolver = resolver(gateway);
        let kannada = Partition::from("kannada");

        let numeric = resolver.resolve_metadata(&kannada, &SampleId::from("numeric")).await;
        assert_eq!(numeric.verbatim(), "42");
        assert_eq!(numeric.metadata().unwrap().extra["speaker_id"], "spk_1");

        let listed = resolver.resolve_metadata(&kannada, &SampleId::from("listed")).await;
        assert_eq!(listed.verbatim(), r#"["ondu","eradu"]"#);

        let null = resolver.resolve_metadata(&kannada, &SampleId::from("null")).await;
        assert!(null.metadata().is_some());
        assert_eq!(null.verbatim(), NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_metadata_does_not_block_artifacts() {
        let mut gateway = MockObjectStoreGateway::new();
        gateway.expect_get_object().returning(|_| Ok(None));
        gateway
            .expect_sign_url()
            .withf(|key, _| key.as_str().ends_with("/denoised.wav"))
            .returning(|key, _| {
                Err(BrowserError::SigningFailed {
                    key: key.to_string(),
                    message: "access denied".to_string(),
                })
            });
        gateway
            .expect_sign_url()
            .withf(|key, expires_in| {
                !key.as_str().ends_with("/denoised.wav")
                    && *expires_in == Duration::from_secs(3600)
            })
            .times(2)
            .returning(|key, _| Ok(signed(key)));

        let resolved = resolver(gateway)
            .resolve_sample(&Partition::from("hindi"), &SampleId::from("s1"))
            .await;

        assert_eq!(
            resolved.metadata,
            MetadataResolution::Missing(MissingReason::ObjectMissing)
        );
        assert!(resolved
            .artifacts
            .original
            .signed()
            .map(|u| u.url.contains("hindi/s1/original.wav"))
            .unwrap_or(false));
        assert_eq!(resolved.artifacts.denoised, ArtifactUrl::Absent);
        assert!(resolved
            .artifacts
            .get(ArtifactKind::DenoisedNormalized)
            .signed()
            .is_some());
    }

    #[tokio::test]
    async fn test_malformed_key_is_absent_without_store_call() {
        // No expectations: any gateway call would panic.
        let gateway = MockObjectStoreGateway::new();
        let resolver = resolver(gateway);
        let bad = SampleId::from("../etc");

        let url = resolver
            .resolve_artifact_url(&Partition::from("hindi"), &bad, ArtifactKind::Original)
            .await;
        assert_eq!(url, ArtifactUrl::Absent);

        let metadata = resolver.resolve_metadata(&Partition::from("hindi"), &bad).await;
        assert_eq!(metadata, MetadataResolution::Missing(MissingReason::ObjectMissing));
    }
}
