use crate::config::{StoreConfig, StoreCredentials};
use crate::error::BrowserError;
use crate::gateway::{
    partition_from_prefix, sample_from_prefix, ObjectKey, ObjectStoreGateway, Partition, SampleId,
    SignedUrl,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use aws_types::region::Region;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// S3-backed gateway over the `{language}/{sample}/{file}` bucket layout
pub struct S3Gateway {
    client: S3Client,
    bucket: String,
}

impl S3Gateway {
    /// Create a new gateway using static credentials
    pub async fn new(config: &StoreConfig, credentials: &StoreCredentials) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                credentials.access_key.clone(),
                credentials.secret_key.clone(),
                None,
                None,
                "browser-config",
            ))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 gateway initialized"
        );

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }

    /// Collect every common prefix under `prefix`, following continuation tokens
    async fn list_common_prefixes(
        &self,
        prefix: Option<String>,
        operation: &'static str,
    ) -> Result<Vec<String>, BrowserError> {
        let mut prefixes = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .delimiter("/")
                .set_prefix(prefix.clone())
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| BrowserError::store_unavailable(operation, DisplayErrorContext(e)))?;

            prefixes.extend(
                response
                    .common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix().map(String::from)),
            );

            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(
            prefix = prefix.as_deref().unwrap_or(""),
            count = prefixes.len(),
            "Listed common prefixes"
        );

        Ok(prefixes)
    }
}

#[async_trait]
impl ObjectStoreGateway for S3Gateway {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_partitions(&self) -> Result<Vec<Partition>, BrowserError> {
        let prefixes = self.list_common_prefixes(None, "list_partitions").await?;

        Ok(prefixes
            .iter()
            .filter_map(|p| partition_from_prefix(p))
            .collect())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, partition = %partition))]
    async fn list_samples(&self, partition: &Partition) -> Result<Vec<SampleId>, BrowserError> {
        let prefixes = self
            .list_common_prefixes(Some(format!("{}/", partition)), "list_samples")
            .await?;

        Ok(prefixes
            .iter()
            .filter_map(|p| sample_from_prefix(p))
            .collect())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn get_object(&self, key: &ObjectKey) -> Result<Option<Vec<u8>>, BrowserError> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                if e.as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    debug!("Object not found");
                    return Ok(None);
                }
                return Err(BrowserError::store_unavailable(
                    "get_object",
                    DisplayErrorContext(e),
                ));
            }
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| BrowserError::store_unavailable("get_object", e))?;

        Ok(Some(body.into_bytes().to_vec()))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn sign_url(
        &self,
        key: &ObjectKey,
        expires_in: Duration,
    ) -> Result<SignedUrl, BrowserError> {
        let signing_failed = |message: String| BrowserError::SigningFailed {
            key: key.to_string(),
            message,
        };

        let presigning_config =
            PresigningConfig::expires_in(expires_in).map_err(|e| signing_failed(e.to_string()))?;
        let validity =
            chrono::Duration::from_std(expires_in).map_err(|e| signing_failed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(presigning_config)
            .await
            .map_err(|e| signing_failed(DisplayErrorContext(e).to_string()))?;

        Ok(SignedUrl {
            url: presigned.uri().to_string(),
            expires_at: Utc::now() + validity,
        })
    }
}
