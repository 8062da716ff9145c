use crate::cache::DEFAULT_TTL;
use crate::error::BrowserError;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Main configuration for the browser service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Object store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Listing cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Pagination configuration
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Object store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Access key ID (STORE_ACCESS_KEY)
    pub access_key: Option<String>,
    /// Secret access key (STORE_SECRET_KEY)
    pub secret_key: Option<String>,
    /// Bucket holding `{language}/{sample}/...` objects (STORE_BUCKET)
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Presigned URL expiration in seconds
    #[serde(default = "default_presigned_url_expiry_secs")]
    pub presigned_url_expiry_secs: u64,
}

/// Listing cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How long language and sample listings are reused, in seconds
    #[serde(default = "default_listing_ttl_secs")]
    pub listing_ttl_secs: u64,
}

/// Pagination configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the caller does not pick one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Page sizes a caller may pick from
    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<usize>,
    /// Number of samples on a page resolved concurrently
    #[serde(default = "default_resolve_concurrency")]
    pub resolve_concurrency: usize,
}

/// API configuration for the browse endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Credentials pulled out of [`StoreConfig`] once both are known to be present
#[derive(Clone)]
pub struct StoreCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

// Default value functions
fn default_service_name() -> String {
    "browser-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_bucket() -> String {
    "indicvoices".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_presigned_url_expiry_secs() -> u64 {
    3600
}

fn default_listing_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_page_size() -> usize {
    10
}

fn default_page_size_options() -> Vec<usize> {
    vec![10, 20, 50, 100]
}

fn default_resolve_concurrency() -> usize {
    8
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

/// Flat environment options and the legacy names they fall back to
const ENV_OVERRIDES: &[(&str, &str, &str)] = &[
    ("store.access_key", "STORE_ACCESS_KEY", "AWS_ACCESS_KEY_ID"),
    ("store.secret_key", "STORE_SECRET_KEY", "AWS_SECRET_ACCESS_KEY"),
    ("store.bucket", "STORE_BUCKET", "S3_BUCKET_NAME"),
];

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration, resolving the flat `STORE_*` options through `lookup`
    pub fn load_with<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/browser").required(false))
            .add_source(config::File::with_name("/etc/indicvoices/browser").required(false))
            // BROWSER__STORE__REGION -> store.region
            .add_source(
                config::Environment::with_prefix("BROWSER")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, primary, fallback) in ENV_OVERRIDES {
            let value = lookup(*primary).or_else(|| lookup(*fallback));
            builder = builder.set_override_option(*key, value)?;
        }

        let config = builder.build()?;
        config.try_deserialize().map_err(Into::into)
    }

    /// Both store credentials, or `ConfigurationMissing` naming every absent one
    pub fn credentials(&self) -> Result<StoreCredentials, BrowserError> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let access_key = present(&self.store.access_key);
        let secret_key = present(&self.store.secret_key);

        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(StoreCredentials {
                access_key: access_key.to_string(),
                secret_key: secret_key.to_string(),
            }),
            (access_key, secret_key) => {
                let mut missing = Vec::new();
                if access_key.is_none() {
                    missing.push("STORE_ACCESS_KEY");
                }
                if secret_key.is_none() {
                    missing.push("STORE_SECRET_KEY");
                }
                Err(BrowserError::ConfigurationMissing(missing.join(", ")))
            }
        }
    }

    /// Validate the non-credential settings
    pub fn validate(&self) -> Result<(), BrowserError> {
        if self.store.bucket.trim().is_empty() {
            return Err(BrowserError::ConfigurationMissing("STORE_BUCKET".to_string()));
        }

        if self.cache.listing_ttl_secs == 0 {
            return Err(invalid("cache.listing_ttl_secs", "must be greater than zero"));
        }

        if self.store.presigned_url_expiry_secs == 0 {
            return Err(invalid(
                "store.presigned_url_expiry_secs",
                "must be greater than zero",
            ));
        }

        let pagination = &self.pagination;
        if pagination.page_size_options.is_empty() {
            return Err(invalid("pagination.page_size_options", "must not be empty"));
        }
        if pagination.page_size_options.contains(&0) {
            return Err(invalid("pagination.page_size_options", "page sizes must be positive"));
        }
        if !pagination
            .page_size_options
            .contains(&pagination.default_page_size)
        {
            return Err(invalid(
                "pagination.default_page_size",
                "must be one of pagination.page_size_options",
            ));
        }
        if pagination.resolve_concurrency == 0 {
            return Err(invalid("pagination.resolve_concurrency", "must be greater than zero"));
        }

        Ok(())
    }

    /// Get listing cache TTL as Duration
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.listing_ttl_secs)
    }

    /// Get presigned URL expiry as Duration
    pub fn presigned_url_expiry(&self) -> Duration {
        Duration::from_secs(self.store.presigned_url_expiry_secs)
    }
}

impl PaginationConfig {
    /// Accept `requested` only if it is one of the configured options
    pub fn page_size(&self, requested: Option<usize>) -> Option<NonZeroUsize> {
        let size = requested.unwrap_or(self.default_page_size);
        if self.page_size_options.contains(&size) {
            NonZeroUsize::new(size)
        } else {
            None
        }
    }
}

fn invalid(key: &str, message: &str) -> BrowserError {
    BrowserError::InvalidConfiguration {
        key: key.to_string(),
        message: message.to_string(),
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: None,
            force_path_style: false,
            presigned_url_expiry_secs: default_presigned_url_expiry_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_ttl_secs: default_listing_ttl_secs(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            page_size_options: default_page_size_options(),
            resolve_concurrency: default_resolve_concurrency(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}
