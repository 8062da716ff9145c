use crate::cache::{CacheKey, TtlCache};
use crate::error::BrowserError;
use crate::gateway::{ObjectStoreGateway, Partition, SampleId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument};

/// Result of a list call that never fails the caller
///
/// When the store could not be reached `items` is empty and `error` holds
/// the failure to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOutcome<T> {
    pub items: Vec<T>,
    pub error: Option<BrowserError>,
}

impl<T> ListOutcome<T> {
    fn ok(items: Vec<T>) -> Self {
        Self { items, error: None }
    }

    fn failed(error: BrowserError) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Cached enumeration of languages and their samples
pub struct ListingService {
    gateway: Arc<dyn ObjectStoreGateway>,
    cache: TtlCache<CacheKey, Vec<String>>,
    ttl: Duration,
}

impl ListingService {
    pub fn new(gateway: Arc<dyn ObjectStoreGateway>, ttl: Duration) -> Self {
        Self {
            gateway,
            cache: TtlCache::new(),
            ttl,
        }
    }

    /// Languages in store order
    #[instrument(skip(self))]
    pub async fn get_partitions(&self) -> ListOutcome<Partition> {
        let gateway = &self.gateway;
        let result = self
            .cache
            .get_or_load(CacheKey::Partitions, self.ttl, || async {
                let partitions = gateway.list_partitions().await?;
                Ok::<_, BrowserError>(partitions.iter().map(|p| p.to_string()).collect())
            })
            .await;

        match result {
            Ok(names) => ListOutcome::ok(names.into_iter().map(Partition::from).collect()),
            Err(e) => report("list_partitions", e),
        }
    }

    /// Samples of `partition`, sorted by identifier
    #[instrument(skip(self), fields(partition = %partition))]
    pub async fn get_samples(&self, partition: &Partition) -> ListOutcome<SampleId> {
        let gateway = &self.gateway;
        let result = self
            .cache
            .get_or_load(CacheKey::SamplesOf(partition.clone()), self.ttl, || async {
                let samples = gateway.list_samples(partition).await?;
                Ok::<_, BrowserError>(samples.iter().map(|s| s.to_string()).collect())
            })
            .await;

        match result {
            Ok(names) => {
                // Stored unsorted; page boundaries depend on this order.
                let mut samples: Vec<SampleId> = names.into_iter().map(SampleId::from).collect();
                samples.sort();
                ListOutcome::ok(samples)
            }
            Err(e) => report("list_samples", e),
        }
    }

    /// Forget cached listings so the next call goes to the store
    ///
    /// With a partition only that partition's samples are dropped; without
    /// one everything is.
    pub fn refresh(&self, partition: Option<&Partition>) {
        match partition {
            Some(partition) => {
                self.cache
                    .invalidate(&CacheKey::SamplesOf(partition.clone()));
            }
            None => self.cache.clear(),
        }
    }
}

fn report<T>(operation: &'static str, err: BrowserError) -> ListOutcome<T> {
    error!(operation, error = %err, "Object store listing failed");
    metrics::counter!("browser_store_errors_total", "operation" => operation).increment(1);
    ListOutcome::failed(err)
}
