use crate::config::{Config, PaginationConfig};
use crate::error::BrowserError;
use crate::gateway::{ArtifactKind, ObjectStoreGateway, Partition, SampleId};
use crate::listing::{ListOutcome, ListingService};
use crate::pagination::{paginate, Page};
use crate::resolver::{ArtifactUrl, MetadataResolution, ResolvedSample, SampleResolver};
use futures::stream::{self, StreamExt};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{info, instrument};

/// One page of a language, each sample resolved for display
#[derive(Debug, Clone)]
pub struct PageView {
    pub partition: Partition,
    pub page: Page<ResolvedSample>,
    /// Set when the sample listing could not be fetched
    pub error: Option<BrowserError>,
}

/// Query surface handed to a presentation layer
///
/// Bundles the cached listings, the pager and the per-sample resolvers over
/// a single gateway.
pub struct SampleBrowser {
    listing: ListingService,
    resolver: SampleResolver,
    pagination: PaginationConfig,
}

impl SampleBrowser {
    pub fn new(gateway: Arc<dyn ObjectStoreGateway>, config: &Config) -> Self {
        info!(
            listing_ttl_secs = config.cache.listing_ttl_secs,
            url_expiry_secs = config.store.presigned_url_expiry_secs,
            "Sample browser initialized"
        );

        Self {
            listing: ListingService::new(gateway.clone(), config.listing_ttl()),
            resolver: SampleResolver::new(gateway, config.presigned_url_expiry()),
            pagination: config.pagination.clone(),
        }
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    pub async fn list_partitions(&self) -> ListOutcome<Partition> {
        self.listing.get_partitions().await
    }

    pub async fn list_samples(&self, partition: &Partition) -> ListOutcome<SampleId> {
        self.listing.get_samples(partition).await
    }

    pub fn paginate(
        &self,
        samples: &[SampleId],
        page: usize,
        page_size: NonZeroUsize,
    ) -> Page<SampleId> {
        paginate(samples, page, page_size)
    }

    pub async fn resolve_metadata(
        &self,
        partition: &Partition,
        sample: &SampleId,
    ) -> MetadataResolution {
        self.resolver.resolve_metadata(partition, sample).await
    }

    pub async fn resolve_artifact_url(
        &self,
        partition: &Partition,
        sample: &SampleId,
        kind: ArtifactKind,
    ) -> ArtifactUrl {
        self.resolver
            .resolve_artifact_url(partition, sample, kind)
            .await
    }

    pub async fn resolve_sample(&self, partition: &Partition, sample: &SampleId) -> ResolvedSample {
        self.resolver.resolve_sample(partition, sample).await
    }

    /// List, paginate and resolve one page of `partition`
    ///
    /// Samples on the page are resolved with bounded concurrency; the rows
    /// keep the sorted sample order.
    #[instrument(skip(self), fields(partition = %partition))]
    pub async fn browse_page(
        &self,
        partition: &Partition,
        page: usize,
        page_size: NonZeroUsize,
    ) -> PageView {
        let samples = self.list_samples(partition).await;
        let ids = paginate(&samples.items, page, page_size);

        let resolver = &self.resolver;
        let rows: Vec<ResolvedSample> = stream::iter(ids.items.clone())
            .map(|sample| async move { resolver.resolve_sample(partition, &sample).await })
            .buffered(self.pagination.resolve_concurrency.max(1))
            .collect()
            .await;

        PageView {
            partition: partition.clone(),
            page: Page {
                items: rows,
                page: ids.page,
                page_size: ids.page_size,
                total_pages: ids.total_pages,
                total_items: ids.total_items,
                has_prev: ids.has_prev,
                has_next: ids.has_next,
            },
            error: samples.error,
        }
    }

    /// Drop cached listings; see [`ListingService::refresh`]
    pub fn refresh(&self, partition: Option<&Partition>) {
        self.listing.refresh(partition);
    }
}
