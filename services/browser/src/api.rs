use crate::browser::SampleBrowser;
use crate::config::ApiConfig;
use crate::gateway::{Partition, SampleId, SignedUrl};
use crate::resolver::{MetadataResolution, MissingReason, ResolvedSample, SampleMetadata};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub browser: Arc<SampleBrowser>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Language list response
#[derive(Debug, Serialize)]
pub struct PartitionListResponse {
    pub partitions: Vec<Partition>,
    /// Present when the store could not be listed
    pub error: Option<ErrorResponse>,
}

/// Query parameters for a sample page
#[derive(Debug, Deserialize)]
pub struct SamplePageQuery {
    /// 1-based page number, clamped to the available pages
    #[serde(default = "default_page")]
    pub page: usize,
    /// Must be one of the configured page sizes
    pub page_size: Option<usize>,
}

fn default_page() -> usize {
    1
}

/// One page of samples
#[derive(Debug, Serialize)]
pub struct SamplePageResponse {
    pub partition: Partition,
    pub samples: Vec<SampleRow>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_samples: usize,
    pub has_prev: bool,
    pub has_next: bool,
    /// Present when the sample listing could not be fetched
    pub error: Option<ErrorResponse>,
}

/// One sample as displayed
#[derive(Debug, Serialize)]
pub struct SampleRow {
    pub sample_id: SampleId,
    /// Transcript, `N/A` when metadata has none
    pub verbatim: String,
    pub metadata: Option<SampleMetadata>,
    /// Why `metadata` is empty
    pub metadata_missing: Option<MissingReason>,
    pub original: Option<SignedUrl>,
    pub denoised: Option<SignedUrl>,
    pub denoised_normalized: Option<SignedUrl>,
}

impl From<ResolvedSample> for SampleRow {
    fn from(resolved: ResolvedSample) -> Self {
        let verbatim = resolved.metadata.verbatim();
        let (metadata, metadata_missing) = match resolved.metadata {
            MetadataResolution::Present(metadata) => (Some(metadata), None),
            MetadataResolution::Missing(reason) => (None, Some(reason)),
        };

        Self {
            sample_id: resolved.sample,
            verbatim,
            metadata,
            metadata_missing,
            original: resolved.artifacts.original.into_signed(),
            denoised: resolved.artifacts.denoised.into_signed(),
            denoised_normalized: resolved.artifacts.denoised_normalized.into_signed(),
        }
    }
}

/// Cache refresh request
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Only drop this language's sample listing
    pub partition: Option<Partition>,
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/partitions", get(list_partitions))
        .route("/api/v1/partitions/:partition/samples", get(list_samples))
        .route("/api/v1/partitions/:partition/samples/:sample", get(get_sample))
        .route("/api/v1/cache/refresh", post(refresh_cache))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "browser-service"
    }))
}

fn error_body(error: &crate::error::BrowserError) -> ErrorResponse {
    ErrorResponse {
        error: error.to_string(),
        code: error.code().to_string(),
    }
}

/// List languages
#[instrument(skip(state))]
async fn list_partitions(State(state): State<AppState>) -> Json<PartitionListResponse> {
    let outcome = state.browser.list_partitions().await;

    Json(PartitionListResponse {
        error: outcome.error.as_ref().map(error_body),
        partitions: outcome.items,
    })
}

/// One page of a language's samples, fully resolved
#[instrument(skip(state))]
async fn list_samples(
    State(state): State<AppState>,
    Path(partition): Path<String>,
    Query(params): Query<SamplePageQuery>,
) -> Result<Json<SamplePageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let pagination = state.browser.pagination();
    let page_size = pagination.page_size(params.page_size).ok_or_else(|| {
        warn!(page_size = ?params.page_size, "Rejected page size");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!(
                    "page_size must be one of {:?}",
                    pagination.page_size_options
                ),
                code: "INVALID_PAGE_SIZE".to_string(),
            }),
        )
    })?;

    let view = state
        .browser
        .browse_page(&Partition::new(partition), params.page, page_size)
        .await;

    Ok(Json(SamplePageResponse {
        partition: view.partition,
        page: view.page.page,
        page_size: view.page.page_size,
        total_pages: view.page.total_pages,
        total_samples: view.page.total_items,
        has_prev: view.page.has_prev,
        has_next: view.page.has_next,
        error: view.error.as_ref().map(error_body),
        samples: view.page.items.into_iter().map(SampleRow::from).collect(),
    }))
}

/// A single sample, fully resolved
#[instrument(skip(state))]
async fn get_sample(
    State(state): State<AppState>,
    Path((partition, sample)): Path<(String, String)>,
) -> Json<SampleRow> {
    let resolved = state
        .browser
        .resolve_sample(&Partition::new(partition), &SampleId::new(sample))
        .await;

    Json(resolved.into())
}

/// Drop cached listings
#[instrument(skip(state))]
async fn refresh_cache(
    State(state): State<AppState>,
    request: Option<Json<RefreshRequest>>,
) -> StatusCode {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    state.browser.refresh(request.partition.as_ref());

    info!(partition = ?request.partition, "Listing cache refreshed");
    StatusCode::NO_CONTENT
}

/// Start the browse API server
pub async fn start_api_server(state: AppState, config: &ApiConfig) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting browse API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}
