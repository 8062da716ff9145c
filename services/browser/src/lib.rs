//! IndicVoices Browser Service
//!
//! Paginated, time-limited access to the IndicVoices object store. The bucket
//! is organised as `{language}/{sample_id}/{file}`; this crate turns its slow,
//! eventually-consistent listings into a stable paged view and turns object
//! keys into short-lived signed URLs for playback.
//!
//! ## Features
//!
//! - **Cached Listings**: Languages and sample IDs are memoised with a TTL,
//!   so a page view costs at most one listing call per language
//! - **Deterministic Paging**: Sample IDs are sorted before slicing, and the
//!   page position is always clamped to the pages that exist
//! - **Fail-soft Resolution**: Missing or unreadable metadata and unsignable
//!   artifacts become `Missing`/`Absent` values instead of errors
//! - **Presigned URL Generation**: Time-limited links for the original,
//!   denoised and denoised+normalized recordings
//!
//! ## Architecture
//!
//! ```text
//!  S3 Bucket                 Browser core                      Callers
//! ┌──────────────┐     ┌───────────────────────────┐     ┌──────────────┐
//! │ {language}/  │     │ ListingService ─ TtlCache │     │              │
//! │   {sample}/  │◀────│ SampleResolver            │◀────│ Browse API   │
//! │     *.json   │     │ Pagination (PageState)    │     │ (axum)       │
//! │     *.wav    │     └───────────────────────────┘     └──────────────┘
//! └──────────────┘            ▲
//!        ▲                    │ ObjectStoreGateway
//!        └──── S3Gateway ─────┘
//! ```

pub mod api;
pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod listing;
pub mod pagination;
pub mod resolver;
pub mod s3_gateway;

pub use api::AppState;
pub use browser::{PageView, SampleBrowser};
pub use cache::{CacheKey, TtlCache};
pub use config::Config;
pub use error::BrowserError;
pub use gateway::{ArtifactKind, ObjectKey, ObjectStoreGateway, Partition, SampleId, SignedUrl};
pub use listing::{ListOutcome, ListingService};
pub use pagination::{paginate, Page, PageState};
pub use resolver::{
    ArtifactSet, ArtifactUrl, MetadataResolution, MissingReason, ResolvedSample, SampleMetadata,
    SampleResolver,
};
pub use s3_gateway::S3Gateway;
