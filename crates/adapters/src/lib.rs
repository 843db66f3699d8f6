//! Media adapters: URL detection, metadata fetching, and shape
//! derivation for each supported image source.
//!
//! Each adapter implements [`MediaAdapter`]; the [`registry`] picks
//! one per URL and the shared [`import`] helper turns fetched metadata
//! into a persisted image with its four shape slots.

use async_trait::async_trait;

use pictura_core::metadata::{ImportBatch, ImportOutcome, MediaMetadata};
use pictura_db::DbPool;

pub mod blur;
pub mod cloudinary;
pub mod config;
pub mod error;
pub mod import;
pub mod local;
pub mod registry;
pub mod transform;
pub mod unsplash;

pub use config::MediaConfig;
pub use error::AdapterError;
pub use registry::AdapterRegistry;

/// Which adapter produced or owns a piece of media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Unsplash,
    Cloudinary,
    Local,
}

impl AdapterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsplash => "unsplash",
            Self::Cloudinary => "cloudinary",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set every media source exposes.
///
/// Adapters are otherwise unrelated and interchangeable; the default
/// `import_image` is the shared orchestration from [`import`], which
/// any adapter may override when its source needs a different flow.
#[async_trait]
pub trait MediaAdapter: Send + Sync {
    /// Stable adapter name used in the author descriptor and results.
    fn kind(&self) -> AdapterKind;

    /// Whether this adapter recognises the given URL.
    fn can_handle(&self, url: &str) -> bool;

    /// Fetch and normalize metadata for one source URL.
    async fn fetch_metadata(
        &self,
        url: &str,
        batch: Option<&ImportBatch>,
    ) -> Result<MediaMetadata, AdapterError>;

    /// Import one URL: fetch metadata, merge batch fields, persist the
    /// image row plus its shapes. Never returns an error -- failures
    /// become structured outcomes.
    async fn import_image(
        &self,
        pool: &DbPool,
        url: &str,
        batch: Option<&ImportBatch>,
    ) -> ImportOutcome {
        import::import_with_metadata(self, pool, url, batch).await
    }
}
