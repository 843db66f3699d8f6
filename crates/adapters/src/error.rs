//! Error taxonomy for the adapter and transform layer.
//!
//! Expected per-item conditions (unsupported URL, missing project) are
//! reported as structured outcomes by the import helper; these errors
//! carry the reason.

use pictura_core::composite::TupleError;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// No registered adapter recognises the URL.
    #[error("No adapter found for this URL. Supported: Unsplash, Cloudinary, local uploads")]
    UnsupportedSource,

    /// The remote metadata API answered with a non-2xx status.
    #[error("{service} API error ({status}): {body}")]
    UpstreamFetch {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The HTTP request itself failed (network, DNS, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The adapter requires a credential that is not configured.
    #[error("{0} is not configured")]
    MissingCredential(&'static str),

    /// A composite tuple could not be decoded.
    #[error("Malformed shape tuple: {0}")]
    MalformedShapeTuple(#[from] TupleError),

    /// Disk read/write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Source image dimensions could not be determined.
    #[error("Could not read image dimensions from {0}")]
    DimensionRead(String),

    /// Raster decode/transform failed.
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// Lossy encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Database error from the persistence step.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Source-specific metadata problem (unextractable id, bad URL
    /// structure, ...).
    #[error("{0}")]
    Metadata(String),
}
