//! Adapter configuration loaded from environment variables.

use std::path::PathBuf;

/// Configuration for all media adapters.
///
/// All fields have defaults suitable for local development; override
/// via environment variables in production.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Unsplash API credential. Adapters fail their items with a
    /// missing-credential error when unset; other adapters keep working.
    pub unsplash_access_key: Option<String>,
    /// Root directory for locally stored sources and generated shapes.
    pub storage_root: PathBuf,
    /// Default Cloudinary account name for attribution.
    pub cloudinary_account: Option<String>,
    /// Fallback Cloudinary version used for year extraction when a URL
    /// carries none.
    pub cloudinary_initial_version: String,
}

impl MediaConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `UNSPLASH_ACCESS_KEY`        | unset                   |
    /// | `LOCAL_IMAGE_STORAGE`        | `/opt/pictura/images`   |
    /// | `CLOUDINARY_ACCOUNT`         | unset                   |
    /// | `CLOUDINARY_INITIAL_VERSION` | `v1665139609`           |
    pub fn from_env() -> Self {
        let unsplash_access_key = std::env::var("UNSPLASH_ACCESS_KEY").ok().filter(|k| !k.is_empty());
        if unsplash_access_key.is_none() {
            tracing::warn!("UNSPLASH_ACCESS_KEY not set; Unsplash imports will fail");
        }

        Self {
            unsplash_access_key,
            storage_root: std::env::var("LOCAL_IMAGE_STORAGE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/opt/pictura/images")),
            cloudinary_account: std::env::var("CLOUDINARY_ACCOUNT").ok(),
            cloudinary_initial_version: std::env::var("CLOUDINARY_INITIAL_VERSION")
                .unwrap_or_else(|_| "v1665139609".into()),
        }
    }
}
