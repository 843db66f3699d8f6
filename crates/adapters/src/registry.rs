//! Adapter registry: URL -> adapter dispatch.
//!
//! Explicitly constructed and passed to the orchestrator -- no global
//! state. Detection scans adapters in registration order and returns
//! the first match; `None` is the expected outcome for unsupported
//! sources, not an error.

use crate::cloudinary::CloudinaryAdapter;
use crate::local::LocalAdapter;
use crate::unsplash::UnsplashAdapter;
use crate::{AdapterKind, MediaAdapter, MediaConfig};

pub struct AdapterRegistry {
    adapters: Vec<Box<dyn MediaAdapter>>,
}

impl AdapterRegistry {
    /// Register the standard adapters in fixed order: Unsplash,
    /// Cloudinary, Local.
    pub fn new(config: &MediaConfig) -> Self {
        Self::from_adapters(vec![
            Box::new(UnsplashAdapter::new(config)),
            Box::new(CloudinaryAdapter::new(config)),
            Box::new(LocalAdapter::new(config)),
        ])
    }

    /// Build a registry from an explicit adapter list (scan order =
    /// list order).
    pub fn from_adapters(adapters: Vec<Box<dyn MediaAdapter>>) -> Self {
        Self { adapters }
    }

    /// First adapter whose `can_handle` accepts the URL.
    pub fn detect(&self, url: &str) -> Option<&dyn MediaAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.can_handle(url))
            .map(|adapter| adapter.as_ref())
    }

    /// Look an adapter up by kind.
    pub fn by_kind(&self, kind: AdapterKind) -> Option<&dyn MediaAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.kind() == kind)
            .map(|adapter| adapter.as_ref())
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn MediaAdapter> {
        self.adapters.iter().map(|adapter| adapter.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AdapterRegistry {
        AdapterRegistry::new(&MediaConfig {
            unsplash_access_key: Some("key".to_string()),
            storage_root: "/tmp/pictura-test".into(),
            cloudinary_account: None,
            cloudinary_initial_version: "v1665139609".to_string(),
        })
    }

    #[test]
    fn detects_by_registration_order() {
        let registry = registry();
        assert_eq!(
            registry
                .detect("https://unsplash.com/photos/abc")
                .map(|a| a.kind()),
            Some(AdapterKind::Unsplash)
        );
        assert_eq!(
            registry
                .detect("https://res.cloudinary.com/demo/image/upload/v1/a.jpg")
                .map(|a| a.kind()),
            Some(AdapterKind::Cloudinary)
        );
        assert_eq!(
            registry
                .detect("/api/images/local/source/a.jpg")
                .map(|a| a.kind()),
            Some(AdapterKind::Local)
        );
    }

    #[test]
    fn unsupported_url_is_none_not_an_error() {
        assert!(registry().detect("https://example.com/image.jpg").is_none());
        assert!(registry().detect("garbage").is_none());
    }

    #[test]
    fn by_kind_finds_registered_adapters() {
        let registry = registry();
        assert!(registry.by_kind(AdapterKind::Local).is_some());
        assert_eq!(registry.all().count(), 3);
    }
}
