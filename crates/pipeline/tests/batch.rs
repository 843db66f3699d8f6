//! Batch orchestration tests using a stub adapter: no network, no
//! database round-trips.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pictura_adapters::{AdapterError, AdapterKind, AdapterRegistry, MediaAdapter};
use pictura_core::metadata::{ImportBatch, ImportOutcome, MediaMetadata};
use pictura_db::DbPool;
use pictura_pipeline::Importer;

/// Accepts `stub://` URLs and records the batch identifier each item
/// arrived with.
struct StubAdapter {
    seen_xmlids: Arc<Mutex<Vec<Option<String>>>>,
}

#[async_trait]
impl MediaAdapter for StubAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Local
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with("stub://")
    }

    async fn fetch_metadata(
        &self,
        url: &str,
        _batch: Option<&ImportBatch>,
    ) -> Result<MediaMetadata, AdapterError> {
        Ok(MediaMetadata {
            url: url.to_string(),
            ..MediaMetadata::default()
        })
    }

    async fn import_image(
        &self,
        _pool: &DbPool,
        url: &str,
        batch: Option<&ImportBatch>,
    ) -> ImportOutcome {
        self.seen_xmlids
            .lock()
            .unwrap()
            .push(batch.and_then(|b| b.xmlid.clone()));
        ImportOutcome::ok(1, url, self.kind().as_str())
    }
}

/// A pool that never connects; the stub adapter does not touch it.
fn lazy_pool() -> DbPool {
    sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap()
}

fn importer_with_stub() -> (Importer, Arc<Mutex<Vec<Option<String>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = AdapterRegistry::from_adapters(vec![Box::new(StubAdapter {
        seen_xmlids: seen.clone(),
    })]);
    (Importer::new(registry, lazy_pool()), seen)
}

#[tokio::test]
async fn partial_batch_reports_per_item_outcomes() {
    let (importer, _) = importer_with_stub();
    let urls = vec![
        "stub://one".to_string(),
        "https://example.com/unsupported.jpg".to_string(),
    ];

    let outcome = importer.import_images(&urls, &ImportBatch::default()).await;

    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.successful, 1);
    assert_eq!(outcome.failed, 1);
    assert!(!outcome.success);

    assert!(outcome.results[0].success);
    assert_eq!(outcome.results[0].url, "stub://one");

    let failure = &outcome.results[1];
    assert!(!failure.success);
    assert_eq!(failure.adapter, "external");
    assert!(failure.error.as_deref().unwrap().contains("No adapter found"));
}

#[tokio::test]
async fn items_receive_sequenced_identifiers() {
    let (importer, seen) = importer_with_stub();
    let urls = vec![
        "stub://a".to_string(),
        "stub://b".to_string(),
        "stub://c".to_string(),
    ];
    let batch = ImportBatch {
        xml_root: Some("batch".to_string()),
        ..ImportBatch::default()
    };

    let outcome = importer.import_images(&urls, &batch).await;
    assert!(outcome.success);

    let xmlids = seen.lock().unwrap().clone();
    assert_eq!(
        xmlids,
        vec![
            Some("batch.00".to_string()),
            Some("batch.01".to_string()),
            Some("batch.02".to_string()),
        ]
    );
}

#[tokio::test]
async fn empty_batch_is_a_success() {
    let (importer, _) = importer_with_stub();
    let outcome = importer.import_images(&[], &ImportBatch::default()).await;
    assert!(outcome.success);
    assert_eq!(outcome.total, 0);
    assert!(outcome.results.is_empty());
}
