//! Batch import orchestrator.
//!
//! URLs are processed strictly sequentially: sequence-number
//! assignment stays deterministic and remote services are not hammered
//! by parallel fetches. A batch never aborts early -- every input URL
//! produces exactly one outcome.

use pictura_adapters::{AdapterError, AdapterRegistry};
use pictura_core::metadata::{BatchOutcome, ImportBatch, ImportOutcome};
use pictura_db::DbPool;

/// Adapter name reported for URLs no adapter recognises.
const EXTERNAL: &str = "external";

pub struct Importer {
    registry: AdapterRegistry,
    pool: DbPool,
}

impl Importer {
    pub fn new(registry: AdapterRegistry, pool: DbPool) -> Self {
        Self { registry, pool }
    }

    /// Import a batch of URLs, one at a time, in input order.
    ///
    /// Per URL: detect an adapter (no match is a failure entry, not an
    /// error) and delegate to its import flow. The returned outcome
    /// list is index-aligned with `urls`.
    pub async fn import_images(&self, urls: &[String], batch: &ImportBatch) -> BatchOutcome {
        let mut results = Vec::with_capacity(urls.len());

        for (index, url) in urls.iter().enumerate() {
            let item_batch = sequenced_batch(batch, index);

            match self.registry.detect(url) {
                Some(adapter) => {
                    tracing::info!(
                        adapter = %adapter.kind(),
                        %url,
                        item = index + 1,
                        total = urls.len(),
                        "importing image"
                    );
                    results.push(adapter.import_image(&self.pool, url, Some(&item_batch)).await);
                }
                None => {
                    results.push(ImportOutcome::failed(
                        url,
                        EXTERNAL,
                        AdapterError::UnsupportedSource.to_string(),
                    ));
                }
            }
        }

        BatchOutcome::from_results(results)
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }
}

/// Batch metadata for item `index`: when a sequence anchor is set and
/// no explicit identifier overrides it, the item gets the identifier
/// `{xml_root}.{index:02}`.
fn sequenced_batch(batch: &ImportBatch, index: usize) -> ImportBatch {
    let mut item = batch.clone();
    if item.xmlid.is_none() {
        if let Some(root) = &item.xml_root {
            item.xmlid = Some(format!("{root}.{index:02}"));
        }
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_suffixes_are_zero_padded_in_input_order() {
        let batch = ImportBatch {
            xml_root: Some("batch".to_string()),
            ..ImportBatch::default()
        };
        let ids: Vec<String> = (0..3)
            .map(|i| sequenced_batch(&batch, i).xmlid.unwrap())
            .collect();
        assert_eq!(ids, ["batch.00", "batch.01", "batch.02"]);
    }

    #[test]
    fn sequence_reaches_two_digits() {
        let batch = ImportBatch {
            xml_root: Some("root".to_string()),
            ..ImportBatch::default()
        };
        assert_eq!(sequenced_batch(&batch, 10).xmlid.as_deref(), Some("root.10"));
    }

    #[test]
    fn explicit_xmlid_wins_over_sequencing() {
        let batch = ImportBatch {
            xmlid: Some("tp.image.hero".to_string()),
            xml_root: Some("batch".to_string()),
            ..ImportBatch::default()
        };
        assert_eq!(
            sequenced_batch(&batch, 2).xmlid.as_deref(),
            Some("tp.image.hero")
        );
    }

    #[test]
    fn no_root_means_no_identifier() {
        assert_eq!(sequenced_batch(&ImportBatch::default(), 0).xmlid, None);
    }
}
