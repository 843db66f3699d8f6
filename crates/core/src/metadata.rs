//! Common metadata, batch, and result types shared by all media
//! adapters and the import orchestrator.

use serde::{Deserialize, Serialize};

use crate::composite::{self, TupleError};
use crate::shape::ShapeSet;
use crate::tags::TagBits;
use crate::types::{DbId, Timestamp};

/// Number of fields in the author descriptor wire tuple.
pub const AUTHOR_FIELD_COUNT: usize = 6;

/// Provenance of an imported image: which adapter produced it and how
/// to find it again at the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorInfo {
    /// Adapter name (`unsplash`, `cloudinary`, `local`, ...).
    pub adapter: String,
    /// Source file/photo id.
    pub file_id: Option<String>,
    /// Source account id.
    pub account_id: Option<String>,
    /// Source folder/collection id.
    pub folder_id: Option<String>,
    /// Free-text info (usually the author's display name).
    pub info: Option<String>,
    /// Opaque adapter-specific configuration.
    pub config: Option<serde_json::Value>,
}

impl AuthorInfo {
    /// Decode an author descriptor from its 6-field wire tuple.
    pub fn parse(wire: &str) -> Result<Self, TupleError> {
        let fields = composite::expect_fields(composite::split_tuple(wire)?, AUTHOR_FIELD_COUNT)?;
        let mut fields = fields.into_iter();

        let adapter = fields.next().unwrap().unwrap_or_default();
        let file_id = fields.next().unwrap();
        let account_id = fields.next().unwrap();
        let folder_id = fields.next().unwrap();
        let info = fields.next().unwrap();
        let config = match fields.next().unwrap() {
            Some(raw) => Some(
                serde_json::from_str(&raw)
                    .map_err(|source| TupleError::Json { field: "config", source })?,
            ),
            None => None,
        };

        Ok(Self {
            adapter,
            file_id,
            account_id,
            folder_id,
            info,
            config,
        })
    }

    /// Encode this descriptor as its wire tuple.
    pub fn to_wire(&self) -> String {
        let config = self.config.as_ref().map(|v| v.to_string());
        composite::join_tuple(&[
            Some(self.adapter.as_str()),
            self.file_id.as_deref(),
            self.account_id.as_deref(),
            self.folder_id.as_deref(),
            self.info.as_deref(),
            config.as_deref(),
        ])
    }
}

/// Geo location attached to an image. Only constructed when both
/// coordinates are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Normalized metadata produced by an adapter's fetch step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Canonical external URL of the image.
    pub url: String,
    pub name: Option<String>,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    /// Pixel width.
    pub x: Option<i32>,
    /// Pixel height.
    pub y: Option<i32>,
    pub fileformat: Option<String>,
    pub author: Option<AuthorInfo>,
    pub shapes: ShapeSet,
    pub geo: Option<GeoPoint>,
    pub date: Option<Timestamp>,
    pub license: Option<String>,
    /// Attribution text.
    pub about: Option<String>,
}

/// Batch metadata applied to every image of one import call.
///
/// Batch-provided `alt_text`, `license`, and identifier values take
/// priority over adapter-derived metadata; everything else prefers the
/// adapter's values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    /// Resolved to a project reference at import time.
    pub domaincode: Option<String>,
    pub owner_id: Option<DbId>,
    /// Attribution name for adapters without an author API.
    pub owner_name: Option<String>,
    pub alt_text: Option<String>,
    pub license: Option<String>,
    /// Explicit stable identifier; wins over every derived form.
    pub xmlid: Option<String>,
    /// Sequence anchor; item *i* of a batch gets `{root}.{i:02}`.
    pub xml_root: Option<String>,
    /// Subject segment for constructed identifiers (default `mixed`).
    pub xml_subject: Option<String>,
    /// Identifier tail for constructed identifiers.
    pub image_identifier: Option<String>,
    pub ctags: Option<TagBits>,
    pub rtags: Option<TagBits>,
}

impl ImportBatch {
    /// Resolve the effective stable identifier for one image:
    /// explicit `xmlid`, else `{domaincode}.image.{subject}-{identifier}`
    /// when both parts are available.
    pub fn effective_xmlid(&self) -> Option<String> {
        if self.xmlid.is_some() {
            return self.xmlid.clone();
        }
        match (&self.domaincode, &self.image_identifier) {
            (Some(domain), Some(identifier)) => {
                let subject = self.xml_subject.as_deref().unwrap_or("mixed");
                Some(format!("{domain}.image.{subject}-{identifier}"))
            }
            _ => None,
        }
    }
}

/// Outcome of importing one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<DbId>,
    pub url: String,
    pub adapter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportOutcome {
    pub fn ok(image_id: DbId, url: impl Into<String>, adapter: impl Into<String>) -> Self {
        Self {
            success: true,
            image_id: Some(image_id),
            url: url.into(),
            adapter: adapter.into(),
            error: None,
        }
    }

    pub fn failed(
        url: impl Into<String>,
        adapter: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            image_id: None,
            url: url.into(),
            adapter: adapter.into(),
            error: Some(error.into()),
        }
    }
}

/// Aggregate outcome of one batch import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub success: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ImportOutcome>,
}

impl BatchOutcome {
    pub fn from_results(results: Vec<ImportOutcome>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;
        Self {
            success: failed == 0,
            total: results.len(),
            successful,
            failed,
            results,
        }
    }
}
