//! Shared import orchestration composed by every adapter.
//!
//! Fetches metadata, resolves the project reference, merges batch
//! fields (batch alt-text/license/identifier win, everything else
//! prefers the adapter), fills missing perceptual hashes for remote
//! shapes, and persists the image row plus its shapes in one
//! transaction. Expected failures become structured outcomes.

use url::Url;

use pictura_core::metadata::{ImportBatch, ImportOutcome, MediaMetadata};
use pictura_core::shape::{ShapeRole, ShapeSet};
use pictura_db::models::image::{CreateImage, Image};
use pictura_db::repositories::image_repo::ImageRepo;
use pictura_db::repositories::project_repo::ProjectRepo;
use pictura_db::DbPool;

use crate::{blur, AdapterError, AdapterKind, MediaAdapter};

/// Default import flow: fetch metadata, then persist. Any error is
/// converted into a failure outcome; the caller's batch never aborts.
pub async fn import_with_metadata<A: MediaAdapter + ?Sized>(
    adapter: &A,
    pool: &DbPool,
    url: &str,
    batch: Option<&ImportBatch>,
) -> ImportOutcome {
    let result = async {
        let metadata = adapter.fetch_metadata(url, batch).await?;
        persist_metadata(pool, adapter.kind(), metadata, batch).await
    }
    .await;

    match result {
        Ok(image) => {
            tracing::info!(
                adapter = %adapter.kind(),
                image_id = image.id,
                url,
                "image imported"
            );
            ImportOutcome::ok(image.id, url, adapter.kind().as_str())
        }
        Err(err) => {
            tracing::error!(adapter = %adapter.kind(), url, %err, "image import failed");
            ImportOutcome::failed(url, adapter.kind().as_str(), err.to_string())
        }
    }
}

/// Merge adapter metadata with batch fields and persist the image.
///
/// Used by the default import flow and by the local upload path, which
/// builds its metadata in-process instead of fetching it.
pub async fn persist_metadata(
    pool: &DbPool,
    kind: AdapterKind,
    mut metadata: MediaMetadata,
    batch: Option<&ImportBatch>,
) -> Result<Image, AdapterError> {
    let mut project_id = None;
    if let Some(domaincode) = batch.and_then(|b| b.domaincode.as_deref()) {
        match ProjectRepo::find_by_domaincode(pool, domaincode).await? {
            Some(project) => project_id = Some(project.id),
            None => tracing::warn!(domaincode, "project not found; importing without project"),
        }
    }

    // Local shapes get their hashes from the generated files; remote
    // shapes are fetched once here. Failures only cost the placeholder.
    if kind != AdapterKind::Local {
        fill_remote_blur_hashes(&mut metadata.shapes).await;
    }

    let input = CreateImage {
        name: metadata
            .name
            .unwrap_or_else(|| filename_from_url(&metadata.url)),
        url: metadata.url,
        project_id,
        owner_id: batch.and_then(|b| b.owner_id),
        alt_text: batch
            .and_then(|b| b.alt_text.clone())
            .or(metadata.alt_text),
        title: metadata.title,
        x: metadata.x,
        y: metadata.y,
        fileformat: metadata.fileformat,
        license: batch.and_then(|b| b.license.clone()).or(metadata.license),
        xmlid: batch.and_then(|b| b.effective_xmlid()),
        geo: match metadata.geo {
            Some(geo) => Some(
                serde_json::to_value(geo)
                    .map_err(|e| AdapterError::Metadata(format!("geo serialization: {e}")))?,
            ),
            None => None,
        },
        date: metadata.date,
        about: metadata.about,
        ctags: batch.and_then(|b| b.ctags),
        rtags: batch.and_then(|b| b.rtags),
        author: metadata.author,
        shapes: metadata.shapes,
    };

    Ok(ImageRepo::create(pool, &input).await?)
}

/// Generate a BlurHash for every remote shape URL that lacks one.
async fn fill_remote_blur_hashes(shapes: &mut ShapeSet) {
    for role in ShapeRole::ALL {
        let Some(mut shape) = shapes.get(role).cloned() else {
            continue;
        };
        if shape.blur.is_some() {
            continue;
        }
        let Some(url) = shape.url.clone() else {
            continue;
        };

        match blur::generate_from_url(&url).await {
            Ok(hash) => {
                shape.blur = Some(hash);
                shapes.set(role, Some(shape));
            }
            Err(err) => {
                tracing::warn!(role = %role, %url, %err, "blur hash generation failed; continuing");
            }
        }
    }
}

/// Last path segment of a URL, without query parameters.
pub(crate) fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "image".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_url_strips_query() {
        assert_eq!(
            filename_from_url("https://x.test/a/b/photo.jpg?w=100"),
            "photo.jpg"
        );
    }

    #[test]
    fn filename_from_url_falls_back() {
        assert_eq!(filename_from_url("not a url"), "image");
        assert_eq!(filename_from_url("https://x.test/"), "image");
    }
}
