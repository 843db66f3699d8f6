//! Shape and perceptual-hash regeneration for existing images.
//!
//! Only locally stored images can be re-rasterized; remote images own
//! their pixels. Regenerated shapes are persisted through the image
//! repository, so derived fields and dependent rows update in the same
//! transaction.

use std::collections::HashMap;

use serde::Deserialize;

use pictura_adapters::local::LocalAdapter;
use pictura_adapters::{blur, AdapterError, AdapterKind, MediaAdapter};
use pictura_core::shape::{Shape, ShapeRole, ShapeSet};
use pictura_core::types::DbId;
use pictura_db::models::image::Image;
use pictura_db::repositories::image_repo::ImageRepo;
use pictura_db::DbPool;

/// Manual focal-point override for one shape.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct XyzOverride {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// What to regenerate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegenerateOptions {
    /// Subset of shapes to regenerate; all four when `None`.
    #[serde(default)]
    pub shapes: Option<Vec<ShapeRole>>,
    /// Per-shape XYZ overrides; shapes without one use the automatic
    /// crop strategy.
    #[serde(default)]
    pub xyz: HashMap<ShapeRole, XyzOverride>,
}

/// Updated shape URLs after a regeneration run.
#[derive(Debug, Clone)]
pub struct RegeneratedShapes {
    pub image_id: DbId,
    pub urls: Vec<(ShapeRole, String)>,
}

/// Regenerate shape files for a locally stored image and persist the
/// new URLs (derived fields and fan-out included).
pub async fn regenerate_shapes(
    pool: &DbPool,
    local: &LocalAdapter,
    image_id: DbId,
    options: &RegenerateOptions,
) -> Result<RegeneratedShapes, AdapterError> {
    let image = load_image(pool, image_id).await?;
    require_local(&image)?;
    let xmlid = image
        .xmlid
        .clone()
        .ok_or_else(|| AdapterError::Metadata("image has no xmlid; cannot name shape files".into()))?;
    let source_path = local.filepath_for(&image.url)?;

    let roles = options
        .shapes
        .clone()
        .unwrap_or_else(|| ShapeRole::ALL.to_vec());

    // Generating all templates at once is cheaper than per-shape
    // decoding; XYZ overrides replace individual results.
    let defaults = local.generate_shapes(&source_path, &xmlid).await?;

    let mut changes = ShapeSet::default();
    let mut urls = Vec::with_capacity(roles.len());
    for role in roles {
        let url = match options.xyz.get(&role) {
            Some(xyz) => {
                local
                    .generate_shape_with_xyz(&source_path, &xmlid, role, xyz.x, xyz.y, xyz.z)
                    .await?
            }
            None => defaults.get(role).to_string(),
        };
        changes.set(role, Some(Shape::from_url(url.clone())));
        urls.push((role, url));
    }

    ImageRepo::update_shapes(pool, image_id, &changes).await?;
    tracing::info!(image_id, count = urls.len(), "shapes regenerated");

    Ok(RegeneratedShapes { image_id, urls })
}

/// Recompute the perceptual hash of every shape that has a URL and
/// persist them into the shapes' `blur` fields.
///
/// Per-shape failures are logged and skipped; the remaining hashes are
/// still written. Returns the hash per regenerated shape.
pub async fn regenerate_blur_hashes(
    pool: &DbPool,
    local: &LocalAdapter,
    image_id: DbId,
) -> Result<Vec<(ShapeRole, String)>, AdapterError> {
    let image = load_image(pool, image_id).await?;

    let mut hashes = Vec::new();
    for role in ShapeRole::ALL {
        let Some(shape) = image.parsed_shape(role) else {
            continue;
        };
        let Some(url) = shape.url else {
            continue;
        };

        let result = if local.can_handle(&url) {
            match local.filepath_for(&url) {
                Ok(path) => match tokio::fs::read(&path).await {
                    Ok(bytes) => blur::generate_from_bytes(&bytes),
                    Err(err) => Err(err.into()),
                },
                Err(err) => Err(err),
            }
        } else {
            blur::generate_from_url(&url).await
        };

        match result {
            Ok(hash) => hashes.push((role, hash)),
            Err(err) => {
                tracing::warn!(image_id, role = %role, %err, "blur hash regeneration failed");
            }
        }
    }

    ImageRepo::set_shape_blurs(pool, image_id, &hashes).await?;
    Ok(hashes)
}

async fn load_image(pool: &DbPool, image_id: DbId) -> Result<Image, AdapterError> {
    ImageRepo::find_by_id(pool, image_id)
        .await?
        .ok_or_else(|| AdapterError::Metadata(format!("image {image_id} not found")))
}

fn require_local(image: &Image) -> Result<(), AdapterError> {
    let adapter = image
        .author_info()
        .map(|author| author.adapter)
        .unwrap_or_default();
    if adapter != AdapterKind::Local.as_str() {
        return Err(AdapterError::Metadata(format!(
            "Cannot regenerate shapes for {adapter} images; only locally stored images can be re-rasterized"
        )));
    }
    Ok(())
}
