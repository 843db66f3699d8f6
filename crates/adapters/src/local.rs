//! Local storage adapter.
//!
//! Handles uploaded images without any network dependency: stores the
//! source file, rasterizes the four shape variants with content-aware
//! cropping, and supports manual XYZ focal-point transforms for the
//! shape editor.
//!
//! Storage layout under the configured root:
//! - `source/`     original uploads, `{xmlid}.{ext}`
//! - `shapes/`     generated variants, `{xmlid}_{shape}.webp`
//! - `transforms/` XYZ previews, `{xmlid}_{shape}_xyz_{x}_{y}_{z}.webp`

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::GenericImageView;

use pictura_core::crop;
use pictura_core::metadata::{AuthorInfo, ImportBatch, MediaMetadata};
use pictura_core::shape::{Shape, ShapeRole, ShapeSet};
use pictura_core::types::DbId;
use pictura_db::DbPool;

use crate::transform::{self, CropStrategy};
use crate::{blur, import, AdapterError, AdapterKind, MediaAdapter, MediaConfig};

/// URL prefix under which locally stored files are served.
const URL_PREFIX: &str = "/api/images/local";

/// Generated shape file URLs, one per slot.
#[derive(Debug, Clone)]
pub struct GeneratedShapes {
    pub square: String,
    pub thumb: String,
    pub wide: String,
    pub vertical: String,
}

impl GeneratedShapes {
    pub fn get(&self, role: ShapeRole) -> &str {
        match role {
            ShapeRole::Square => &self.square,
            ShapeRole::Thumb => &self.thumb,
            ShapeRole::Wide => &self.wide,
            ShapeRole::Vertical => &self.vertical,
        }
    }
}

/// Result of importing one uploaded file.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub image_id: DbId,
    pub source_url: String,
    pub shapes: GeneratedShapes,
}

pub struct LocalAdapter {
    source_dir: PathBuf,
    shapes_dir: PathBuf,
    transforms_dir: PathBuf,
}

impl LocalAdapter {
    pub fn new(config: &MediaConfig) -> Self {
        let root = &config.storage_root;
        Self {
            source_dir: root.join("source"),
            shapes_dir: root.join("shapes"),
            transforms_dir: root.join("transforms"),
        }
    }

    /// Create the storage directories. Idempotent: already-existing
    /// directories (or ones created concurrently) are fine, so imports
    /// never abort here spuriously.
    pub async fn ensure_directories(&self) -> Result<(), AdapterError> {
        for dir in [&self.source_dir, &self.shapes_dir, &self.transforms_dir] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    /// `{xmlid}.{ext}`, extension taken from the original filename.
    fn source_filename(xmlid: &str, original_filename: &str) -> String {
        let ext = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_else(|| ".jpg".to_string());
        format!("{xmlid}{ext}")
    }

    /// `{xmlid}_{label}.webp`.
    fn shape_filename(xmlid: &str, label: &str) -> String {
        format!("{xmlid}_{label}.webp")
    }

    /// Store an uploaded source file, returning its serving URL.
    pub async fn store_source_file(
        &self,
        bytes: &[u8],
        xmlid: &str,
        original_filename: &str,
    ) -> Result<String, AdapterError> {
        self.ensure_directories().await?;
        let filename = Self::source_filename(xmlid, original_filename);
        tokio::fs::write(self.source_dir.join(&filename), bytes).await?;
        tracing::debug!(%filename, "stored source file");
        Ok(format!("{URL_PREFIX}/source/{filename}"))
    }

    /// Absolute path for a serving URL produced by this adapter.
    pub fn filepath_for(&self, url_path: &str) -> Result<PathBuf, AdapterError> {
        let rest = url_path
            .strip_prefix(URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| AdapterError::Metadata(format!("invalid local image URL: {url_path}")))?;
        let (subdir, filename) = rest
            .split_once('/')
            .ok_or_else(|| AdapterError::Metadata(format!("invalid local image URL: {url_path}")))?;

        let dir = match subdir {
            "source" => &self.source_dir,
            "shapes" => &self.shapes_dir,
            "transforms" => &self.transforms_dir,
            other => {
                return Err(AdapterError::Metadata(format!(
                    "invalid local image subdirectory: {other}"
                )))
            }
        };
        Ok(dir.join(filename))
    }

    /// Generate all four shape variants from a source file.
    ///
    /// Thumb uses the attention strategy (face-weighted), the other
    /// three entropy. Filenames are deterministic, so regeneration
    /// overwrites in place.
    pub async fn generate_shapes(
        &self,
        source_path: &Path,
        xmlid: &str,
    ) -> Result<GeneratedShapes, AdapterError> {
        self.ensure_directories().await?;
        let img = image::open(source_path)?;

        let mut urls = Vec::with_capacity(ShapeRole::ALL.len());
        for role in ShapeRole::ALL {
            let strategy = match role {
                ShapeRole::Thumb => CropStrategy::Attention,
                _ => CropStrategy::Entropy,
            };
            let (w, h) = role.target_size();
            let cropped = transform::smart_crop(&img, w, h, strategy);
            let bytes = transform::encode_webp(&cropped)?;

            let filename = Self::shape_filename(xmlid, role.as_str());
            tokio::fs::write(self.shapes_dir.join(&filename), &bytes).await?;
            tracing::debug!(%filename, "generated shape");
            urls.push(format!("{URL_PREFIX}/shapes/{filename}"));
        }

        let mut urls = urls.into_iter();
        Ok(GeneratedShapes {
            square: urls.next().unwrap(),
            thumb: urls.next().unwrap(),
            wide: urls.next().unwrap(),
            vertical: urls.next().unwrap(),
        })
    }

    /// Generate one shape with a manual XYZ focal-point override.
    ///
    /// `x`/`y` are focal-point percentages of the source dimensions,
    /// `z` the zoom percentage fed into the inverse multiplier (see
    /// [`pictura_core::crop::xyz_extraction`]). Output goes to the
    /// transforms directory so previews never clobber the canonical
    /// shape files.
    pub async fn generate_shape_with_xyz(
        &self,
        source_path: &Path,
        xmlid: &str,
        role: ShapeRole,
        x: f64,
        y: f64,
        z: f64,
    ) -> Result<String, AdapterError> {
        self.ensure_directories().await?;
        let img = image::open(source_path)?;
        let (src_w, src_h) = img.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(AdapterError::DimensionRead(
                source_path.display().to_string(),
            ));
        }

        let (target_w, target_h) = role.target_size();
        let region = crop::xyz_extraction(src_w, src_h, (target_w, target_h), x, y, z)
            .map_err(|e| AdapterError::Metadata(e.to_string()))?;

        let out = transform::extract_and_resize(&img, region, target_w, target_h);
        let bytes = transform::encode_webp(&out)?;

        let filename = Self::shape_filename(xmlid, &format!("{role}_xyz_{x}_{y}_{z}"));
        tokio::fs::write(self.transforms_dir.join(&filename), &bytes).await?;
        tracing::debug!(%filename, x, y, z, "generated XYZ shape");
        Ok(format!("{URL_PREFIX}/transforms/{filename}"))
    }

    /// Import one uploaded file end-to-end: store the source, read its
    /// dimensions, generate all four shapes plus their perceptual
    /// hashes, and feed the same persistence path the remote adapters
    /// use.
    pub async fn import_uploaded_file(
        &self,
        pool: &DbPool,
        bytes: &[u8],
        original_filename: &str,
        batch: &ImportBatch,
    ) -> Result<UploadResult, AdapterError> {
        let xmlid = batch.effective_xmlid().ok_or_else(|| {
            AdapterError::Metadata("local uploads require an xmlid or domaincode+identifier".into())
        })?;

        let source_url = self
            .store_source_file(bytes, &xmlid, original_filename)
            .await?;
        let source_path = self.filepath_for(&source_url)?;

        let (width, height) = image::image_dimensions(&source_path)
            .map_err(|_| AdapterError::DimensionRead(source_path.display().to_string()))?;
        let format = image::guess_format(bytes)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("none");

        let generated = self.generate_shapes(&source_path, &xmlid).await?;
        let shapes = self.shapes_with_blur(&generated).await;

        let metadata = MediaMetadata {
            url: source_url.clone(),
            name: Some(original_filename.to_string()),
            alt_text: None,
            title: None,
            x: Some(width as i32),
            y: Some(height as i32),
            fileformat: Some(format.to_string()),
            author: Some(AuthorInfo {
                adapter: AdapterKind::Local.as_str().to_string(),
                file_id: Some(original_filename.to_string()),
                account_id: None,
                folder_id: None,
                info: Some(format!("Local upload: {original_filename}")),
                config: None,
            }),
            shapes,
            geo: None,
            date: None,
            license: None,
            about: None,
        };

        let image = import::persist_metadata(pool, AdapterKind::Local, metadata, Some(batch)).await?;
        Ok(UploadResult {
            image_id: image.id,
            source_url,
            shapes: generated,
        })
    }

    /// Build the shape set from generated files, hashing each one.
    /// Hash failures cost only the placeholder, never the import.
    async fn shapes_with_blur(&self, generated: &GeneratedShapes) -> ShapeSet {
        let mut shapes = ShapeSet::default();
        for role in ShapeRole::ALL {
            let url = generated.get(role);
            let blur = match self.hash_shape_file(url).await {
                Ok(hash) => Some(hash),
                Err(err) => {
                    tracing::warn!(role = %role, %err, "blur hash generation failed; continuing");
                    None
                }
            };
            shapes.set(role, Some(Shape::from_url_and_blur(url, blur)));
        }
        shapes
    }

    async fn hash_shape_file(&self, url: &str) -> Result<String, AdapterError> {
        let path = self.filepath_for(url)?;
        let bytes = tokio::fs::read(&path).await?;
        blur::generate_from_bytes(&bytes)
    }
}

#[async_trait]
impl MediaAdapter for LocalAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Local
    }

    fn can_handle(&self, url: &str) -> bool {
        // Relative serving paths, or absolute URLs carrying one.
        url.starts_with(URL_PREFIX)
            || url::Url::parse(url)
                .map(|parsed| parsed.path().starts_with(URL_PREFIX))
                .unwrap_or(false)
    }

    /// Metadata for an already-stored local file. Uploads go through
    /// [`LocalAdapter::import_uploaded_file`], which knows the shapes;
    /// this path only recovers dimensions and format from disk.
    async fn fetch_metadata(
        &self,
        url: &str,
        _batch: Option<&ImportBatch>,
    ) -> Result<MediaMetadata, AdapterError> {
        let path = self.filepath_for(url)?;
        let (width, height) = image::image_dimensions(&path)
            .map_err(|_| AdapterError::DimensionRead(path.display().to_string()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        Ok(MediaMetadata {
            url: url.to_string(),
            name: Some(filename.clone()),
            x: Some(width as i32),
            y: Some(height as i32),
            fileformat: path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase()),
            author: Some(AuthorInfo {
                adapter: AdapterKind::Local.as_str().to_string(),
                file_id: Some(filename),
                info: Some("Uploaded to local storage".to_string()),
                ..AuthorInfo::default()
            }),
            ..MediaMetadata::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn adapter_in(dir: &TempDir) -> LocalAdapter {
        LocalAdapter::new(&MediaConfig {
            unsplash_access_key: None,
            storage_root: dir.path().to_path_buf(),
            cloudinary_account: None,
            cloudinary_initial_version: "v1665139609".to_string(),
        })
    }

    fn sample_png() -> Vec<u8> {
        let img = RgbImage::from_fn(400, 300, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn recognises_local_urls() {
        let dir = TempDir::new().unwrap();
        let a = adapter_in(&dir);
        assert!(a.can_handle("/api/images/local/source/tp.image.a.jpg"));
        assert!(a.can_handle("https://cms.example.com/api/images/local/shapes/x.webp"));
        assert!(!a.can_handle("https://images.unsplash.com/photo-1"));
    }

    #[test]
    fn filenames_are_deterministic() {
        assert_eq!(
            LocalAdapter::source_filename("tp.image.child-marie_2024", "Portrait.JPG"),
            "tp.image.child-marie_2024.jpg"
        );
        assert_eq!(
            LocalAdapter::source_filename("tp.image.a", "noextension"),
            "tp.image.a.jpg"
        );
        assert_eq!(
            LocalAdapter::shape_filename("tp.image.a", "square"),
            "tp.image.a_square.webp"
        );
    }

    #[tokio::test]
    async fn stores_and_resolves_source_files() {
        let dir = TempDir::new().unwrap();
        let a = adapter_in(&dir);

        let url = a
            .store_source_file(&sample_png(), "tp.image.a", "photo.png")
            .await
            .unwrap();
        assert_eq!(url, "/api/images/local/source/tp.image.a.png");

        let path = a.filepath_for(&url).unwrap();
        assert!(path.exists());
        assert!(a.filepath_for("/somewhere/else").is_err());
        assert!(a.filepath_for("/api/images/local/bogus/x.png").is_err());
    }

    #[tokio::test]
    async fn generates_all_four_shapes_with_target_dimensions() {
        let dir = TempDir::new().unwrap();
        let a = adapter_in(&dir);
        let url = a
            .store_source_file(&sample_png(), "tp.image.b", "photo.png")
            .await
            .unwrap();
        let source = a.filepath_for(&url).unwrap();

        let generated = a.generate_shapes(&source, "tp.image.b").await.unwrap();
        for role in ShapeRole::ALL {
            let path = a.filepath_for(generated.get(role)).unwrap();
            let (w, h) = image::image_dimensions(&path).unwrap();
            assert_eq!((w, h), role.target_size(), "role {role}");
        }

        // Regeneration overwrites in place: same URLs, still readable.
        let again = a.generate_shapes(&source, "tp.image.b").await.unwrap();
        assert_eq!(again.square, generated.square);
    }

    #[tokio::test]
    async fn xyz_transform_lands_in_transforms_dir() {
        let dir = TempDir::new().unwrap();
        let a = adapter_in(&dir);
        let url = a
            .store_source_file(&sample_png(), "tp.image.c", "photo.png")
            .await
            .unwrap();
        let source = a.filepath_for(&url).unwrap();

        let shape_url = a
            .generate_shape_with_xyz(&source, "tp.image.c", ShapeRole::Square, 25.0, 75.0, 50.0)
            .await
            .unwrap();
        assert!(shape_url.starts_with("/api/images/local/transforms/"));

        let path = a.filepath_for(&shape_url).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (128, 128));
    }

    #[tokio::test]
    async fn fetch_metadata_reads_dimensions() {
        let dir = TempDir::new().unwrap();
        let a = adapter_in(&dir);
        let url = a
            .store_source_file(&sample_png(), "tp.image.d", "photo.png")
            .await
            .unwrap();

        let metadata = a.fetch_metadata(&url, None).await.unwrap();
        assert_eq!(metadata.x, Some(400));
        assert_eq!(metadata.y, Some(300));
        assert_eq!(metadata.fileformat.as_deref(), Some("png"));
        assert_eq!(metadata.author.unwrap().adapter, "local");
    }

    #[tokio::test]
    async fn missing_file_is_a_dimension_read_failure() {
        let dir = TempDir::new().unwrap();
        let a = adapter_in(&dir);
        let err = a
            .fetch_metadata("/api/images/local/source/absent.png", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::DimensionRead(_)));
    }
}
