//! Cloudinary adapter.
//!
//! Works without API access: cloud name, public id, folder, and
//! version are parsed from the URL structure, and shape URLs are built
//! by inserting transformation segments into the `/upload/` path.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use url::Url;

use pictura_core::metadata::{AuthorInfo, ImportBatch, MediaMetadata};
use pictura_core::naming::alt_text_from_public_id;
use pictura_core::shape::{Shape, ShapeRole, ShapeSet};

use crate::{AdapterError, AdapterKind, MediaAdapter, MediaConfig};

pub struct CloudinaryAdapter {
    default_account: Option<String>,
    /// Fallback `v{unix}` version for year extraction.
    initial_version: String,
    transform_re: Regex,
    simple_re: Regex,
}

impl CloudinaryAdapter {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            default_account: config.cloudinary_account.clone(),
            initial_version: config.cloudinary_initial_version.clone(),
            transform_re: Regex::new(
                r"^(https://res\.cloudinary\.com/[^/]+/image/upload/)(.*?)(/v\d+/.+)$",
            )
            .expect("static regex"),
            simple_re: Regex::new(
                r"^(https://res\.cloudinary\.com/[^/]+/image/upload)(/v\d+/.+)$",
            )
            .expect("static regex"),
        }
    }

    /// Build one shape URL by inserting a transformation segment.
    ///
    /// Thumb uses `c_crop` (focal-point automation), everything else
    /// `c_fill`; gravity is automatic either way. When the source URL
    /// already carries a `c_crop` transformation it is kept and the
    /// new transformation is chained after it instead of replacing it.
    fn build_shape_url(&self, base: &str, role: ShapeRole) -> String {
        let (w, h) = role.target_size();
        let crop_mode = match role {
            ShapeRole::Thumb => "c_crop",
            _ => "c_fill",
        };
        let transform = format!("{crop_mode},g_auto,w_{w},h_{h}");

        if let Some(caps) = self.transform_re.captures(base) {
            let existing = &caps[2];
            return if existing.contains("c_crop") {
                format!("{}{}/{}{}", &caps[1], existing, transform, &caps[3])
            } else {
                format!("{}{}{}", &caps[1], transform, &caps[3])
            };
        }
        if let Some(caps) = self.simple_re.captures(base) {
            return format!("{}/{}{}", &caps[1], transform, &caps[2]);
        }

        // Unrecognised structure: leave the URL untouched.
        base.to_string()
    }

    fn extract_cloud_name(url: &str) -> Option<String> {
        let re = Regex::new(r"res\.cloudinary\.com/([^/]+)").expect("static regex");
        re.captures(url).map(|caps| caps[1].to_string())
    }

    /// Public id is the versioned path without its extension:
    /// `.../v123/dasei/Lichtdesign_rxwwbj.jpg` -> `dasei/Lichtdesign_rxwwbj`.
    fn extract_public_id(url: &str) -> Option<String> {
        let re = Regex::new(r"/v\d+/(.+?)(?:\?|$)").expect("static regex");
        let path = re.captures(url).map(|caps| caps[1].to_string())?;
        let stripped = match path.rfind('.') {
            Some(pos) if pos > 0 => path[..pos].to_string(),
            _ => path,
        };
        Some(stripped)
    }

    fn extract_version(url: &str) -> Option<String> {
        let re = Regex::new(r"/(v\d+)/").expect("static regex");
        re.captures(url).map(|caps| caps[1].to_string())
    }

    /// Cloudinary versions are unix timestamps: `v1665139609` -> 2022.
    fn year_from_version(version: &str) -> Option<i32> {
        let timestamp: i64 = version.strip_prefix('v')?.parse().ok()?;
        DateTime::<Utc>::from_timestamp(timestamp, 0).map(|dt| dt.year())
    }

    fn detect_file_format(url: &str) -> String {
        let path = Url::parse(url)
            .map(|parsed| parsed.path().to_lowercase())
            .unwrap_or_default();
        for (suffix, format) in [
            (".jpg", "jpeg"),
            (".jpeg", "jpeg"),
            (".png", "png"),
            (".webp", "webp"),
            (".gif", "gif"),
        ] {
            if path.ends_with(suffix) {
                return format.to_string();
            }
        }
        "jpeg".to_string()
    }
}

#[async_trait]
impl MediaAdapter for CloudinaryAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Cloudinary
    }

    fn can_handle(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .is_some_and(|host| host.contains("cloudinary.com"))
    }

    async fn fetch_metadata(
        &self,
        url: &str,
        batch: Option<&ImportBatch>,
    ) -> Result<MediaMetadata, AdapterError> {
        let cloud_name = Self::extract_cloud_name(url).or(self.default_account.clone());
        let public_id = Self::extract_public_id(url);
        let (folder, filename) = match public_id.as_deref() {
            Some(id) => match id.rsplit_once('/') {
                Some((folder, filename)) => (Some(folder.to_string()), Some(filename.to_string())),
                None => (None, Some(id.to_string())),
            },
            None => (None, None),
        };

        let version = Self::extract_version(url);
        let year = version
            .as_deref()
            .and_then(Self::year_from_version)
            .or_else(|| Self::year_from_version(&self.initial_version))
            .unwrap_or_else(|| Utc::now().year());

        let alt_text = filename
            .as_deref()
            .map(|name| alt_text_from_public_id(folder.as_deref(), name))
            .unwrap_or_default();

        // No author API; attribution comes from the batch owner.
        let author_name = batch
            .and_then(|b| b.owner_name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let shapes = ShapeSet {
            square: Some(Shape::from_url(self.build_shape_url(url, ShapeRole::Square))),
            thumb: Some(Shape::from_url(self.build_shape_url(url, ShapeRole::Thumb))),
            wide: Some(Shape::from_url(self.build_shape_url(url, ShapeRole::Wide))),
            vertical: Some(Shape::from_url(
                self.build_shape_url(url, ShapeRole::Vertical),
            )),
        };

        Ok(MediaMetadata {
            url: url.to_string(),
            name: filename.clone().or_else(|| Some("Cloudinary Image".to_string())),
            alt_text: Some(alt_text),
            title: None,
            x: None,
            y: None,
            fileformat: Some(Self::detect_file_format(url)),
            author: Some(AuthorInfo {
                adapter: AdapterKind::Cloudinary.as_str().to_string(),
                file_id: public_id,
                account_id: cloud_name,
                folder_id: folder,
                info: Some(author_name.clone()),
                config: None,
            }),
            shapes,
            geo: None,
            date: None,
            license: Some("private".to_string()),
            about: Some(format!("(c) {author_name} | Private | {year}")),
        })
    }
}
