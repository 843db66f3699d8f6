//! Unsplash adapter.
//!
//! Fetches photo metadata from the Unsplash read API and synthesizes
//! the four shape URLs by rewriting the raw CDN URL's transformation
//! parameters. The parameter layout is an external contract shared
//! with URLs already stored and with the consuming UI; see
//! [`build_shape_url`].

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use url::Url;

use pictura_core::metadata::{AuthorInfo, GeoPoint, ImportBatch, MediaMetadata};
use pictura_core::naming::alt_text_from_slug;
use pictura_core::shape::{Shape, ShapeRole, ShapeSet};

use crate::{AdapterError, AdapterKind, MediaAdapter, MediaConfig};

const API_BASE: &str = "https://api.unsplash.com";

/// Query parameters carrying the CDN authentication; preserved
/// verbatim through every URL rewrite.
const AUTH_PARAMS: [&str; 2] = ["ixid", "ixlib"];

pub struct UnsplashAdapter {
    access_key: Option<String>,
    client: reqwest::Client,
}

impl UnsplashAdapter {
    pub fn new(config: &MediaConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(config: &MediaConfig, client: reqwest::Client) -> Self {
        Self {
            access_key: config.unsplash_access_key.clone(),
            client,
        }
    }

    /// Extract the photo id from any of the recognised URL forms:
    /// `unsplash.com/photos/{id}`, `images.unsplash.com/photo-{id}`,
    /// or a `photo` query parameter.
    fn extract_photo_id(url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;

        if host.contains("unsplash.com") {
            let segments: Vec<&str> = parsed
                .path_segments()
                .map(|s| s.filter(|seg| !seg.is_empty()).collect())
                .unwrap_or_default();

            if let Some(pos) = segments.iter().position(|s| *s == "photos") {
                if let Some(id) = segments.get(pos + 1) {
                    return Some((*id).to_string());
                }
            }

            if let Some(id) = segments
                .iter()
                .find_map(|s| s.strip_prefix("photo-"))
                .filter(|id| !id.is_empty())
            {
                return Some(id.to_string());
            }
        }

        parsed
            .query_pairs()
            .find(|(key, _)| key == "photo")
            .map(|(_, value)| value.into_owned())
    }

    fn transform_metadata(photo: UnsplashPhoto) -> MediaMetadata {
        let date = photo
            .created_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let year = date.map(|d| d.year()).unwrap_or_else(|| Utc::now().year());

        let alt_text = photo
            .slug
            .as_deref()
            .map(alt_text_from_slug)
            .filter(|text| !text.is_empty())
            .or_else(|| photo.alt_description.clone())
            .or_else(|| photo.description.clone())
            .unwrap_or_default();

        let name = photo
            .alt_description
            .clone()
            .or_else(|| photo.description.clone())
            .unwrap_or_else(|| format!("Unsplash Photo {}", photo.id));

        let geo = photo.location.as_ref().and_then(|location| {
            let position = location.position.as_ref()?;
            match (position.latitude, position.longitude) {
                (Some(latitude), Some(longitude)) => Some(GeoPoint {
                    latitude,
                    longitude,
                    location: location
                        .name
                        .clone()
                        .or_else(|| location.city.clone())
                        .or_else(|| location.country.clone()),
                }),
                _ => None,
            }
        });

        let collection_id = photo
            .current_user_collections
            .as_ref()
            .and_then(|collections| collections.first())
            .map(|collection| collection.id.to_string());

        let shapes = ShapeSet {
            square: shape_for(&photo.urls.raw, ShapeRole::Square),
            thumb: shape_for(&photo.urls.raw, ShapeRole::Thumb),
            wide: shape_for(&photo.urls.raw, ShapeRole::Wide),
            vertical: shape_for(&photo.urls.raw, ShapeRole::Vertical),
        };

        MediaMetadata {
            url: photo.urls.raw.clone(),
            name: Some(name),
            alt_text: Some(alt_text),
            title: photo.description.clone(),
            x: Some(photo.width),
            y: Some(photo.height),
            fileformat: Some(detect_file_format(&photo.urls.raw)),
            author: Some(AuthorInfo {
                adapter: AdapterKind::Unsplash.as_str().to_string(),
                file_id: Some(photo.id.clone()),
                account_id: Some(photo.user.id.clone()),
                folder_id: collection_id,
                info: Some(photo.user.name.clone()),
                config: None,
            }),
            shapes,
            geo,
            date,
            license: Some("unsplash".to_string()),
            about: Some(format!("(c) {} | Unsplash | {}", photo.user.name, year)),
        }
    }
}

#[async_trait]
impl MediaAdapter for UnsplashAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Unsplash
    }

    fn can_handle(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .is_some_and(|host| {
                host.contains("unsplash.com") || host.contains("images.unsplash.com")
            })
    }

    async fn fetch_metadata(
        &self,
        url: &str,
        _batch: Option<&ImportBatch>,
    ) -> Result<MediaMetadata, AdapterError> {
        let photo_id = Self::extract_photo_id(url).ok_or_else(|| {
            AdapterError::Metadata(format!("Could not extract Unsplash photo ID from URL: {url}"))
        })?;
        let access_key = self
            .access_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential("UNSPLASH_ACCESS_KEY"))?;

        let api_url = format!("{API_BASE}/photos/{photo_id}?client_id={access_key}");
        let response = self
            .client
            .get(&api_url)
            .header("Accept-Version", "v1")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::UpstreamFetch {
                service: "Unsplash",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let photo: UnsplashPhoto = response.json().await?;
        Ok(Self::transform_metadata(photo))
    }
}

/// Rewrite a raw Unsplash CDN URL into one shape variant.
///
/// The construction is a strict external contract:
/// 1. every existing query parameter is dropped except the two
///    authentication parameters, which pass through byte-for-byte;
/// 2. parameters are set in fixed order: crop method, `fit`, `w`, `h`,
///    then (thumb only) the centered 1.5x focal-point parameters;
/// 3. the authentication parameters are re-appended last.
///
/// The crop method is `entropy` for square/wide/vertical and
/// `focalpoint` for thumb, approximating a face-centered avatar crop
/// without vision inference.
pub fn build_shape_url(base: &str, role: ShapeRole) -> Result<String, AdapterError> {
    let mut parsed = Url::parse(base)
        .map_err(|e| AdapterError::Metadata(format!("unparseable Unsplash URL {base}: {e}")))?;

    // Read auth parameters from the raw query so their encoding
    // survives untouched.
    let auth: Vec<String> = parsed
        .query()
        .map(|query| {
            query
                .split('&')
                .filter(|pair| {
                    AUTH_PARAMS
                        .iter()
                        .any(|param| pair.starts_with(&format!("{param}=")))
                })
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let (w, h) = role.target_size();
    let crop_method = match role {
        ShapeRole::Thumb => "focalpoint",
        _ => "entropy",
    };

    let mut query = format!("crop={crop_method}&fit=crop&w={w}&h={h}");
    if role == ShapeRole::Thumb {
        query.push_str("&fp-x=0.5&fp-y=0.5&fp-z=1.5");
    }
    for pair in &auth {
        query.push('&');
        query.push_str(pair);
    }

    parsed.set_query(Some(&query));
    Ok(parsed.into())
}

fn shape_for(base: &str, role: ShapeRole) -> Option<Shape> {
    match build_shape_url(base, role) {
        Ok(url) => Some(Shape::from_url(url)),
        Err(err) => {
            tracing::warn!(role = %role, %err, "could not synthesize shape URL");
            None
        }
    }
}

/// File format from the URL path extension or the `fm` query
/// parameter; Unsplash serves JPEG when nothing says otherwise.
fn detect_file_format(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "jpeg".to_string();
    };
    let path = parsed.path().to_lowercase();

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

    match parsed
        .query_pairs()
        .find(|(key, _)| key == "fm")
        .map(|(_, value)| value.into_owned())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "jpeg".to_string(),
        Some("png") => "png".to_string(),
        Some("webp") => "webp".to_string(),
        _ => "jpeg".to_string(),
    }
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UnsplashPhoto {
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub alt_description: Option<String>,
    pub urls: UnsplashUrls,
    pub user: UnsplashUser,
    #[serde(default)]
    pub location: Option<UnsplashLocation>,
    #[serde(default)]
    pub current_user_collections: Option<Vec<UnsplashCollection>>,
}

#[derive(Debug, Deserialize)]
pub struct UnsplashUrls {
    pub raw: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsplashUser {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsplashLocation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub position: Option<UnsplashPosition>,
}

#[derive(Debug, Deserialize)]
pub struct UnsplashPosition {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UnsplashCollection {
    pub id: i64,
}
