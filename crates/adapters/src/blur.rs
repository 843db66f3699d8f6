//! BlurHash generation for shape previews.

use image::imageops::FilterType;
use image::DynamicImage;

use crate::AdapterError;

/// Horizontal DCT components.
const COMPONENTS_X: u32 = 4;
/// Vertical DCT components.
const COMPONENTS_Y: u32 = 3;
/// Downscale edge length before encoding; the hash only carries very
/// low frequencies, so 32px is plenty.
const HASH_SIZE: u32 = 32;

/// Encode a BlurHash for an already-decoded image.
pub fn generate(img: &DynamicImage) -> Result<String, AdapterError> {
    let small = img.resize_exact(HASH_SIZE, HASH_SIZE, FilterType::Triangle);
    let rgba = small.to_rgba8();
    blurhash::encode(
        COMPONENTS_X,
        COMPONENTS_Y,
        rgba.width(),
        rgba.height(),
        rgba.as_raw(),
    )
    .map_err(|e| AdapterError::Encode(format!("blurhash: {e}")))
}

/// Decode raw image bytes and encode their BlurHash.
pub fn generate_from_bytes(bytes: &[u8]) -> Result<String, AdapterError> {
    let img = image::load_from_memory(bytes)?;
    generate(&img)
}

/// Fetch a remote image and encode its BlurHash.
pub async fn generate_from_url(url: &str) -> Result<String, AdapterError> {
    let bytes = reqwest::get(url)
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    generate_from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn generates_a_hash_for_a_solid_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, image::Rgb([120, 80, 40])));
        let hash = generate(&img).unwrap();
        assert!(!hash.is_empty());
    }

    #[test]
    fn hash_is_deterministic() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, 128])
        }));
        assert_eq!(generate(&img).unwrap(), generate(&img).unwrap());
    }
}
