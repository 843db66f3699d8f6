//! Alt-text derivation and file-format validation helpers.
//!
//! Remote services encode a human-readable description in their URL
//! slugs and public ids; these helpers turn them into display text.

/// Image file formats accepted by the `images.fileformat` column.
pub const VALID_FILE_FORMATS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "tiff", "tif", "ico", "heic", "heif",
    "avif",
];

/// Minimum length of a trailing slug token for it to count as an
/// id-like suffix rather than a word.
const ID_SUFFIX_MIN_LEN: usize = 10;

pub fn is_valid_file_format(format: &str) -> bool {
    VALID_FILE_FORMATS.contains(&format.to_lowercase().as_str())
}

/// Derive alt text from a hyphenated URL slug.
///
/// Strips a trailing id-like token (last hyphen-delimited token of
/// length >= 10), replaces the remaining hyphens with spaces, and
/// capitalizes the first letter.
///
/// `woman-lying-on-stairway-brofJVz94tQ` -> `Woman lying on stairway`.
pub fn alt_text_from_slug(slug: &str) -> String {
    let trimmed = match slug.rsplit_once('-') {
        Some((head, tail)) if tail.len() >= ID_SUFFIX_MIN_LEN => head,
        _ => slug,
    };
    capitalize(&trimmed.replace('-', " "))
}

/// Derive alt text from a folder + filename public id.
///
/// Strips trailing `_hash` suffixes (an underscore followed by 2+
/// alphanumerics, applied twice to catch `_ea_rh`-style double
/// suffixes), replaces underscores with spaces, and capitalizes.
pub fn alt_text_from_public_id(folder: Option<&str>, filename: &str) -> String {
    if filename.is_empty() {
        return String::new();
    }
    let mut text = match folder {
        Some(folder) => format!("{folder} {filename}"),
        None => filename.to_string(),
    };

    text = strip_underscore_suffix(&text, 2);
    text = strip_underscore_suffix(&text, 2);
    capitalize(&text.replace('_', " "))
}

/// Capitalize the first character of a string.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn strip_underscore_suffix(text: &str, min_len: usize) -> String {
    match text.rsplit_once('_') {
        Some((head, tail))
            if tail.len() >= min_len && tail.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            head.to_string()
        }
        _ => text.to_string(),
    }
}
