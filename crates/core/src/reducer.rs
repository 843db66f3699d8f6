//! Shape reducer: turns raw shape records into the canonical JSON
//! values cached on the image row and denormalized onto every entity
//! row that references it.
//!
//! The reduction is a pure function; persistence and fan-out live in
//! the db crate.

use serde_json::{json, Map, Value};

use crate::shape::{Shape, ShapeRole, ShapeSet};
use crate::tags::TagBits;

/// The five derived read fields of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFields {
    pub img_show: bool,
    pub img_thumb: Value,
    pub img_square: Value,
    pub img_wide: Value,
    pub img_vert: Value,
}

impl DerivedFields {
    /// Recompute all five derived fields from the raw shapes and the
    /// rights bitset. `alt_text` is folded into each value a shape
    /// produced itself (never into a cascaded fallback).
    pub fn derive(shapes: &ShapeSet, rtags: TagBits, alt_text: Option<&str>) -> Self {
        let img_square = reduce(shapes.square.as_ref(), ShapeRole::Square, None, alt_text);
        let img_thumb = reduce(
            shapes.thumb.as_ref(),
            ShapeRole::Thumb,
            Some(&img_square),
            alt_text,
        );
        let img_wide = reduce(shapes.wide.as_ref(), ShapeRole::Wide, None, alt_text);
        let img_vert = reduce(shapes.vertical.as_ref(), ShapeRole::Vertical, None, alt_text);

        Self {
            img_show: rtags.img_show(),
            img_thumb,
            img_square,
            img_wide,
            img_vert,
        }
    }
}

/// Reduce one raw shape to its canonical value.
///
/// Priority on a populated shape, strictly in this order:
/// 1. `json` -- returned verbatim, regardless of other fields;
/// 2. any of `x`/`y`/`z` -- `{"type":"params","x":..,"y":..,"z":..}`;
/// 3. `url` -- `{"url":..}`;
/// 4. otherwise the role's null policy applies.
///
/// Null policy: `square` is mandatory, so its absence is the sentinel
/// `{"error":true}`; `wide`/`vertical` are optional enhancements and
/// report `{"enabled":false}`; `thumb` cascades to the already-reduced
/// square value in `fallback` and never reports its own sentinel.
pub fn reduce(
    shape: Option<&Shape>,
    role: ShapeRole,
    fallback: Option<&Value>,
    alt_text: Option<&str>,
) -> Value {
    if let Some(shape) = shape {
        let base = if let Some(payload) = &shape.json {
            Some(payload.clone())
        } else if shape.has_params() {
            Some(json!({
                "type": "params",
                "x": shape.x,
                "y": shape.y,
                "z": shape.z,
            }))
        } else {
            shape.url.as_ref().map(|url| json!({ "url": url }))
        };

        if let Some(value) = base {
            return enrich(value, shape, alt_text);
        }
    }

    match role {
        ShapeRole::Square => json!({ "error": true }),
        ShapeRole::Wide | ShapeRole::Vertical => json!({ "enabled": false }),
        ShapeRole::Thumb => fallback
            .cloned()
            .unwrap_or_else(|| json!({ "error": true })),
    }
}

/// Fold `blur`/`turl`/`tpar` and the image alt text into a value the
/// shape produced itself. Non-object payloads pass through untouched.
fn enrich(value: Value, shape: &Shape, alt_text: Option<&str>) -> Value {
    match value {
        Value::Object(mut map) => {
            merge_str(&mut map, "blur", shape.blur.as_deref());
            merge_str(&mut map, "turl", shape.turl.as_deref());
            merge_str(&mut map, "tpar", shape.tpar.as_deref());
            if let Some(alt) = alt_text.filter(|alt| !alt.is_empty()) {
                merge_str(&mut map, "alt_text", Some(alt));
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn merge_str(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url_shape(url: &str) -> Shape {
        Shape::from_url(url)
    }

    #[test]
    fn json_payload_wins_over_everything() {
        let shape = Shape {
            x: Some(10.0),
            url: Some("https://x.test/ignored".to_string()),
            json: Some(json!({"url": "https://x.test/canonical"})),
            ..Shape::default()
        };
        let value = reduce(Some(&shape), ShapeRole::Square, None, None);
        assert_eq!(value["url"], "https://x.test/canonical");
        assert!(value.get("type").is_none());
    }

    #[test]
    fn params_win_over_url() {
        let shape = Shape {
            x: Some(50.0),
            z: Some(80.0),
            url: Some("https://x.test/ignored".to_string()),
            ..Shape::default()
        };
        let value = reduce(Some(&shape), ShapeRole::Square, None, None);
        assert_eq!(value["type"], "params");
        assert_eq!(value["x"], 50.0);
        assert_eq!(value["y"], Value::Null);
        assert_eq!(value["z"], 80.0);
    }

    #[test]
    fn url_only_reduces_to_url_object() {
        let value = reduce(
            Some(&url_shape("https://x.test/a.webp")),
            ShapeRole::Wide,
            None,
            None,
        );
        assert_eq!(value, json!({"url": "https://x.test/a.webp"}));
    }

    #[test]
    fn null_square_is_error_sentinel() {
        assert_eq!(
            reduce(None, ShapeRole::Square, None, None),
            json!({"error": true})
        );
    }

    #[test]
    fn null_wide_and_vertical_are_disabled() {
        assert_eq!(
            reduce(None, ShapeRole::Wide, None, None),
            json!({"enabled": false})
        );
        assert_eq!(
            reduce(None, ShapeRole::Vertical, None, None),
            json!({"enabled": false})
        );
    }

    #[test]
    fn null_thumb_cascades_to_reduced_square() {
        let square = reduce(
            Some(&url_shape("https://x.test/sq.webp")),
            ShapeRole::Square,
            None,
            None,
        );
        let thumb = reduce(None, ShapeRole::Thumb, Some(&square), None);
        assert_eq!(thumb, square);
    }

    #[test]
    fn empty_thumb_shape_also_cascades() {
        // A present-but-empty shape falls through to the null policy.
        let square = reduce(
            Some(&url_shape("https://x.test/sq.webp")),
            ShapeRole::Square,
            None,
            None,
        );
        let thumb = reduce(Some(&Shape::default()), ShapeRole::Thumb, Some(&square), None);
        assert_eq!(thumb, square);
    }

    #[test]
    fn blur_and_alt_text_are_merged() {
        let shape = Shape {
            url: Some("https://x.test/a.webp".to_string()),
            blur: Some("LKO2?U%2Tw=w".to_string()),
            ..Shape::default()
        };
        let value = reduce(Some(&shape), ShapeRole::Square, None, Some("A stage"));
        assert_eq!(value["url"], "https://x.test/a.webp");
        assert_eq!(value["blur"], "LKO2?U%2Tw=w");
        assert_eq!(value["alt_text"], "A stage");
    }

    #[test]
    fn fallback_is_not_enriched_with_thumb_fields() {
        let square = reduce(
            Some(&url_shape("https://x.test/sq.webp")),
            ShapeRole::Square,
            None,
            None,
        );
        let thumb_shape = Shape {
            blur: Some("should-not-appear".to_string()),
            ..Shape::default()
        };
        let thumb = reduce(Some(&thumb_shape), ShapeRole::Thumb, Some(&square), None);
        assert_eq!(thumb, square);
    }

    #[test]
    fn derive_computes_all_five_fields() {
        let shapes = ShapeSet {
            square: Some(url_shape("https://x.test/sq.webp")),
            thumb: None,
            wide: Some(url_shape("https://x.test/wide.webp")),
            vertical: None,
        };
        let derived = DerivedFields::derive(&shapes, TagBits(0), None);

        assert!(derived.img_show);
        assert_eq!(derived.img_square, json!({"url": "https://x.test/sq.webp"}));
        assert_eq!(derived.img_thumb, derived.img_square);
        assert_eq!(derived.img_wide, json!({"url": "https://x.test/wide.webp"}));
        assert_eq!(derived.img_vert, json!({"enabled": false}));
    }

    #[test]
    fn derive_respects_quality_gate() {
        let shapes = ShapeSet::default();
        let derived = DerivedFields::derive(&shapes, TagBits(crate::tags::QUALITY_HIDDEN), None);
        assert!(!derived.img_show);
        assert_eq!(derived.img_square, json!({"error": true}));
    }
}
