//! The shape value type: one crop variant of an image.
//!
//! A shape is an 8-field composite record `(x, y, z, url, json, blur,
//! turl, tpar)` describing exactly one of: raw focal-point coordinates,
//! a ready-to-use URL, an inline JSON payload, or a thumbnail-URL /
//! template-parameter pair, plus an optional perceptual-hash
//! placeholder. The wire form is the tuple format from
//! [`crate::composite`].

use serde::{Deserialize, Serialize};

use crate::composite::{self, TupleError};

/// Number of fields in the shape wire tuple.
pub const SHAPE_FIELD_COUNT: usize = 8;

/// The four shape slots every image carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeRole {
    Square,
    Thumb,
    Wide,
    Vertical,
}

impl ShapeRole {
    /// All roles in slot order.
    pub const ALL: [ShapeRole; 4] = [
        ShapeRole::Square,
        ShapeRole::Thumb,
        ShapeRole::Wide,
        ShapeRole::Vertical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Thumb => "thumb",
            Self::Wide => "wide",
            Self::Vertical => "vertical",
        }
    }

    /// Fixed target dimensions `(width, height)` in pixels.
    ///
    /// These values are a shared contract with the consuming UI layer
    /// and with remote crop URLs already in circulation. Do not change
    /// them without coordinating both.
    pub fn target_size(self) -> (u32, u32) {
        match self {
            Self::Square => (128, 128),
            Self::Thumb => (64, 64),
            Self::Wide => (336, 168),
            Self::Vertical => (126, 224),
        }
    }
}

impl std::fmt::Display for ShapeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShapeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "square" => Ok(Self::Square),
            "thumb" => Ok(Self::Thumb),
            "wide" => Ok(Self::Wide),
            "vertical" => Ok(Self::Vertical),
            other => Err(format!("unknown shape role '{other}'")),
        }
    }
}

/// One crop variant of an image. All fields optional; an all-`None`
/// shape is valid wire data but reduces to the role's null policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Horizontal focal point as a percentage of source width (0-100).
    pub x: Option<f64>,
    /// Vertical focal point as a percentage of source height (0-100).
    pub y: Option<f64>,
    /// Zoom percentage (0-100). Lower values mean a wider view.
    pub z: Option<f64>,
    /// Ready-to-use URL for this variant.
    pub url: Option<String>,
    /// Inline canonical payload; wins over every other field.
    pub json: Option<serde_json::Value>,
    /// Perceptual-hash placeholder (BlurHash).
    pub blur: Option<String>,
    /// Thumbnail/template URL.
    pub turl: Option<String>,
    /// Template parameters paired with `turl`.
    pub tpar: Option<String>,
}

impl Shape {
    /// Shape holding only a URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Shape holding a URL plus a perceptual hash.
    pub fn from_url_and_blur(url: impl Into<String>, blur: Option<String>) -> Self {
        Self {
            url: Some(url.into()),
            blur,
            ..Self::default()
        }
    }

    /// True if any of the focal-point coordinates is set.
    pub fn has_params(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some()
    }

    /// Decode a shape from its wire tuple.
    ///
    /// Exactly eight fields are required. Callers persisting shapes
    /// must treat a parse error as "keep the previous raw value
    /// unchanged" -- stale data beats lost data.
    pub fn parse(wire: &str) -> Result<Self, TupleError> {
        let fields = composite::expect_fields(composite::split_tuple(wire)?, SHAPE_FIELD_COUNT)?;
        let mut fields = fields.into_iter();

        let x = parse_numeric(fields.next().unwrap(), "x")?;
        let y = parse_numeric(fields.next().unwrap(), "y")?;
        let z = parse_numeric(fields.next().unwrap(), "z")?;
        let url = fields.next().unwrap();
        let json = match fields.next().unwrap() {
            Some(raw) => Some(
                serde_json::from_str(&raw)
                    .map_err(|source| TupleError::Json { field: "json", source })?,
            ),
            None => None,
        };
        let blur = fields.next().unwrap();
        let turl = fields.next().unwrap();
        let tpar = fields.next().unwrap();

        Ok(Self {
            x,
            y,
            z,
            url,
            json,
            blur,
            turl,
            tpar,
        })
    }

    /// Encode this shape as its wire tuple.
    pub fn to_wire(&self) -> String {
        let x = self.x.map(format_numeric);
        let y = self.y.map(format_numeric);
        let z = self.z.map(format_numeric);
        let json = self.json.as_ref().map(|v| v.to_string());

        composite::join_tuple(&[
            x.as_deref(),
            y.as_deref(),
            z.as_deref(),
            self.url.as_deref(),
            json.as_deref(),
            self.blur.as_deref(),
            self.turl.as_deref(),
            self.tpar.as_deref(),
        ])
    }
}

/// The four shape slots of one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeSet {
    pub square: Option<Shape>,
    pub thumb: Option<Shape>,
    pub wide: Option<Shape>,
    pub vertical: Option<Shape>,
}

impl ShapeSet {
    pub fn get(&self, role: ShapeRole) -> Option<&Shape> {
        match role {
            ShapeRole::Square => self.square.as_ref(),
            ShapeRole::Thumb => self.thumb.as_ref(),
            ShapeRole::Wide => self.wide.as_ref(),
            ShapeRole::Vertical => self.vertical.as_ref(),
        }
    }

    pub fn set(&mut self, role: ShapeRole, shape: Option<Shape>) {
        match role {
            ShapeRole::Square => self.square = shape,
            ShapeRole::Thumb => self.thumb = shape,
            ShapeRole::Wide => self.wide = shape,
            ShapeRole::Vertical => self.vertical = shape,
        }
    }

    /// True if at least one slot is populated.
    pub fn any(&self) -> bool {
        ShapeRole::ALL.iter().any(|role| self.get(*role).is_some())
    }
}

fn parse_numeric(
    field: Option<String>,
    name: &'static str,
) -> Result<Option<f64>, TupleError> {
    match field {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| TupleError::Numeric {
                field: name,
                value: raw,
            }),
        None => Ok(None),
    }
}

fn format_numeric(value: f64) -> String {
    // f64 Display is shortest-round-trip, so parse(to_wire()) == self.
    format!("{value}")
}
