//! Image row model and DTOs.
//!
//! Shapes and the author descriptor are stored in their composite
//! tuple wire form (TEXT columns); the five derived `img_*` read
//! fields are materialized JSONB/BOOLEAN columns recomputed by the
//! image repository on every shape or bitset change.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use pictura_core::metadata::AuthorInfo;
use pictura_core::shape::{Shape, ShapeRole, ShapeSet};
use pictura_core::tags::TagBits;
use pictura_core::types::{DbId, Timestamp};

/// A row from the `images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    pub name: String,
    pub url: String,
    pub project_id: Option<DbId>,
    pub owner_id: Option<DbId>,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    /// Pixel width.
    pub x: Option<i32>,
    /// Pixel height.
    pub y: Option<i32>,
    pub fileformat: String,
    pub license: String,
    pub xmlid: Option<String>,
    pub geo: Option<serde_json::Value>,
    pub date: Option<Timestamp>,
    pub about: Option<String>,
    pub ctags: i32,
    pub rtags: i32,
    /// Author descriptor in wire form.
    pub author: Option<String>,
    /// Shape slots in wire form.
    pub shape_square: Option<String>,
    pub shape_thumb: Option<String>,
    pub shape_wide: Option<String>,
    pub shape_vertical: Option<String>,
    /// Derived read fields.
    pub img_show: bool,
    pub img_thumb: Option<serde_json::Value>,
    pub img_square: Option<serde_json::Value>,
    pub img_wide: Option<serde_json::Value>,
    pub img_vert: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Image {
    /// Raw wire text of one shape slot.
    pub fn shape_wire(&self, role: ShapeRole) -> Option<&str> {
        match role {
            ShapeRole::Square => self.shape_square.as_deref(),
            ShapeRole::Thumb => self.shape_thumb.as_deref(),
            ShapeRole::Wide => self.shape_wide.as_deref(),
            ShapeRole::Vertical => self.shape_vertical.as_deref(),
        }
    }

    /// Decode one shape slot. A malformed wire value is logged and
    /// read as absent; the raw column is left untouched.
    pub fn parsed_shape(&self, role: ShapeRole) -> Option<Shape> {
        let wire = self.shape_wire(role)?;
        match Shape::parse(wire) {
            Ok(shape) => Some(shape),
            Err(err) => {
                tracing::warn!(
                    image_id = self.id,
                    role = %role,
                    %err,
                    "malformed shape tuple; treating as absent"
                );
                None
            }
        }
    }

    /// Decode all four shape slots.
    pub fn shapes(&self) -> ShapeSet {
        ShapeSet {
            square: self.parsed_shape(ShapeRole::Square),
            thumb: self.parsed_shape(ShapeRole::Thumb),
            wide: self.parsed_shape(ShapeRole::Wide),
            vertical: self.parsed_shape(ShapeRole::Vertical),
        }
    }

    /// Decode the author descriptor.
    pub fn author_info(&self) -> Option<AuthorInfo> {
        let wire = self.author.as_deref()?;
        match AuthorInfo::parse(wire) {
            Ok(author) => Some(author),
            Err(err) => {
                tracing::warn!(image_id = self.id, %err, "malformed author tuple");
                None
            }
        }
    }

    pub fn rtag_bits(&self) -> TagBits {
        TagBits(self.rtags)
    }
}

/// DTO for creating a new image. Shapes and author are passed as
/// values; the repository serializes them to wire form and computes
/// the derived fields in the same transaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateImage {
    pub name: String,
    pub url: String,
    pub project_id: Option<DbId>,
    pub owner_id: Option<DbId>,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub fileformat: Option<String>,
    pub license: Option<String>,
    pub xmlid: Option<String>,
    pub geo: Option<serde_json::Value>,
    pub date: Option<Timestamp>,
    pub about: Option<String>,
    pub ctags: Option<TagBits>,
    pub rtags: Option<TagBits>,
    pub author: Option<AuthorInfo>,
    pub shapes: ShapeSet,
}
