//! Repository for the `images` table.
//!
//! Every write path that can change a shape slot or the rights bitset
//! recomputes the five derived read fields and fans them out to the
//! dependent entity tables inside the same transaction, so readers
//! never observe an image row disagreeing with its dependents.

use sqlx::{PgPool, Postgres, Transaction};

use pictura_core::reducer::DerivedFields;
use pictura_core::shape::{Shape, ShapeRole, ShapeSet};
use pictura_core::tags::TagBits;
use pictura_core::types::DbId;

use crate::models::image::{CreateImage, Image};
use crate::repositories::propagation;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, name, url, project_id, owner_id, alt_text, title, x, y, \
    fileformat, license, xmlid, geo, date, about, ctags, rtags, author, \
    shape_square, shape_thumb, shape_wide, shape_vertical, \
    img_show, img_thumb, img_square, img_wide, img_vert, created_at, updated_at";

/// Provides persistence for images and their shape slots.
pub struct ImageRepo;

impl ImageRepo {
    /// Insert a new image with its shapes, derived fields, and fan-out
    /// in one transaction.
    pub async fn create(pool: &PgPool, input: &CreateImage) -> Result<Image, sqlx::Error> {
        let rtags = input.rtags.unwrap_or_default();
        let derived = DerivedFields::derive(&input.shapes, rtags, input.alt_text.as_deref());

        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO images
                (name, url, project_id, owner_id, alt_text, title, x, y,
                 fileformat, license, xmlid, geo, date, about, ctags, rtags, author,
                 shape_square, shape_thumb, shape_wide, shape_vertical,
                 img_show, img_thumb, img_square, img_wide, img_vert)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                     COALESCE($9, 'none'), COALESCE($10, 'BY'), $11, $12, $13, $14,
                     COALESCE($15, 0), COALESCE($16, 0), $17,
                     $18, $19, $20, $21,
                     $22, $23, $24, $25, $26)
             RETURNING {COLUMNS}"
        );
        let image = sqlx::query_as::<_, Image>(&query)
            .bind(&input.name)
            .bind(&input.url)
            .bind(input.project_id)
            .bind(input.owner_id)
            .bind(&input.alt_text)
            .bind(&input.title)
            .bind(input.x)
            .bind(input.y)
            .bind(&input.fileformat)
            .bind(&input.license)
            .bind(&input.xmlid)
            .bind(&input.geo)
            .bind(input.date)
            .bind(&input.about)
            .bind(input.ctags.map(|t| t.0))
            .bind(input.rtags.map(|t| t.0))
            .bind(input.author.as_ref().map(|a| a.to_wire()))
            .bind(input.shapes.square.as_ref().map(Shape::to_wire))
            .bind(input.shapes.thumb.as_ref().map(Shape::to_wire))
            .bind(input.shapes.wide.as_ref().map(Shape::to_wire))
            .bind(input.shapes.vertical.as_ref().map(Shape::to_wire))
            .bind(derived.img_show)
            .bind(&derived.img_thumb)
            .bind(&derived.img_square)
            .bind(&derived.img_wide)
            .bind(&derived.img_vert)
            .fetch_one(&mut *tx)
            .await?;

        propagation::fan_out(&mut tx, image.id, &derived).await?;
        tx.commit().await?;

        Ok(image)
    }

    /// Find an image by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1");
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an image by its stable external identifier.
    pub async fn find_by_xmlid(pool: &PgPool, xmlid: &str) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE xmlid = $1");
        sqlx::query_as::<_, Image>(&query)
            .bind(xmlid)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the shape slots present in `changes`, recompute the
    /// derived fields, and fan out -- all in one transaction.
    ///
    /// Slots absent from `changes` keep their raw column value even
    /// when it is malformed (stale beats lost).
    pub async fn update_shapes(
        pool: &PgPool,
        id: DbId,
        changes: &ShapeSet,
    ) -> Result<Option<Image>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(current) = Self::lock_row(&mut tx, id).await? else {
            return Ok(None);
        };

        let mut merged = current.shapes();
        for role in ShapeRole::ALL {
            if let Some(shape) = changes.get(role) {
                merged.set(role, Some(shape.clone()));
            }
        }
        let derived =
            DerivedFields::derive(&merged, current.rtag_bits(), current.alt_text.as_deref());

        let query = format!(
            "UPDATE images SET
                shape_square   = COALESCE($2, shape_square),
                shape_thumb    = COALESCE($3, shape_thumb),
                shape_wide     = COALESCE($4, shape_wide),
                shape_vertical = COALESCE($5, shape_vertical),
                img_show   = $6,
                img_thumb  = $7,
                img_square = $8,
                img_wide   = $9,
                img_vert   = $10,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let image = sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .bind(changes.square.as_ref().map(Shape::to_wire))
            .bind(changes.thumb.as_ref().map(Shape::to_wire))
            .bind(changes.wide.as_ref().map(Shape::to_wire))
            .bind(changes.vertical.as_ref().map(Shape::to_wire))
            .bind(derived.img_show)
            .bind(&derived.img_thumb)
            .bind(&derived.img_square)
            .bind(&derived.img_wide)
            .bind(&derived.img_vert)
            .fetch_one(&mut *tx)
            .await?;

        propagation::fan_out(&mut tx, id, &derived).await?;
        tx.commit().await?;

        Ok(Some(image))
    }

    /// Overwrite one shape slot from wire text.
    ///
    /// A malformed tuple keeps the previous raw value unchanged (logged,
    /// never fatal) and returns the untouched row.
    pub async fn update_shape_wire(
        pool: &PgPool,
        id: DbId,
        role: ShapeRole,
        wire: &str,
    ) -> Result<Option<Image>, sqlx::Error> {
        match Shape::parse(wire) {
            Ok(shape) => {
                let mut changes = ShapeSet::default();
                changes.set(role, Some(shape));
                Self::update_shapes(pool, id, &changes).await
            }
            Err(err) => {
                tracing::warn!(
                    image_id = id,
                    role = %role,
                    %err,
                    "malformed shape tuple; keeping previous value"
                );
                Self::find_by_id(pool, id).await
            }
        }
    }

    /// Replace the rights bitset, recompute the derived fields, and
    /// fan out -- all in one transaction.
    pub async fn set_rtags(
        pool: &PgPool,
        id: DbId,
        rtags: TagBits,
    ) -> Result<Option<Image>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(current) = Self::lock_row(&mut tx, id).await? else {
            return Ok(None);
        };

        let derived =
            DerivedFields::derive(&current.shapes(), rtags, current.alt_text.as_deref());

        let query = format!(
            "UPDATE images SET
                rtags = $2,
                img_show   = $3,
                img_thumb  = $4,
                img_square = $5,
                img_wide   = $6,
                img_vert   = $7,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let image = sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .bind(rtags.0)
            .bind(derived.img_show)
            .bind(&derived.img_thumb)
            .bind(&derived.img_square)
            .bind(&derived.img_wide)
            .bind(&derived.img_vert)
            .fetch_one(&mut *tx)
            .await?;

        propagation::fan_out(&mut tx, id, &derived).await?;
        tx.commit().await?;

        Ok(Some(image))
    }

    /// Write perceptual hashes into the `blur` field of the given
    /// shape slots. Slots whose stored tuple cannot be decoded are
    /// skipped (their raw value is preserved).
    pub async fn set_shape_blurs(
        pool: &PgPool,
        id: DbId,
        blurs: &[(ShapeRole, String)],
    ) -> Result<Option<Image>, sqlx::Error> {
        let Some(current) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let mut changes = ShapeSet::default();
        for (role, blur) in blurs {
            if let Some(mut shape) = current.parsed_shape(*role) {
                shape.blur = Some(blur.clone());
                changes.set(*role, Some(shape));
            }
        }
        if !changes.any() {
            return Ok(Some(current));
        }

        Self::update_shapes(pool, id, &changes).await
    }

    /// Fetch a row under `FOR UPDATE` inside an open transaction.
    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }
}
