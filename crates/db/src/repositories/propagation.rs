//! Propagation fan-out: keeps the denormalized `img_*` copies on every
//! dependent entity row in lockstep with the image they reference.
//!
//! Reimplements what was once a database-side trigger as an explicit
//! application-level procedure: the image repository calls [`fan_out`]
//! inside every transaction that changes a shape or bitset, and
//! [`PropagationRepo::backfill`] replays the computation for rows that
//! predate the mechanism.

use sqlx::{PgPool, Postgres, Transaction};

use pictura_core::reducer::DerivedFields;
use pictura_core::types::DbId;

use crate::models::entity::EntityKind;
use crate::models::image::Image;

/// Overwrite the five derived columns on every dependent row, in every
/// entity table, that references `image_id`. Runs inside the caller's
/// transaction: a failure on any table rolls back the whole update.
pub(crate) async fn fan_out(
    tx: &mut Transaction<'_, Postgres>,
    image_id: DbId,
    derived: &DerivedFields,
) -> Result<(), sqlx::Error> {
    for kind in EntityKind::ALL {
        let query = format!(
            "UPDATE {} SET
                img_show   = $2,
                img_thumb  = $3,
                img_square = $4,
                img_wide   = $5,
                img_vert   = $6
             WHERE img_id = $1",
            kind.table()
        );
        sqlx::query(&query)
            .bind(image_id)
            .bind(derived.img_show)
            .bind(&derived.img_thumb)
            .bind(&derived.img_square)
            .bind(&derived.img_wide)
            .bind(&derived.img_vert)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Batch recomputation and entity sync operations.
pub struct PropagationRepo;

impl PropagationRepo {
    /// Recompute the derived fields of every image and re-copy them to
    /// all dependent rows. Idempotent; one transaction per image so a
    /// single bad row cannot wedge the whole run.
    ///
    /// Returns the number of images processed.
    pub async fn backfill(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM images ORDER BY id",
            crate::repositories::image_repo::COLUMNS
        );
        let images = sqlx::query_as::<_, Image>(&query).fetch_all(pool).await?;

        let mut processed = 0;
        for image in images {
            let derived = DerivedFields::derive(
                &image.shapes(),
                image.rtag_bits(),
                image.alt_text.as_deref(),
            );

            let mut tx = pool.begin().await?;
            sqlx::query(
                "UPDATE images SET
                    img_show   = $2,
                    img_thumb  = $3,
                    img_square = $4,
                    img_wide   = $5,
                    img_vert   = $6
                 WHERE id = $1",
            )
            .bind(image.id)
            .bind(derived.img_show)
            .bind(&derived.img_thumb)
            .bind(&derived.img_square)
            .bind(&derived.img_wide)
            .bind(&derived.img_vert)
            .execute(&mut *tx)
            .await?;

            fan_out(&mut tx, image.id, &derived).await?;
            tx.commit().await?;
            processed += 1;
        }

        tracing::info!(processed, "propagation backfill complete");
        Ok(processed)
    }

    /// Re-sync one dependent row after it acquires or loses its image
    /// reference: copy the image's derived fields onto the row, or
    /// clear them when the reference is removed.
    ///
    /// Returns `true` if the row existed.
    pub async fn sync_entity_image(
        pool: &PgPool,
        kind: EntityKind,
        row_id: DbId,
        image_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let result = match image_id {
            Some(image_id) => {
                let query = format!(
                    "UPDATE {table} SET
                        img_id     = i.id,
                        img_show   = i.img_show,
                        img_thumb  = i.img_thumb,
                        img_square = i.img_square,
                        img_wide   = i.img_wide,
                        img_vert   = i.img_vert
                     FROM images i
                     WHERE {table}.id = $1 AND i.id = $2",
                    table = kind.table()
                );
                sqlx::query(&query)
                    .bind(row_id)
                    .bind(image_id)
                    .execute(pool)
                    .await?
            }
            None => {
                let query = format!(
                    "UPDATE {} SET
                        img_id     = NULL,
                        img_show   = FALSE,
                        img_thumb  = NULL,
                        img_square = NULL,
                        img_wide   = NULL,
                        img_vert   = NULL
                     WHERE id = $1",
                    kind.table()
                );
                sqlx::query(&query).bind(row_id).execute(pool).await?
            }
        };
        Ok(result.rows_affected() > 0)
    }
}
