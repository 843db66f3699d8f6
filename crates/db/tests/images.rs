//! Integration tests for image persistence, the derived read fields,
//! and propagation to dependent entity tables.

use serde_json::json;
use sqlx::PgPool;

use pictura_core::shape::{Shape, ShapeRole, ShapeSet};
use pictura_core::tags::{TagBits, QUALITY_HIDDEN};
use pictura_db::models::entity::EntityKind;
use pictura_db::models::image::CreateImage;
use pictura_db::repositories::image_repo::ImageRepo;
use pictura_db::repositories::propagation::PropagationRepo;

fn sample_image(name: &str) -> CreateImage {
    CreateImage {
        name: name.to_string(),
        url: format!("https://images.example.com/{name}.jpg"),
        alt_text: Some("A rehearsal on stage".to_string()),
        shapes: ShapeSet {
            square: Some(Shape::from_url("https://images.example.com/sq.webp")),
            thumb: None,
            wide: Some(Shape::from_url("https://images.example.com/wide.webp")),
            vertical: None,
        },
        ..CreateImage::default()
    }
}

async fn insert_user(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn entity_img_square(pool: &PgPool, table: &str, id: i64) -> Option<serde_json::Value> {
    sqlx::query_scalar(&format!("SELECT img_square FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_computes_derived_fields(pool: PgPool) {
    let image = ImageRepo::create(&pool, &sample_image("stage")).await.unwrap();

    assert!(image.img_show);
    assert_eq!(
        image.img_square,
        Some(json!({
            "url": "https://images.example.com/sq.webp",
            "alt_text": "A rehearsal on stage"
        }))
    );
    // Thumb has no shape of its own and cascades to the square value.
    assert_eq!(image.img_thumb, image.img_square);
    assert_eq!(image.img_vert, Some(json!({"enabled": false})));
    assert_eq!(image.fileformat, "none");
    assert_eq!(image.license, "BY");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn shape_update_propagates_in_one_transaction(pool: PgPool) {
    let image = ImageRepo::create(&pool, &sample_image("hero")).await.unwrap();

    let user_id = insert_user(&pool, "alice").await;
    PropagationRepo::sync_entity_image(&pool, EntityKind::Users, user_id, Some(image.id))
        .await
        .unwrap();
    assert_eq!(
        entity_img_square(&pool, "users", user_id).await,
        image.img_square
    );

    // Overwrite the square shape; the dependent row must show the new
    // value in the same read.
    let mut changes = ShapeSet::default();
    changes.set(
        ShapeRole::Square,
        Some(Shape::from_url("https://images.example.com/sq2.webp")),
    );
    let updated = ImageRepo::update_shapes(&pool, image.id, &changes)
        .await
        .unwrap()
        .unwrap();

    let expected = json!({
        "url": "https://images.example.com/sq2.webp",
        "alt_text": "A rehearsal on stage"
    });
    assert_eq!(updated.img_square, Some(expected.clone()));
    assert_eq!(
        entity_img_square(&pool, "users", user_id).await,
        Some(expected)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_wire_keeps_previous_value(pool: PgPool) {
    let image = ImageRepo::create(&pool, &sample_image("keep")).await.unwrap();
    let before = image.shape_square.clone();

    let after = ImageRepo::update_shape_wire(&pool, image.id, ShapeRole::Square, "(,,,broken")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(after.shape_square, before);
    assert_eq!(after.img_square, image.img_square);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn hiding_via_rtags_reaches_dependents(pool: PgPool) {
    let image = ImageRepo::create(&pool, &sample_image("hide")).await.unwrap();
    let user_id = insert_user(&pool, "bob").await;
    PropagationRepo::sync_entity_image(&pool, EntityKind::Users, user_id, Some(image.id))
        .await
        .unwrap();

    let updated = ImageRepo::set_rtags(&pool, image.id, TagBits(QUALITY_HIDDEN))
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.img_show);

    let user_show: bool = sqlx::query_scalar("SELECT img_show FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!user_show);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn backfill_populates_legacy_rows(pool: PgPool) {
    // A row written before the derived-field mechanism existed: raw
    // shape tuple present, img_* columns empty.
    let image_id: i64 = sqlx::query_scalar(
        "INSERT INTO images (name, url, shape_square)
         VALUES ('legacy', 'https://images.example.com/legacy.jpg',
                 '(,,,https://images.example.com/legacy-sq.webp,,,,)')
         RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let event_id: i64 =
        sqlx::query_scalar("INSERT INTO events (name, img_id) VALUES ('premiere', $1) RETURNING id")
            .bind(image_id)
            .fetch_one(&pool)
            .await
            .unwrap();

    let processed = PropagationRepo::backfill(&pool).await.unwrap();
    assert_eq!(processed, 1);

    let expected = json!({"url": "https://images.example.com/legacy-sq.webp"});
    let image = ImageRepo::find_by_id(&pool, image_id).await.unwrap().unwrap();
    assert_eq!(image.img_square, Some(expected.clone()));
    assert_eq!(
        entity_img_square(&pool, "events", event_id).await,
        Some(expected)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn losing_the_reference_clears_entity_fields(pool: PgPool) {
    let image = ImageRepo::create(&pool, &sample_image("clear")).await.unwrap();
    let user_id = insert_user(&pool, "carol").await;
    PropagationRepo::sync_entity_image(&pool, EntityKind::Users, user_id, Some(image.id))
        .await
        .unwrap();

    PropagationRepo::sync_entity_image(&pool, EntityKind::Users, user_id, None)
        .await
        .unwrap();

    let (img_id, img_show): (Option<i64>, bool) =
        sqlx::query_as("SELECT img_id, img_show FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(img_id, None);
    assert!(!img_show);
    assert_eq!(entity_img_square(&pool, "users", user_id).await, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_by_xmlid(pool: PgPool) {
    let mut input = sample_image("named");
    input.xmlid = Some("tp.image.mixed-named.00".to_string());
    ImageRepo::create(&pool, &input).await.unwrap();

    let found = ImageRepo::find_by_xmlid(&pool, "tp.image.mixed-named.00")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "named");
    assert!(ImageRepo::find_by_xmlid(&pool, "tp.image.missing")
        .await
        .unwrap()
        .is_none());
}
