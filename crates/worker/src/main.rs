//! Batch-import worker: imports a list of image URLs from the command
//! line, applying batch metadata from environment variables.
//!
//! Usage:
//!   pictura-worker <url> [<url> ...]
//!
//! Environment:
//!   DATABASE_URL          Postgres connection string (required)
//!   IMPORT_XML_ROOT       sequence anchor; items get `{root}.00`, ...
//!   IMPORT_DOMAINCODE     project domain code to resolve
//!   IMPORT_ALT_TEXT       alt-text override for every item
//!   IMPORT_LICENSE        license override for every item
//!   IMPORT_OWNER_NAME     attribution name for adapters without an
//!                         author API
//!   plus the adapter configuration read by `MediaConfig::from_env`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pictura_adapters::{AdapterRegistry, MediaConfig};
use pictura_core::metadata::ImportBatch;
use pictura_pipeline::Importer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pictura_worker=info,pictura_adapters=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        anyhow::bail!("usage: pictura-worker <url> [<url> ...]");
    }

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let pool = pictura_db::create_pool(&database_url).await?;
    pictura_db::health_check(&pool).await?;

    let batch = ImportBatch {
        xml_root: std::env::var("IMPORT_XML_ROOT").ok(),
        domaincode: std::env::var("IMPORT_DOMAINCODE").ok(),
        alt_text: std::env::var("IMPORT_ALT_TEXT").ok(),
        license: std::env::var("IMPORT_LICENSE").ok(),
        owner_name: std::env::var("IMPORT_OWNER_NAME").ok(),
        ..ImportBatch::default()
    };

    let registry = AdapterRegistry::new(&MediaConfig::from_env());
    let importer = Importer::new(registry, pool);

    tracing::info!(total = urls.len(), "starting batch import");
    let outcome = importer.import_images(&urls, &batch).await;

    for result in &outcome.results {
        if result.success {
            tracing::info!(
                url = %result.url,
                image_id = result.image_id,
                adapter = %result.adapter,
                "imported"
            );
        } else {
            tracing::error!(
                url = %result.url,
                error = result.error.as_deref().unwrap_or("unknown"),
                "failed"
            );
        }
    }
    tracing::info!(
        total = outcome.total,
        successful = outcome.successful,
        failed = outcome.failed,
        "batch import finished"
    );

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
