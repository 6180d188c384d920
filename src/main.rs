use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mqs_api::auth::TokenVerifier;
use mqs_api::config::AppConfig;
use mqs_api::database::{
    seed, DocumentStore, MemoryDocumentStore, PgDocumentStore, MQPROFILE_COLLECTION, MQPROFILE_KEY,
};
use mqs_api::schema::RequestSchema;
use mqs_api::AppState;

#[derive(Parser)]
#[command(name = "mqs-api")]
#[command(about = "MQS API - read access to message-queue profiles")]
#[command(version)]
struct Args {
    #[arg(long, help = "Port to listen on (overrides MQS_API_PORT / PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Serve from an in-memory store seeded with this JSON array of mqprofiles")]
    seed: Option<PathBuf>,

    #[arg(long, help = "Postgres URL for the document store (overrides DATABASE_URL)")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = mqs_api::config::config();
    tracing::info!("Starting MQS API in {:?} mode", config.environment);

    let store = open_store(&args, config).await?;
    let tokens = TokenVerifier::from_config(&config.security).context("token verification is not configured")?;
    let schema = RequestSchema::bundled().context("failed to load request schema")?;

    let state = AppState::new(store, tokens, schema, &config.api.route_version_prefix);
    let app = mqs_api::app(state, config).context("failed to build routes")?;

    let port = args.port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("MQS API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn open_store(args: &Args, config: &AppConfig) -> Result<Arc<dyn DocumentStore>> {
    if let Some(path) = &args.seed {
        let docs = seed::load_mqprofiles(path)?;
        let store = MemoryDocumentStore::new();
        tracing::info!("Seeding in-memory store with {} mqprofile(s) from {}", docs.len(), path.display());
        store.insert_many(MQPROFILE_COLLECTION, docs).await;
        return Ok(Arc::new(store));
    }

    let Some(url) = args.database_url.as_ref().or(config.database.url.as_ref()) else {
        bail!("no document store configured; set DATABASE_URL, pass --database-url, or pass --seed");
    };

    let mut store = PgDocumentStore::connect(url, &config.database)
        .await
        .context("failed to connect to the document store")?;
    store
        .ensure_collection(MQPROFILE_COLLECTION, MQPROFILE_KEY)
        .await
        .context("failed to prepare the mqprofile collection")?;

    Ok(Arc::new(store))
}
