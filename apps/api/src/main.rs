mod analysis;
mod assessment;
mod config;
mod db;
mod errors;
mod identity;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;
mod store;
mod web;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::{AnalysisGateway, HttpGateway, LlmAnalyzer};
use crate::config::{Config, DocumentBackend};
use crate::db::create_pool;
use crate::identity::FirebaseIdentity;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::FileStorage;
use crate::store::{DocumentStore, Documents, FirestoreStore, MemoryStore, PostgresStore};
use crate::web::{BrowserSessions, MemorySessionStore, RedisSessionStore, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Fails on missing required env vars
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Career Compass API v{}", env!("CARGO_PKG_VERSION"));

    let documents = Documents::new(build_document_store(&config).await?);

    let sessions: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            info!("Redis session store initialized");
            Arc::new(RedisSessionStore::new(client))
        }
        None => {
            warn!("REDIS_URL not set; sign-ins will not survive a restart");
            Arc::new(MemorySessionStore::new())
        }
    };

    let identity = Arc::new(FirebaseIdentity::for_project(
        config.firebase_api_key.clone(),
        config.firebase_auth_emulator_host.as_deref(),
    ));
    let browsers = BrowserSessions::new(identity, sessions);
    let _sweeper = browsers.spawn_sweeper();

    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let analyzer = LlmAnalyzer::new(llm);

    let gateway: Arc<dyn AnalysisGateway> = match &config.gateway_url {
        Some(url) => {
            info!("Assessments will be submitted to {url}");
            Arc::new(HttpGateway::new(url))
        }
        None => Arc::new(analyzer.clone()),
    };

    let storage = match &config.storage {
        Some(storage_config) => {
            info!("File storage initialized (bucket: {})", storage_config.bucket);
            Some(FileStorage::connect(storage_config).await)
        }
        None => {
            info!("File storage not configured; uploads disabled");
            None
        }
    };

    let state = AppState {
        analyzer,
        gateway,
        documents,
        browsers,
        storage,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Picks the document backend named by `DOCUMENT_STORE`.
async fn build_document_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.document_backend {
        DocumentBackend::Firestore => {
            info!(
                "Firestore document store initialized (project: {})",
                config.firebase_project_id
            );
            Arc::new(FirestoreStore::for_project(
                config.firebase_project_id.clone(),
                config.firebase_api_key.clone(),
                config.firestore_access_token.clone(),
                config.firestore_emulator_host.as_deref(),
            ))
        }
        DocumentBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres document store")?;
            let pool = create_pool(url).await?;
            Arc::new(PostgresStore::connect(pool).await?)
        }
        DocumentBackend::Memory => {
            warn!("In-memory document store: profiles and results are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
