use anyhow::{bail, Context, Result};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Which backend holds user profile and assessment documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentBackend {
    Firestore,
    Postgres,
    Memory,
}

/// S3-compatible object storage settings. Present only when all credentials are set.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub firebase_api_key: String,
    pub firebase_project_id: String,
    pub firebase_auth_emulator_host: Option<String>,
    pub firestore_emulator_host: Option<String>,
    pub firestore_access_token: Option<String>,
    pub document_backend: DocumentBackend,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub storage: Option<StorageConfig>,
    pub gateway_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let document_backend = parse_backend(
            &std::env::var("DOCUMENT_STORE").unwrap_or_else(|_| "firestore".to_string()),
        )?;
        let database_url = optional_env("DATABASE_URL");
        if document_backend == DocumentBackend::Postgres && database_url.is_none() {
            bail!("DOCUMENT_STORE=postgres requires DATABASE_URL to be set");
        }

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            firebase_api_key: require_env("FIREBASE_API_KEY")?,
            firebase_project_id: require_env("FIREBASE_PROJECT_ID")?,
            firebase_auth_emulator_host: optional_env("FIREBASE_AUTH_EMULATOR_HOST"),
            firestore_emulator_host: optional_env("FIRESTORE_EMULATOR_HOST"),
            firestore_access_token: optional_env("FIRESTORE_ACCESS_TOKEN"),
            document_backend,
            database_url,
            redis_url: optional_env("REDIS_URL"),
            storage: storage_from_env(),
            gateway_url: optional_env("GATEWAY_URL"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parse_backend(raw: &str) -> Result<DocumentBackend> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "firestore" => Ok(DocumentBackend::Firestore),
        "postgres" => Ok(DocumentBackend::Postgres),
        "memory" => Ok(DocumentBackend::Memory),
        other => bail!("DOCUMENT_STORE must be one of firestore, postgres, memory (got '{other}')"),
    }
}

fn storage_from_env() -> Option<StorageConfig> {
    Some(StorageConfig {
        bucket: optional_env("FIREBASE_STORAGE_BUCKET")?,
        endpoint: optional_env("STORAGE_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_STORAGE_ENDPOINT.to_string()),
        access_key_id: optional_env("STORAGE_ACCESS_KEY_ID")?,
        secret_access_key: optional_env("STORAGE_SECRET_ACCESS_KEY")?,
    })
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values both count as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
