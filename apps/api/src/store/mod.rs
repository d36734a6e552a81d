//! Document Store client.
//!
//! `DocumentStore` is the narrow seam to whichever external store holds per-user
//! records. Backends: Firestore (REST), Postgres (JSONB table), in-memory.
//! `Documents` layers the profile and assessment operations on top.
//!
//! `AppState` holds a `Documents` wrapping an `Arc<dyn DocumentStore>`, chosen at
//! startup via `DOCUMENT_STORE`.

pub mod documents;
pub mod firestore;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use documents::{Documents, SavedAssessment};
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// A stored record: a flat JSON object of named fields.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Assessments,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Assessments => "assessments",
        }
    }
}

/// Timestamp field a write stamps with the backend's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    CreatedAt,
    UpdatedAt,
}

impl Stamp {
    pub fn field(&self) -> &'static str {
        match self {
            Stamp::CreatedAt => "createdAt",
            Stamp::UpdatedAt => "updatedAt",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document at {collection}/{key}")]
    NotFound {
        collection: &'static str,
        key: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed document: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Fields>, StoreError>;

    /// Replaces the whole document, creating it if needed.
    async fn set(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        stamp: Stamp,
    ) -> Result<(), StoreError>;

    /// Merges `fields` into an existing document; `StoreError::NotFound` if absent.
    async fn update(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        stamp: Stamp,
    ) -> Result<(), StoreError>;
}
