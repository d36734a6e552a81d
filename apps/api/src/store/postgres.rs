use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::store::{Collection, DocumentStore, Fields, Stamp, StoreError};

const CREATE_DOCUMENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        key        TEXT NOT NULL,
        data       JSONB NOT NULL,
        PRIMARY KEY (collection, key)
    )
"#;

/// Documents as JSONB rows keyed by (collection, key). Stamps use the
/// database clock; concurrent writes to one key are last-writer-wins.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps `pool`, creating the documents table if it does not exist.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::query(CREATE_DOCUMENTS_TABLE).execute(&pool).await?;
        info!("Postgres document store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Fields>, StoreError> {
        let data: Option<Value> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = $1 AND key = $2")
                .bind(collection.as_str())
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match data {
            None => Ok(None),
            Some(Value::Object(fields)) => Ok(Some(fields)),
            Some(other) => Err(StoreError::Malformed(format!(
                "{}/{key} holds a non-object document: {other}",
                collection.as_str()
            ))),
        }
    }

    async fn set(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, key, data)
            VALUES ($1, $2, $3::jsonb || jsonb_build_object($4::text, to_jsonb(now())))
            ON CONFLICT (collection, key) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(Value::Object(fields))
        .bind(stamp.field())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3::jsonb || jsonb_build_object($4::text, to_jsonb(now()))
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(Value::Object(fields))
        .bind(stamp.field())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.as_str(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}
