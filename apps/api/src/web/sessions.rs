use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::models::Session;

/// How long a signed-in browser survives without being seen.
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Where a browser's signed-in session is kept between process restarts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, sid: Uuid) -> Result<Option<Session>>;
    async fn save(&self, sid: Uuid, session: &Session) -> Result<()>;
    async fn remove(&self, sid: Uuid) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, sid: Uuid) -> Result<Option<Session>> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(sessions.get(&sid).cloned())
    }

    async fn save(&self, sid: Uuid, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(sid, session.clone());
        Ok(())
    }

    async fn remove(&self, sid: Uuid) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&sid);
        Ok(())
    }
}

/// Sessions as JSON strings under `compass:session:{sid}` with a sliding TTL.
pub struct RedisSessionStore {
    client: redis::Client,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("Redis connection failed")
    }
}

fn session_key(sid: Uuid) -> String {
    format!("compass:session:{sid}")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, sid: Uuid) -> Result<Option<Session>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(session_key(sid)).await?;
        raw.map(|json| serde_json::from_str(&json).context("Stored session is not valid JSON"))
            .transpose()
    }

    async fn save(&self, sid: Uuid, session: &Session) -> Result<()> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(session)?;
        conn.set_ex::<_, _, ()>(session_key(sid), json, SESSION_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn remove(&self, sid: Uuid) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(session_key(sid)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::session::testing::session_for;

    #[test]
    fn test_session_key_is_namespaced() {
        let sid = Uuid::nil();
        assert_eq!(
            session_key(sid),
            "compass:session:00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    async fn test_memory_store_save_load_remove() {
        let store = MemorySessionStore::new();
        let sid = Uuid::new_v4();
        assert!(store.load(sid).await.unwrap().is_none());

        store.save(sid, &session_for("grad@example.com")).await.unwrap();
        assert_eq!(
            store.load(sid).await.unwrap().unwrap().email,
            "grad@example.com"
        );

        store.remove(sid).await.unwrap();
        assert!(store.load(sid).await.unwrap().is_none());
    }
}
