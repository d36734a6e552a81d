use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::store::{Collection, DocumentStore, Fields, Stamp, StoreError};

/// Process-local store for development and tests. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<(Collection, String), Fields>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn stamped(mut fields: Fields, stamp: Stamp) -> Fields {
    fields.insert(
        stamp.field().to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    fields
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Fields>, StoreError> {
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        Ok(documents.get(&(collection, key.to_string())).cloned())
    }

    async fn set(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.insert((collection, key.to_string()), stamped(fields, stamp));
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        let existing = documents
            .get_mut(&(collection, key.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.as_str(),
                key: key.to_string(),
            })?;
        existing.extend(stamped(fields, stamp));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_replaces_and_stamps() {
        let store = MemoryStore::new();
        store
            .set(Collection::Users, "u1", fields(json!({"a": 1, "b": 2})), Stamp::CreatedAt)
            .await
            .unwrap();
        store
            .set(Collection::Users, "u1", fields(json!({"c": 3})), Stamp::CreatedAt)
            .await
            .unwrap();

        let doc = store.get(Collection::Users, "u1").await.unwrap().unwrap();
        assert!(doc.get("a").is_none());
        assert_eq!(doc["c"], 3);
        assert!(doc["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_update_merges_and_requires_existing() {
        let store = MemoryStore::new();
        let err = store
            .update(Collection::Users, "u1", fields(json!({"x": 1})), Stamp::UpdatedAt)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        store
            .set(Collection::Users, "u1", fields(json!({"a": 1})), Stamp::CreatedAt)
            .await
            .unwrap();
        store
            .update(Collection::Users, "u1", fields(json!({"b": 2})), Stamp::UpdatedAt)
            .await
            .unwrap();

        let doc = store.get(Collection::Users, "u1").await.unwrap().unwrap();
        assert_eq!(doc["a"], 1);
        assert_eq!(doc["b"], 2);
        assert!(doc.contains_key("createdAt"));
        assert!(doc.contains_key("updatedAt"));
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = MemoryStore::new();
        store
            .set(Collection::Users, "u1", Fields::new(), Stamp::CreatedAt)
            .await
            .unwrap();
        assert!(store.get(Collection::Assessments, "u1").await.unwrap().is_none());
    }
}
