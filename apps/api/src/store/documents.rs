use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::models::AssessmentResult;
use crate::store::{Collection, DocumentStore, Fields, Stamp, StoreError};

/// A previously saved assessment record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAssessment {
    pub results: AssessmentResult,
    pub created_at: Option<String>,
}

/// Per-user profile and assessment records.
#[derive(Clone)]
pub struct Documents {
    store: Arc<dyn DocumentStore>,
}

impl Documents {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Writes `users/{user_id}`, replacing any previous profile.
    pub async fn create_user_document(&self, user_id: &str, data: Fields) -> Result<(), StoreError> {
        self.store
            .set(Collection::Users, user_id, data, Stamp::CreatedAt)
            .await
    }

    pub async fn get_user_document(&self, user_id: &str) -> Result<Option<Fields>, StoreError> {
        self.store.get(Collection::Users, user_id).await
    }

    /// Merges `data` into an existing profile; `StoreError::NotFound` if there is none.
    pub async fn update_user_document(&self, user_id: &str, data: Fields) -> Result<(), StoreError> {
        self.store
            .update(Collection::Users, user_id, data, Stamp::UpdatedAt)
            .await
    }

    pub async fn save_assessment_results(
        &self,
        user_id: &str,
        results: &AssessmentResult,
    ) -> Result<(), StoreError> {
        let results = serde_json::to_value(results)
            .map_err(|e| StoreError::Malformed(format!("unserializable results: {e}")))?;
        let mut data = Fields::new();
        data.insert("results".to_string(), results);
        self.store
            .set(Collection::Assessments, user_id, data, Stamp::CreatedAt)
            .await
    }

    pub async fn get_assessment_results(
        &self,
        user_id: &str,
    ) -> Result<Option<SavedAssessment>, StoreError> {
        let Some(mut doc) = self.store.get(Collection::Assessments, user_id).await? else {
            return Ok(None);
        };

        let results = doc.remove("results").unwrap_or(Value::Null);
        let results = AssessmentResult::from_value(&results).map_err(|e| {
            StoreError::Malformed(format!("assessments/{user_id} results: {e}"))
        })?;
        let created_at = doc
            .get(Stamp::CreatedAt.field())
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Some(SavedAssessment {
            results,
            created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CareerPath;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn documents() -> Documents {
        Documents::new(Arc::new(MemoryStore::new()))
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn sample_result() -> AssessmentResult {
        AssessmentResult {
            career_paths: vec![CareerPath {
                title: "Cloud Engineer".to_string(),
                skills: vec!["AWS".to_string(), "Terraform".to_string()],
                market_insights: vec!["Cloud adoption in the region".to_string()],
                learning_resources: vec!["AWS Skill Builder".to_string()],
                target_companies: vec!["STC".to_string()],
            }],
        }
    }

    #[tokio::test]
    async fn test_missing_assessment_is_none_every_time() {
        let documents = documents();
        assert!(documents.get_assessment_results("uid-1").await.unwrap().is_none());
        assert!(documents.get_assessment_results("uid-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saved_assessment_round_trips_with_timestamp() {
        let documents = documents();
        documents
            .save_assessment_results("uid-1", &sample_result())
            .await
            .unwrap();

        let saved = documents.get_assessment_results("uid-1").await.unwrap().unwrap();
        assert_eq!(saved.results, sample_result());
        assert!(saved.created_at.is_some());
    }

    #[tokio::test]
    async fn test_user_document_lifecycle() {
        let documents = documents();
        assert!(documents.get_user_document("uid-1").await.unwrap().is_none());

        documents
            .create_user_document("uid-1", fields(json!({ "email": "grad@example.com" })))
            .await
            .unwrap();
        documents
            .update_user_document("uid-1", fields(json!({ "displayName": "Sara" })))
            .await
            .unwrap();

        let doc = documents.get_user_document("uid-1").await.unwrap().unwrap();
        assert_eq!(doc["email"], "grad@example.com");
        assert_eq!(doc["displayName"], "Sara");
        assert!(doc.contains_key("createdAt"));
        assert!(doc.contains_key("updatedAt"));
    }

    #[tokio::test]
    async fn test_update_without_profile_is_not_found() {
        let err = documents()
            .update_user_document("uid-9", fields(json!({ "displayName": "x" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_documents_are_keyed_by_user() {
        let documents = documents();
        documents
            .save_assessment_results("uid-1", &sample_result())
            .await
            .unwrap();
        assert!(documents.get_assessment_results("uid-2").await.unwrap().is_none());
    }
}
