use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One model-generated career suggestion with its supporting lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerPath {
    pub title: String,
    pub skills: Vec<String>,
    pub market_insights: Vec<String>,
    pub learning_resources: Vec<String>,
    pub target_companies: Vec<String>,
}

/// Ordered list of recommendations, as returned by the analysis gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub career_paths: Vec<CareerPath>,
}

impl AssessmentResult {
    /// Checks that an untyped model reply has the expected shape.
    /// Unknown extra fields are tolerated; missing or mistyped ones are not.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}
