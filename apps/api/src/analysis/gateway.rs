//! Analysis backends.
//!
//! `LlmAnalyzer` talks to the language model in process and is what the
//! `/api/analyze-assessment` endpoint serves. `HttpGateway` is the caller's side
//! of that endpoint, used when the shell is pointed at a remote gateway.
//!
//! `AppState` holds an `Arc<dyn AnalysisGateway>`, chosen at startup via config.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::analysis::prompts::{build_analysis_prompt, ANALYSIS_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::{AnswerSet, AssessmentResult};

/// The only failure text a user ever sees for analysis.
pub const ANALYSIS_FAILED: &str = "Failed to analyze assessment";

pub const ANALYZE_PATH: &str = "/api/analyze-assessment";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("language model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("model reply does not match the career path shape: {0}")]
    Shape(serde_json::Error),

    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway responded with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    async fn analyze(&self, answers: &AnswerSet) -> Result<AssessmentResult, AnalysisError>;
}

/// In-process gateway backed by the language model.
#[derive(Clone)]
pub struct LlmAnalyzer {
    llm: LlmClient,
}

impl LlmAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Runs one analysis and returns the model's JSON reply as parsed, after
    /// checking it has the `careerPaths` shape.
    pub async fn analyze_value(&self, answers: &AnswerSet) -> Result<Value, AnalysisError> {
        let prompt = build_analysis_prompt(answers);
        let value: Value = self.llm.call_json(&prompt, ANALYSIS_SYSTEM).await?;
        let result = AssessmentResult::from_value(&value).map_err(AnalysisError::Shape)?;

        info!(
            "Assessment analyzed: {} answers, {} career paths",
            answers.len(),
            result.career_paths.len()
        );
        Ok(value)
    }
}

#[async_trait]
impl AnalysisGateway for LlmAnalyzer {
    async fn analyze(&self, answers: &AnswerSet) -> Result<AssessmentResult, AnalysisError> {
        let value = self.analyze_value(answers).await?;
        AssessmentResult::from_value(&value).map_err(AnalysisError::Shape)
    }
}

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    answers: &'a AnswerSet,
}

/// Remote gateway reached over HTTP: one POST, no retries.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), ANALYZE_PATH),
        }
    }
}

#[async_trait]
impl AnalysisGateway for HttpGateway {
    async fn analyze(&self, answers: &AnswerSet) -> Result<AssessmentResult, AnalysisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeBody { answers })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Status(status.as_u16()));
        }

        let value: Value = response.json().await?;
        AssessmentResult::from_value(&value).map_err(AnalysisError::Shape)
    }
}
