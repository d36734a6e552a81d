// Analysis Gateway: turns a completed answer set into career recommendations.
// All provider calls go through llm_client; this module owns the prompt and
// the shape check on the reply.

pub mod gateway;
pub mod handlers;
pub mod prompts;

pub use gateway::{AnalysisError, AnalysisGateway, HttpGateway, LlmAnalyzer, ANALYSIS_FAILED};
