use std::sync::Arc;

use crate::analysis::{AnalysisGateway, LlmAnalyzer};
use crate::storage::FileStorage;
use crate::store::Documents;
use crate::web::BrowserSessions;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Backs `POST /api/analyze-assessment`, which returns the model's JSON verbatim.
    pub analyzer: LlmAnalyzer,
    /// What the assessment page submits to. Defaults to `analyzer`; a remote
    /// gateway when `GATEWAY_URL` is set.
    pub gateway: Arc<dyn AnalysisGateway>,
    pub documents: Documents,
    pub browsers: BrowserSessions,
    /// `None` unless storage credentials are configured.
    pub storage: Option<FileStorage>,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::identity::session::testing::StaticIdentity;
    use crate::llm_client::LlmClient;
    use crate::store::MemoryStore;
    use crate::web::MemorySessionStore;

    /// In-memory state whose analysis calls go to the chat endpoint at `base_url`.
    pub fn state_with_provider(base_url: &str) -> AppState {
        let analyzer = LlmAnalyzer::new(LlmClient::new("test-key".to_string(), base_url));
        AppState {
            gateway: Arc::new(analyzer.clone()),
            analyzer,
            documents: Documents::new(Arc::new(MemoryStore::new())),
            browsers: BrowserSessions::new(
                Arc::new(StaticIdentity),
                Arc::new(MemorySessionStore::new()),
            ),
            storage: None,
        }
    }
}
