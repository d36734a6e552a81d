use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity-provider session held for a signed-in browser.
/// Owned by the provider; the app keeps a read-only copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub signed_in_at: DateTime<Utc>,
}
