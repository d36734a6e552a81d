//! Firebase Authentication over the Identity Toolkit REST API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::identity::{AuthError, IdentityProvider};
use crate::models::Session;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Production endpoint, or the local emulator when a host is given.
    pub fn for_project(api_key: String, emulator_host: Option<&str>) -> Self {
        match emulator_host {
            Some(host) => Self::new(api_key, format!("http://{host}/identitytoolkit.googleapis.com")),
            None => Self::new(api_key, IDENTITY_TOOLKIT_URL),
        }
    }

    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/v1/accounts:{action}", self.base_url);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| {
                warn!("Identity provider unreachable: {e}");
                AuthError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => Err(AuthError::Rejected(auth_code(&envelope.error.message))),
                Err(_) => {
                    warn!("Identity provider returned {status}: {body}");
                    Err(AuthError::Unexpected(format!("status {status}")))
                }
            };
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unexpected(e.to_string()))?;

        info!("Identity {action} succeeded for uid {}", body.local_id);
        Ok(Session {
            uid: body.local_id,
            email: body.email,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            signed_in_at: Utc::now(),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.password_call("signInWithPassword", email, password).await
    }
}

/// Maps a REST error message (`"WEAK_PASSWORD : Password should be ..."`) to the
/// `auth/*` code the web SDK would report.
fn auth_code(message: &str) -> String {
    let raw = message.split(':').next().unwrap_or_default().trim();
    let code = match raw {
        "EMAIL_EXISTS" => "email-already-in-use",
        "INVALID_EMAIL" => "invalid-email",
        "MISSING_EMAIL" => "missing-email",
        "WEAK_PASSWORD" => "weak-password",
        "MISSING_PASSWORD" => "missing-password",
        "EMAIL_NOT_FOUND" => "user-not-found",
        "INVALID_PASSWORD" => "wrong-password",
        "INVALID_LOGIN_CREDENTIALS" => "invalid-credential",
        "USER_DISABLED" => "user-disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "too-many-requests",
        "OPERATION_NOT_ALLOWED" => "operation-not-allowed",
        other => return format!("auth/{}", other.to_ascii_lowercase().replace('_', "-")),
    };
    format!("auth/{code}")
}
