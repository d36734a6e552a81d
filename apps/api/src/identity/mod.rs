//! Identity/Session client.
//!
//! `IdentityProvider` is the narrow seam to the external identity service;
//! `SessionClient` owns the current-session value for one browser and pushes
//! changes to subscribers.

pub mod firebase;
pub mod session;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Session;

pub use firebase::FirebaseIdentity;
pub use session::{SessionClient, SessionState, Subscription};

/// Authentication failures, rendered the way the provider's web SDK words them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The provider refused the request; carries an `auth/*` code.
    #[error("Firebase: Error ({0}).")]
    Rejected(String),

    #[error("Firebase: Error (auth/network-request-failed).")]
    Network(String),

    #[error("Firebase: Error (auth/internal-error).")]
    Unexpected(String),
}

impl AuthError {
    pub fn code(&self) -> &str {
        match self {
            AuthError::Rejected(code) => code,
            AuthError::Network(_) => "auth/network-request-failed",
            AuthError::Unexpected(_) => "auth/internal-error",
        }
    }

    /// Provider-side cause, for logs only.
    pub fn detail(&self) -> &str {
        match self {
            AuthError::Rejected(code) => code,
            AuthError::Network(detail) | AuthError::Unexpected(detail) => detail,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
}
