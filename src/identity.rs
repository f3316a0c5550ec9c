//! Identity collaborator
//!
//! Email/password accounts behind a trait, with the signed-in user exposed as
//! an observable value.

mod firebase;

pub use firebase::FirebaseIdentity;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub uid: String,
    pub email: String,
    /// Bearer token for the document store
    pub id_token: String,
    pub expires_at: DateTime<Utc>,
}

impl UserSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The service refused the request (bad password, duplicate email, ...)
    #[error("{message}")]
    Rejected { code: String, message: String },
    /// Non-2xx reply without the service's error body
    #[error("The identity service is unavailable (HTTP {status}). Try again later.")]
    Unavailable { status: u16 },
    #[error("Could not reach the identity service: {0}")]
    Transport(String),
    #[error("Unexpected identity service response: {0}")]
    Malformed(String),
}

impl IdentityError {
    /// Map a service error code (`"WEAK_PASSWORD : Password should be ..."`)
    /// to a user-facing message.
    pub fn rejected(raw: &str) -> Self {
        let code = raw.split(" : ").next().unwrap_or(raw).trim().to_string();
        let message = match code.as_str() {
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                "Invalid email or password.".to_string()
            }
            "EMAIL_EXISTS" => "This email is already registered.".to_string(),
            "INVALID_EMAIL" => "The email address is badly formatted.".to_string(),
            "MISSING_PASSWORD" => "Enter a password.".to_string(),
            "WEAK_PASSWORD" => "Password should be at least 6 characters.".to_string(),
            "USER_DISABLED" => "This account has been disabled.".to_string(),
            "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Try again later.".to_string(),
            _ => raw.to_string(),
        };
        IdentityError::Rejected { code, message }
    }
}

/// Account operations consumed by the login and profile views
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, IdentityError>;

    /// Create an account and sign it in
    async fn register(&self, email: &str, password: &str) -> Result<UserSession, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Observable current user; `None` when signed out
    fn current_user(&self) -> watch::Receiver<Option<UserSession>>;
}
