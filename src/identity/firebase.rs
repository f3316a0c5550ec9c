//! Firebase Identity Toolkit REST adapter

use super::{IdentityError, IdentityProvider, UserSession};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    base_url: String,
    session_tx: watch::Sender<Option<UserSession>>,
}

impl FirebaseIdentity {
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_tx,
        }
    }

    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<UserSession, IdentityError> {
        let url = format!("{}/v1/accounts:{action}", self.base_url);
        let body = PasswordRequest {
            email: email.trim(),
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if !status.is_success() {
            // Without the service's error body the failure is not about the
            // credentials (a proxy or gateway answered)
            let Ok(resp) = serde_json::from_str::<ErrorResponse>(&text) else {
                tracing::warn!(status = %status, action, "Identity service unavailable");
                return Err(IdentityError::Unavailable {
                    status: status.as_u16(),
                });
            };
            let err = IdentityError::rejected(&resp.error.message);
            if let IdentityError::Rejected { code, .. } = &err {
                tracing::info!(code = %code, action, "Identity service refused request");
            }
            return Err(err);
        }

        let auth: AuthResponse =
            serde_json::from_str(&text).map_err(|e| IdentityError::Malformed(e.to_string()))?;
        let expires_in: i64 = auth
            .expires_in
            .parse()
            .map_err(|_| IdentityError::Malformed(format!("expiresIn = {}", auth.expires_in)))?;

        let session = UserSession {
            uid: auth.local_id,
            email: auth.email,
            id_token: auth.id_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        };

        tracing::info!(uid = %session.uid, action, "Signed in");
        self.session_tx.send_replace(Some(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, IdentityError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    async fn register(&self, email: &str, password: &str) -> Result<UserSession, IdentityError> {
        self.password_call("signUp", email, password).await
    }

    /// Sessions are client-side tokens; signing out forgets them.
    async fn sign_out(&self) -> Result<(), IdentityError> {
        if let Some(session) = self.session_tx.send_replace(None) {
            tracing::info!(uid = %session.uid, "Signed out");
        }
        Ok(())
    }

    fn current_user(&self) -> watch::Receiver<Option<UserSession>> {
        self.session_tx.subscribe()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    id_token: String,
    #[serde(default)]
    email: String,
    #[serde(default = "default_expires_in")]
    expires_in: String,
    local_id: String,
}

fn default_expires_in() -> String {
    "3600".to_string()
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
