//! Firestore REST adapter for the trail collection

use super::{Trail, TrailStore, TrailStoreError, COLLECTION};
use crate::identity::UserSession;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::watch;

pub struct FirestoreTrailStore {
    client: Client,
    base_url: String,
    project_id: String,
    session: watch::Receiver<Option<UserSession>>,
}

impl FirestoreTrailStore {
    /// Requests carry the current user's token when someone is signed in.
    pub fn new(
        base_url: &str,
        project_id: impl Into<String>,
        session: watch::Receiver<Option<UserSession>>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            session,
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{COLLECTION}",
            self.base_url, self.project_id
        )
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<ListResponse, TrailStoreError> {
        let mut request = self.client.get(self.collection_url());
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        let bearer = self.session.borrow().as_ref().map(|s| {
            if s.is_expired() {
                tracing::warn!(uid = %s.uid, "ID token expired; the store may refuse the request");
            }
            s.id_token.clone()
        });
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TrailStoreError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TrailStoreError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|r| r.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TrailStoreError::Service {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| TrailStoreError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TrailStore for FirestoreTrailStore {
    async fn list_trails(&self) -> Result<Vec<Trail>, TrailStoreError> {
        let mut trails = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(page_token.as_deref()).await?;
            trails.extend(page.documents.into_iter().map(Document::into_trail));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(count = trails.len(), "Loaded trails");
        Ok(trails)
    }
}

// Firestore wire schema

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

/// Typed field value; only the variants trails use are decoded.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Value {
    string_value: Option<String>,
    /// int64 travels as a decimal string
    integer_value: Option<String>,
    double_value: Option<f64>,
}

impl Value {
    fn as_number(&self) -> Option<f64> {
        self.double_value
            .or_else(|| self.integer_value.as_deref()?.parse::<f64>().ok())
    }
}

impl Document {
    fn into_trail(self) -> Trail {
        let text = |key: &str| {
            self.fields
                .get(key)
                .and_then(|v| v.string_value.clone())
                .unwrap_or_default()
        };
        let progress = self
            .fields
            .get("progresso")
            .and_then(Value::as_number)
            .map_or(0, Trail::clamp_progress);

        Trail {
            id: self.name.rsplit('/').next().unwrap_or_default().to_string(),
            title: text("titulo"),
            description: text("descricao"),
            progress,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
