//! Application wiring
//!
//! One `App` owns every collaborator handle for the lifetime of the process.

use crate::config::{AppConfig, ConfigError};
use crate::identity::{FirebaseIdentity, IdentityProvider};
use crate::llm::gemini::{self, GeminiService};
use crate::llm::{LlmService, LoggingService};
use crate::runtime::{self, ChatHandle, Notifier, ServiceLlmClient};
use crate::state_machine::ChatContext;
use crate::trails::{FirestoreTrailStore, TrailStore};
use std::sync::Arc;

pub struct App {
    identity: Arc<dyn IdentityProvider>,
    trails: Arc<dyn TrailStore>,
    llm: Arc<dyn LlmService>,
    chat_context: ChatContext,
}

impl App {
    /// Build the production collaborators. Missing identity or document-store
    /// settings fail here; a missing inference key only fails at submit time.
    pub fn init(config: &AppConfig) -> Result<Self, ConfigError> {
        let firebase_key = config.firebase.require_api_key()?;
        let project_id = config.firebase.require_project_id()?;

        let identity = Arc::new(FirebaseIdentity::new(
            firebase_key,
            &config.firebase.auth_url,
        ));
        let trails = Arc::new(FirestoreTrailStore::new(
            &config.firebase.firestore_url,
            project_id,
            identity.current_user(),
        ));

        let api_key = config.gemini.api_key.clone().unwrap_or_default();
        let credential_check = gemini::validate_api_key(&api_key);
        match &credential_check {
            Ok(()) => tracing::info!(model = %config.gemini.model, "Inference configured"),
            Err(e) => {
                tracing::warn!(error = %e, "Inference key unusable; chat submits will be refused");
            }
        }

        let service: Arc<dyn LlmService> = Arc::new(GeminiService::new(
            api_key,
            config.gemini.model.clone(),
            &config.gemini.base_url,
        ));

        Ok(Self::from_parts(
            identity,
            trails,
            Arc::new(LoggingService::new(service)),
            ChatContext::new(credential_check, config.gemini.persona_delivery),
        ))
    }

    pub fn from_parts(
        identity: Arc<dyn IdentityProvider>,
        trails: Arc<dyn TrailStore>,
        llm: Arc<dyn LlmService>,
        chat_context: ChatContext,
    ) -> Self {
        Self {
            identity,
            trails,
            llm,
            chat_context,
        }
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    pub fn trails(&self) -> &dyn TrailStore {
        self.trails.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.current_user().borrow().is_some()
    }

    /// Mount a fresh chat view. The conversation lives until the handle is
    /// dropped.
    pub fn mount_chat<N: Notifier + 'static>(&self, notifier: N) -> ChatHandle {
        runtime::mount(
            self.chat_context.clone(),
            ServiceLlmClient::new(self.llm.clone()),
            notifier,
        )
    }

    /// Tear down: sign out whoever is signed in.
    pub async fn shutdown(self) {
        if let Err(e) = self.identity.sign_out().await {
            tracing::warn!(error = %e, "Sign-out during shutdown failed");
        }
        tracing::info!("Shut down");
    }
}
