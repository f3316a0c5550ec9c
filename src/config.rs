//! Environment configuration

use crate::llm::gemini;
use crate::state_machine::PersonaDelivery;
use thiserror::Error;

pub const DEFAULT_FIREBASE_AUTH_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} has an unsupported value: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Inference settings
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Checked lazily, at submit time
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub persona_delivery: PersonaDelivery,
}

/// Identity and document-store settings
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub auth_url: String,
    pub firestore_url: String,
}

impl FirebaseConfig {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::Missing("FIREBASE_API_KEY"))
    }

    pub fn require_project_id(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .ok_or(ConfigError::Missing("FIREBASE_PROJECT_ID"))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub firebase: FirebaseConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let persona_delivery = match get("GEMINI_PERSONA_DELIVERY") {
            None => PersonaDelivery::default(),
            Some(value) => PersonaDelivery::parse(&value).ok_or(ConfigError::Invalid {
                var: "GEMINI_PERSONA_DELIVERY",
                value,
            })?,
        };

        Ok(Self {
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY").or_else(|| get("EXPO_PUBLIC_GEMINI_API_KEY")),
                model: get("GEMINI_MODEL").unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),
                persona_delivery,
            },
            firebase: FirebaseConfig {
                api_key: get("FIREBASE_API_KEY"),
                project_id: get("FIREBASE_PROJECT_ID"),
                auth_url: get("FIREBASE_AUTH_URL")
                    .unwrap_or_else(|| DEFAULT_FIREBASE_AUTH_URL.to_string()),
                firestore_url: get("FIRESTORE_URL")
                    .unwrap_or_else(|| DEFAULT_FIRESTORE_URL.to_string()),
            },
        })
    }
}
