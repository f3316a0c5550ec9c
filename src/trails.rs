//! Learning trails
//!
//! Read-only access to the trail documents shown in the Trails tab.

mod firestore;

pub use firestore::FirestoreTrailStore;

use async_trait::async_trait;
use thiserror::Error;

/// Name of the remote collection holding trail documents
pub const COLLECTION: &str = "trilhas";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trail {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Completion percentage, 0..=100
    pub progress: u8,
}

impl Trail {
    /// Clamp any numeric progress value into 0..=100.
    pub fn clamp_progress(value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        // Range checked above the cast
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = value.clamp(0.0, 100.0).round() as u8;
        pct
    }
}

#[derive(Debug, Error)]
pub enum TrailStoreError {
    #[error("Could not reach the document store: {0}")]
    Transport(String),
    #[error("Document store refused the request ({status}): {message}")]
    Service { status: u16, message: String },
    #[error("Unexpected document store response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait TrailStore: Send + Sync {
    /// Every trail in the collection, in store order
    async fn list_trails(&self) -> Result<Vec<Trail>, TrailStoreError>;
}
