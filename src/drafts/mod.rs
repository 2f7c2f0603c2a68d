//! Draft persistence collaborators
//!
//! The wizard never persists anything itself. Saving a draft and publishing
//! a listing go through a [`DraftStore`], which the host implements against
//! its backend. [`FileDraftStore`] keeps drafts as JSON files for the CLI.

mod file_store;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::form::FormData;
use crate::wizard::WizardKind;

pub use file_store::FileDraftStore;

/// Errors raised by draft collaborators
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("draft '{0}' not found")]
    NotFound(String),

    /// Failure reported by the backend; the message is shown to the user as-is
    #[error("{0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid draft data: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the wizard hands a store when saving or publishing
#[derive(Debug, Clone)]
pub struct DraftRequest {
    /// Existing draft to overwrite, if the session has saved before
    pub id: Option<String>,
    pub kind: WizardKind,
    pub step: u8,
    pub form_data: Arc<FormData>,
}

/// A persisted, possibly incomplete listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub kind: WizardKind,
    pub step: u8,
    pub form_data: FormData,
    /// sha256 of the canonical form data
    pub content_hash: String,
    #[serde(default)]
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Draft {
    pub fn summary(&self) -> DraftSummary {
        DraftSummary {
            id: self.id.clone(),
            kind: self.kind,
            title: self.form_data.text("title").to_string(),
            step: self.step,
            published: self.published,
            updated_at: self.updated_at,
        }
    }
}

/// Listing row for draft pickers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSummary {
    pub id: String,
    pub kind: WizardKind,
    pub title: String,
    pub step: u8,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}

/// Backend that persists drafts and publishes listings
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Persist the draft, returning its id
    async fn save_draft(&self, request: DraftRequest) -> Result<String, DraftError>;

    /// Publish the listing
    async fn complete(&self, request: DraftRequest) -> Result<(), DraftError>;

    async fn load(&self, id: &str) -> Result<Draft, DraftError>;

    /// Drafts ordered by most recently updated first
    async fn list(&self) -> Result<Vec<DraftSummary>, DraftError>;
}

/// Hex sha256 of form data with object keys sorted at every level
pub fn content_hash(data: &FormData) -> String {
    let canonical = canonicalize(&data.clone().into_value());
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_hash_ignores_key_order() {
        let a = FormData::new()
            .with("title", "Casa")
            .with("address", json!({"city": "Moca", "street": "Calle 2"}));
        let b = FormData::new()
            .with("address", json!({"street": "Calle 2", "city": "Moca"}))
            .with("title", "Casa");

        assert_eq!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 64);
    }

    #[test]
    fn test_content_hash_changes_with_values() {
        let a = FormData::new().with("price", 1);
        let b = FormData::new().with("price", 2);
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_rejected_error_is_verbatim() {
        let err = DraftError::Rejected("Listing quota exceeded".to_string());
        assert_eq!(err.to_string(), "Listing quota exceeded");
    }
}
