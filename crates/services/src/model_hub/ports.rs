use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

/// Lifecycle of a ModelHub entry; only `Ready` entries are offered for chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelHubStatus {
    Downloading,
    Ready,
    Error,
}

impl ModelHubStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelHubStatus::Downloading => "downloading",
            ModelHubStatus::Ready => "ready",
            ModelHubStatus::Error => "error",
        }
    }
}

impl FromStr for ModelHubStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "downloading" => Ok(ModelHubStatus::Downloading),
            "ready" => Ok(ModelHubStatus::Ready),
            "error" => Ok(ModelHubStatus::Error),
            other => Err(format!(
                "Unknown status '{other}': expected downloading, ready or error"
            )),
        }
    }
}

impl fmt::Display for ModelHubStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hosted open model a user has added to their hub
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHubEntry {
    pub id: Uuid,
    pub user_id: String,
    /// Upstream repository id, e.g. `acme/chat-7b`
    pub model_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Where the weights come from, e.g. `huggingface`
    pub source: String,
    pub tags: Vec<String>,
    pub status: ModelHubStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModelHubEntry {
    /// New entry in the `Downloading` state
    pub fn new(
        user_id: impl Into<String>,
        model_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            model_id: model_id.into(),
            name: name.into(),
            description: None,
            source: "huggingface".to_string(),
            tags: Vec::new(),
            status: ModelHubStatus::Downloading,
            created_at: now,
            updated_at: now,
        }
    }

    /// Identifier to stream this model with
    pub fn routing_id(&self) -> String {
        format!("modelhub/{}", self.model_id)
    }

    pub fn is_ready(&self) -> bool {
        self.status == ModelHubStatus::Ready
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelHubStoreError {
    #[error("No ModelHub entry with id '{id}'")]
    NotFound { id: Uuid },
    #[error("Model '{model_id}' is already in the hub")]
    Duplicate { model_id: String },
    #[error("ModelHub store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for per-user ModelHub entries
///
/// A user holds at most one entry per `model_id`. Every operation is scoped
/// to the owning user; another user's entry id behaves as missing.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait ModelHubStore: Send + Sync {
    /// The user's entries, newest first
    async fn list(&self, user_id: &str) -> Result<Vec<ModelHubEntry>, ModelHubStoreError>;

    async fn insert(&self, entry: ModelHubEntry) -> Result<ModelHubEntry, ModelHubStoreError>;

    async fn set_status(
        &self,
        user_id: &str,
        id: Uuid,
        status: ModelHubStatus,
    ) -> Result<ModelHubEntry, ModelHubStoreError>;

    /// Returns whether an entry was removed
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, ModelHubStoreError>;
}
