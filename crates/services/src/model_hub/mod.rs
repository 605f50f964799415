//! Per-user ModelHub
//!
//! Users add hosted open models by repository id. An entry starts out
//! `downloading` and is offered for chat as `modelhub/<model_id>` once it is
//! `ready`; routing then sends it through the gateway like any other
//! `modelhub/` identifier.

pub mod ports;
pub mod store;

pub use ports::{ModelHubEntry, ModelHubStatus, ModelHubStore, ModelHubStoreError};
pub use store::InMemoryModelHubStore;

use std::sync::Arc;
use uuid::Uuid;

const MODELHUB_PREFIX: &str = "modelhub/";

/// Fields supplied when adding a model to the hub
#[derive(Debug, Clone, Default)]
pub struct NewModelHubEntry {
    pub model_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelHubError {
    #[error("Invalid model id '{0}': expected '<org>/<model>'")]
    InvalidModelId(String),
    #[error(transparent)]
    Store(#[from] ModelHubStoreError),
}

/// Normalize a repository id; a leading `modelhub/` is accepted and dropped
fn normalize_model_id(raw: &str) -> Result<String, ModelHubError> {
    let trimmed = raw.trim();
    let model_id = trimmed.strip_prefix(MODELHUB_PREFIX).unwrap_or(trimmed);

    let valid = model_id
        .split('/')
        .all(|part| !part.is_empty() && part != "." && part != "..")
        && !model_id.contains(|c: char| c.is_whitespace() || matches!(c, '?' | '#' | '%'));
    if !valid {
        return Err(ModelHubError::InvalidModelId(raw.to_string()));
    }
    Ok(model_id.to_string())
}

/// ModelHub operations over a store
pub struct ModelHub {
    store: Arc<dyn ModelHubStore>,
}

impl ModelHub {
    pub fn new(store: Arc<dyn ModelHubStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<ModelHubEntry>, ModelHubError> {
        Ok(self.store.list(user_id).await?)
    }

    /// Entries the user can chat with right now
    pub async fn ready_models(&self, user_id: &str) -> Result<Vec<ModelHubEntry>, ModelHubError> {
        let mut entries = self.store.list(user_id).await?;
        entries.retain(ModelHubEntry::is_ready);
        Ok(entries)
    }

    pub async fn add(
        &self,
        user_id: &str,
        request: NewModelHubEntry,
    ) -> Result<ModelHubEntry, ModelHubError> {
        let model_id = normalize_model_id(&request.model_id)?;
        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| model_id.rsplit('/').next().unwrap_or(&model_id).to_string());

        let mut entry = ModelHubEntry::new(user_id, model_id, name);
        entry.description = request.description.filter(|d| !d.trim().is_empty());
        entry.tags = request.tags;

        let saved = self.store.insert(entry).await?;
        tracing::info!(model_id = %saved.model_id, id = %saved.id, "Added ModelHub entry");
        Ok(saved)
    }

    pub async fn set_status(
        &self,
        user_id: &str,
        id: Uuid,
        status: ModelHubStatus,
    ) -> Result<ModelHubEntry, ModelHubError> {
        let updated = self.store.set_status(user_id, id, status).await?;
        tracing::info!(model_id = %updated.model_id, %status, "ModelHub entry status changed");
        Ok(updated)
    }

    pub async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, ModelHubError> {
        let removed = self.store.delete(user_id, id).await?;
        if removed {
            tracing::info!(%id, "Deleted ModelHub entry");
        }
        Ok(removed)
    }
}
