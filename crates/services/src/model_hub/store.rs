use super::ports::{ModelHubEntry, ModelHubStatus, ModelHubStore, ModelHubStoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local ModelHub store
#[derive(Default)]
pub struct InMemoryModelHubStore {
    entries: RwLock<HashMap<Uuid, ModelHubEntry>>,
}

impl InMemoryModelHubStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelHubStore for InMemoryModelHubStore {
    async fn list(&self, user_id: &str) -> Result<Vec<ModelHubEntry>, ModelHubStoreError> {
        let entries = self.entries.read().await;
        let mut owned: Vec<ModelHubEntry> = entries
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn insert(&self, entry: ModelHubEntry) -> Result<ModelHubEntry, ModelHubStoreError> {
        let mut entries = self.entries.write().await;
        let duplicate = entries
            .values()
            .any(|e| e.user_id == entry.user_id && e.model_id == entry.model_id);
        if duplicate {
            return Err(ModelHubStoreError::Duplicate {
                model_id: entry.model_id,
            });
        }
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn set_status(
        &self,
        user_id: &str,
        id: Uuid,
        status: ModelHubStatus,
    ) -> Result<ModelHubEntry, ModelHubStoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .filter(|e| e.user_id == user_id)
            .ok_or(ModelHubStoreError::NotFound { id })?;
        entry.status = status;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, ModelHubStoreError> {
        let mut entries = self.entries.write().await;
        let owned = entries.get(&id).is_some_and(|e| e.user_id == user_id);
        Ok(owned && entries.remove(&id).is_some())
    }
}
