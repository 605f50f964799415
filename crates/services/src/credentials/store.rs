use super::ports::{CredentialStore, CredentialStoreError, ProviderCredential};
use crate::model_router::ProviderTag;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local credential store
///
/// Backs the settings routes when no external store is wired in. Reads
/// vastly outnumber writes, so a read-write lock guards the map.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<(String, ProviderTag), ProviderCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(
        &self,
        user_id: &str,
        provider: ProviderTag,
    ) -> Result<Option<ProviderCredential>, CredentialStoreError> {
        let credentials = self.credentials.read().await;
        Ok(credentials.get(&(user_id.to_string(), provider)).cloned())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<ProviderCredential>, CredentialStoreError> {
        let credentials = self.credentials.read().await;
        let mut owned: Vec<ProviderCredential> = credentials
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|c| c.provider.as_str());
        Ok(owned)
    }

    async fn upsert(
        &self,
        credential: ProviderCredential,
    ) -> Result<ProviderCredential, CredentialStoreError> {
        let mut credentials = self.credentials.write().await;
        credentials.insert(
            (credential.user_id.clone(), credential.provider),
            credential.clone(),
        );
        Ok(credential)
    }

    async fn set_enabled(
        &self,
        user_id: &str,
        provider: ProviderTag,
        enabled: bool,
    ) -> Result<ProviderCredential, CredentialStoreError> {
        let mut credentials = self.credentials.write().await;
        let credential = credentials
            .get_mut(&(user_id.to_string(), provider))
            .ok_or(CredentialStoreError::NotFound { provider })?;
        credential.is_enabled = enabled;
        Ok(credential.clone())
    }

    async fn delete(
        &self,
        user_id: &str,
        provider: ProviderTag,
    ) -> Result<bool, CredentialStoreError> {
        let mut credentials = self.credentials.write().await;
        Ok(credentials.remove(&(user_id.to_string(), provider)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let store = InMemoryCredentialStore::new();
        store
            .upsert(ProviderCredential::new("u1", ProviderTag::OpenRouter, "sk-or-old"))
            .await
            .unwrap();
        store
            .upsert(ProviderCredential::new("u1", ProviderTag::OpenRouter, "sk-or-new"))
            .await
            .unwrap();

        let all = store.list("u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].api_key.expose(), "sk-or-new");
    }

    #[tokio::test]
    async fn test_credentials_are_scoped_per_user() {
        let store = InMemoryCredentialStore::new();
        store
            .upsert(ProviderCredential::new("u1", ProviderTag::GoogleApi, "AIza-1"))
            .await
            .unwrap();

        assert!(store
            .get("u2", ProviderTag::GoogleApi)
            .await
            .unwrap()
            .is_none());
        assert!(store.list("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_provider() {
        let store = InMemoryCredentialStore::new();
        store
            .upsert(ProviderCredential::new("u1", ProviderTag::OpenRouter, "b"))
            .await
            .unwrap();
        store
            .upsert(ProviderCredential::new("u1", ProviderTag::GoogleApi, "a"))
            .await
            .unwrap();

        let providers: Vec<_> = store
            .list("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.provider)
            .collect();
        assert_eq!(providers, vec![ProviderTag::GoogleApi, ProviderTag::OpenRouter]);
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let store = InMemoryCredentialStore::new();
        store
            .upsert(ProviderCredential::new("u1", ProviderTag::OpenRouter, "k"))
            .await
            .unwrap();

        let toggled = store
            .set_enabled("u1", ProviderTag::OpenRouter, false)
            .await
            .unwrap();
        assert!(!toggled.is_enabled);
        assert!(!toggled.is_usable());

        assert!(store.delete("u1", ProviderTag::OpenRouter).await.unwrap());
        assert!(!store.delete("u1", ProviderTag::OpenRouter).await.unwrap());
        assert!(matches!(
            store.set_enabled("u1", ProviderTag::OpenRouter, true).await,
            Err(CredentialStoreError::NotFound { .. })
        ));
    }
}
