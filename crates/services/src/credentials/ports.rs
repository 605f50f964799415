use crate::model_router::ProviderTag;
use async_trait::async_trait;
use config::SecretString;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

/// A user's own API key for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    pub user_id: String,
    pub provider: ProviderTag,
    pub api_key: SecretString,
    pub is_enabled: bool,
    /// Overrides the provider's configured endpoint when set
    pub base_url: Option<String>,
}

impl ProviderCredential {
    pub fn new(user_id: impl Into<String>, provider: ProviderTag, api_key: impl Into<SecretString>) -> Self {
        Self {
            user_id: user_id.into(),
            provider,
            api_key: api_key.into(),
            is_enabled: true,
            base_url: None,
        }
    }

    /// Only enabled credentials with a non-blank key take part in routing
    pub fn is_usable(&self) -> bool {
        self.is_enabled && !self.api_key.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("No credential for provider '{provider}'")]
    NotFound { provider: ProviderTag },
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for per-user provider credentials
///
/// At most one credential exists per `(user_id, provider)`.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(
        &self,
        user_id: &str,
        provider: ProviderTag,
    ) -> Result<Option<ProviderCredential>, CredentialStoreError>;

    async fn list(&self, user_id: &str) -> Result<Vec<ProviderCredential>, CredentialStoreError>;

    /// Insert or replace the credential for `(user_id, provider)`
    async fn upsert(
        &self,
        credential: ProviderCredential,
    ) -> Result<ProviderCredential, CredentialStoreError>;

    async fn set_enabled(
        &self,
        user_id: &str,
        provider: ProviderTag,
        enabled: bool,
    ) -> Result<ProviderCredential, CredentialStoreError>;

    /// Returns whether a credential was removed
    async fn delete(&self, user_id: &str, provider: ProviderTag)
        -> Result<bool, CredentialStoreError>;
}
