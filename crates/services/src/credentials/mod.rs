//! Credential resolution and settings
//!
//! Precedence for providers that need their own key:
//!
//! 1. the caller's stored credential, if enabled and non-empty
//! 2. the process-wide default from configuration
//! 3. otherwise `MissingCredential`
//!
//! Gateway-backed providers always use the gateway's configured key.

pub mod ports;
pub mod store;

pub use ports::{CredentialStore, CredentialStoreError, ProviderCredential};
pub use store::InMemoryCredentialStore;

use crate::model_router::ProviderTag;
use config::{ProvidersConfig, SecretString};
use inference_providers::CompletionError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    User,
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::User => f.write_str("user"),
            CredentialSource::Environment => f.write_str("environment"),
        }
    }
}

/// Key (and optional endpoint override) to call a provider with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub api_key: SecretString,
    pub base_url: Option<String>,
    pub source: CredentialSource,
}

pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    gateway_key: SecretString,
    google_default: Option<SecretString>,
    openrouter_default: Option<SecretString>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>, providers: &ProvidersConfig) -> Self {
        Self {
            store,
            gateway_key: providers.gateway.api_key.clone().unwrap_or_default(),
            google_default: providers.google.default_api_key.clone(),
            openrouter_default: providers.openrouter.default_api_key.clone(),
        }
    }

    fn environment_default(&self, provider: ProviderTag) -> Option<&SecretString> {
        match provider {
            ProviderTag::GoogleApi => self.google_default.as_ref(),
            ProviderTag::OpenRouter => self.openrouter_default.as_ref(),
            ProviderTag::Gateway | ProviderTag::ModelHub => Some(&self.gateway_key),
        }
        .filter(|key| !key.is_empty() || provider.uses_gateway())
    }

    /// Resolve the key to use for `provider` on behalf of `user_id`
    pub async fn resolve(
        &self,
        user_id: Option<&str>,
        provider: ProviderTag,
    ) -> Result<ResolvedCredential, CompletionError> {
        if provider.uses_gateway() {
            return Ok(ResolvedCredential {
                api_key: self.gateway_key.clone(),
                base_url: None,
                source: CredentialSource::Environment,
            });
        }

        if let Some(user_id) = user_id {
            match self.store.get(user_id, provider).await {
                Ok(Some(credential)) if credential.is_usable() => {
                    tracing::debug!(%provider, "Using caller's stored credential");
                    return Ok(ResolvedCredential {
                        api_key: credential.api_key,
                        base_url: credential.base_url,
                        source: CredentialSource::User,
                    });
                }
                Ok(Some(_)) => {
                    tracing::debug!(%provider, "Stored credential disabled or empty, using default");
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%provider, error = %e, "Credential lookup failed, using default");
                }
            }
        }

        match self.environment_default(provider) {
            Some(key) => Ok(ResolvedCredential {
                api_key: key.clone(),
                base_url: None,
                source: CredentialSource::Environment,
            }),
            None => {
                tracing::info!(%provider, "No credential available for provider");
                Err(CompletionError::MissingCredential {
                    provider: provider.to_string(),
                })
            }
        }
    }
}

/// Credential as shown to the owner: the key is never returned in full
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskedCredential {
    pub provider: ProviderTag,
    pub masked_key: String,
    pub is_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl From<&ProviderCredential> for MaskedCredential {
    fn from(credential: &ProviderCredential) -> Self {
        Self {
            provider: credential.provider,
            masked_key: credential.api_key.masked(),
            is_enabled: credential.is_enabled,
            base_url: credential.base_url.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialSettingsError {
    #[error("Provider '{0}' does not accept user keys")]
    ProviderNotConfigurable(ProviderTag),
    #[error("API key must not be empty")]
    EmptyKey,
    #[error(transparent)]
    Store(#[from] CredentialStoreError),
}

/// Settings operations over a credential store
pub struct CredentialSettings {
    store: Arc<dyn CredentialStore>,
}

impl CredentialSettings {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<MaskedCredential>, CredentialSettingsError> {
        let credentials = self.store.list(user_id).await?;
        Ok(credentials.iter().map(MaskedCredential::from).collect())
    }

    /// Save (insert or replace) a key; new keys start enabled unless told otherwise
    pub async fn save(
        &self,
        user_id: &str,
        provider: ProviderTag,
        api_key: SecretString,
        base_url: Option<String>,
        is_enabled: Option<bool>,
    ) -> Result<MaskedCredential, CredentialSettingsError> {
        if !provider.requires_user_key() {
            return Err(CredentialSettingsError::ProviderNotConfigurable(provider));
        }
        if api_key.is_empty() {
            return Err(CredentialSettingsError::EmptyKey);
        }

        let credential = ProviderCredential {
            user_id: user_id.to_string(),
            provider,
            api_key,
            is_enabled: is_enabled.unwrap_or(true),
            base_url: base_url.filter(|url| !url.trim().is_empty()),
        };
        let saved = self.store.upsert(credential).await?;
        tracing::info!(%provider, "Saved provider credential");
        Ok(MaskedCredential::from(&saved))
    }

    pub async fn set_enabled(
        &self,
        user_id: &str,
        provider: ProviderTag,
        enabled: bool,
    ) -> Result<MaskedCredential, CredentialSettingsError> {
        let updated = self.store.set_enabled(user_id, provider, enabled).await?;
        tracing::info!(%provider, enabled, "Toggled provider credential");
        Ok(MaskedCredential::from(&updated))
    }

    pub async fn delete(
        &self,
        user_id: &str,
        provider: ProviderTag,
    ) -> Result<bool, CredentialSettingsError> {
        let removed = self.store.delete(user_id, provider).await?;
        if removed {
            tracing::info!(%provider, "Deleted provider credential");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{GatewayConfig, GoogleConfig, OpenRouterConfig};
    use ports::MockCredentialStore;

    fn providers(google: Option<&str>, openrouter: Option<&str>) -> ProvidersConfig {
        ProvidersConfig {
            gateway: GatewayConfig {
                api_key: Some(SecretString::new("gw-key")),
                ..Default::default()
            },
            google: GoogleConfig {
                default_api_key: google.map(SecretString::new),
                ..Default::default()
            },
            openrouter: OpenRouterConfig {
                default_api_key: openrouter.map(SecretString::new),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn store_with(credential: ProviderCredential) -> Arc<dyn CredentialStore> {
        let store = InMemoryCredentialStore::new();
        store.upsert(credential).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_enabled_user_key_wins_over_environment() {
        let mut credential = ProviderCredential::new("u1", ProviderTag::OpenRouter, "sk-or-user");
        credential.base_url = Some("https://proxy.example/api/v1".to_string());
        let resolver = CredentialResolver::new(
            store_with(credential).await,
            &providers(None, Some("sk-or-env")),
        );

        let resolved = resolver
            .resolve(Some("u1"), ProviderTag::OpenRouter)
            .await
            .unwrap();
        assert_eq!(resolved.api_key.expose(), "sk-or-user");
        assert_eq!(resolved.source, CredentialSource::User);
        assert_eq!(
            resolved.base_url.as_deref(),
            Some("https://proxy.example/api/v1")
        );
    }

    #[tokio::test]
    async fn test_disabled_user_key_falls_back_to_environment() {
        let mut credential = ProviderCredential::new("u1", ProviderTag::GoogleApi, "AIza-user");
        credential.is_enabled = false;
        let resolver = CredentialResolver::new(
            store_with(credential).await,
            &providers(Some("AIza-env"), None),
        );

        let resolved = resolver
            .resolve(Some("u1"), ProviderTag::GoogleApi)
            .await
            .unwrap();
        assert_eq!(resolved.api_key.expose(), "AIza-env");
        assert_eq!(resolved.source, CredentialSource::Environment);
    }

    #[tokio::test]
    async fn test_blank_user_key_falls_back_to_environment() {
        let resolver = CredentialResolver::new(
            store_with(ProviderCredential::new("u1", ProviderTag::GoogleApi, "   ")).await,
            &providers(Some("AIza-env"), None),
        );

        let resolved = resolver
            .resolve(Some("u1"), ProviderTag::GoogleApi)
            .await
            .unwrap();
        assert_eq!(resolved.source, CredentialSource::Environment);
    }

    #[tokio::test]
    async fn test_anonymous_caller_uses_environment() {
        let resolver = CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            &providers(Some("AIza-env"), None),
        );

        let resolved = resolver.resolve(None, ProviderTag::GoogleApi).await.unwrap();
        assert_eq!(resolved.api_key.expose(), "AIza-env");
    }

    #[tokio::test]
    async fn test_no_key_anywhere_is_missing_credential() {
        let resolver = CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            &providers(None, Some("")),
        );

        for provider in [ProviderTag::GoogleApi, ProviderTag::OpenRouter] {
            let result = resolver.resolve(Some("u1"), provider).await;
            assert_eq!(
                result,
                Err(CompletionError::MissingCredential {
                    provider: provider.to_string(),
                })
            );
        }
    }

    #[tokio::test]
    async fn test_gateway_uses_its_own_key_without_store_lookup() {
        let mut store = MockCredentialStore::new();
        store.expect_get().never();
        let resolver = CredentialResolver::new(Arc::new(store), &providers(None, None));

        for provider in [ProviderTag::Gateway, ProviderTag::ModelHub] {
            let resolved = resolver.resolve(Some("u1"), provider).await.unwrap();
            assert_eq!(resolved.api_key.expose(), "gw-key");
        }
    }

    #[tokio::test]
    async fn test_gateway_without_key_is_not_an_error() {
        let resolver = CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            &ProvidersConfig::default(),
        );

        let resolved = resolver.resolve(None, ProviderTag::Gateway).await.unwrap();
        assert!(resolved.api_key.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_falls_back_to_environment() {
        let mut store = MockCredentialStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_, _| Err(CredentialStoreError::Unavailable("timeout".to_string())));
        let resolver = CredentialResolver::new(Arc::new(store), &providers(None, Some("sk-or-env")));

        let resolved = resolver
            .resolve(Some("u1"), ProviderTag::OpenRouter)
            .await
            .unwrap();
        assert_eq!(resolved.api_key.expose(), "sk-or-env");
        assert_eq!(resolved.source, CredentialSource::Environment);
    }

    #[tokio::test]
    async fn test_settings_masks_keys() {
        let settings = CredentialSettings::new(Arc::new(InMemoryCredentialStore::new()));

        let saved = settings
            .save(
                "u1",
                ProviderTag::OpenRouter,
                SecretString::new("sk-or-v1-abcdef123456"),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(saved.masked_key, "sk-or-v1...");
        assert!(saved.is_enabled);

        let listed = settings.list("u1").await.unwrap();
        assert_eq!(listed, vec![saved]);
        let json = serde_json::to_string(&listed).unwrap();
        assert!(!json.contains("abcdef123456"));
    }

    #[tokio::test]
    async fn test_settings_rejects_gateway_and_empty_keys() {
        let settings = CredentialSettings::new(Arc::new(InMemoryCredentialStore::new()));

        assert!(matches!(
            settings
                .save("u1", ProviderTag::Gateway, SecretString::new("k"), None, None)
                .await,
            Err(CredentialSettingsError::ProviderNotConfigurable(ProviderTag::Gateway))
        ));
        assert!(matches!(
            settings
                .save("u1", ProviderTag::GoogleApi, SecretString::new(" "), None, None)
                .await,
            Err(CredentialSettingsError::EmptyKey)
        ));
    }

    #[tokio::test]
    async fn test_settings_toggle_and_delete() {
        let settings = CredentialSettings::new(Arc::new(InMemoryCredentialStore::new()));
        settings
            .save("u1", ProviderTag::GoogleApi, SecretString::new("AIza-key"), None, Some(false))
            .await
            .unwrap();

        let toggled = settings
            .set_enabled("u1", ProviderTag::GoogleApi, true)
            .await
            .unwrap();
        assert!(toggled.is_enabled);

        assert!(settings.delete("u1", ProviderTag::GoogleApi).await.unwrap());
        assert!(settings.list("u1").await.unwrap().is_empty());
    }
}
