//! Provider adapter registry
//!
//! Maps each [`ProviderTag`] to the backend that serves it plus the
//! process-level endpoint settings for that backend. Built once at startup.

use super::identifier::ProviderTag;
use crate::credentials::ResolvedCredential;
use config::ProvidersConfig;
use inference_providers::{
    BackendConfig, GeminiBackend, OpenAiCompatibleBackend, OpenRouterBackend, ProviderBackend,
    EXTRA_APP_TITLE, EXTRA_HTTP_REFERER,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Backend plus the endpoint settings it is called with
#[derive(Clone)]
pub struct ProviderBinding {
    pub backend: Arc<dyn ProviderBackend>,
    pub base_url: String,
    pub extra: HashMap<String, String>,
}

pub struct ProviderRegistry {
    bindings: HashMap<ProviderTag, ProviderBinding>,
    timeout_seconds: i64,
}

impl ProviderRegistry {
    pub fn from_config(providers: &ProvidersConfig) -> Self {
        // ModelHub is not a transport of its own: it shares the gateway instance
        let gateway: Arc<dyn ProviderBackend> = Arc::new(OpenAiCompatibleBackend::gateway());
        let gateway_binding = ProviderBinding {
            backend: gateway,
            base_url: providers.gateway.base_url.clone(),
            extra: HashMap::new(),
        };

        let mut bindings = HashMap::new();
        bindings.insert(ProviderTag::Gateway, gateway_binding.clone());
        bindings.insert(ProviderTag::ModelHub, gateway_binding);
        bindings.insert(
            ProviderTag::GoogleApi,
            ProviderBinding {
                backend: Arc::new(GeminiBackend::new()),
                base_url: providers.google.base_url.clone(),
                extra: HashMap::new(),
            },
        );
        bindings.insert(
            ProviderTag::OpenRouter,
            ProviderBinding {
                backend: Arc::new(OpenRouterBackend::new()),
                base_url: providers.openrouter.base_url.clone(),
                extra: HashMap::from([
                    (
                        EXTRA_HTTP_REFERER.to_string(),
                        providers.openrouter.app_url.clone(),
                    ),
                    (
                        EXTRA_APP_TITLE.to_string(),
                        providers.openrouter.app_title.clone(),
                    ),
                ]),
            },
        );

        Self {
            bindings,
            timeout_seconds: providers.timeout_seconds,
        }
    }

    /// Swap the backend for `tag`, keeping its endpoint settings.
    ///
    /// Overriding the gateway also rebinds ModelHub, which shares it.
    pub fn with_override(mut self, tag: ProviderTag, backend: Arc<dyn ProviderBackend>) -> Self {
        for (bound, binding) in self.bindings.iter_mut() {
            let shares_gateway = tag == ProviderTag::Gateway && bound.uses_gateway();
            if *bound == tag || shares_gateway {
                binding.backend = backend.clone();
            }
        }
        self
    }

    pub fn get(&self, tag: ProviderTag) -> Option<&ProviderBinding> {
        self.bindings.get(&tag)
    }

    /// Per-call backend settings for a binding and a resolved credential
    pub fn backend_config(
        &self,
        binding: &ProviderBinding,
        credential: &ResolvedCredential,
    ) -> BackendConfig {
        BackendConfig {
            base_url: credential
                .base_url
                .clone()
                .unwrap_or_else(|| binding.base_url.clone()),
            api_key: credential.api_key.expose().to_string(),
            timeout_seconds: self.timeout_seconds,
            extra: binding.extra.clone(),
        }
    }
}
