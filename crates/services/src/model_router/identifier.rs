//! Model identifier resolution
//!
//! A model identifier is `<prefix>/<rest>` where the prefix names the
//! provider. Resolution is total: anything without a recognized prefix goes
//! to the gateway with the identifier unchanged.

use inference_providers::CompletionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Suffix marking a reasoning variant of a gateway model
pub const REASONING_SUFFIX: &str = "-thinking";
/// Substring marking a reasoning model on any provider
pub const REASONING_MARKER: &str = "reasoning";
/// Gateway namespace that `modelhub/` identifiers are rewritten into
pub const MODELHUB_NAMESPACE: &str = "huggingface";

const PREFIX_DELIMITER: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderTag {
    #[serde(rename = "gateway")]
    Gateway,
    #[serde(rename = "google-api")]
    GoogleApi,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "modelhub")]
    ModelHub,
}

impl ProviderTag {
    pub const ALL: [ProviderTag; 4] = [
        ProviderTag::Gateway,
        ProviderTag::GoogleApi,
        ProviderTag::OpenRouter,
        ProviderTag::ModelHub,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::Gateway => "gateway",
            ProviderTag::GoogleApi => "google-api",
            ProviderTag::OpenRouter => "openrouter",
            ProviderTag::ModelHub => "modelhub",
        }
    }

    /// Providers that need a user or default key of their own
    pub fn requires_user_key(&self) -> bool {
        matches!(self, ProviderTag::GoogleApi | ProviderTag::OpenRouter)
    }

    /// Providers served by the gateway backend and its credential
    pub fn uses_gateway(&self) -> bool {
        matches!(self, ProviderTag::Gateway | ProviderTag::ModelHub)
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderTag {
    type Err = CompletionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| CompletionError::UnsupportedProvider(s.to_string()))
    }
}

/// Outcome of resolving a model identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModel {
    pub provider: ProviderTag,
    /// Model name as the upstream expects it
    pub upstream_model: String,
    /// Output should be run through reasoning extraction
    pub is_reasoning: bool,
}

pub fn is_reasoning_model(model: &str) -> bool {
    model.ends_with(REASONING_SUFFIX) || model.contains(REASONING_MARKER)
}

/// Decompose a model identifier into provider, upstream name and reasoning flag
pub fn resolve(identifier: &str) -> ResolvedModel {
    let (provider, upstream_model) = match identifier.split_once(PREFIX_DELIMITER) {
        Some(("google-api", rest)) => (ProviderTag::GoogleApi, rest.to_string()),
        Some(("openrouter", rest)) => (ProviderTag::OpenRouter, rest.to_string()),
        // An empty remainder is left empty so the router rejects it
        Some(("modelhub", "")) => (ProviderTag::ModelHub, String::new()),
        Some(("modelhub", rest)) => (
            ProviderTag::ModelHub,
            format!("{MODELHUB_NAMESPACE}{PREFIX_DELIMITER}{rest}"),
        ),
        _ => (ProviderTag::Gateway, identifier.to_string()),
    };

    let is_reasoning = is_reasoning_model(&upstream_model);
    let upstream_model = if is_reasoning && provider.uses_gateway() {
        upstream_model
            .strip_suffix(REASONING_SUFFIX)
            .map(str::to_string)
            .unwrap_or(upstream_model)
    } else {
        upstream_model
    };

    ResolvedModel {
        provider,
        upstream_model,
        is_reasoning,
    }
}
