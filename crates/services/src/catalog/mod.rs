//! Curated chat model catalog
//!
//! Display data only. Routing accepts any identifier, listed here or not.

use crate::model_router::ProviderTag;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_CHAT_MODEL: &str = "google-api/gemini-1.5-pro";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatModel {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub provider: ProviderTag,
}

const fn model(
    id: &'static str,
    name: &'static str,
    provider: ProviderTag,
    description: &'static str,
) -> ChatModel {
    ChatModel {
        id,
        name,
        description,
        provider,
    }
}

pub const CHAT_MODELS: &[ChatModel] = &[
    model(
        "google-api/gemini-1.5-pro",
        "Gemini 1.5 Pro",
        ProviderTag::GoogleApi,
        "Google's most capable model - Direct API",
    ),
    model(
        "google-api/gemini-1.5-flash",
        "Gemini 1.5 Flash",
        ProviderTag::GoogleApi,
        "Fast and efficient Google model - Direct API",
    ),
    model(
        "google-api/gemini-pro",
        "Gemini Pro",
        ProviderTag::GoogleApi,
        "Google Gemini Pro - Direct API",
    ),
    model(
        "google-api/gemini-1.5-flash-8b",
        "Gemini 1.5 Flash 8B",
        ProviderTag::GoogleApi,
        "Lightweight and fast - Direct API",
    ),
    model(
        "openrouter/anthropic/claude-3.5-sonnet",
        "Claude 3.5 Sonnet",
        ProviderTag::OpenRouter,
        "Anthropic's balanced model via OpenRouter",
    ),
    model(
        "openrouter/anthropic/claude-3-opus",
        "Claude 3 Opus",
        ProviderTag::OpenRouter,
        "Anthropic's most capable model via OpenRouter",
    ),
    model(
        "openrouter/anthropic/claude-3-haiku",
        "Claude 3 Haiku",
        ProviderTag::OpenRouter,
        "Anthropic's fastest model via OpenRouter",
    ),
    model(
        "openrouter/google/gemini-pro-1.5",
        "Gemini Pro 1.5",
        ProviderTag::OpenRouter,
        "Google Gemini via OpenRouter",
    ),
    model(
        "openrouter/google/gemini-flash-1.5",
        "Gemini Flash 1.5",
        ProviderTag::OpenRouter,
        "Fast Google model via OpenRouter",
    ),
    model(
        "openrouter/meta-llama/llama-3.1-70b-instruct",
        "Llama 3.1 70B",
        ProviderTag::OpenRouter,
        "Meta's powerful open model via OpenRouter",
    ),
    model(
        "openrouter/meta-llama/llama-3.1-8b-instruct",
        "Llama 3.1 8B",
        ProviderTag::OpenRouter,
        "Meta's efficient model via OpenRouter",
    ),
    model(
        "openrouter/openai/gpt-4-turbo",
        "GPT-4 Turbo",
        ProviderTag::OpenRouter,
        "OpenAI GPT-4 Turbo via OpenRouter",
    ),
    model(
        "openrouter/openai/gpt-4o",
        "GPT-4o",
        ProviderTag::OpenRouter,
        "OpenAI GPT-4o via OpenRouter",
    ),
    model(
        "openrouter/openai/gpt-3.5-turbo",
        "GPT-3.5 Turbo",
        ProviderTag::OpenRouter,
        "OpenAI GPT-3.5 Turbo via OpenRouter",
    ),
    model(
        "openrouter/mistralai/mistral-large",
        "Mistral Large",
        ProviderTag::OpenRouter,
        "Mistral's large model via OpenRouter",
    ),
    model(
        "openrouter/mistralai/mixtral-8x7b-instruct",
        "Mixtral 8x7B",
        ProviderTag::OpenRouter,
        "Mistral's Mixtral model via OpenRouter",
    ),
];

/// Catalog grouped by provider, in catalog order within each group
pub fn models_by_provider() -> BTreeMap<ProviderTag, Vec<ChatModel>> {
    let mut grouped: BTreeMap<ProviderTag, Vec<ChatModel>> = BTreeMap::new();
    for model in CHAT_MODELS {
        grouped.entry(model.provider).or_default().push(*model);
    }
    grouped
}

pub fn find_model(id: &str) -> Option<&'static ChatModel> {
    CHAT_MODELS.iter().find(|m| m.id == id)
}
