use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================
// Chat streaming
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatStreamRequest {
    /// Model identifier, e.g. `openrouter/openai/gpt-4o` or `google-api/gemini-1.5-pro`
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// One of `system`, `user` or `assistant`
    pub role: String,
    pub content: String,
}

impl ChatStreamRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model is required".to_string());
        }
        if self.messages.is_empty() {
            return Err("messages cannot be empty".to_string());
        }
        for message in &self.messages {
            if !matches!(message.role.as_str(), "system" | "user" | "assistant") {
                return Err(format!("invalid message role: {}", message.role));
            }
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("temperature must be between 0 and 2".to_string());
            }
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens <= 0 {
                return Err("max_tokens must be positive".to_string());
            }
        }
        Ok(())
    }
}

/// One server-sent event on the chat stream
///
/// `type` is `text_delta`, `reasoning_delta`, `error` or `done`. The stream
/// ends after the first `error` or `done`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StreamEventPayload {
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

// ============================================
// Model catalog
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelsResponse {
    pub default_model: String,
    pub providers: Vec<ProviderModels>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderModels {
    pub provider: String,
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub provider: String,
}

// ============================================
// Provider credentials
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveCredentialRequest {
    /// `google-api` or `openrouter`
    pub provider: String,
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToggleCredentialRequest {
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialResponse {
    pub provider: String,
    /// First characters of the key followed by `...`
    pub masked_key: String,
    pub is_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialListResponse {
    pub data: Vec<CredentialResponse>,
}

// ============================================
// ModelHub
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddHubModelRequest {
    /// Repository id, e.g. `acme/chat-7b`
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateHubModelRequest {
    /// `downloading`, `ready` or `error`
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HubModelResponse {
    pub id: String,
    pub model_id: String,
    /// Identifier to pass as `model` when streaming, `modelhub/<model_id>`
    pub chat_model_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: String,
    pub tags: Vec<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HubModelListResponse {
    pub data: Vec<HubModelResponse>,
}

// ============================================
// Errors
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: String, error_type: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: None,
                code: None,
            },
        }
    }

    pub fn with_param(message: String, error_type: String, param: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: Some(param),
                code: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model: &str, role: &str) -> ChatStreamRequest {
        ChatStreamRequest {
            model: model.to_string(),
            messages: vec![Message {
                role: role.to_string(),
                content: "Hi".to_string(),
            }],
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(request("openai/gpt-4o", "user").validate().is_ok());
        assert!(request(" ", "user").validate().is_err());
        assert!(request("openai/gpt-4o", "tool").validate().is_err());

        let mut empty = request("openai/gpt-4o", "user");
        empty.messages.clear();
        assert_eq!(empty.validate().unwrap_err(), "messages cannot be empty");

        let mut hot = request("openai/gpt-4o", "user");
        hot.temperature = Some(3.0);
        assert!(hot.validate().is_err());
    }
}
