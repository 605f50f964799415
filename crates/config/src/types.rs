use serde::{Deserialize, Deserializer};
use std::{collections::HashMap, env, fmt};

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://ai-gateway.vercel.sh/v1";
pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_PROVIDER_TIMEOUT_SECONDS: i64 = 120;

/// Number of leading characters of a secret that may be shown outside the process.
pub const SECRET_VISIBLE_PREFIX_LEN: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            providers: ProvidersConfig::from_env()?,
        })
    }
}

/// A secret value (API key) that never prints itself in full.
///
/// `Debug` is redacted; [`SecretString::masked`] yields the short prefix
/// that is safe to surface to clients.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret. Only adapters building authenticated requests should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Short prefix followed by `...`.
    ///
    /// At most half of the key is ever shown; keys no longer than
    /// [`SECRET_VISIBLE_PREFIX_LEN`] are masked entirely.
    pub fn masked(&self) -> String {
        let len = self.0.chars().count();
        if len <= SECRET_VISIBLE_PREFIX_LEN {
            return "...".to_string();
        }
        let visible = SECRET_VISIBLE_PREFIX_LEN.min(len / 2);
        let prefix: String = self.0.chars().take(visible).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

/// Read an optional secret from the environment, treating blank values as unset
fn secret_from_env(name: &str) -> Option<SecretString> {
    env::var(name)
        .ok()
        .map(SecretString::from)
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| default_host()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| "SERVER_PORT must be a valid port number")?,
        })
    }
}

/// Logging Configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl LoggingConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        let mut modules = HashMap::new();

        // Load module-specific log levels
        if let Ok(level) = env::var("LOG_MODULE_API") {
            modules.insert("api".to_string(), level);
        }
        if let Ok(level) = env::var("LOG_MODULE_SERVICES") {
            modules.insert("services".to_string(), level);
        }
        if let Ok(level) = env::var("LOG_MODULE_INFERENCE_PROVIDERS") {
            modules.insert("inference_providers".to_string(), level);
        }

        Ok(Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            format: env::var("LOG_FORMAT").unwrap_or_else(|_| default_log_format()),
            modules,
        })
    }

    /// Filter directive string understood by `tracing_subscriber::EnvFilter`
    pub fn filter_directives(&self) -> String {
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();

        let mut filter = self.level.clone();
        for (module, level) in modules {
            filter.push_str(&format!(",{module}={level}"));
        }
        filter
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut modules = HashMap::new();
        modules.insert("api".to_string(), "debug".to_string());
        modules.insert("services".to_string(), "debug".to_string());

        Self {
            level: default_log_level(),
            format: default_log_format(),
            modules,
        }
    }
}

/// Upstream provider endpoints and process-wide default credentials.
///
/// Built once at startup and handed to the provider registry; nothing in the
/// routing layer reads the environment after this point.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: i64,
}

fn default_timeout() -> i64 {
    DEFAULT_PROVIDER_TIMEOUT_SECONDS
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            google: GoogleConfig::default(),
            openrouter: OpenRouterConfig::default(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ProvidersConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            gateway: GatewayConfig::from_env(),
            google: GoogleConfig::from_env(),
            openrouter: OpenRouterConfig::from_env(),
            timeout_seconds: match env::var("PROVIDER_TIMEOUT_SECONDS") {
                Ok(value) => value
                    .parse()
                    .map_err(|_| "PROVIDER_TIMEOUT_SECONDS must be a valid number")?,
                Err(_) => default_timeout(),
            },
        })
    }
}

/// Default multi-model passthrough backend. It manages its own credential.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

fn default_gateway_base_url() -> String {
    DEFAULT_GATEWAY_BASE_URL.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            api_key: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("AI_GATEWAY_BASE_URL").unwrap_or_else(|_| default_gateway_base_url()),
            api_key: secret_from_env("AI_GATEWAY_API_KEY"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_google_base_url")]
    pub base_url: String,
    /// Used when the caller has no enabled key of their own
    #[serde(default)]
    pub default_api_key: Option<SecretString>,
}

fn default_google_base_url() -> String {
    DEFAULT_GOOGLE_BASE_URL.to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: default_google_base_url(),
            default_api_key: None,
        }
    }
}

impl GoogleConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("GOOGLE_API_BASE_URL").unwrap_or_else(|_| default_google_base_url()),
            default_api_key: secret_from_env("GOOGLE_API_KEY"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_openrouter_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub default_api_key: Option<SecretString>,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// Sent as `X-Title`
    #[serde(default = "default_app_title")]
    pub app_title: String,
}

fn default_openrouter_base_url() -> String {
    DEFAULT_OPENROUTER_BASE_URL.to_string()
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_app_title() -> String {
    "Praxis".to_string()
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_openrouter_base_url(),
            default_api_key: None,
            app_url: default_app_url(),
            app_title: default_app_title(),
        }
    }
}

impl OpenRouterConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|_| default_openrouter_base_url()),
            default_api_key: secret_from_env("OPENROUTER_API_KEY"),
            app_url: env::var("APP_URL").unwrap_or_else(|_| default_app_url()),
            app_title: env::var("APP_TITLE").unwrap_or_else(|_| default_app_title()),
        }
    }
}
