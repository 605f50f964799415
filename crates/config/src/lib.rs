// Configuration Management
//
// This crate handles all configuration loading for the routing layer.
// It provides:
// - Configuration structs and deserialization
// - File loading logic with environment fallback
// - Default provider endpoints and the process-wide default credentials
//
// Configuration is built once at process start and passed down explicitly.

use std::path::Path;
use thiserror::Error;

pub mod types;

// Re-export all configuration types
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found. Tried paths: {paths}")]
    FileNotFound { paths: String },

    #[error("Failed to read configuration file: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {source}")]
    ParseError {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("Invalid environment configuration: {0}")]
    Environment(String),
}

const CONFIG_PATHS: [&str; 3] = ["config/config.yaml", "config.yaml", "config/default.yaml"];

/// Main configuration loading interface
impl ApiConfig {
    /// Load configuration from YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ApiConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the first existing default location
    pub fn load_from_default_paths() -> Result<Self, ConfigError> {
        for path in &CONFIG_PATHS {
            if Path::new(path).exists() {
                return Self::load_from_file(path);
            }
        }

        Err(ConfigError::FileNotFound {
            paths: CONFIG_PATHS.join(", "),
        })
    }

    /// Load configuration from default locations, falling back to environment variables
    pub fn load() -> Result<Self, ConfigError> {
        match Self::load_from_default_paths() {
            Err(ConfigError::FileNotFound { .. }) => {
                Self::from_env().map_err(ConfigError::Environment)
            }
            other => other,
        }
    }
}
