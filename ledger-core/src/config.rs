//! Configuration for the group ledger

use serde::{Deserialize, Serialize};

use crate::validator::ValidationMode;

/// Ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Validation configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Mode used after each ingest
    #[serde(default)]
    pub default_mode: ValidationMode,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(mode) = std::env::var("GROUPTAB_VALIDATION_MODE") {
            config.validation.default_mode = parse_mode(&mode)?;
        }

        Ok(config)
    }
}

fn parse_mode(value: &str) -> crate::Result<ValidationMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "incremental" => Ok(ValidationMode::Incremental),
        "full" => Ok(ValidationMode::Full),
        other => Err(crate::Error::Config(format!(
            "Unknown validation mode: {}",
            other
        ))),
    }
}
