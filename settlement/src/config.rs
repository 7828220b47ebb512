//! Configuration for settlement

use serde::{Deserialize, Serialize};

use crate::types::Strategy;

/// Settlement configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Strategy used when the caller does not pick one
    #[serde(default)]
    pub default_strategy: Strategy,

    /// Ledger configuration
    #[serde(default)]
    pub ledger: grouptab_ledger_core::Config,
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
        let mut config = Config {
            ledger: grouptab_ledger_core::Config::from_env()?,
            ..Config::default()
        };

        if let Ok(strategy) = std::env::var("GROUPTAB_SETTLEMENT_STRATEGY") {
            config.default_strategy = match strategy.trim().to_ascii_lowercase().as_str() {
                "direct_readout" | "direct" => Strategy::DirectReadout,
                "netting" => Strategy::Netting,
                other => {
                    return Err(crate::Error::Config(format!(
                        "Unknown settlement strategy: {}",
                        other
                    )))
                }
            };
        }

        Ok(config)
    }
}
