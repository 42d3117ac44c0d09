use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;
use crate::writer::KeyRetrieval;

pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// File configuration of a [`crate::Generator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Rows per executed batch and per commit of an owned connection.
    pub batch_size: usize,
    pub key_retrieval: KeyRetrieval,
    /// Schema searched for tables named without a `schema.` prefix.
    pub schema: String,
    /// Row count of facets that declare none.
    pub default_rows: Option<u64>,
    pub logging: LoggingConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            key_retrieval: KeyRetrieval::default(),
            schema: "public".to_string(),
            default_rows: None,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
    pub json: bool,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, GenerationError> {
        let config: GeneratorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, GenerationError> {
        toml::to_string_pretty(self).map_err(|err| GenerationError::config(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.batch_size == 0 {
            return Err(GenerationError::config("batch_size must be greater than zero"));
        }
        if self.schema.trim().is_empty() {
            return Err(GenerationError::config("schema must not be blank"));
        }
        if self.default_rows == Some(0) {
            return Err(GenerationError::config("default_rows must be greater than zero"));
        }
        Ok(())
    }
}
