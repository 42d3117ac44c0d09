use thiserror::Error;

/// Errors emitted while configuring facets or generating rows.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Invalid builder or setting configuration, detected before any I/O.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// A configured column does not exist in the discovered metadata.
    #[error("column [{column}] is not found in table [{table}]")]
    SchemaMismatch { table: String, column: String },
    /// A bounded supplier was asked for more values than it declared.
    #[error("supplier exhausted: {0}")]
    Exhausted(String),
    /// No setting layer provides a supplier for an included column.
    #[error("no supplier found for column [{column}] of table [{table}]")]
    Resolution { table: String, column: String },
    /// Pooled values were read before being kept or populated.
    #[error("value pool: {0}")]
    ValuePool(String),
    #[error(transparent)]
    Database(#[from] rowsmith_core::Error),
    #[error("config error: {0}")]
    ConfigFile(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        GenerationError::Configuration(message.into())
    }
}
