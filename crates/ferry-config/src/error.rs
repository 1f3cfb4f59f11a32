use thiserror::Error;

/// Failure to build a usable [`crate::FerryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or a value had the wrong type.
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// The value parsed but the engine cannot run with it.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
