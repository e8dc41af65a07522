//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading hook configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to list the configuration directory.
    #[error("failed to read configuration directory: {0}")]
    Io(#[from] std::io::Error),
    /// A configuration source could not be parsed or merged.
    #[error("failed to load hook configuration: {0}")]
    Figment(Box<figment::Error>),
    /// The merged configuration had an unusable shape.
    #[error("invalid configuration: {0}")]
    InvalidValue(String),
}

impl From<figment::Error> for SettingsError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
