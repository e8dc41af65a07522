//! Hook error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running hooks.
///
/// Script outcomes (non-zero exit, timeout) are not errors; they are
/// [`ExecutionOutcome`](crate::types::ExecutionOutcome) values.
#[derive(Debug, Error)]
pub enum HookError {
    /// The event name cannot be used as a directory name.
    #[error("invalid hook event name: '{name}'")]
    InvalidEventName {
        /// The rejected name.
        name: String,
    },

    /// The event's hook directory exists but could not be listed.
    #[error("failed to scan hook directory {}: {source}", path.display())]
    Discovery {
        /// Directory that was being scanned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration value has the wrong type or cannot be parsed.
    #[error("invalid configuration value for '{key}': {message}")]
    Config {
        /// Dotted configuration key.
        key: String,
        /// What was wrong with the value.
        message: String,
    },

    /// A cmdline template could not be interpolated.
    #[error("invalid cmdline template in '{key}': {message}")]
    Template {
        /// Dotted configuration key holding the template.
        key: String,
        /// What was wrong with the template.
        message: String,
    },

    /// The script process could not be started or waited on.
    #[error("failed to launch hook script '{script}': {source}")]
    Launch {
        /// Script base name.
        script: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl HookError {
    /// Whether this error comes from operator configuration.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Template { .. })
    }
}

/// Result type for hook operations.
pub type Result<T> = std::result::Result<T, HookError>;
