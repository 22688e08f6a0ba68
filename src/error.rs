//! Error types for cloudburst-submit

use thiserror::Error;

use crate::template::TemplateError;

/// Crate Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling, rendering, or submitting Jobs
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration: malformed override, unreadable template, bad kubeconfig
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
    },

    /// Template rendering failed (undefined binding or invalid syntax)
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Substituted template text is not a well-formed manifest
    #[error("manifest parse error: {message}")]
    Parse {
        /// Description of what failed to parse
        message: String,
    },

    /// The cluster API rejected or could not perform the create call
    #[error("kubernetes client error: {0}")]
    Client(#[from] kube::Error),

    /// Filesystem error while persisting a rendered manifest
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization failed while persisting a rendered manifest
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Create a manifest parse error with the given message
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }
}
