//! Error types for the sitedrop core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types for sitedrop.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration loading or parsing error.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A `${name}` placeholder that cannot be expanded.
    #[error("Unknown placeholder `${{{name}}}` in template `{template}`")]
    Placeholder { name: String, template: String },

    /// A `${` without its closing `}`.
    #[error("Unterminated placeholder `${{{fragment}` in template `{template}`")]
    UnterminatedPlaceholder { fragment: String, template: String },

    /// Revision-control metadata is required but unavailable.
    #[error("Revision error: {0}")]
    Revision(String),

    /// A configured path could not be resolved.
    #[error("Path error for {path}: {message}")]
    Path { path: PathBuf, message: String },

    /// File system I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic configuration crate error.
    #[error("Config crate error: {0}")]
    ConfigCrate(#[from] config::ConfigError),
}

impl CoreError {
    /// Create a new configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new placeholder error.
    pub fn placeholder(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::Placeholder {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Create a new unterminated placeholder error.
    pub fn unterminated_placeholder(
        fragment: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self::UnterminatedPlaceholder {
            fragment: fragment.into(),
            template: template.into(),
        }
    }

    /// Create a new revision error.
    pub fn revision(message: impl Into<String>) -> Self {
        Self::Revision(message.into())
    }

    /// Create a new path error.
    pub fn path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration class (missing or
    /// invalid templates, paths or revision metadata).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}
