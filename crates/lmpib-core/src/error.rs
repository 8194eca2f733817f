use crate::core::context::ConfigError;
use crate::core::units::UnitError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration for '{node}': {reason}")]
    Configuration { node: String, reason: String },

    #[error("Class mismatch: expected '{expected}', got '{found}'")]
    ClassMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("Unknown {family} class '{class}'")]
    UnknownClass { family: &'static str, class: String },

    #[error("Missing 'class' discriminator in {family} dictionary")]
    MissingClass { family: &'static str },

    #[error("Malformed '{class}' dictionary: {reason}")]
    Malformed { class: String, reason: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Missing compile context for '{node}': {reason}")]
    MissingContext { node: String, reason: String },

    #[error("Unsupported workflow document: {0}")]
    UnsupportedDocument(String),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Context(#[from] ConfigError),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn configuration(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            node: node.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(class: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            class: class.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string_lossy().to_string(),
            source,
        }
    }
}
