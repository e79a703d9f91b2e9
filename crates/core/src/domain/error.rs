// Domain Error Types

use thiserror::Error;

/// Errors raised while turning a JSON document into a configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("Field '{field}' in {context} has wrong type, expected {expected}")]
    WrongType {
        field: String,
        context: String,
        expected: &'static str,
    },

    #[error("Unknown directory alias: {0}")]
    UnknownAlias(String),

    #[error("Unknown argument mapper mode: {0}")]
    UnknownMapper(String),

    #[error("Linear argument mapping needs equal lengths: '{param}' has {found} values, expected {expected}")]
    LengthMismatch {
        param: String,
        expected: usize,
        found: usize,
    },

    #[error("Parameter '{0}' is named in 'pira-file' but has no values")]
    MissingParameter(String),

    #[error("Item '{item}' declared twice in build '{build}'")]
    DuplicateItem { build: String, item: String },

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("Cannot determine configuration schema: {0}")]
    UnknownSchema(String),

    #[error("Cannot read configuration {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Queries against a loaded configuration that name something it does not hold
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Unknown build: {0}")]
    UnknownBuild(String),

    #[error("Unknown item '{item}' in build '{build}'")]
    UnknownItem { build: String, item: String },

    #[error("Flavor '{flavor}' not declared for item '{item}'")]
    UnknownFlavor { item: String, flavor: String },

    #[error("Item '{item}' has no {what}")]
    MissingEntry { item: String, what: &'static str },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
