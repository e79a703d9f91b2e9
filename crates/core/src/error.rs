// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::domain::ConfigError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] crate::domain::LookupError),

    #[error("Functor error: {0}")]
    Functor(#[from] crate::port::FunctorError),

    #[error("Shell error: {0}")]
    Shell(#[from] crate::port::ShellError),

    #[error("Build error: {0}")]
    Build(#[from] crate::application::builder::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
