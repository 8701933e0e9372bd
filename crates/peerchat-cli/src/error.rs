//! Error handling for the peerchat CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Session error: {0}")]
    Session(#[from] peerchat_core::PeerchatError),

    #[error("Command failed: {0}")]
    Command(#[from] peerchat_core::CommandError),

    #[error("Configuration error: {0}")]
    Config(#[from] peerchat_core::ConfigError),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
