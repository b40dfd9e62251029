//! CLI error types.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configuration file does not exist.
    #[error("config not found at {}. Pass --config or create stackguard.toml", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// A command-line argument could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the policy layer.
    #[error(transparent)]
    Policy(#[from] policy::Error),

    /// An error occurred in the guard layer.
    #[error(transparent)]
    Guard(#[from] guard::Error),

    /// Failed to render JSON output.
    #[error("failed to render output: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
