//! Error types for agent-insights-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the agent-insights-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The log root exists but cannot be read
    #[error("cannot read log root {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Assembling a single session failed
    #[error("failed to assemble session {session_id}: {message}")]
    Assembly { session_id: String, message: String },

    /// Session not found
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// Result type alias for agent-insights-core
pub type Result<T> = std::result::Result<T, Error>;
