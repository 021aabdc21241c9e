//! Error types for the ingestion and session pipeline.
//!
//! Each component owns a typed error enum built with `thiserror`. The CLI
//! and orchestration layers wrap these in `anyhow` for context.
//!
//! Per-file read failures during context building are not errors at all:
//! they are collected as [`SkippedFile`](crate::context::SkippedFile)
//! records and the build carries on.

use std::path::PathBuf;

/// Failure to obtain a local copy of a repository.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The identifier is empty or does not yield a usable directory name.
    #[error("invalid repository identifier: '{0}'")]
    InvalidIdentifier(String),

    /// The transport (e.g. `git clone`) failed.
    #[error("fetching '{identifier}' failed: {message}")]
    Transport { identifier: String, message: String },

    /// Local filesystem work around the fetch failed.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FetchError {
    /// Wrap a `std::io::Error` with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn transport(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by the answering oracle. Fatal to a single turn only.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("oracle provider is disabled")]
    Disabled,

    #[error("unknown oracle provider: '{0}'")]
    UnknownProvider(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

/// Failure of a session turn.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A question was asked before any repository context was loaded.
    #[error("no repository context loaded; ingest a repository before asking")]
    NoContext,

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FetchError::transport("https://example.com/a.git", "repository not found");
        assert_eq!(
            err.to_string(),
            "fetching 'https://example.com/a.git' failed: repository not found"
        );

        let err = SessionError::from(OracleError::Quota("429".into()));
        assert_eq!(err.to_string(), "quota exceeded: 429");

        let err = OracleError::Api {
            status: 500,
            body: "boom".into(),
        };
        assert!(err.to_string().contains("500"));
    }
}
