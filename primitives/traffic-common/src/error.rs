//! Error types for GitHub access and table persistence.

use std::path::PathBuf;

/// Message shown when GitHub answers 403 Forbidden.
pub const AUTH_HELP: &str = "A 403 Forbidden error occurred. You may need to get a GitHub \
                             Personal Access Token with full access to repo and export it \
                             as GITHUB_TOKEN.";

/// Failure while talking to the GitHub REST API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// GitHub refused the request (HTTP 403).
    #[error("{}", AUTH_HELP)]
    Auth,

    /// Any other non-200 answer.
    #[error("HTTP {status} {reason} for {url}")]
    Http {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response has no `{0}` field")]
    MissingField(&'static str),
}

impl ApiError {
    /// Returns true for the 403 case, which callers may recover from.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }
}

/// Failure while reading or writing a stored traffic table.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid traffic table in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
