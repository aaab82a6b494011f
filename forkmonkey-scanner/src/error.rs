// Copyright 2025 ForkMonkey Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Error types for the scanner

use forkmonkey_core::InvariantViolation;
use std::path::PathBuf;
use thiserror::Error;

/// A failed call against the repository directory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectoryError {
    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by host (reset at {reset:?})")]
    RateLimited { reset: Option<i64> },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl DirectoryError {
    /// Whether the failure comes from the network or the host's load
    /// rather than from the request itself.
    pub fn is_transient(&self) -> bool {
        match self {
            DirectoryError::Network(_)
            | DirectoryError::RateLimited { .. }
            | DirectoryError::Timeout { .. } => true,
            DirectoryError::Api { status, .. } => *status >= 500,
            DirectoryError::NotFound(_) | DirectoryError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DirectoryError::Decode(err.to_string())
        } else {
            DirectoryError::Network(err.to_string())
        }
    }
}

/// Invalid scanner configuration. Always raised before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that abort a scan or the writing of its documents.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load source repository {full_name}: {source}")]
    Root {
        full_name: String,
        #[source]
        source: DirectoryError,
    },

    #[error("Refusing to write inconsistent documents: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Failed to serialize {document}: {source}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DirectoryError::Network("reset".into()).is_transient());
        assert!(DirectoryError::Timeout { timeout_ms: 10 }.is_transient());
        assert!(DirectoryError::RateLimited { reset: None }.is_transient());
        assert!(DirectoryError::Api {
            status: 502,
            message: String::new()
        }
        .is_transient());

        assert!(!DirectoryError::Api {
            status: 422,
            message: String::new()
        }
        .is_transient());
        assert!(!DirectoryError::NotFound("a/b".into()).is_transient());
        assert!(!DirectoryError::Decode("eof".into()).is_transient());
    }
}
