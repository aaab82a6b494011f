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

//! Scanner configuration
//!
//! Loaded from a TOML file, then overridden by any environment variables
//! that are set. Command-line flags are applied on top by the binary.

use crate::error::ConfigError;
use forkmonkey_core::repository::is_valid_full_name;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Deepest degree a scan may be configured to reach
pub const MAX_SUPPORTED_DEPTH: u32 = 64;

/// Widest activity window accepted, one hundred years
pub const MAX_ACTIVE_WINDOW_HOURS: u64 = 24 * 366 * 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub scan: ScanSettings,

    #[serde(default)]
    pub directory: DirectorySettings,

    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// `owner/name` of the root repository
    #[serde(default)]
    pub source_repo: String,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_max_total")]
    pub max_total: usize,

    /// How recently a repository must have been updated to count as active
    #[serde(default = "default_active_window_hours")]
    pub active_window_hours: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_per_page")]
    pub per_page: u32,

    #[serde(default = "default_max_fork_pages")]
    pub max_fork_pages: u32,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

// Keeps the token out of logs.
impl std::fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("api_base_url", &self.api_base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("per_page", &self.per_page)
            .field("max_fork_pages", &self.max_fork_pages)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_total() -> usize {
    100
}

fn default_active_window_hours() -> u64 {
    24
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    format!("forkmonkey-scanner/{}", env!("CARGO_PKG_VERSION"))
}

fn default_per_page() -> u32 {
    100
}

fn default_max_fork_pages() -> u32 {
    10
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("web")
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            source_repo: String::new(),
            max_depth: default_max_depth(),
            max_total: default_max_total(),
            active_window_hours: default_active_window_hours(),
        }
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token: None,
            user_agent: default_user_agent(),
            per_page: default_per_page(),
            max_fork_pages: default_max_fork_pages(),
            request_timeout_ms: default_request_timeout_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl DirectorySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ScanSettings {
    pub fn active_window(&self) -> chrono::Duration {
        let hours = self.active_window_hours.min(MAX_ACTIVE_WINDOW_HOURS);
        chrono::Duration::hours(hours as i64)
    }
}

impl ScannerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - FORKMONKEY_SOURCE_REPO: root repository as `owner/name`
    /// - GITHUB_REPOSITORY: fallback for the root repository
    /// - FORKMONKEY_MAX_DEPTH: deepest fork degree to scan (default: 3)
    /// - FORKMONKEY_MAX_TOTAL: maximum repositories to collect (default: 100)
    /// - FORKMONKEY_OUTPUT_DIR: directory for the JSON documents (default: web)
    /// - GITHUB_TOKEN: API token for the GitHub directory
    pub fn from_env() -> Self {
        Self::default().merge_env_from(|key| std::env::var(key).ok())
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        Ok(config.merge_env_from(|key| std::env::var(key).ok()))
    }

    /// Override fields whose variable `lookup` returns. Unparsable numbers
    /// are ignored.
    pub fn merge_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(repo) = lookup("FORKMONKEY_SOURCE_REPO") {
            self.scan.source_repo = repo;
        } else if self.scan.source_repo.is_empty() {
            if let Some(repo) = lookup("GITHUB_REPOSITORY") {
                self.scan.source_repo = repo;
            }
        }

        if let Some(depth) = lookup("FORKMONKEY_MAX_DEPTH").and_then(|v| v.parse().ok()) {
            self.scan.max_depth = depth;
        }
        if let Some(total) = lookup("FORKMONKEY_MAX_TOTAL").and_then(|v| v.parse().ok()) {
            self.scan.max_total = total;
        }
        if let Some(dir) = lookup("FORKMONKEY_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()) {
            self.directory.token = Some(token);
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_full_name(&self.scan.source_repo) {
            return Err(ConfigError::invalid(
                "scan.source_repo",
                format!("expected owner/name, got {:?}", self.scan.source_repo),
            ));
        }
        if self.scan.max_total == 0 {
            return Err(ConfigError::invalid("scan.max_total", "must be at least 1"));
        }
        if self.scan.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::invalid(
                "scan.max_depth",
                format!("must be at most {}", MAX_SUPPORTED_DEPTH),
            ));
        }
        if self.scan.active_window_hours > MAX_ACTIVE_WINDOW_HOURS {
            return Err(ConfigError::invalid(
                "scan.active_window_hours",
                format!("must be at most {}", MAX_ACTIVE_WINDOW_HOURS),
            ));
        }
        if self.directory.max_concurrent_requests == 0 {
            return Err(ConfigError::invalid(
                "directory.max_concurrent_requests",
                "must be at least 1",
            ));
        }
        if self.directory.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "directory.request_timeout_ms",
                "must be at least 1",
            ));
        }
        if !(1..=100).contains(&self.directory.per_page) {
            return Err(ConfigError::invalid(
                "directory.per_page",
                "must be between 1 and 100",
            ));
        }
        if self.directory.max_fork_pages == 0 {
            return Err(ConfigError::invalid(
                "directory.max_fork_pages",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
