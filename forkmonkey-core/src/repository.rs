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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository metadata as reported by the directory host.
///
/// Transient: produced during a scan and dropped once records are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryNode {
    pub owner: String,
    pub name: String,
    /// `owner/name`, the identity used for dedup and lineage
    pub full_name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fork: bool,
    /// Full name of the repository this one was forked from
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl RepositoryNode {
    /// Build a node with GitHub style URL and default branch.
    pub fn new(
        full_name: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let full_name = full_name.into();
        let (owner, name) = split_full_name(&full_name);
        Self {
            url: format!("https://github.com/{}", full_name),
            owner,
            name,
            full_name,
            created_at,
            updated_at,
            fork: false,
            parent: None,
            default_branch: default_branch(),
        }
    }

    /// Mark this node as a fork of `parent`.
    pub fn forked_from(mut self, parent: impl Into<String>) -> Self {
        self.fork = true;
        self.parent = Some(parent.into());
        self
    }
}

/// Split `owner/name`; a missing slash yields an empty owner.
pub fn split_full_name(full_name: &str) -> (String, String) {
    match full_name.split_once('/') {
        Some((owner, name)) => (owner.to_string(), name.to_string()),
        None => (String::new(), full_name.to_string()),
    }
}

/// Whether `value` looks like `owner/name` with both parts non-empty.
pub fn is_valid_full_name(value: &str) -> bool {
    match value.split_once('/') {
        Some((owner, name)) => !owner.is_empty() && !name.is_empty() && !name.contains('/'),
        None => false,
    }
}
