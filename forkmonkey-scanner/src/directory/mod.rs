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

//! Repository directory capability
//!
//! The scanner only needs three calls from the hosting service: look up a
//! repository, page through its direct forks, and read a file from its
//! default branch. [`GitHubDirectory`] talks to the GitHub REST API and
//! [`InMemoryDirectory`] serves a fixed graph for tests.

mod github;
mod memory;

pub use github::GitHubDirectory;
pub use memory::{DirectoryCall, InMemoryDirectory};

use crate::error::DirectoryError;
use async_trait::async_trait;
use forkmonkey_core::RepositoryNode;

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Look up one repository by `owner/name`.
    async fn get_node(&self, full_name: &str) -> Result<RepositoryNode, DirectoryError>;

    /// One page (1-based) of direct forks. An empty page ends the listing.
    /// Forks carry `full_name` as their parent.
    async fn get_forks_page(
        &self,
        full_name: &str,
        page: u32,
    ) -> Result<Vec<RepositoryNode>, DirectoryError>;

    /// Raw contents of `path` on the default branch, `None` if absent.
    async fn get_file(&self, full_name: &str, path: &str)
        -> Result<Option<Vec<u8>>, DirectoryError>;

    /// Page size of fork listings, if fixed. A shorter page is the last one.
    fn fork_page_size(&self) -> Option<usize> {
        None
    }
}
