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

//! In-memory directory for tests
//!
//! Serves a fork graph built up front, with failure and latency injection
//! per repository and a log of every call made against it.

use super::DirectoryClient;
use crate::error::DirectoryError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use forkmonkey_core::{RepositoryNode, MARKER_FILE_PATH};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Record of a call against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCall {
    /// "get_node", "get_forks_page" or "get_file"
    pub method: &'static str,
    pub full_name: String,
    /// Page number or file path
    pub detail: Option<String>,
}

#[derive(Default)]
struct DirectoryState {
    nodes: HashMap<String, RepositoryNode>,
    forks: HashMap<String, Vec<String>>,
    files: HashMap<(String, String), Vec<u8>>,
    fork_failures: HashMap<String, DirectoryError>,
    file_failures: HashMap<String, DirectoryError>,
    fork_delays: HashMap<String, Duration>,
    calls: Vec<DirectoryCall>,
}

pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
    page_size: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DirectoryState::default()),
            page_size: 100,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Timestamp given to repositories added without one.
    pub fn default_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// Add or replace a repository. A declared parent also lists it as a fork.
    pub fn insert(&self, node: RepositoryNode) {
        let mut state = self.state.lock();
        if let Some(parent) = &node.parent {
            let listing = state.forks.entry(parent.clone()).or_default();
            if !listing.contains(&node.full_name) {
                listing.push(node.full_name.clone());
            }
        }
        state.nodes.insert(node.full_name.clone(), node);
    }

    pub fn add_root(&self, full_name: &str) -> RepositoryNode {
        let at = Self::default_timestamp();
        let node = RepositoryNode::new(full_name, at, at);
        self.insert(node.clone());
        node
    }

    pub fn add_fork(&self, parent: &str, full_name: &str) -> RepositoryNode {
        let at = Self::default_timestamp();
        let node = RepositoryNode::new(full_name, at, at).forked_from(parent);
        self.insert(node.clone());
        node
    }

    /// List an existing repository as a fork of a second parent as well.
    pub fn also_list_under(&self, parent: &str, full_name: &str) {
        self.state
            .lock()
            .forks
            .entry(parent.to_string())
            .or_default()
            .push(full_name.to_string());
    }

    pub fn set_file(&self, full_name: &str, path: &str, contents: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .files
            .insert((full_name.to_string(), path.to_string()), contents.into());
    }

    /// Write a minimal valid marker payload.
    pub fn set_marker(&self, full_name: &str, generation: u32, rarity_score: f64) {
        let payload = serde_json::json!({
            "generation": generation,
            "rarity_score": rarity_score,
        });
        self.set_file(full_name, MARKER_FILE_PATH, payload.to_string());
    }

    /// Fail every fork listing request for `full_name`.
    pub fn fail_forks(&self, full_name: &str, error: DirectoryError) {
        self.state
            .lock()
            .fork_failures
            .insert(full_name.to_string(), error);
    }

    /// Fail every file request for `full_name`.
    pub fn fail_files(&self, full_name: &str, error: DirectoryError) {
        self.state
            .lock()
            .file_failures
            .insert(full_name.to_string(), error);
    }

    /// Delay every fork listing request for `full_name`.
    pub fn delay_forks(&self, full_name: &str, delay: Duration) {
        self.state
            .lock()
            .fork_delays
            .insert(full_name.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Most calls that were ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }

    fn record(&self, method: &'static str, full_name: &str, detail: Option<String>) {
        self.state.lock().calls.push(DirectoryCall {
            method,
            full_name: full_name.to_string(),
            detail,
        });
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn get_node(&self, full_name: &str) -> Result<RepositoryNode, DirectoryError> {
        let _guard = self.enter();
        self.record("get_node", full_name, None);
        self.state
            .lock()
            .nodes
            .get(full_name)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(full_name.to_string()))
    }

    async fn get_forks_page(
        &self,
        full_name: &str,
        page: u32,
    ) -> Result<Vec<RepositoryNode>, DirectoryError> {
        let _guard = self.enter();
        self.record("get_forks_page", full_name, Some(page.to_string()));

        let delay = self.state.lock().fork_delays.get(full_name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if let Some(error) = state.fork_failures.get(full_name) {
            return Err(error.clone());
        }
        if !state.nodes.contains_key(full_name) {
            return Err(DirectoryError::NotFound(full_name.to_string()));
        }
        if page == 0 {
            return Err(DirectoryError::Api {
                status: 422,
                message: "pages start at 1".to_string(),
            });
        }

        let start = (page as usize - 1).saturating_mul(self.page_size);
        let listing = state.forks.get(full_name).map(Vec::as_slice).unwrap_or(&[]);
        Ok(listing
            .iter()
            .skip(start)
            .take(self.page_size)
            .filter_map(|name| state.nodes.get(name))
            .map(|node| {
                let mut node = node.clone();
                if node.parent.is_none() {
                    node.parent = Some(full_name.to_string());
                }
                node
            })
            .collect())
    }

    async fn get_file(
        &self,
        full_name: &str,
        path: &str,
    ) -> Result<Option<Vec<u8>>, DirectoryError> {
        let _guard = self.enter();
        self.record("get_file", full_name, Some(path.to_string()));

        let state = self.state.lock();
        if let Some(error) = state.file_failures.get(full_name) {
            return Err(error.clone());
        }
        Ok(state
            .files
            .get(&(full_name.to_string(), path.to_string()))
            .cloned())
    }

    fn fork_page_size(&self) -> Option<usize> {
        Some(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paged_listing() {
        let directory = InMemoryDirectory::new().with_page_size(2);
        directory.add_root("owner/root");
        for i in 0..5 {
            directory.add_fork("owner/root", &format!("user{}/fork", i));
        }

        let page1 = directory.get_forks_page("owner/root", 1).await.unwrap();
        let page3 = directory.get_forks_page("owner/root", 3).await.unwrap();
        let page4 = directory.get_forks_page("owner/root", 4).await.unwrap();

        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].full_name, "user0/fork");
        assert_eq!(page1[0].parent.as_deref(), Some("owner/root"));
        assert_eq!(page3.len(), 1);
        assert!(page4.is_empty());
        assert_eq!(directory.call_count("get_forks_page"), 3);
    }

    #[tokio::test]
    async fn test_injected_failures_and_files() {
        let directory = InMemoryDirectory::new();
        directory.add_root("owner/root");
        directory.set_marker("owner/root", 1, 50.0);
        directory.fail_forks("owner/root", DirectoryError::Network("reset".into()));

        assert!(directory.get_forks_page("owner/root", 1).await.is_err());
        assert!(directory
            .get_file("owner/root", MARKER_FILE_PATH)
            .await
            .unwrap()
            .is_some());
        assert_eq!(
            directory.get_file("owner/root", "missing.txt").await.unwrap(),
            None
        );
        assert!(matches!(
            directory.get_node("nobody/here").await,
            Err(DirectoryError::NotFound(_))
        ));
        assert_eq!(directory.calls().len(), 4);
    }
}
