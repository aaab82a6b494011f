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

//! Fork Collector
//!
//! Breadth-first walk of the fork network from a root repository. Each
//! level's fork listings are fetched concurrently through the shared
//! [`RequestGate`]; the level is a barrier, and only the coordinator that
//! owns the [`Traversal`] accepts nodes, so dedup and the `max_total` cap
//! are decided against a fully known level in a fixed order.
//!
//! A listing that fails or times out skips that node's subtree for the rest
//! of the scan. Pages already received for it are discarded.

use crate::directory::DirectoryClient;
use crate::error::{ConfigError, DirectoryError};
use crate::gate::RequestGate;
use forkmonkey_core::RepositoryNode;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorLimits {
    pub max_depth: u32,
    pub max_total: usize,
    /// Upper bound on listing pages requested per repository
    pub max_fork_pages: u32,
}

impl CollectorLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_total == 0 {
            return Err(ConfigError::invalid("max_total", "must be at least 1"));
        }
        if self.max_fork_pages == 0 {
            return Err(ConfigError::invalid("max_fork_pages", "must be at least 1"));
        }
        Ok(())
    }
}

/// A repository accepted into the scan with its distance from the root.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedRepo {
    pub node: RepositoryNode,
    pub degree: u32,
}

/// A fork listing that could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub full_name: String,
    pub degree: u32,
    pub error: DirectoryError,
}

/// Result of one collection. Always usable, even when cancelled.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Accepted repositories in level order, root first
    pub repos: Vec<CollectedRepo>,
    pub failures: Vec<FetchFailure>,
    pub cancelled: bool,
    /// `max_total` was reached while more forks were pending
    pub truncated: bool,
}

/// Forks reported for one repository.
struct Listing {
    forks: Vec<RepositoryNode>,
    /// Paging stopped on the budget or page cap, not on an empty page
    cut_short: bool,
}

enum Offer {
    Accepted(usize),
    Duplicate,
    Full,
}

/// Seen set and accepted list, owned by the collecting task only.
struct Traversal {
    seen: HashSet<String>,
    accepted: Vec<CollectedRepo>,
    max_total: usize,
}

impl Traversal {
    fn new(root: RepositoryNode, max_total: usize) -> Self {
        let mut seen = HashSet::new();
        seen.insert(root.full_name.clone());
        Self {
            seen,
            accepted: vec![CollectedRepo {
                node: root,
                degree: 0,
            }],
            max_total,
        }
    }

    fn offer(&mut self, node: RepositoryNode, degree: u32) -> Offer {
        if self.seen.contains(&node.full_name) {
            return Offer::Duplicate;
        }
        if self.is_full() {
            return Offer::Full;
        }
        self.seen.insert(node.full_name.clone());
        self.accepted.push(CollectedRepo { node, degree });
        Offer::Accepted(self.accepted.len() - 1)
    }

    fn remaining(&self) -> usize {
        self.max_total.saturating_sub(self.accepted.len())
    }

    fn is_full(&self) -> bool {
        self.remaining() == 0
    }
}

pub struct ForkCollector {
    client: Arc<dyn DirectoryClient>,
    gate: Arc<RequestGate>,
    limits: CollectorLimits,
}

impl ForkCollector {
    pub fn new(
        client: Arc<dyn DirectoryClient>,
        gate: Arc<RequestGate>,
        limits: CollectorLimits,
    ) -> Result<Self, ConfigError> {
        limits.validate()?;
        Ok(Self {
            client,
            gate,
            limits,
        })
    }

    pub fn limits(&self) -> CollectorLimits {
        self.limits
    }

    /// Walk the fork network below `root`.
    pub async fn collect(&self, root: RepositoryNode, cancel: &CancellationToken) -> Collection {
        let mut traversal = Traversal::new(root, self.limits.max_total);
        let mut failures = Vec::new();
        let mut cancelled = false;
        let mut truncated = false;

        let mut frontier: Vec<usize> = vec![0];
        let mut degree = 0u32;

        while !frontier.is_empty() && degree < self.limits.max_depth {
            if traversal.is_full() {
                break;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let parents: Vec<String> = frontier
                .iter()
                .map(|&i| traversal.accepted[i].node.full_name.clone())
                .collect();
            let budget = traversal.remaining();

            let listings = tokio::select! {
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                listings = self.fetch_level(&parents, budget) => listings,
            };

            let next_degree = degree + 1;
            let mut next_frontier = Vec::new();

            'merge: for (parent, listing) in parents.iter().zip(listings) {
                let listing = match listing {
                    Ok(listing) => listing,
                    Err(error) => {
                        tracing::warn!(
                            repo = %parent,
                            degree,
                            error = %error,
                            "Fork listing failed, skipping subtree"
                        );
                        failures.push(FetchFailure {
                            full_name: parent.clone(),
                            degree,
                            error,
                        });
                        continue;
                    }
                };

                for fork in listing.forks {
                    match traversal.offer(fork, next_degree) {
                        Offer::Accepted(index) => next_frontier.push(index),
                        Offer::Duplicate => {}
                        Offer::Full => {
                            truncated = true;
                            break 'merge;
                        }
                    }
                }
                if listing.cut_short && traversal.is_full() {
                    truncated = true;
                }
            }

            tracing::info!(
                degree = next_degree,
                accepted = next_frontier.len(),
                total = traversal.accepted.len(),
                "Collected fork level"
            );
            frontier = next_frontier;
            degree = next_degree;
        }

        Collection {
            repos: traversal.accepted,
            failures,
            cancelled,
            truncated,
        }
    }

    /// Fetch listings for one level, in `parents` order.
    async fn fetch_level(
        &self,
        parents: &[String],
        budget: usize,
    ) -> Vec<Result<Listing, DirectoryError>> {
        let fetches = parents.iter().map(|parent| self.list_forks(parent, budget));
        futures::future::join_all(fetches).await
    }

    /// Page through the direct forks of `full_name` until an empty or short
    /// page, the page cap, or `budget` forks have been seen.
    async fn list_forks(&self, full_name: &str, budget: usize) -> Result<Listing, DirectoryError> {
        let page_size = self.client.fork_page_size();
        let mut forks = Vec::new();

        for page in 1..=self.limits.max_fork_pages {
            let batch = self
                .gate
                .run(self.client.get_forks_page(full_name, page))
                .await?;
            tracing::debug!(repo = %full_name, page, forks = batch.len(), "Fetched fork page");

            let last = batch.is_empty() || page_size.map_or(false, |size| batch.len() < size);
            forks.extend(batch.into_iter().map(|fork| declare_parent(fork, full_name)));

            if last {
                return Ok(Listing {
                    forks,
                    cut_short: false,
                });
            }
            if forks.len() >= budget {
                break;
            }
        }

        Ok(Listing {
            forks,
            cut_short: true,
        })
    }
}

fn declare_parent(mut fork: RepositoryNode, lister: &str) -> RepositoryNode {
    if fork.parent.is_none() {
        fork.parent = Some(lister.to_string());
        fork.fork = true;
    }
    fork
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use std::time::Duration;

    fn limits(max_depth: u32, max_total: usize) -> CollectorLimits {
        CollectorLimits {
            max_depth,
            max_total,
            max_fork_pages: 10,
        }
    }

    /// root -> fork1 -> fork1.1, root -> fork2 -> fork2.1
    fn two_by_two() -> Arc<InMemoryDirectory> {
        let directory = InMemoryDirectory::new();
        directory.add_root("owner/root");
        directory.add_fork("owner/root", "a/fork1");
        directory.add_fork("owner/root", "b/fork2");
        directory.add_fork("a/fork1", "c/fork1.1");
        directory.add_fork("b/fork2", "d/fork2.1");
        Arc::new(directory)
    }

    fn collector(directory: Arc<InMemoryDirectory>, limits: CollectorLimits) -> ForkCollector {
        let gate = Arc::new(RequestGate::new(4, Duration::from_secs(5)));
        ForkCollector::new(directory, gate, limits).unwrap()
    }

    async fn run(directory: &Arc<InMemoryDirectory>, limits: CollectorLimits) -> Collection {
        let root = directory.get_node("owner/root").await.unwrap();
        collector(directory.clone(), limits)
            .collect(root, &CancellationToken::new())
            .await
    }

    fn degrees(collection: &Collection) -> Vec<(&str, u32)> {
        collection
            .repos
            .iter()
            .map(|r| (r.node.full_name.as_str(), r.degree))
            .collect()
    }

    #[tokio::test]
    async fn test_two_levels() {
        let directory = two_by_two();
        let collection = run(&directory, limits(2, 100)).await;

        assert_eq!(
            degrees(&collection),
            vec![
                ("owner/root", 0),
                ("a/fork1", 1),
                ("b/fork2", 1),
                ("c/fork1.1", 2),
                ("d/fork2.1", 2),
            ]
        );
        assert!(!collection.truncated);
        assert!(!collection.cancelled);
        assert!(collection.failures.is_empty());
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let directory = two_by_two();
        let collection = run(&directory, limits(1, 100)).await;

        assert_eq!(
            degrees(&collection),
            vec![("owner/root", 0), ("a/fork1", 1), ("b/fork2", 1)]
        );
        // degree-1 nodes are never listed
        assert!(directory
            .calls()
            .iter()
            .all(|c| c.full_name == "owner/root" || c.method == "get_node"));
    }

    #[tokio::test]
    async fn test_depth_zero_is_root_only() {
        let directory = two_by_two();
        let collection = run(&directory, limits(0, 100)).await;
        assert_eq!(degrees(&collection), vec![("owner/root", 0)]);
        assert_eq!(directory.call_count("get_forks_page"), 0);
    }

    #[tokio::test]
    async fn test_total_limit_truncates_mid_level() {
        let directory = two_by_two();
        let collection = run(&directory, limits(5, 4)).await;

        assert_eq!(collection.repos.len(), 4);
        assert_eq!(collection.repos[0].node.full_name, "owner/root");
        assert_eq!(collection.repos[3].node.full_name, "c/fork1.1");
        assert!(collection.truncated);
    }

    #[tokio::test]
    async fn test_total_of_one_is_root() {
        let directory = two_by_two();
        let collection = run(&directory, limits(5, 1)).await;
        assert_eq!(degrees(&collection), vec![("owner/root", 0)]);
        assert_eq!(directory.call_count("get_forks_page"), 0);
    }

    #[tokio::test]
    async fn test_exactly_full_network_is_not_truncated() {
        let directory = InMemoryDirectory::new();
        directory.add_root("owner/root");
        directory.add_fork("owner/root", "a/leaf");
        directory.add_fork("owner/root", "b/leaf");
        let directory = Arc::new(directory);

        let collection = run(&directory, limits(3, 3)).await;
        assert_eq!(collection.repos.len(), 3);
        assert!(!collection.truncated);
    }

    #[tokio::test]
    async fn test_dedup_keeps_first_degree() {
        let directory = two_by_two();
        // fork2.1 is also reported by the root listing
        directory.also_list_under("owner/root", "d/fork2.1");
        let collection = run(&directory, limits(3, 100)).await;

        let names: Vec<_> = collection.repos.iter().map(|r| &r.node.full_name).collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());

        let seen = collection
            .repos
            .iter()
            .find(|r| r.node.full_name == "d/fork2.1")
            .unwrap();
        assert_eq!(seen.degree, 1);
    }

    #[tokio::test]
    async fn test_failed_listing_skips_subtree() {
        let directory = two_by_two();
        directory.fail_forks("a/fork1", DirectoryError::Network("connection reset".into()));
        let collection = run(&directory, limits(2, 100)).await;

        assert_eq!(
            degrees(&collection),
            vec![
                ("owner/root", 0),
                ("a/fork1", 1),
                ("b/fork2", 1),
                ("d/fork2.1", 2),
            ]
        );
        assert_eq!(collection.failures.len(), 1);
        assert_eq!(collection.failures[0].full_name, "a/fork1");
        assert_eq!(collection.failures[0].degree, 1);
        // no retry
        let attempts = directory
            .calls()
            .iter()
            .filter(|c| c.full_name == "a/fork1" && c.method == "get_forks_page")
            .count();
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let directory = two_by_two();
        directory.delay_forks("b/fork2", Duration::from_secs(2));
        let gate = Arc::new(RequestGate::new(4, Duration::from_millis(50)));
        let collector = ForkCollector::new(directory.clone(), gate, limits(2, 100)).unwrap();
        let root = directory.get_node("owner/root").await.unwrap();

        let collection = collector.collect(root, &CancellationToken::new()).await;

        assert_eq!(collection.repos.len(), 4);
        assert!(matches!(
            collection.failures[0].error,
            DirectoryError::Timeout { timeout_ms: 50 }
        ));
    }

    #[tokio::test]
    async fn test_pagination_until_short_page() {
        let directory = InMemoryDirectory::new().with_page_size(2);
        directory.add_root("owner/root");
        for i in 0..5 {
            directory.add_fork("owner/root", &format!("user{}/fork", i));
        }
        let directory = Arc::new(directory);

        let collection = run(&directory, limits(1, 100)).await;
        assert_eq!(collection.repos.len(), 6);
        assert_eq!(directory.call_count("get_forks_page"), 3);
    }

    #[tokio::test]
    async fn test_paging_stops_at_budget() {
        let directory = InMemoryDirectory::new().with_page_size(2);
        directory.add_root("owner/root");
        for i in 0..10 {
            directory.add_fork("owner/root", &format!("user{}/fork", i));
        }
        let directory = Arc::new(directory);

        let collection = run(&directory, limits(1, 3)).await;
        assert_eq!(collection.repos.len(), 3);
        assert!(collection.truncated);
        assert_eq!(directory.call_count("get_forks_page"), 1);
    }

    #[tokio::test]
    async fn test_cancelled_returns_accepted() {
        let directory = two_by_two();
        directory.delay_forks("a/fork1", Duration::from_secs(5));
        let collector = collector(directory.clone(), limits(3, 100));
        let root = directory.get_node("owner/root").await.unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let collection = collector.collect(root, &cancel).await;
        assert!(collection.cancelled);
        assert_eq!(
            degrees(&collection),
            vec![("owner/root", 0), ("a/fork1", 1), ("b/fork2", 1)]
        );
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let directory = InMemoryDirectory::new();
        directory.add_root("owner/root");
        for i in 0..12 {
            let name = format!("user{}/fork", i);
            directory.add_fork("owner/root", &name);
            directory.delay_forks(&name, Duration::from_millis(20));
        }
        let directory = Arc::new(directory);
        let gate = Arc::new(RequestGate::new(3, Duration::from_secs(5)));
        let collector = ForkCollector::new(directory.clone(), gate, limits(2, 100)).unwrap();
        let root = directory.get_node("owner/root").await.unwrap();

        let collection = collector.collect(root, &CancellationToken::new()).await;
        assert_eq!(collection.repos.len(), 13);
        assert!(directory.peak_in_flight() <= 3);
        assert!(directory.peak_in_flight() > 1);
    }

    #[test]
    fn test_invalid_limits() {
        let gate = Arc::new(RequestGate::new(1, Duration::from_secs(1)));
        let result = ForkCollector::new(Arc::new(InMemoryDirectory::new()), gate, limits(2, 0));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
