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

//! Scan pipeline
//!
//! Resolve the source repository, collect its fork network, extract a
//! record from every collected repository, then hand the record set to the
//! aggregators. Partial results (failed listings, unreadable markers, a
//! cancelled scan) are reported in the [`ScanSummary`] rather than raised.

use crate::collector::{CollectorLimits, FetchFailure, ForkCollector};
use crate::config::ScannerConfig;
use crate::directory::DirectoryClient;
use crate::error::{ConfigError, Result, ScanError};
use crate::extractor::{Extraction, RecordExtractor};
use crate::gate::RequestGate;
use chrono::{DateTime, Utc};
use forkmonkey_core::{CommunityViews, CreatureRecord, InvariantViolation};
use futures::StreamExt;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Counts reported at the end of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Repositories accepted by the collector
    pub collected: usize,
    /// Repositories that produced a record
    pub records: usize,
    /// No marker file
    pub skipped_missing: usize,
    /// Marker present but undecodable
    pub skipped_malformed: usize,
    /// Marker fetch failed
    pub extraction_failures: usize,
    /// Fork listings that failed or timed out
    pub fetch_failures: usize,
    /// Collected but never extracted because the scan was cancelled
    pub unprocessed: usize,
    pub cancelled: bool,
    pub truncated: bool,
}

impl ScanSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_missing + self.skipped_malformed
    }

    pub fn failed(&self) -> usize {
        self.extraction_failures + self.fetch_failures
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "collected {} repositories: {} records, {} skipped ({} without marker, {} malformed), {} failed ({} marker fetches, {} fork listings)",
            self.collected,
            self.records,
            self.skipped(),
            self.skipped_missing,
            self.skipped_malformed,
            self.failed(),
            self.extraction_failures,
            self.fetch_failures,
        )?;
        if self.unprocessed > 0 {
            write!(f, ", {} not processed", self.unprocessed)?;
        }
        if self.truncated {
            write!(f, ", truncated at max_total")?;
        }
        if self.cancelled {
            write!(f, ", cancelled")?;
        }
        Ok(())
    }
}

/// Everything one scan produced.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Canonical full name of the root repository
    pub source_repo: String,
    pub scan_time: DateTime<Utc>,
    pub summary: ScanSummary,
    /// Records in discovery order, root first
    pub records: Vec<CreatureRecord>,
    pub fetch_failures: Vec<FetchFailure>,
}

impl ScanReport {
    /// Build the four documents, all stamped with the scan time.
    pub fn into_views(
        self,
        active_window: chrono::Duration,
    ) -> std::result::Result<CommunityViews, InvariantViolation> {
        CommunityViews::build(&self.source_repo, self.records, self.scan_time, active_window)
    }
}

pub struct Scanner {
    client: Arc<dyn DirectoryClient>,
    gate: Arc<RequestGate>,
    collector: ForkCollector,
    extractor: RecordExtractor,
    source_repo: String,
    active_window: chrono::Duration,
}

impl Scanner {
    /// Validate `config` and wire the pipeline. Makes no remote calls.
    pub fn new(
        client: Arc<dyn DirectoryClient>,
        config: &ScannerConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let gate = Arc::new(RequestGate::new(
            config.directory.max_concurrent_requests,
            config.directory.request_timeout(),
        ));
        let collector = ForkCollector::new(
            client.clone(),
            gate.clone(),
            CollectorLimits {
                max_depth: config.scan.max_depth,
                max_total: config.scan.max_total,
                max_fork_pages: config.directory.max_fork_pages,
            },
        )?;
        let extractor = RecordExtractor::new(client.clone(), gate.clone());

        Ok(Self {
            client,
            gate,
            collector,
            extractor,
            source_repo: config.scan.source_repo.clone(),
            active_window: config.scan.active_window(),
        })
    }

    pub fn active_window(&self) -> chrono::Duration {
        self.active_window
    }

    pub async fn scan(&self, cancel: &CancellationToken) -> Result<ScanReport> {
        self.scan_at(Utc::now(), cancel).await
    }

    /// Scan with a fixed scan time.
    pub async fn scan_at(
        &self,
        scan_time: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<ScanReport> {
        tracing::info!(
            source_repo = %self.source_repo,
            max_depth = self.collector.limits().max_depth,
            max_total = self.collector.limits().max_total,
            "Starting fork network scan"
        );

        let root = self
            .gate
            .run(self.client.get_node(&self.source_repo))
            .await
            .map_err(|source| ScanError::Root {
                full_name: self.source_repo.clone(),
                source,
            })?;
        let source_repo = root.full_name.clone();

        let collection = self.collector.collect(root, cancel).await;
        let mut summary = ScanSummary {
            collected: collection.repos.len(),
            fetch_failures: collection.failures.len(),
            cancelled: collection.cancelled,
            truncated: collection.truncated,
            ..ScanSummary::default()
        };

        let mut records = Vec::new();
        if !summary.cancelled {
            let extractor = &self.extractor;
            let root_name = source_repo.as_str();
            let extractions = futures::stream::iter(&collection.repos)
                .map(move |repo| extractor.extract(&repo.node, root_name, repo.degree, scan_time))
                .buffered(self.gate.max_concurrent());
            tokio::pin!(extractions);

            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => {
                        summary.cancelled = true;
                        break;
                    }
                    next = extractions.next() => next,
                };
                let Some(extraction) = next else {
                    break;
                };
                match extraction {
                    Extraction::Record(record) => records.push(*record),
                    Extraction::Missing => summary.skipped_missing += 1,
                    Extraction::Malformed(_) => summary.skipped_malformed += 1,
                    Extraction::Failed(_) => summary.extraction_failures += 1,
                }
            }
        }
        summary.records = records.len();
        summary.unprocessed = summary
            .collected
            .saturating_sub(summary.records + summary.skipped() + summary.extraction_failures);

        tracing::info!(
            source_repo = %source_repo,
            collected = summary.collected,
            records = summary.records,
            skipped = summary.skipped(),
            failed = summary.failed(),
            unprocessed = summary.unprocessed,
            cancelled = summary.cancelled,
            truncated = summary.truncated,
            "Scan complete"
        );

        Ok(ScanReport {
            source_repo,
            scan_time,
            summary,
            records,
            fetch_failures: collection.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::error::DirectoryError;
    use chrono::TimeZone;
    use forkmonkey_core::MARKER_FILE_PATH;

    fn scan_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn config() -> ScannerConfig {
        let mut config = ScannerConfig::default();
        config.scan.source_repo = "owner/root".to_string();
        config
    }

    fn network() -> Arc<InMemoryDirectory> {
        let directory = InMemoryDirectory::new();
        directory.add_root("owner/root");
        directory.add_fork("owner/root", "a/fork1");
        directory.add_fork("owner/root", "b/fork2");
        directory.add_fork("a/fork1", "c/fork1.1");
        directory.set_marker("owner/root", 1, 80.0);
        directory.set_marker("a/fork1", 2, 60.0);
        directory.set_marker("c/fork1.1", 3, 95.0);
        Arc::new(directory)
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let directory = network();
        directory.set_file("b/fork2", MARKER_FILE_PATH, "{broken");
        let scanner = Scanner::new(directory, &config()).unwrap();

        let report = scanner
            .scan_at(scan_time(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            report.summary,
            ScanSummary {
                collected: 4,
                records: 3,
                skipped_missing: 0,
                skipped_malformed: 1,
                extraction_failures: 0,
                fetch_failures: 0,
                unprocessed: 0,
                cancelled: false,
                truncated: false,
            }
        );
        let names: Vec<_> = report.records.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["owner/root", "a/fork1", "c/fork1.1"]);
    }

    #[tokio::test]
    async fn test_views_from_report() {
        let scanner = Scanner::new(network(), &config()).unwrap();
        let report = scanner
            .scan_at(scan_time(), &CancellationToken::new())
            .await
            .unwrap();
        let views = report.into_views(scanner.active_window()).unwrap();

        assert_eq!(views.total(), 3);
        assert_eq!(views.leaderboard.rankings[0].full_name, "c/fork1.1");
        assert_eq!(views.family_tree.root, "owner/root");
        assert_eq!(views.network_stats.active_today, 3);
    }

    #[tokio::test]
    async fn test_invalid_config_makes_no_calls() {
        let directory = network();
        let mut config = config();
        config.scan.max_total = 0;

        assert!(Scanner::new(directory.clone(), &config).is_err());
        assert!(directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_source_is_fatal() {
        let mut config = config();
        config.scan.source_repo = "ghost/repo".to_string();
        let scanner = Scanner::new(network(), &config).unwrap();

        let err = scanner
            .scan_at(scan_time(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::Root {
                source: DirectoryError::NotFound(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let scanner = Scanner::new(network(), &config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = scanner.scan_at(scan_time(), &cancel).await.unwrap();
        assert!(report.summary.cancelled);
        assert_eq!(report.summary.collected, 1);
        assert_eq!(report.summary.unprocessed, 1);
        assert!(report.records.is_empty());
        assert!(report.summary.to_string().contains("1 not processed"));
    }

    #[test]
    fn test_summary_display() {
        let summary = ScanSummary {
            collected: 10,
            records: 6,
            skipped_missing: 2,
            skipped_malformed: 1,
            extraction_failures: 1,
            fetch_failures: 0,
            unprocessed: 0,
            cancelled: false,
            truncated: true,
        };
        let text = summary.to_string();
        assert!(text.starts_with("collected 10 repositories: 6 records, 3 skipped"));
        assert!(text.contains("1 failed"));
        assert!(text.ends_with("truncated at max_total"));
    }
}
