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

//! JSON document writer
//!
//! The four documents of a scan are validated together and serialized in
//! full before anything touches the output directory. Each file is written
//! to a temporary sibling and renamed into place.

use crate::error::{Result, ScanError};
use forkmonkey_core::CommunityViews;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const COMMUNITY_FILE: &str = "community_data.json";
pub const FAMILY_TREE_FILE: &str = "family_tree.json";
pub const LEADERBOARD_FILE: &str = "leaderboard.json";
pub const NETWORK_STATS_FILE: &str = "network_stats.json";

pub struct DocumentWriter {
    dir: PathBuf,
}

fn render<T: Serialize>(document: &'static str, value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|source| ScanError::Serialize { document, source })
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents).map_err(|source| ScanError::Write {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| ScanError::Write {
        path: path.to_path_buf(),
        source,
    })
}

impl DocumentWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write all four documents. Returns the paths written.
    pub fn write(&self, views: &CommunityViews) -> Result<Vec<PathBuf>> {
        views.validate()?;

        let documents = [
            (COMMUNITY_FILE, render("community", &views.community)?),
            (FAMILY_TREE_FILE, render("family tree", &views.family_tree)?),
            (LEADERBOARD_FILE, render("leaderboard", &views.leaderboard)?),
            (NETWORK_STATS_FILE, render("network stats", &views.network_stats)?),
        ];

        std::fs::create_dir_all(&self.dir).map_err(|source| ScanError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let mut written = Vec::with_capacity(documents.len());
        for (name, contents) in documents {
            let path = self.dir.join(name);
            write_atomic(&path, &contents)?;
            tracing::info!(path = %path.display(), bytes = contents.len(), "Wrote document");
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use forkmonkey_core::{CreatureRecord, RecordInputs, RepositoryNode};
    use tempfile::TempDir;

    fn views() -> CommunityViews {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let root = RepositoryNode::new("owner/root", at, at);
        let fork = RepositoryNode::new("user/fork", at, at).forked_from("owner/root");
        let records = [(&root, 0), (&fork, 1)]
            .into_iter()
            .map(|(node, degree)| {
                CreatureRecord::assemble(RecordInputs {
                    repository: node,
                    root_full_name: "owner/root",
                    degree,
                    marker: br#"{"generation": 1, "rarity_score": 42.5}"#,
                    svg: None,
                    dna: None,
                    scan_time: at,
                })
                .unwrap()
            })
            .collect();
        CommunityViews::build("owner/root", records, at, Duration::hours(24)).unwrap()
    }

    #[test]
    fn test_writes_four_documents() {
        let temp = TempDir::new().unwrap();
        let writer = DocumentWriter::new(temp.path().join("web"));

        let written = writer.write(&views()).unwrap();
        assert_eq!(written.len(), 4);

        let read = |name: &str| -> serde_json::Value {
            let text = std::fs::read_to_string(writer.dir().join(name)).unwrap();
            serde_json::from_str(&text).unwrap()
        };
        let community = read(COMMUNITY_FILE);
        let tree = read(FAMILY_TREE_FILE);
        let leaderboard = read(LEADERBOARD_FILE);
        let stats = read(NETWORK_STATS_FILE);

        assert_eq!(community["total_forks"], 2);
        assert_eq!(tree["total_nodes"], 2);
        assert_eq!(leaderboard["total_ranked"], 2);
        assert_eq!(stats["total_monkeys"], 2);
        assert_eq!(community["forks"][1]["degree_label"], "1st degree");
        assert_eq!(community["last_updated"], leaderboard["last_updated"]);

        let leftovers = std::fs::read_dir(writer.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |x| x == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_inconsistent_views_write_nothing() {
        let temp = TempDir::new().unwrap();
        let writer = DocumentWriter::new(temp.path().join("web"));

        let mut views = views();
        views.leaderboard.total_ranked = 5;

        assert!(matches!(writer.write(&views), Err(ScanError::Invariant(_))));
        assert!(!writer.dir().exists());
    }

    #[test]
    fn test_overwrites_previous_scan() {
        let temp = TempDir::new().unwrap();
        let writer = DocumentWriter::new(temp.path());
        writer.write(&views()).unwrap();

        let mut next = views();
        next.community.source_repo = "owner/renamed".to_string();
        writer.write(&next).unwrap();

        let text = std::fs::read_to_string(temp.path().join(COMMUNITY_FILE)).unwrap();
        assert!(text.contains("owner/renamed"));
    }
}
