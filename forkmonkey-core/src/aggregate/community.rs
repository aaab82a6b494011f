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

use super::family_tree::FamilyTreeDocument;
use super::leaderboard::LeaderboardDocument;
use super::network_stats::NetworkStatsDocument;
use crate::error::{InvariantViolation, Result};
use crate::record::CreatureRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Every record of a scan, in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityDocument {
    pub last_updated: DateTime<Utc>,
    pub source_repo: String,
    pub total_forks: usize,
    pub forks: Vec<CreatureRecord>,
}

impl CommunityDocument {
    pub fn validate(&self) -> Result<()> {
        if self.total_forks != self.forks.len() {
            return Err(InvariantViolation::CountMismatch {
                field: "total_forks",
                found: self.total_forks,
                expected: self.forks.len(),
            });
        }
        Ok(())
    }
}

/// The four documents of one scan. Always built and written together.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityViews {
    pub community: CommunityDocument,
    pub leaderboard: LeaderboardDocument,
    pub family_tree: FamilyTreeDocument,
    pub network_stats: NetworkStatsDocument,
}

impl CommunityViews {
    /// Build all views from the full record set with one shared timestamp.
    pub fn build(
        source_repo: &str,
        records: Vec<CreatureRecord>,
        scan_time: DateTime<Utc>,
        active_window: Duration,
    ) -> Result<Self> {
        let leaderboard = LeaderboardDocument::build(&records, scan_time)?;
        let family_tree = FamilyTreeDocument::build(&records, scan_time)?;
        let network_stats = NetworkStatsDocument::build(&records, scan_time, active_window)?;
        let community = CommunityDocument {
            last_updated: scan_time,
            source_repo: source_repo.to_string(),
            total_forks: records.len(),
            forks: records,
        };

        let views = Self {
            community,
            leaderboard,
            family_tree,
            network_stats,
        };
        views.validate()?;
        Ok(views)
    }

    /// Check each document and the totals that must agree across them.
    pub fn validate(&self) -> Result<()> {
        self.community.validate()?;
        self.leaderboard.validate()?;
        self.family_tree.validate()?;
        self.network_stats.validate()?;

        let expected = self.community.total_forks;
        for (field, found) in [
            ("total_nodes", self.family_tree.total_nodes),
            ("total_ranked", self.leaderboard.total_ranked),
            ("total_monkeys", self.network_stats.total_monkeys),
        ] {
            if found != expected {
                return Err(InvariantViolation::CountMismatch {
                    field,
                    found,
                    expected,
                });
            }
        }
        Ok(())
    }

    pub fn total(&self) -> usize {
        self.community.total_forks
    }
}
