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

//! Rarity leaderboard
//!
//! Records are ordered by `rarity_score` descending. Equal scores fall back to
//! lower degree first, then `full_name` ascending, so the order never depends
//! on discovery timing. Ranks are positional: `rankings[i].rank == i + 1`.

use crate::error::{InvariantViolation, Result};
use crate::record::CreatureRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub owner: String,
    pub repo: String,
    pub full_name: String,
    pub url: String,
    pub rarity_score: f64,
    pub generation: u32,
    pub age_days: u32,
    pub mutation_count: u32,
    pub is_root: bool,
    pub degree: u32,
    pub degree_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monkey_svg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardDocument {
    pub last_updated: DateTime<Utc>,
    pub total_ranked: usize,
    pub rankings: Vec<LeaderboardEntry>,
}

fn ranking_order(a: &CreatureRecord, b: &CreatureRecord) -> Ordering {
    b.monkey_stats
        .rarity_score
        .total_cmp(&a.monkey_stats.rarity_score)
        .then_with(|| a.degree.cmp(&b.degree))
        .then_with(|| a.full_name.cmp(&b.full_name))
}

impl LeaderboardEntry {
    fn from_record(rank: usize, record: &CreatureRecord) -> Self {
        Self {
            rank,
            owner: record.owner.clone(),
            repo: record.repo.clone(),
            full_name: record.full_name.clone(),
            url: record.url.clone(),
            rarity_score: record.monkey_stats.rarity_score,
            generation: record.monkey_stats.generation,
            age_days: record.monkey_stats.age_days,
            mutation_count: record.monkey_stats.mutation_count,
            is_root: record.is_root,
            degree: record.degree,
            degree_label: record.degree_label.clone(),
            monkey_svg: Some(record.monkey_svg.clone()).filter(|svg| !svg.is_empty()),
        }
    }
}

impl LeaderboardDocument {
    pub fn build(records: &[CreatureRecord], last_updated: DateTime<Utc>) -> Result<Self> {
        let mut ordered: Vec<&CreatureRecord> = records.iter().collect();
        ordered.sort_by(|a, b| ranking_order(a, b));

        let rankings: Vec<LeaderboardEntry> = ordered
            .into_iter()
            .enumerate()
            .map(|(i, record)| LeaderboardEntry::from_record(i + 1, record))
            .collect();

        let document = Self {
            last_updated,
            total_ranked: rankings.len(),
            rankings,
        };
        document.validate()?;
        Ok(document)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_ranked != self.rankings.len() {
            return Err(InvariantViolation::CountMismatch {
                field: "total_ranked",
                found: self.total_ranked,
                expected: self.rankings.len(),
            });
        }
        for (position, entry) in self.rankings.iter().enumerate() {
            if entry.rank != position + 1 {
                return Err(InvariantViolation::RankOutOfSequence {
                    position,
                    expected: position + 1,
                    found: entry.rank,
                });
            }
        }
        for (position, pair) in self.rankings.windows(2).enumerate() {
            if pair[0].rarity_score < pair[1].rarity_score {
                return Err(InvariantViolation::UnsortedRanking {
                    position,
                    current: pair[0].rarity_score,
                    next: pair[1].rarity_score,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::testing::{record, scan_time};

    #[test]
    fn test_sorted_by_rarity_descending() {
        let records = vec![
            record("owner/root", None, 0, 1, 60.0),
            record("user1/fork1", Some("owner/root"), 1, 2, 100.0),
            record("user2/fork2", Some("owner/root"), 1, 2, 80.0),
        ];
        let board = LeaderboardDocument::build(&records, scan_time()).unwrap();

        let names: Vec<_> = board.rankings.iter().map(|e| e.full_name.as_str()).collect();
        assert_eq!(names, vec!["user1/fork1", "user2/fork2", "owner/root"]);
        assert_eq!(board.total_ranked, 3);
        for (i, entry) in board.rankings.iter().enumerate() {
            assert_eq!(entry.rank, i + 1);
        }
    }

    #[test]
    fn test_ties_break_on_degree_then_name() {
        let records = vec![
            record("zed/fork", Some("owner/root"), 1, 2, 50.0),
            record("amy/fork", Some("zed/fork"), 2, 3, 50.0),
            record("owner/root", None, 0, 1, 50.0),
            record("bob/fork", Some("owner/root"), 1, 2, 50.0),
        ];
        let board = LeaderboardDocument::build(&records, scan_time()).unwrap();

        let names: Vec<_> = board.rankings.iter().map(|e| e.full_name.as_str()).collect();
        assert_eq!(names, vec!["owner/root", "bob/fork", "zed/fork", "amy/fork"]);
    }

    #[test]
    fn test_svg_only_when_present() {
        let mut with_svg = record("owner/root", None, 0, 1, 10.0);
        with_svg.monkey_svg = "<svg></svg>".to_string();
        let without_svg = record("user1/fork1", Some("owner/root"), 1, 2, 5.0);
        let board = LeaderboardDocument::build(&[with_svg, without_svg], scan_time()).unwrap();

        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json["rankings"][0]["monkey_svg"], "<svg></svg>");
        assert!(json["rankings"][1].get("monkey_svg").is_none());
    }

    #[test]
    fn test_validate_rejects_tampered_document() {
        let records = vec![
            record("owner/root", None, 0, 1, 60.0),
            record("user1/fork1", Some("owner/root"), 1, 2, 100.0),
        ];
        let mut board = LeaderboardDocument::build(&records, scan_time()).unwrap();
        board.rankings.swap(0, 1);
        assert!(matches!(
            board.validate(),
            Err(InvariantViolation::RankOutOfSequence { .. })
        ));

        board.rankings[0].rank = 1;
        board.rankings[1].rank = 2;
        assert!(matches!(
            board.validate(),
            Err(InvariantViolation::UnsortedRanking { .. })
        ));

        board.total_ranked = 5;
        assert!(matches!(
            board.validate(),
            Err(InvariantViolation::CountMismatch { .. })
        ));
    }
}
