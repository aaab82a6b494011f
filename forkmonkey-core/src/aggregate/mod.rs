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

//! Aggregate views over a scan's record set
//!
//! Each view is a pure reduction over the complete set of records and checks
//! its own invariants before it is returned. [`CommunityViews`] builds all of
//! them together and checks the totals that must agree across documents.

pub mod community;
pub mod family_tree;
pub mod leaderboard;
pub mod network_stats;

pub use community::{CommunityDocument, CommunityViews};
pub use family_tree::{FamilyTreeDocument, FamilyTreeNode};
pub use leaderboard::{LeaderboardDocument, LeaderboardEntry};
pub use network_stats::{NetworkStatsDocument, TraitDistribution, TraitHighlight};

#[cfg(test)]
pub(crate) mod testing {
    use crate::degree::degree_label;
    use crate::dna::DnaSeed;
    use crate::record::{CreatureRecord, MonkeyStats};
    use crate::repository::split_full_name;
    use chrono::{DateTime, TimeZone, Utc};

    pub fn scan_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    pub fn record(
        full_name: &str,
        parent: Option<&str>,
        degree: u32,
        generation: u32,
        rarity_score: f64,
    ) -> CreatureRecord {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let seed = DnaSeed::derive(full_name, &created_at, b"{}");
        let (owner, repo) = split_full_name(full_name);
        CreatureRecord {
            owner,
            repo,
            full_name: full_name.to_string(),
            url: format!("https://github.com/{}", full_name),
            is_root: degree == 0,
            degree,
            degree_label: degree_label(degree),
            parent: parent.map(str::to_string),
            created_at,
            updated_at: scan_time(),
            monkey_stats: MonkeyStats {
                dna_hash: seed.dna_hash(),
                generation,
                age_days: 182,
                mutation_count: seed.derive_mutation_count(generation),
                rarity_score,
                parent_id: None,
                traits: seed.derive_traits(),
            },
            monkey_svg: String::new(),
            monkey_dna: serde_json::json!({}),
        }
    }
}
