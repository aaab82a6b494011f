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

//! Property-based tests for labeling, derivation and the aggregate views.

use chrono::{DateTime, Duration, TimeZone, Utc};
use forkmonkey_core::{
    degree_label, CommunityViews, CreatureRecord, DnaSeed, RecordInputs, RepositoryNode,
    TraitCategory,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn scan_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
}

/// A random fork tree: node `i > 0` hangs under some earlier node.
fn fork_tree() -> impl Strategy<Value = Vec<(Option<usize>, u32, u32, u32)>> {
    (1usize..40).prop_flat_map(|n| {
        prop::collection::vec((any::<prop::sample::Index>(), 1u32..6, 0u32..1000, 0u32..400), n)
            .prop_map(|nodes| {
                nodes
                    .into_iter()
                    .enumerate()
                    .map(|(i, (parent, generation, score, age))| {
                        let parent = if i == 0 { None } else { Some(parent.index(i)) };
                        (parent, generation, score, age)
                    })
                    .collect()
            })
    })
}

fn build_records(tree: &[(Option<usize>, u32, u32, u32)]) -> Vec<CreatureRecord> {
    let mut degrees: Vec<u32> = Vec::with_capacity(tree.len());
    let mut records = Vec::with_capacity(tree.len());

    for (i, (parent, generation, score, age)) in tree.iter().enumerate() {
        let degree = parent.map(|p| degrees[p] + 1).unwrap_or(0);
        degrees.push(degree);

        let created_at = scan_time() - Duration::days(i64::from(*age));
        let mut node = RepositoryNode::new(format!("user{}/monkey", i), created_at, created_at);
        if let Some(p) = parent {
            node = node.forked_from(format!("user{}/monkey", p));
        }
        let marker = format!(
            r#"{{"generation": {}, "rarity_score": {}}}"#,
            generation,
            f64::from(*score) / 10.0
        );
        let record = CreatureRecord::assemble(RecordInputs {
            repository: &node,
            root_full_name: "user0/monkey",
            degree,
            marker: marker.as_bytes(),
            svg: None,
            dna: None,
            scan_time: scan_time(),
        })
        .expect("generated marker is valid");
        records.push(record);
    }
    records
}

proptest! {
    #[test]
    fn test_higher_degree_labels(d in 4u32..100_000) {
        prop_assert_eq!(degree_label(d), format!("{}th degree", d));
    }

    #[test]
    fn test_derived_traits_are_reproducible(name in "[a-z]{1,12}/[a-z]{1,12}", payload in ".{0,64}") {
        let created = scan_time();
        let a = DnaSeed::derive(&name, &created, payload.as_bytes());
        let b = DnaSeed::derive(&name, &created, payload.as_bytes());
        prop_assert_eq!(a.derive_traits(), b.derive_traits());
        for (category, t) in a.derive_traits().iter() {
            prop_assert!(category.values(t.rarity).contains(&t.value.as_str()));
        }
    }

    #[test]
    fn test_views_hold_invariants(tree in fork_tree()) {
        let records = build_records(&tree);
        let views = CommunityViews::build("user0/monkey", records.clone(), scan_time(), Duration::hours(24))
            .expect("generated tree is consistent");

        // one root
        let roots: Vec<_> = views.community.forks.iter().filter(|r| r.is_root).collect();
        prop_assert_eq!(roots.len(), 1);
        prop_assert_eq!(roots[0].parent.clone(), None);
        prop_assert_eq!(roots[0].degree_label.as_str(), "root");

        // leaderboard ordering
        for (i, entry) in views.leaderboard.rankings.iter().enumerate() {
            prop_assert_eq!(entry.rank, i + 1);
        }
        for pair in views.leaderboard.rankings.windows(2) {
            prop_assert!(pair[0].rarity_score >= pair[1].rarity_score);
        }

        // family tree inverse relation
        let parents: HashMap<&str, Option<&str>> = views
            .family_tree
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.parent.as_deref()))
            .collect();
        for node in &views.family_tree.nodes {
            for child in &node.children {
                prop_assert_eq!(parents[child.as_str()], Some(node.id.as_str()));
            }
        }

        // histograms
        let stats = &views.network_stats;
        for category in TraitCategory::ALL {
            let sum: usize = stats.trait_distribution[&category].values().sum();
            prop_assert_eq!(sum, stats.total_monkeys);
        }
        let rarest = stats.rarest_trait.clone().expect("non-empty network");
        let min = stats.trait_distribution[&rarest.category].values().copied().min();
        prop_assert_eq!(Some(rarest.count), min);
        let common = stats.most_common_trait.clone().expect("non-empty network");
        let max = stats.trait_distribution[&common.category].values().copied().max();
        prop_assert_eq!(Some(common.count), max);
        prop_assert!(stats.min_rarity <= stats.avg_rarity && stats.avg_rarity <= stats.max_rarity);

        // cross-document totals
        prop_assert_eq!(views.community.total_forks, views.family_tree.total_nodes);
        prop_assert_eq!(views.family_tree.total_nodes, views.leaderboard.total_ranked);
        prop_assert_eq!(views.leaderboard.total_ranked, stats.total_monkeys);

        // idempotent for identical inputs
        let again = CommunityViews::build("user0/monkey", records, scan_time(), Duration::hours(24))
            .expect("second build");
        prop_assert_eq!(
            serde_json::to_string(&views.leaderboard).unwrap(),
            serde_json::to_string(&again.leaderboard).unwrap()
        );
        prop_assert_eq!(
            serde_json::to_string(&views.network_stats).unwrap(),
            serde_json::to_string(&again.network_stats).unwrap()
        );
        prop_assert_eq!(views.family_tree, again.family_tree);
    }
}
