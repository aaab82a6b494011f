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

//! Error types for record assembly and aggregation

use thiserror::Error;

/// Result type for aggregate construction
pub type Result<T> = std::result::Result<T, InvariantViolation>;

/// A structural invariant did not hold while building an aggregate view.
///
/// These are fatal for the document being produced: callers must not
/// persist a view that failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("No root record in scan")]
    MissingRoot,

    #[error("Multiple root records: {0:?}")]
    MultipleRoots(Vec<String>),

    #[error("Root record {full_name} is inconsistent: {reason}")]
    MalformedRoot { full_name: String, reason: String },

    #[error("Duplicate record for {0}")]
    DuplicateRecord(String),

    #[error("Non-root record {0} has no parent")]
    MissingParent(String),

    #[error("Lineage cycle detected involving {0}")]
    LineageCycle(String),

    #[error("Child {child} listed under {listed_under} but records parent {recorded:?}")]
    ParentChildMismatch {
        child: String,
        listed_under: String,
        recorded: Option<String>,
    },

    #[error("Leaderboard rank {found} at position {position}, expected {expected}")]
    RankOutOfSequence {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("Leaderboard not sorted at position {position}: {current} < {next}")]
    UnsortedRanking {
        position: usize,
        current: f64,
        next: f64,
    },

    #[error("Trait category {category} sums to {sum}, expected {expected}")]
    TraitSumMismatch {
        category: String,
        sum: usize,
        expected: usize,
    },

    #[error("Rarity statistics out of order: min={min}, avg={avg}, max={max}")]
    RarityOrder { min: f64, avg: f64, max: f64 },

    #[error("active_today ({active}) exceeds total_monkeys ({total})")]
    ActiveExceedsTotal { active: usize, total: usize },

    #[error("{which} trait {category}/{value} does not carry the extreme count")]
    TraitHighlight {
        which: &'static str,
        category: String,
        value: String,
    },

    #[error("{field} is {found}, expected {expected}")]
    CountMismatch {
        field: &'static str,
        found: usize,
        expected: usize,
    },
}

/// Marker payload could not be decoded into creature stats.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Invalid marker JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Generation must be a positive 32-bit integer, got {0}")]
    InvalidGeneration(i64),

    #[error("Rarity score must be a finite non-negative number, got {0}")]
    InvalidRarityScore(f64),
}
