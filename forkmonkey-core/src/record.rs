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

//! Creature records
//!
//! A [`CreatureRecord`] is the durable unit of scan output. It is assembled
//! from repository metadata, the BFS degree the repository was found at, and
//! the marker payload committed to the repository. Fields the payload leaves
//! out are filled from the repository's [`DnaSeed`].

use crate::degree::degree_label;
use crate::dna::DnaSeed;
use crate::error::PayloadError;
use crate::repository::RepositoryNode;
use crate::traits::{Trait, TraitCategory, Traits};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker file whose presence makes a repository a participant.
pub const MARKER_FILE_PATH: &str = "monkey_data/stats.json";
/// Optional rendered creature.
pub const SVG_FILE_PATH: &str = "monkey_data/monkey.svg";
/// Optional free-form DNA document.
pub const DNA_FILE_PATH: &str = "monkey_data/dna.json";

/// Decoded marker payload.
///
/// Only `generation` and `rarity_score` are required.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerPayload {
    pub generation: i64,
    pub rarity_score: f64,
    #[serde(default)]
    pub dna_hash: Option<String>,
    #[serde(default)]
    pub mutation_count: Option<u32>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub traits: PartialTraits,
}

/// Traits as committed in a marker; any category may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialTraits {
    pub body_color: Option<Trait>,
    pub face_expression: Option<Trait>,
    pub accessory: Option<Trait>,
    pub pattern: Option<Trait>,
    pub background: Option<Trait>,
    pub special: Option<Trait>,
}

impl PartialTraits {
    fn get(&self, category: TraitCategory) -> Option<&Trait> {
        match category {
            TraitCategory::BodyColor => self.body_color.as_ref(),
            TraitCategory::FaceExpression => self.face_expression.as_ref(),
            TraitCategory::Accessory => self.accessory.as_ref(),
            TraitCategory::Pattern => self.pattern.as_ref(),
            TraitCategory::Background => self.background.as_ref(),
            TraitCategory::Special => self.special.as_ref(),
        }
    }

    /// Fill every missing category from the seed.
    fn complete(&self, seed: &DnaSeed) -> Traits {
        let mut traits = seed.derive_traits();
        for category in TraitCategory::ALL {
            if let Some(committed) = self.get(category) {
                *traits.get_mut(category) = committed.clone();
            }
        }
        traits
    }
}

impl MarkerPayload {
    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        let payload: MarkerPayload = serde_json::from_slice(bytes)?;
        if payload.generation <= 0 || u32::try_from(payload.generation).is_err() {
            return Err(PayloadError::InvalidGeneration(payload.generation));
        }
        if !payload.rarity_score.is_finite() || payload.rarity_score < 0.0 {
            return Err(PayloadError::InvalidRarityScore(payload.rarity_score));
        }
        Ok(payload)
    }
}

/// Derived stats block of a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonkeyStats {
    pub dna_hash: String,
    pub generation: u32,
    pub age_days: u32,
    pub mutation_count: u32,
    pub rarity_score: f64,
    pub parent_id: Option<String>,
    pub traits: Traits,
}

/// One participating repository in the fork network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub owner: String,
    pub repo: String,
    pub full_name: String,
    pub url: String,
    pub is_root: bool,
    pub degree: u32,
    pub degree_label: String,
    pub parent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub monkey_stats: MonkeyStats,
    /// Rendered creature, passed through untouched
    #[serde(default)]
    pub monkey_svg: String,
    #[serde(default = "empty_object")]
    pub monkey_dna: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Everything needed to assemble a record for one repository.
#[derive(Debug, Clone)]
pub struct RecordInputs<'a> {
    pub repository: &'a RepositoryNode,
    pub root_full_name: &'a str,
    pub degree: u32,
    /// Raw marker bytes
    pub marker: &'a [u8],
    pub svg: Option<String>,
    pub dna: Option<serde_json::Value>,
    pub scan_time: DateTime<Utc>,
}

impl CreatureRecord {
    /// Decode the marker and build the record.
    ///
    /// Deterministic: identical inputs always produce an identical record.
    pub fn assemble(inputs: RecordInputs<'_>) -> Result<Self, PayloadError> {
        let repo = inputs.repository;
        let payload = MarkerPayload::decode(inputs.marker)?;
        let seed = DnaSeed::derive(&repo.full_name, &repo.created_at, inputs.marker);

        // decode() guarantees the range
        let generation = payload.generation as u32;
        let age_days = (inputs.scan_time - repo.created_at).num_days().max(0);

        let monkey_stats = MonkeyStats {
            dna_hash: payload
                .dna_hash
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| seed.dna_hash()),
            generation,
            age_days: u32::try_from(age_days).unwrap_or(u32::MAX),
            mutation_count: payload
                .mutation_count
                .unwrap_or_else(|| seed.derive_mutation_count(generation)),
            rarity_score: payload.rarity_score,
            parent_id: payload.parent_id,
            traits: payload.traits.complete(&seed),
        };

        let is_root = inputs.degree == 0;
        let parent = if is_root {
            None
        } else {
            Some(
                repo.parent
                    .clone()
                    .unwrap_or_else(|| inputs.root_full_name.to_string()),
            )
        };

        Ok(Self {
            owner: repo.owner.clone(),
            repo: repo.name.clone(),
            full_name: repo.full_name.clone(),
            url: repo.url.clone(),
            is_root,
            degree: inputs.degree,
            degree_label: degree_label(inputs.degree),
            parent,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            monkey_stats,
            monkey_svg: inputs.svg.unwrap_or_default(),
            monkey_dna: inputs
                .dna
                .filter(|v| v.is_object())
                .unwrap_or_else(empty_object),
        })
    }
}
