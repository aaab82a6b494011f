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

//! Procedural DNA derivation
//!
//! Every derived attribute is a pure function of a seed built from stable
//! repository identity and the marker payload bytes:
//!
//! ```text
//! seed = BLAKE3("forkmonkey-dna" || version || full_name || 0 || created_at || 0 || payload)
//!
//! bytes  0..12  six little-endian u16 rarity rolls, one per category
//! bytes 12..18  six value picks, one per category
//! byte  18      mutation jitter
//! ```
//!
//! Bumping [`DNA_VERSION`] changes every derived value, so it must only move
//! together with a deliberate re-roll of the network.

use crate::traits::{Rarity, Trait, TraitCategory, Traits};
use chrono::{DateTime, SecondsFormat, Utc};

/// Version of the derivation function mixed into every seed.
pub const DNA_VERSION: u8 = 1;

const DOMAIN_TAG: &[u8] = b"forkmonkey-dna";
const ROLL_OFFSET: usize = 0;
const PICK_OFFSET: usize = 12;
const MUTATION_OFFSET: usize = 18;

/// Seed for one repository's derived attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnaSeed([u8; 32]);

impl DnaSeed {
    pub fn derive(full_name: &str, created_at: &DateTime<Utc>, payload: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(&[DNA_VERSION]);
        hasher.update(full_name.as_bytes());
        hasher.update(&[0]);
        hasher.update(
            created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true)
                .as_bytes(),
        );
        hasher.update(&[0]);
        hasher.update(payload);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Stable 32 character hex digest identifying this creature.
    pub fn dna_hash(&self) -> String {
        hex::encode(&self.0[..16])
    }

    fn category_index(category: TraitCategory) -> usize {
        TraitCategory::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or(0)
    }

    /// Tier and value for a single category.
    pub fn derive_trait(&self, category: TraitCategory) -> Trait {
        let i = Self::category_index(category);
        let roll = u16::from_le_bytes([
            self.0[ROLL_OFFSET + 2 * i],
            self.0[ROLL_OFFSET + 2 * i + 1],
        ]) % 10_000;
        let rarity = Rarity::from_roll(roll);
        let values = category.values(rarity);
        let pick = self.0[PICK_OFFSET + i] as usize % values.len();
        Trait::new(values[pick], rarity)
    }

    pub fn derive_traits(&self) -> Traits {
        Traits {
            body_color: self.derive_trait(TraitCategory::BodyColor),
            face_expression: self.derive_trait(TraitCategory::FaceExpression),
            accessory: self.derive_trait(TraitCategory::Accessory),
            pattern: self.derive_trait(TraitCategory::Pattern),
            background: self.derive_trait(TraitCategory::Background),
            special: self.derive_trait(TraitCategory::Special),
        }
    }

    /// Mutations accumulate one per generation plus up to three of jitter.
    pub fn derive_mutation_count(&self, generation: u32) -> u32 {
        generation
            .saturating_sub(1)
            .saturating_add(u32::from(self.0[MUTATION_OFFSET] % 4))
    }
}
