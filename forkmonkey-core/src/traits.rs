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

//! Creature trait categories, rarity tiers and the value tables they draw from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six fixed trait categories, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitCategory {
    BodyColor,
    FaceExpression,
    Accessory,
    Pattern,
    Background,
    Special,
}

impl TraitCategory {
    pub const ALL: [TraitCategory; 6] = [
        TraitCategory::BodyColor,
        TraitCategory::FaceExpression,
        TraitCategory::Accessory,
        TraitCategory::Pattern,
        TraitCategory::Background,
        TraitCategory::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TraitCategory::BodyColor => "body_color",
            TraitCategory::FaceExpression => "face_expression",
            TraitCategory::Accessory => "accessory",
            TraitCategory::Pattern => "pattern",
            TraitCategory::Background => "background",
            TraitCategory::Special => "special",
        }
    }

    /// Values available to this category at the given tier.
    pub fn values(&self, rarity: Rarity) -> &'static [&'static str] {
        let table = match self {
            TraitCategory::BodyColor => &BODY_COLOR,
            TraitCategory::FaceExpression => &FACE_EXPRESSION,
            TraitCategory::Accessory => &ACCESSORY,
            TraitCategory::Pattern => &PATTERN,
            TraitCategory::Background => &BACKGROUND,
            TraitCategory::Special => &SPECIAL,
        };
        table[rarity.index()]
    }
}

impl fmt::Display for TraitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rarity tiers, most to least frequent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub const ALL: [Rarity; 6] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythic,
    ];

    /// Exclusive upper bounds of each tier on a 0..10_000 roll.
    const ROLL_BOUNDS: [u16; 6] = [5_000, 7_500, 9_000, 9_700, 9_950, 10_000];

    fn index(&self) -> usize {
        *self as usize
    }

    /// Map a uniform roll in `0..10_000` to a tier. Larger rolls clamp to mythic.
    pub fn from_roll(roll: u16) -> Self {
        Self::ALL
            .iter()
            .zip(Self::ROLL_BOUNDS.iter())
            .find(|(_, bound)| roll < **bound)
            .map(|(rarity, _)| *rarity)
            .unwrap_or(Rarity::Mythic)
    }
}

/// A single trait value with its tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trait {
    pub value: String,
    pub rarity: Rarity,
}

impl Trait {
    pub fn new(value: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            value: value.into(),
            rarity,
        }
    }
}

/// Exactly one trait per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traits {
    pub body_color: Trait,
    pub face_expression: Trait,
    pub accessory: Trait,
    pub pattern: Trait,
    pub background: Trait,
    pub special: Trait,
}

impl Traits {
    pub fn get(&self, category: TraitCategory) -> &Trait {
        match category {
            TraitCategory::BodyColor => &self.body_color,
            TraitCategory::FaceExpression => &self.face_expression,
            TraitCategory::Accessory => &self.accessory,
            TraitCategory::Pattern => &self.pattern,
            TraitCategory::Background => &self.background,
            TraitCategory::Special => &self.special,
        }
    }

    pub fn get_mut(&mut self, category: TraitCategory) -> &mut Trait {
        match category {
            TraitCategory::BodyColor => &mut self.body_color,
            TraitCategory::FaceExpression => &mut self.face_expression,
            TraitCategory::Accessory => &mut self.accessory,
            TraitCategory::Pattern => &mut self.pattern,
            TraitCategory::Background => &mut self.background,
            TraitCategory::Special => &mut self.special,
        }
    }

    /// Iterate `(category, trait)` in canonical category order.
    pub fn iter(&self) -> impl Iterator<Item = (TraitCategory, &Trait)> {
        TraitCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

// Tables are indexed by tier. Values never repeat across tiers of a category.
type TierTable = [&'static [&'static str]; 6];

const BODY_COLOR: TierTable = [
    &["brown", "tan", "beige", "chocolate"],
    &["gray", "cream", "auburn"],
    &["silver", "blue", "green"],
    &["purple", "crimson"],
    &["gold", "rainbow"],
    &["cosmic"],
];

const FACE_EXPRESSION: TierTable = [
    &["happy", "neutral", "curious", "sleepy"],
    &["grinning", "surprised", "thoughtful"],
    &["winking", "cool", "mischievous"],
    &["laser_eyes", "starry_eyed"],
    &["enlightened", "fire_eyes"],
    &["void_gaze"],
];

const ACCESSORY: TierTable = [
    &["none", "bandana", "scarf"],
    &["cap", "glasses", "bow_tie"],
    &["headphones", "monocle", "top_hat"],
    &["crown", "wizard_hat"],
    &["halo", "jetpack"],
    &["infinity_gauntlet"],
];

const PATTERN: TierTable = [
    &["solid", "spotted", "striped"],
    &["patched", "freckled"],
    &["tiger", "zebra", "camo"],
    &["galaxy", "circuit"],
    &["holographic", "aurora"],
    &["glitch"],
];

const BACKGROUND: TierTable = [
    &["white", "jungle", "sky", "beach"],
    &["sunset", "forest", "desert"],
    &["city", "underwater", "mountains"],
    &["space", "volcano"],
    &["nebula", "crystal_cave"],
    &["multiverse"],
];

const SPECIAL: TierTable = [
    &["none"],
    &["sparkles", "bubbles"],
    &["glow", "shadow_clone"],
    &["lightning", "flames"],
    &["time_warp", "aura"],
    &["singularity"],
];
