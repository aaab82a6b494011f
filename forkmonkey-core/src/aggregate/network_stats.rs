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

//! Network-wide statistics
//!
//! Histograms use ordered maps so the document serializes identically for
//! identical inputs. The rarest and most common trait are chosen across all
//! six categories; ties keep the first candidate in canonical category order,
//! then value order.

use crate::error::{InvariantViolation, Result};
use crate::record::CreatureRecord;
use crate::traits::TraitCategory;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TraitDistribution = BTreeMap<TraitCategory, BTreeMap<String, usize>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitHighlight {
    #[serde(rename = "trait")]
    pub category: TraitCategory,
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatsDocument {
    pub last_updated: DateTime<Utc>,
    pub total_monkeys: usize,
    pub active_today: usize,
    /// generation -> count
    pub generations: BTreeMap<u32, usize>,
    pub avg_rarity: f64,
    pub max_rarity: f64,
    pub min_rarity: f64,
    pub rarest_trait: Option<TraitHighlight>,
    pub most_common_trait: Option<TraitHighlight>,
    pub trait_distribution: TraitDistribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Rarest,
    MostCommon,
}

impl Extreme {
    fn label(&self) -> &'static str {
        match self {
            Extreme::Rarest => "rarest",
            Extreme::MostCommon => "most_common",
        }
    }

    fn beats(&self, candidate: usize, best: usize) -> bool {
        match self {
            Extreme::Rarest => candidate < best,
            Extreme::MostCommon => candidate > best,
        }
    }
}

fn pick_extreme(distribution: &TraitDistribution, extreme: Extreme) -> Option<TraitHighlight> {
    let mut best: Option<TraitHighlight> = None;
    for category in TraitCategory::ALL {
        let Some(values) = distribution.get(&category) else {
            continue;
        };
        for (value, &count) in values {
            let replace = match &best {
                None => true,
                Some(current) => extreme.beats(count, current.count),
            };
            if replace {
                best = Some(TraitHighlight {
                    category,
                    value: value.clone(),
                    count,
                });
            }
        }
    }
    best
}

impl NetworkStatsDocument {
    /// Reduce the record set. `active_window` is how far back from
    /// `last_updated` an `updated_at` still counts as active.
    pub fn build(
        records: &[CreatureRecord],
        last_updated: DateTime<Utc>,
        active_window: Duration,
    ) -> Result<Self> {
        let cutoff = last_updated - active_window;
        let active_today = records.iter().filter(|r| r.updated_at >= cutoff).count();

        let mut generations: BTreeMap<u32, usize> = BTreeMap::new();
        let mut trait_distribution: TraitDistribution = TraitCategory::ALL
            .into_iter()
            .map(|c| (c, BTreeMap::new()))
            .collect();
        let mut min_rarity = f64::INFINITY;
        let mut max_rarity = f64::NEG_INFINITY;
        let mut rarity_sum = 0.0;

        for record in records {
            let stats = &record.monkey_stats;
            *generations.entry(stats.generation).or_insert(0) += 1;

            min_rarity = min_rarity.min(stats.rarity_score);
            max_rarity = max_rarity.max(stats.rarity_score);
            rarity_sum += stats.rarity_score;

            for (category, t) in stats.traits.iter() {
                *trait_distribution
                    .entry(category)
                    .or_default()
                    .entry(t.value.clone())
                    .or_insert(0) += 1;
            }
        }

        let (avg_rarity, min_rarity, max_rarity) = if records.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            // Float summation can land an ulp outside [min, max].
            let avg = (rarity_sum / records.len() as f64).clamp(min_rarity, max_rarity);
            (avg, min_rarity, max_rarity)
        };

        let document = Self {
            last_updated,
            total_monkeys: records.len(),
            active_today,
            generations,
            avg_rarity,
            max_rarity,
            min_rarity,
            rarest_trait: pick_extreme(&trait_distribution, Extreme::Rarest),
            most_common_trait: pick_extreme(&trait_distribution, Extreme::MostCommon),
            trait_distribution,
        };
        document.validate()?;
        Ok(document)
    }

    pub fn validate(&self) -> Result<()> {
        if self.active_today > self.total_monkeys {
            return Err(InvariantViolation::ActiveExceedsTotal {
                active: self.active_today,
                total: self.total_monkeys,
            });
        }

        let generation_sum: usize = self.generations.values().sum();
        if generation_sum != self.total_monkeys
            || self.generations.iter().any(|(g, c)| *g == 0 || *c == 0)
        {
            return Err(InvariantViolation::CountMismatch {
                field: "generations",
                found: generation_sum,
                expected: self.total_monkeys,
            });
        }

        if !(self.min_rarity <= self.avg_rarity && self.avg_rarity <= self.max_rarity) {
            return Err(InvariantViolation::RarityOrder {
                min: self.min_rarity,
                avg: self.avg_rarity,
                max: self.max_rarity,
            });
        }

        for category in TraitCategory::ALL {
            let sum: usize = self
                .trait_distribution
                .get(&category)
                .map(|values| values.values().sum())
                .unwrap_or(0);
            if sum != self.total_monkeys {
                return Err(InvariantViolation::TraitSumMismatch {
                    category: category.to_string(),
                    sum,
                    expected: self.total_monkeys,
                });
            }
        }

        for (highlight, extreme) in [
            (&self.rarest_trait, Extreme::Rarest),
            (&self.most_common_trait, Extreme::MostCommon),
        ] {
            let expected = pick_extreme(&self.trait_distribution, extreme);
            let matches = match (highlight, &expected) {
                (Some(h), Some(e)) => h.count == e.count,
                (None, None) => true,
                _ => false,
            };
            if !matches {
                let (category, value) = highlight
                    .as_ref()
                    .map(|h| (h.category.to_string(), h.value.clone()))
                    .unwrap_or_default();
                return Err(InvariantViolation::TraitHighlight {
                    which: extreme.label(),
                    category,
                    value,
                });
            }
        }
        Ok(())
    }
}
