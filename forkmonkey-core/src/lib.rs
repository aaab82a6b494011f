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

//! ForkMonkey Core
//!
//! Data model, deterministic creature derivation and the aggregate views
//! built over a fork network scan.

pub mod aggregate;
pub mod degree;
pub mod dna;
pub mod error;
pub mod record;
pub mod repository;
pub mod traits;

pub use aggregate::{
    CommunityDocument, CommunityViews, FamilyTreeDocument, FamilyTreeNode, LeaderboardDocument,
    LeaderboardEntry, NetworkStatsDocument, TraitHighlight,
};
pub use degree::degree_label;
pub use dna::{DnaSeed, DNA_VERSION};
pub use error::{InvariantViolation, PayloadError, Result};
pub use record::{
    CreatureRecord, MarkerPayload, MonkeyStats, RecordInputs, DNA_FILE_PATH, MARKER_FILE_PATH,
    SVG_FILE_PATH,
};
pub use repository::RepositoryNode;
pub use traits::{Rarity, Trait, TraitCategory, Traits};
