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

//! Record Extractor
//!
//! Reads the marker file from a repository and assembles its record. A
//! repository without a marker is simply not a participant. The SVG and
//! DNA companions are optional and never stop a record from being built.

use crate::directory::DirectoryClient;
use crate::error::DirectoryError;
use crate::gate::RequestGate;
use chrono::{DateTime, Utc};
use forkmonkey_core::{
    CreatureRecord, PayloadError, RecordInputs, RepositoryNode, DNA_FILE_PATH, MARKER_FILE_PATH,
    SVG_FILE_PATH,
};
use std::sync::Arc;

/// Outcome of extracting one repository.
#[derive(Debug)]
pub enum Extraction {
    Record(Box<CreatureRecord>),
    /// No marker file on the default branch
    Missing,
    /// Marker present but undecodable; treated as missing
    Malformed(PayloadError),
    /// Marker could not be fetched
    Failed(DirectoryError),
}

impl Extraction {
    pub fn into_record(self) -> Option<CreatureRecord> {
        match self {
            Extraction::Record(record) => Some(*record),
            _ => None,
        }
    }
}

pub struct RecordExtractor {
    client: Arc<dyn DirectoryClient>,
    gate: Arc<RequestGate>,
}

impl RecordExtractor {
    pub fn new(client: Arc<dyn DirectoryClient>, gate: Arc<RequestGate>) -> Self {
        Self { client, gate }
    }

    pub async fn extract(
        &self,
        repository: &RepositoryNode,
        root_full_name: &str,
        degree: u32,
        scan_time: DateTime<Utc>,
    ) -> Extraction {
        let full_name = repository.full_name.as_str();

        let marker = match self.fetch(full_name, MARKER_FILE_PATH).await {
            Ok(Some(marker)) => marker,
            Ok(None) => {
                tracing::debug!(repo = %full_name, "No marker file, not a participant");
                return Extraction::Missing;
            }
            Err(error) => {
                tracing::warn!(repo = %full_name, error = %error, "Failed to fetch marker file");
                return Extraction::Failed(error);
            }
        };

        let svg = self
            .companion(full_name, SVG_FILE_PATH)
            .await
            .and_then(|bytes| String::from_utf8(bytes).ok());
        let dna = self
            .companion(full_name, DNA_FILE_PATH)
            .await
            .and_then(|bytes| serde_json::from_slice(&bytes).ok());

        let assembled = CreatureRecord::assemble(RecordInputs {
            repository,
            root_full_name,
            degree,
            marker: &marker,
            svg,
            dna,
            scan_time,
        });

        match assembled {
            Ok(record) => {
                tracing::debug!(
                    repo = %full_name,
                    degree,
                    generation = record.monkey_stats.generation,
                    rarity_score = record.monkey_stats.rarity_score,
                    "Extracted record"
                );
                Extraction::Record(Box::new(record))
            }
            Err(error) => {
                tracing::warn!(repo = %full_name, error = %error, "Malformed marker payload, skipping");
                Extraction::Malformed(error)
            }
        }
    }

    async fn fetch(&self, full_name: &str, path: &str) -> Result<Option<Vec<u8>>, DirectoryError> {
        self.gate.run(self.client.get_file(full_name, path)).await
    }

    /// Optional file; a failed fetch reads as absent.
    async fn companion(&self, full_name: &str, path: &str) -> Option<Vec<u8>> {
        match self.fetch(full_name, path).await {
            Ok(contents) => contents,
            Err(error) => {
                tracing::debug!(repo = %full_name, path, error = %error, "Companion file unavailable");
                None
            }
        }
    }
}
