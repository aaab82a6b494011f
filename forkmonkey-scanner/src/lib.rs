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

//! ForkMonkey scanner
//!
//! Walks the fork network of a source repository through a
//! [`DirectoryClient`], turns every participating repository into a
//! creature record and writes the community documents.
//!
//! ```no_run
//! use forkmonkey_scanner::{DocumentWriter, GitHubDirectory, Scanner, ScannerConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScannerConfig::load(None)?;
//! let directory = Arc::new(GitHubDirectory::new(&config.directory)?);
//! let scanner = Scanner::new(directory, &config)?;
//!
//! let report = scanner.scan(&CancellationToken::new()).await?;
//! println!("{}", report.summary);
//! let views = report.into_views(scanner.active_window())?;
//! DocumentWriter::new(&config.output.dir).write(&views)?;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod output;
pub mod pipeline;

pub use collector::{CollectedRepo, Collection, CollectorLimits, FetchFailure, ForkCollector};
pub use config::{DirectorySettings, OutputSettings, ScanSettings, ScannerConfig};
pub use directory::{DirectoryCall, DirectoryClient, GitHubDirectory, InMemoryDirectory};
pub use error::{ConfigError, DirectoryError, ScanError};
pub use extractor::{Extraction, RecordExtractor};
pub use gate::RequestGate;
pub use output::DocumentWriter;
pub use pipeline::{ScanReport, ScanSummary, Scanner};
