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

//! ForkMonkey CLI
//!
//! Scans the fork network of a repository and writes the community
//! documents consumed by the web front end.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forkmonkey_core::{
    CommunityDocument, CommunityViews, FamilyTreeDocument, LeaderboardDocument,
    NetworkStatsDocument,
};
use forkmonkey_scanner::output::{
    COMMUNITY_FILE, FAMILY_TREE_FILE, LEADERBOARD_FILE, NETWORK_STATS_FILE,
};
use forkmonkey_scanner::{DocumentWriter, GitHubDirectory, Scanner, ScannerConfig};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "forkmonkey=info,forkmonkey_scanner=info";

#[derive(Parser, Debug)]
#[command(name = "forkmonkey")]
#[command(author, version, about = "ForkMonkey fork network scanner", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true, env = "FORKMONKEY_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the fork network and write the documents
    Scan {
        /// Source repository as owner/name (overrides config file)
        #[arg(long)]
        repo: Option<String>,

        /// Deepest fork degree to follow
        #[arg(long)]
        max_depth: Option<u32>,

        /// Maximum repositories to collect, root included
        #[arg(long)]
        max_total: Option<usize>,

        /// Output directory for the documents
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Concurrent requests against the directory
        #[arg(long)]
        concurrency: Option<usize>,

        /// Scan and validate without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check previously written documents for consistency
    Validate {
        /// Directory holding the documents
        #[arg(default_value = "web")]
        dir: PathBuf,
    },
}

fn init_logging(json_logs: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match cli.command {
        Commands::Scan {
            repo,
            max_depth,
            max_total,
            output,
            concurrency,
            dry_run,
        } => {
            let mut config = ScannerConfig::load(cli.config)?;

            // Apply CLI overrides
            if let Some(repo) = repo {
                config.scan.source_repo = repo;
            }
            if let Some(depth) = max_depth {
                config.scan.max_depth = depth;
            }
            if let Some(total) = max_total {
                config.scan.max_total = total;
            }
            if let Some(dir) = output {
                config.output.dir = dir;
            }
            if let Some(n) = concurrency {
                config.directory.max_concurrent_requests = n;
            }

            run_scan(config, dry_run, cli.json).await
        }
        Commands::Validate { dir } => validate_documents(&dir, cli.json),
    }
}

async fn run_scan(config: ScannerConfig, dry_run: bool, json_output: bool) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let directory = Arc::new(
        GitHubDirectory::new(&config.directory).context("Failed to create GitHub client")?,
    );
    let scanner = Scanner::new(directory, &config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping scan");
            on_signal.cancel();
        }
    });

    let report = scanner.scan(&cancel).await?;
    let summary = report.summary.clone();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("✓ Scanned {}: {}", report.source_repo, summary);
        for failure in &report.fetch_failures {
            println!("  ✗ {} (degree {}): {}", failure.full_name, failure.degree, failure.error);
        }
    }

    if summary.cancelled {
        warn!(
            collected = summary.collected,
            unprocessed = summary.unprocessed,
            "Scan cancelled, documents left unchanged"
        );
        if !json_output {
            println!("  ⚠ Scan cancelled, documents in {:?} left unchanged", config.output.dir);
        }
        return Ok(());
    }

    let views = report
        .into_views(scanner.active_window())
        .context("Scan produced inconsistent documents")?;

    if dry_run {
        info!(total = views.total(), "Dry run, not writing documents");
        return Ok(());
    }

    let written = DocumentWriter::new(&config.output.dir).write(&views)?;
    if !json_output {
        for path in written {
            println!("  → {}", path.display());
        }
    }
    Ok(())
}

fn read_document<T: serde::de::DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))
}

fn validate_documents(dir: &Path, json_output: bool) -> Result<()> {
    let views = CommunityViews {
        community: read_document::<CommunityDocument>(dir, COMMUNITY_FILE)?,
        leaderboard: read_document::<LeaderboardDocument>(dir, LEADERBOARD_FILE)?,
        family_tree: read_document::<FamilyTreeDocument>(dir, FAMILY_TREE_FILE)?,
        network_stats: read_document::<NetworkStatsDocument>(dir, NETWORK_STATS_FILE)?,
    };

    let result = views.validate();
    if json_output {
        let body = match &result {
            Ok(()) => json!({"valid": true, "total": views.total()}),
            Err(e) => json!({"valid": false, "error": e.to_string()}),
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
    }

    result.with_context(|| format!("Documents in {:?} are inconsistent", dir))?;
    if !json_output {
        println!("✓ {} documents consistent ({} monkeys)", dir.display(), views.total());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "forkmonkey",
            "scan",
            "--repo",
            "owner/root",
            "--json",
            "--json-logs",
            "--config",
            "forkmonkey.toml",
        ])
        .unwrap();

        assert!(cli.json);
        assert!(cli.json_logs);
        assert_eq!(cli.config, Some(PathBuf::from("forkmonkey.toml")));
        assert!(matches!(cli.command, Commands::Scan { repo: Some(_), .. }));
    }

    #[test]
    fn test_global_flags_before_subcommand() {
        let cli = Cli::try_parse_from(["forkmonkey", "--json", "validate", "out"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Validate { ref dir } if dir == Path::new("out")));
    }
}
