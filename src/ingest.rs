//! Ingestion pipeline orchestration.
//!
//! Coordinates the full ingest flow: materialize → build context →
//! (optionally) estimate tokens. The resulting [`IngestReport`] carries the
//! context that a [`Session`](crate::session::Session) then holds as its
//! prefix.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::context::{build, BuildReport, ContextPolicy, SkippedFile};
use crate::materialize::{Fetcher, GitFetcher, Materializer};
use crate::models::CodeContext;
use crate::oracle::Oracle;
use crate::tokens::estimate_tokens;

/// Outcome of ingesting one repository.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Where the repository lives locally.
    pub root: PathBuf,
    pub context: CodeContext,
    pub skipped: Vec<SkippedFile>,
}

impl IngestReport {
    fn from_build(root: PathBuf, report: BuildReport) -> Self {
        Self {
            root,
            context: report.context,
            skipped: report.skipped,
        }
    }
}

/// Fetch `identifier` into the data directory with git and build its context.
pub fn ingest_remote(config: &Config, identifier: &str) -> Result<IngestReport> {
    let fetcher = GitFetcher::from_config(&config.git);
    ingest_with(config, identifier, fetcher)
}

/// Same as [`ingest_remote`] with a caller-supplied transport.
pub fn ingest_with<F: Fetcher>(
    config: &Config,
    identifier: &str,
    fetcher: F,
) -> Result<IngestReport> {
    let materializer = Materializer::new(&config.data.base_dir, fetcher)?;
    let root = materializer
        .materialize(identifier)
        .with_context(|| format!("Failed to materialize repository '{}'", identifier))?;
    build_local(config, &root)
}

/// Build the context of an existing local directory without fetching.
pub fn build_local(config: &Config, root: &Path) -> Result<IngestReport> {
    if !root.is_dir() {
        bail!("Repository root does not exist: {}", root.display());
    }
    let policy = ContextPolicy::from_config(&config.context)?;
    let report = build(root, &policy);
    Ok(IngestReport::from_build(root.to_path_buf(), report))
}

/// Print a human-readable summary, including a token estimate.
pub async fn print_report(report: &IngestReport, oracle: &dyn Oracle) {
    let tokens = estimate_tokens(oracle, report.context.as_str()).await;

    println!("ingest {}", report.root.display());
    println!("  files:       {}", report.context.file_count());
    println!("  bytes:       {}", report.context.len());
    println!("  skipped:     {}", report.skipped.len());
    println!("  tokens:      {}", tokens);
    println!("  fingerprint: {}", &report.context.fingerprint()[..12]);
    for skipped in &report.skipped {
        println!("  ! {}: {}", skipped.path, skipped.reason);
    }
}
