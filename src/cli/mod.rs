//! Command-line interface for nmr-match.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **ingest**: Parse raw source files and write each source's catalog tables
//! - **match**: Rank catalogued spectra against one or more query shift sets
//! - **catalog**: Summarize or inspect the merged catalog
//!
//! ## Usage
//!
//! ```text
//! # Build catalog tables for every source under ./data
//! nmr-match ingest --data-dir data
//!
//! # Rank against a single query set
//! nmr-match match --data-dir data 19.0 53.2 178.5
//!
//! # Several query sets, JSON output
//! nmr-match match --data-dir data --set "19.0,53.2" --set "40.1,12.5" --format json
//!
//! # Per-source counts
//! nmr-match catalog summary --data-dir data
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::PipelineConfig;
use crate::core::types::SourceTag;

pub mod catalog;
pub mod ingest;
pub mod query;

#[derive(Parser)]
#[command(name = "nmr-match")]
#[command(version)]
#[command(about = "Identify small molecules from 13C NMR chemical shifts")]
#[command(
    long_about = "nmr-match builds a catalog of reference 13C chemical shift lists from HMDB, BMRB and MMCD downloads and ranks catalogued spectra against a measured list of shifts.\n\nThe score of a candidate is the sum, over query shifts, of the distance to the nearest catalogued shift. Lower is better."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse raw source files into catalog tables
    Ingest(ingest::IngestArgs),

    /// Rank catalogued spectra against query shifts
    Match(query::MatchArgs),

    /// Inspect the merged catalog
    Catalog(catalog::CatalogArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Where the sources live, shared by every command
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory holding one subdirectory per source
    /// (hmdb_nmr_spectra, mmcd_nmr_spectra, bmrb_nmr_spectra)
    #[arg(long, conflicts_with = "config")]
    pub data_dir: Option<PathBuf>,

    /// JSON pipeline configuration naming each source's directories
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Restrict to these sources (repeatable; default: all configured)
    #[arg(long = "source", value_enum)]
    pub sources: Vec<SourceTag>,
}

impl SourceArgs {
    /// Resolve the arguments into a pipeline configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// selection leaves no source.
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let config = match &self.config {
            Some(path) => PipelineConfig::load_from_file(path)?.restrict(&self.sources),
            None => {
                let root = self.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));
                PipelineConfig::from_data_dir(&root, &self.sources)
            }
        };
        if config.sources.is_empty() {
            anyhow::bail!("No configured source matches the --source selection");
        }
        Ok(config)
    }
}

/// Install a global rayon pool of `threads` workers
pub(crate) fn configure_threads(threads: Option<usize>) -> anyhow::Result<()> {
    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()?;
    }
    Ok(())
}
