//! # nmr-match
//!
//! A library for identifying small molecules from 13C NMR chemical shifts.
//!
//! Reference shift lists are harvested from three public databases, each
//! with its own file format:
//!
//! | Source | Format | Files |
//! |--------|--------|-------|
//! | HMDB | XML | `*nmr_one_d_spectrum*.xml`, `hmdb_metabolites.xml` |
//! | BMRB | NMR-STAR | `bmse*.str` |
//! | MMCD | flat peak list | `expnmr_*.txt` |
//!
//! Ingest normalizes every source into two plain tables (`id_shifts.csv`,
//! `id_name.csv`). Matching loads the tables of all sources into one
//! [`Catalog`] and ranks its spectra against a query by nearest-neighbor
//! alignment cost.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nmr_match::{Catalog, MatchingEngine, PipelineConfig};
//! use std::path::Path;
//!
//! // Load the tables written by `nmr-match ingest`
//! let config = PipelineConfig::from_data_dir(Path::new("data"), &[]);
//! let catalog = Catalog::load(&config).unwrap();
//!
//! // Rank catalogued spectra against measured shifts
//! let engine = MatchingEngine::new(&catalog);
//! for m in engine.find_matches(&[19.0, 53.2, 178.5]) {
//!     println!("{:.3} {} {}", m.score, m.molecule_id, m.display_name);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: Catalog tables, source reading, and the merged catalog
//! - [`config`]: Source directory configuration
//! - [`core`]: Identifiers, shift sets, and spectrum records
//! - [`matching`]: Matching engine and scoring
//! - [`parsing`]: Parsers for the HMDB, BMRB, and MMCD formats
//! - [`cli`]: Command-line interface implementation

pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use catalog::store::Catalog;
pub use config::PipelineConfig;
pub use crate::core::spectrum::{MoleculeName, ShiftSet, SpectrumRecord};
pub use crate::core::types::*;
pub use matching::engine::{MatchResult, MatchingConfig, MatchingEngine};
