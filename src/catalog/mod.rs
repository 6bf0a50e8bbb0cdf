//! Spectrum catalog: per-source tables on disk and their in-memory union.
//!
//! Ingest and matching meet at two plain-text tables per source directory:
//!
//! - `id_shifts.csv`: `<molecule id>,<spectrum id>,<shift>,<shift>,...`
//! - `id_name.csv`: `<molecule id>,"<display name>"`
//!
//! [`reader::SourceReader`] produces the tables from raw files,
//! [`codec`] moves them to and from disk, and [`store::Catalog`] merges the
//! tables of every configured source for matching.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nmr_match::catalog::store::Catalog;
//! use nmr_match::config::PipelineConfig;
//! use std::path::Path;
//!
//! let config = PipelineConfig::from_data_dir(Path::new("data"), &[]);
//! let catalog = Catalog::load(&config).unwrap();
//!
//! for (source, counts) in catalog.summary() {
//!     println!("{source}: {} spectra", counts.spectra);
//! }
//! ```

pub mod codec;
pub mod reader;
pub mod store;
