//! Ranking catalogued spectra against query shift sets.
//!
//! - [`MatchingEngine`]: scores every catalog entry and keeps the K best
//! - [`scoring`]: the nearest-neighbor alignment score
//!
//! ## Scoring
//!
//! Every query shift is charged the distance to its closest shift in the
//! candidate spectrum, and the charges are summed. Lower is better. Extra
//! shifts in the candidate are not penalized.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nmr_match::{Catalog, MatchingEngine, PipelineConfig};
//! use std::path::Path;
//!
//! let config = PipelineConfig::from_data_dir(Path::new("data"), &[]);
//! let catalog = Catalog::load(&config).unwrap();
//!
//! let engine = MatchingEngine::new(&catalog);
//! for m in engine.find_matches(&[19.0, 53.2, 178.5]) {
//!     println!("{:.3} {} {}", m.score, m.molecule_id, m.display_name);
//! }
//! ```

pub mod engine;
pub mod scoring;

pub use engine::{MatchResult, MatchingConfig, MatchingEngine, DEFAULT_TOP_K};
