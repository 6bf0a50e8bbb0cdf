//! Core data types for chemical-shift matching.
//!
//! - [`SourceTag`](types::SourceTag): The upstream database a record came from (HMDB, BMRB, MMCD)
//! - [`MoleculeId`](types::MoleculeId), [`SpectrumKey`](types::SpectrumKey): Source-qualified identifiers
//! - [`ShiftSet`](spectrum::ShiftSet): An ascending list of chemical shifts in ppm
//! - [`SpectrumRecord`](spectrum::SpectrumRecord), [`MoleculeName`](spectrum::MoleculeName): Normalized records produced by the readers
//!
//! ## Identifiers
//!
//! Every molecule id carries its source prefix, so ids from different
//! databases never collide once the per-source tables are merged:
//!
//! | Source | Raw accession  | Molecule id |
//! |--------|----------------|-------------|
//! | HMDB   | HMDB0000161    | HMDB-161    |
//! | BMRB   | bmse000042     | BMRB-42     |
//! | MMCD   | expnmr_00007_3 | MMCD-7      |

pub mod spectrum;
pub mod types;
