//! Parsers for the raw per-source NMR formats.
//!
//! One parser per upstream database, selected explicitly by [`SourceTag`]:
//!
//! - **HMDB** ([`hmdb`]): tagged XML, streamed event by event. Handles both the
//!   per-spectrum `*nmr_one_d_spectrum*.xml` exports and the
//!   `hmdb_metabolites.xml` name dump.
//! - **BMRB** ([`bmrb`]): NMR-STAR save-frame text (`bmse*.str`).
//! - **MMCD** ([`mmcd`]): flat whitespace-delimited peak lists
//!   (`expnmr_*.txt`) in two dialects.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nmr_match::core::types::SourceTag;
//! use nmr_match::parsing::{parse_file, ParserOptions};
//! use std::path::Path;
//!
//! let parsed = parse_file(
//!     SourceTag::Mmcd,
//!     Path::new("mmcd_nmr_spectra/expnmr_00001_3.txt"),
//!     &ParserOptions::default(),
//! )
//! .unwrap();
//!
//! for record in &parsed.spectra {
//!     println!("{} {:?}", record.molecule_id(), record.shifts().as_slice());
//! }
//! ```
//!
//! ## Recoverable failures
//!
//! A value that does not parse as a float is logged and dropped; the rest of
//! the file is still used. Whole-file failures come back as [`ParseError`] so
//! the caller can log them and move on to the next file.

pub mod bmrb;
pub mod hmdb;
pub mod mmcd;

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use thiserror::Error;

use crate::core::spectrum::{MoleculeName, SpectrumRecord};
use crate::core::types::SourceTag;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    #[error("No qualifying chemical shifts: {0}")]
    EmptySpectrum(String),

    #[error("Unsupported peak list dialect: {0}")]
    UnsupportedDialect(String),
}

/// Default isotope label spectra are filtered on
pub const DEFAULT_NUCLEUS: &str = "13C";

/// Source-independent parser settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Isotope label a spectrum must target to be kept (e.g. "13C")
    pub nucleus: String,
    /// Restrict BMRB assigned shifts to one atom type (e.g. "C"); `None` keeps every row
    pub bmrb_atom_type: Option<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            nucleus: DEFAULT_NUCLEUS.to_string(),
            bmrb_atom_type: None,
        }
    }
}

/// Everything extracted from one raw file
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub spectra: Vec<SpectrumRecord>,
    pub names: Vec<MoleculeName>,
    /// Records inside the file that were dropped as malformed or empty
    pub skipped_records: usize,
}

impl ParsedFile {
    /// True when the file contributed nothing to the catalog
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty() && self.names.is_empty()
    }
}

/// Parse one raw file with the parser for `source`
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, and a
/// format-specific error when the file as a whole cannot be used.
pub fn parse_file(
    source: SourceTag,
    path: &Path,
    options: &ParserOptions,
) -> Result<ParsedFile, ParseError> {
    match source {
        SourceTag::Hmdb => hmdb::parse_hmdb_file(path, options),
        SourceTag::Bmrb => bmrb::parse_bmrb_file(path, options),
        SourceTag::Mmcd => mmcd::parse_mmcd_file(path),
    }
}

/// Whether `path` follows the file naming convention of `source`
#[must_use]
pub fn accepts_file(source: SourceTag, path: &Path) -> bool {
    match source {
        SourceTag::Hmdb => hmdb::is_hmdb_file(path),
        SourceTag::Bmrb => bmrb::is_bmrb_file(path),
        SourceTag::Mmcd => mmcd::is_mmcd_file(path),
    }
}

/// Open a raw file, transparently decompressing `.gz` inputs
pub(crate) fn open_input(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = std::fs::File::open(path)?;
    let is_gzipped = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));

    if is_gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read a whole raw text file, replacing invalid UTF-8 rather than failing
pub(crate) fn read_input_text(path: &Path) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    open_input(path)?.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// File name with a trailing `.gz` removed
pub(crate) fn uncompressed_name(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    Some(name.strip_suffix(".gz").unwrap_or(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_gzipped_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peaks.txt.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(b"NAME=alanine\n").unwrap();
        encoder.finish().unwrap();

        assert_eq!(read_input_text(&path).unwrap(), "NAME=alanine\n");
    }

    #[test]
    fn test_uncompressed_name() {
        assert_eq!(
            uncompressed_name(Path::new("dir/bmse000001.str.gz")),
            Some("bmse000001.str")
        );
        assert_eq!(uncompressed_name(Path::new("a.xml")), Some("a.xml"));
    }

    #[test]
    fn test_accepts_file_dispatch() {
        assert!(accepts_file(
            SourceTag::Bmrb,
            Path::new("bmrb_nmr_spectra/bmse000042.str")
        ));
        assert!(!accepts_file(SourceTag::Bmrb, Path::new("id_shifts.csv")));
        assert!(accepts_file(SourceTag::Mmcd, Path::new("expnmr_00001_3.txt")));
        assert!(accepts_file(
            SourceTag::Hmdb,
            Path::new("HMDB0000001_nmr_one_d_spectrum_1022.xml")
        ));
    }
}
