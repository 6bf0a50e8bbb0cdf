//! Parser for MMCD experimental peak lists (`expnmr_<n>_<k>.txt`).
//!
//! The first line is a comma-separated header that may carry a `NAME=` field.
//! Two layouts exist:
//!
//! | Dialect | Marker on line 1 | First data line (0-based) | Shift column |
//! |---------|------------------|---------------------------|--------------|
//! | 1       | field `DU…`      | 4                         | 3            |
//! | 2       | none             | 2                         | 1            |

use std::path::Path;

use tracing::{debug, warn};

use crate::core::spectrum::{MoleculeName, ShiftSet, SpectrumRecord};
use crate::core::types::{SourceTag, DEFAULT_SPECTRUM_ID};
use crate::parsing::{read_input_text, ParseError, ParsedFile};
use crate::utils::normalize::{normalize_index, underscores_to_spaces};

/// Prefix shared by every MMCD peak list file name
const FILE_PREFIX: &str = "expnmr_";

/// Name prefixes that are identifiers rather than prose and keep their underscores
const VERBATIM_NAME_PREFIXES: [&str; 2] = ["expnmr_", "cq_"];

/// Peak list layout, detected from the header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Header carries a `DU` field; shifts in column 3 from line 4
    Du,
    /// Plain two-column layout; shifts in column 1 from line 2
    Plain,
}

impl Dialect {
    /// Detect the dialect from the header line
    #[must_use]
    pub fn detect(header: &str) -> Self {
        if header.split(',').any(|f| f.trim().starts_with("DU")) {
            Self::Du
        } else {
            Self::Plain
        }
    }

    /// 0-based index of the first data line
    #[must_use]
    pub fn first_data_line(self) -> usize {
        match self {
            Self::Du => 4,
            Self::Plain => 2,
        }
    }

    /// 0-based whitespace-delimited column holding the shift
    #[must_use]
    pub fn shift_column(self) -> usize {
        match self {
            Self::Du => 3,
            Self::Plain => 1,
        }
    }
}

/// Contents of one peak list
#[derive(Debug, Clone, PartialEq)]
pub struct PeakList {
    pub dialect: Dialect,
    pub name: Option<String>,
    pub shifts: ShiftSet,
    /// Data lines whose shift column did not parse
    pub rejected: usize,
}

/// Whether `path` is an MMCD peak list
#[must_use]
pub fn is_mmcd_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.starts_with(FILE_PREFIX))
}

/// Molecule index encoded in the file name, e.g. `expnmr_00042_3.txt` → `42`
#[must_use]
pub fn molecule_index_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(FILE_PREFIX)?
        .split('_')
        .next()
        .and_then(normalize_index)
}

/// Normalize a raw `NAME=` value for display
#[must_use]
pub fn display_name(raw: &str) -> String {
    if VERBATIM_NAME_PREFIXES.iter().any(|p| raw.starts_with(p)) {
        raw.to_string()
    } else {
        underscores_to_spaces(raw)
    }
}

/// Parse the text of a peak list
///
/// # Errors
///
/// Returns `ParseError::UnsupportedDialect` if the text has no header line.
pub fn parse_peak_list(text: &str, origin: &str) -> Result<PeakList, ParseError> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| ParseError::UnsupportedDialect(format!("{origin}: no header line")))?;

    let dialect = Dialect::detect(header);
    let name = header
        .split(',')
        .filter(|f| f.trim().starts_with("NAME"))
        .filter_map(|f| f.split('=').nth(1))
        .map(|v| v.trim().to_string())
        .last();

    let column = dialect.shift_column();
    let mut values = Vec::new();
    let mut rejected = 0;

    for (i, line) in text.lines().enumerate().skip(dialect.first_data_line()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let Some(raw) = fields.get(column) else {
            debug!(file = %origin, line = i + 1, "Too few fields for a peak, skipping line");
            continue;
        };
        match raw.parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) => {
                warn!(
                    file = %origin,
                    line = i + 1,
                    value = %raw,
                    "Could not convert chemical shift to a number, dropping line"
                );
                rejected += 1;
            }
        }
    }

    Ok(PeakList {
        dialect,
        name,
        shifts: ShiftSet::new(values),
        rejected,
    })
}

/// Parse an MMCD peak list file into one spectrum and its name
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read,
/// `ParseError::MalformedEntry` if the file name carries no molecule index,
/// `ParseError::UnsupportedDialect` if the file has no header, and
/// `ParseError::EmptySpectrum` if no shift could be read.
pub fn parse_mmcd_file(path: &Path) -> Result<ParsedFile, ParseError> {
    let origin = path.display().to_string();
    let index = molecule_index_from_path(path).ok_or_else(|| {
        ParseError::MalformedEntry(format!("{origin}: no molecule index in file name"))
    })?;

    let text = read_input_text(path)?;
    let peaks = parse_peak_list(&text, &origin)?;
    let molecule_id = SourceTag::Mmcd.qualify(&index);

    let record = SpectrumRecord::new(
        SourceTag::Mmcd,
        molecule_id.clone(),
        DEFAULT_SPECTRUM_ID,
        peaks.shifts,
    )
    .ok_or_else(|| ParseError::EmptySpectrum(format!("{origin}: no readable peaks")))?;

    let name = peaks.name.as_deref().map(display_name).unwrap_or_default();

    Ok(ParsedFile {
        spectra: vec![record],
        names: vec![MoleculeName::new(molecule_id, name)],
        skipped_records: peaks.rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DU_LIST: &str = "NAME=L_alanine, DU=ppm, SF=150.9
FORMAT: peak list
#
  No.   Atom   Mult   Shift
  1     C1     s      178.5
  2     C2     d      53.2

  3     C3     q      19.0
";

    const PLAIN_LIST: &str = "NAME=cq_00042
 ppm
1  40.1
2  12.5
3
4  77.7
";

    #[test]
    fn test_detect_dialect() {
        assert_eq!(Dialect::detect("NAME=x, DU=ppm"), Dialect::Du);
        assert_eq!(Dialect::detect("NAME=x"), Dialect::Plain);
        assert_eq!(Dialect::detect(""), Dialect::Plain);
    }

    #[test]
    fn test_parse_du_dialect() {
        let peaks = parse_peak_list(DU_LIST, "test").unwrap();
        assert_eq!(peaks.dialect, Dialect::Du);
        assert_eq!(peaks.name.as_deref(), Some("L_alanine"));
        assert_eq!(peaks.shifts.as_slice(), &[19.0, 53.2, 178.5]);
        assert_eq!(peaks.rejected, 0);
    }

    #[test]
    fn test_parse_plain_dialect_skips_short_rows() {
        let peaks = parse_peak_list(PLAIN_LIST, "test").unwrap();
        assert_eq!(peaks.dialect, Dialect::Plain);
        assert_eq!(peaks.shifts.as_slice(), &[12.5, 40.1, 77.7]);
    }

    #[test]
    fn test_one_bad_value_among_three_good() {
        let text = "NAME=glycine\nppm\n1 42.0\n2 oops\n3 17.5\n4 30.25\n";
        let peaks = parse_peak_list(text, "test").unwrap();
        assert_eq!(peaks.shifts.as_slice(), &[17.5, 30.25, 42.0]);
        assert_eq!(peaks.rejected, 1);
    }

    #[test]
    fn test_missing_name() {
        let peaks = parse_peak_list("DU=ppm\n", "test").unwrap();
        assert_eq!(peaks.name, None);
        assert!(peaks.shifts.is_empty());
    }

    #[test]
    fn test_empty_file_is_unsupported() {
        assert!(matches!(
            parse_peak_list("", "test"),
            Err(ParseError::UnsupportedDialect(_))
        ));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("L_alanine"), "L alanine");
        assert_eq!(display_name("cq_00042"), "cq_00042");
        assert_eq!(display_name("expnmr_00042_3"), "expnmr_00042_3");
    }

    #[test]
    fn test_molecule_index_from_path() {
        assert_eq!(
            molecule_index_from_path(Path::new("mmcd/expnmr_00042_3.txt")).as_deref(),
            Some("42")
        );
        assert_eq!(molecule_index_from_path(Path::new("expnmr_.txt")), None);
        assert_eq!(molecule_index_from_path(Path::new("peaks_00042_3.txt")), None);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expnmr_00007_3.txt");
        std::fs::write(&path, DU_LIST).unwrap();

        let parsed = parse_mmcd_file(&path).unwrap();
        assert_eq!(parsed.spectra[0].molecule_id().as_str(), "MMCD-7");
        assert_eq!(parsed.names[0].display_name, "L alanine");
    }

    #[test]
    fn test_parse_file_without_peaks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expnmr_00008_3.txt");
        std::fs::write(&path, "NAME=empty\nppm\n").unwrap();

        assert!(matches!(
            parse_mmcd_file(&path),
            Err(ParseError::EmptySpectrum(_))
        ));
    }
}
