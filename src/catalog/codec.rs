//! Reading and writing the two per-source catalog tables.
//!
//! `id_shifts.csv` has one spectrum per line: molecule id, spectrum id, then
//! the shifts in ascending order with three decimals:
//!
//! ```text
//! HMDB-1,1022,19.000,53.200,178.500
//! ```
//!
//! `id_name.csv` has one molecule per line, the name always double-quoted with
//! embedded quotes doubled:
//!
//! ```text
//! HMDB-1,"L-Alanine"
//! ```
//!
//! Neither table has a header. Readers trim whitespace around fields, so the
//! older padded layout (`HMDB-1, 1022,  19.000`) loads as well.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::catalog::store::CatalogError;
use crate::core::spectrum::{MoleculeName, ShiftSet, SpectrumRecord};
use crate::core::types::{MoleculeId, SourceTag};
use crate::utils::normalize::format_shift;

/// File name of the shifts table
pub const SHIFTS_TABLE: &str = "id_shifts.csv";

/// File name of the names table
pub const NAMES_TABLE: &str = "id_name.csv";

/// The two tables of one source, in file order
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub source: SourceTag,
    pub spectra: Vec<SpectrumRecord>,
    pub names: Vec<MoleculeName>,
}

impl SourceTables {
    #[must_use]
    pub fn new(source: SourceTag) -> Self {
        Self {
            source,
            spectra: Vec::new(),
            names: Vec::new(),
        }
    }
}

/// Write the shifts table
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_shifts<W: Write>(out: W, spectra: &[SpectrumRecord]) -> Result<(), CatalogError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(out);

    for record in spectra {
        let mut row = Vec::with_capacity(record.shifts().len() + 2);
        row.push(record.molecule_id().to_string());
        row.push(record.spectrum_id().to_string());
        row.extend(record.shifts().iter().map(format_shift));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the names table
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_names<W: Write>(mut out: W, names: &[MoleculeName]) -> Result<(), CatalogError> {
    for name in names {
        writeln!(out, "{}", format_name_line(name))?;
    }
    out.flush()?;
    Ok(())
}

/// One `id_name.csv` line, without the line terminator
#[must_use]
pub fn format_name_line(name: &MoleculeName) -> String {
    // Line breaks would split the record
    let flat = name.display_name.replace(['\r', '\n'], " ");
    format!("{},\"{}\"", name.molecule_id, flat.replace('"', "\"\""))
}

/// Parse one `id_name.csv` line. Returns `None` for lines without an id.
#[must_use]
pub fn parse_name_line(line: &str) -> Option<MoleculeName> {
    let (id, rest) = line.split_once(',')?;
    let id = id.trim().trim_matches('"');
    if id.is_empty() {
        return None;
    }
    Some(MoleculeName::new(MoleculeId::new(id), unquote(rest)))
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => trimmed.trim_matches('"').to_string(),
    }
}

/// Read a shifts table. Rows that do not parse are logged and skipped.
///
/// # Errors
///
/// Returns an error only if the underlying reader fails.
pub fn read_shifts<R: Read>(
    input: R,
    source: SourceTag,
    origin: &str,
) -> Result<Vec<SpectrumRecord>, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut spectra = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let line = i + 1;
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(file = %origin, line, error = %e, "Unreadable shifts row, skipping");
                continue;
            }
        };

        if row.len() < 3 {
            if row.iter().any(|f| !f.is_empty()) {
                warn!(file = %origin, line, "Shifts row has no shifts, skipping");
            }
            continue;
        }

        let values: Result<Vec<f64>, _> = row
            .iter()
            .skip(2)
            .filter(|f| !f.is_empty())
            .map(str::parse::<f64>)
            .collect();
        let Ok(values) = values else {
            warn!(file = %origin, line, "Non-numeric shift in row, skipping");
            continue;
        };

        let molecule_id = MoleculeId::new(&row[0]);
        match SpectrumRecord::new(source, molecule_id, &row[1], ShiftSet::new(values)) {
            Some(record) => spectra.push(record),
            None => warn!(file = %origin, line, "Shifts row has no shifts, skipping"),
        }
    }

    debug!(file = %origin, spectra = spectra.len(), "Read shifts table");
    Ok(spectra)
}

/// Read a names table. Lines without an id are logged and skipped.
///
/// # Errors
///
/// Returns an error only if the underlying reader fails.
pub fn read_names<R: BufRead>(input: R, origin: &str) -> Result<Vec<MoleculeName>, CatalogError> {
    let mut names = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line_text = line?;
        if line_text.trim().is_empty() {
            continue;
        }
        match parse_name_line(&line_text) {
            Some(name) => names.push(name),
            None => warn!(file = %origin, line = i + 1, "Unreadable name row, skipping"),
        }
    }
    debug!(file = %origin, names = names.len(), "Read names table");
    Ok(names)
}

/// Write both tables of a source into `dir`, creating it if needed
///
/// # Errors
///
/// Returns an error if the directory or files cannot be written.
pub fn write_source_tables(dir: &Path, tables: &SourceTables) -> Result<(), CatalogError> {
    std::fs::create_dir_all(dir)?;
    write_shifts(
        BufWriter::new(File::create(dir.join(SHIFTS_TABLE))?),
        &tables.spectra,
    )?;
    write_names(
        BufWriter::new(File::create(dir.join(NAMES_TABLE))?),
        &tables.names,
    )?;
    Ok(())
}

/// Read both tables of a source from `dir`
///
/// # Errors
///
/// Returns `CatalogError::MissingCatalogFile` if either table is absent, and
/// an I/O error if a table cannot be read.
pub fn read_source_tables(dir: &Path, source: SourceTag) -> Result<SourceTables, CatalogError> {
    let shifts_path = dir.join(SHIFTS_TABLE);
    let names_path = dir.join(NAMES_TABLE);
    for path in [&shifts_path, &names_path] {
        if !path.is_file() {
            return Err(CatalogError::MissingCatalogFile(path.clone()));
        }
    }

    let spectra = read_shifts(
        File::open(&shifts_path)?,
        source,
        &shifts_path.display().to_string(),
    )?;
    let names = read_names(
        BufReader::new(File::open(&names_path)?),
        &names_path.display().to_string(),
    )?;

    Ok(SourceTables {
        source,
        spectra,
        names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, spectrum: &str, shifts: Vec<f64>) -> SpectrumRecord {
        SpectrumRecord::new(SourceTag::Hmdb, MoleculeId::new(id), spectrum, shifts.into()).unwrap()
    }

    #[test]
    fn test_write_shifts_layout() {
        let mut out = Vec::new();
        write_shifts(&mut out, &[record("HMDB-1", "1022", vec![178.5, 19.0, 53.2])]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HMDB-1,1022,19.000,53.200,178.500\n"
        );
    }

    #[test]
    fn test_tables_round_trip_through_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = SourceTables::new(SourceTag::Hmdb);
        tables.spectra.push(record("HMDB-1", "1022", vec![19.0, 53.2]));
        tables.spectra.push(record("HMDB-2", "7", vec![0.5]));
        tables
            .names
            .push(MoleculeName::new(MoleculeId::new("HMDB-1"), "2,3-\"di\" acid"));

        write_source_tables(dir.path(), &tables).unwrap();
        let loaded = read_source_tables(dir.path(), SourceTag::Hmdb).unwrap();

        assert_eq!(loaded.spectra, tables.spectra);
        assert_eq!(loaded.names, tables.names);
    }

    #[test]
    fn test_shifts_round_trip_at_written_precision() {
        let mut out = Vec::new();
        write_shifts(&mut out, &[record("HMDB-3", "9", vec![19.00049, 53.2004, 0.12345])]).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "HMDB-3,9,0.123,19.000,53.200\n");

        let spectra = read_shifts(out.as_slice(), SourceTag::Hmdb, "test").unwrap();
        assert_eq!(spectra[0].shifts().as_slice(), &[0.123, 19.0, 53.2]);
    }

    #[test]
    fn test_read_legacy_padded_rows() {
        let text = "HMDB-1, 1022,  19.000,  53.200\n";
        let spectra = read_shifts(text.as_bytes(), SourceTag::Hmdb, "test").unwrap();
        assert_eq!(spectra[0].spectrum_id(), "1022");
        assert_eq!(spectra[0].shifts().as_slice(), &[19.0, 53.2]);

        let names = read_names("HMDB-1, \"L-Alanine\"\n".as_bytes(), "test").unwrap();
        assert_eq!(names[0].display_name, "L-Alanine");
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let text = "BMRB-1,1,12.0\nBMRB-2,1\nBMRB-3,1,abc,4.0\n\nBMRB-4,1,7.5\n";
        let spectra = read_shifts(text.as_bytes(), SourceTag::Bmrb, "test").unwrap();
        let ids: Vec<_> = spectra.iter().map(|r| r.molecule_id().as_str()).collect();
        assert_eq!(ids, vec!["BMRB-1", "BMRB-4"]);
    }

    #[test]
    fn test_parse_name_line() {
        let name = parse_name_line("MMCD-7,\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(name.molecule_id.as_str(), "MMCD-7");
        assert_eq!(name.display_name, "say \"hi\"");

        let unquoted = parse_name_line("MMCD-8,glycine").unwrap();
        assert_eq!(unquoted.display_name, "glycine");

        assert!(parse_name_line("no comma").is_none());
        assert!(parse_name_line(",\"orphan\"").is_none());
    }

    #[test]
    fn test_format_name_line_flattens_line_breaks() {
        let name = MoleculeName::new(MoleculeId::new("BMRB-5"), "two\nlines");
        assert_eq!(format_name_line(&name), "BMRB-5,\"two lines\"");
    }

    #[test]
    fn test_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SHIFTS_TABLE), "").unwrap();
        assert!(matches!(
            read_source_tables(dir.path(), SourceTag::Mmcd),
            Err(CatalogError::MissingCatalogFile(p)) if p.ends_with(NAMES_TABLE)
        ));
    }
}
