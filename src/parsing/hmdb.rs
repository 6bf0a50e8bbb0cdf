//! Streaming parser for HMDB XML exports.
//!
//! Two kinds of files share this parser:
//!
//! - the metabolite dump (`hmdb_metabolites.xml`), whose `<metabolite>`
//!   elements carry the accession and display name of each molecule;
//! - the one-dimensional spectrum exports (`*nmr_one_d_spectrum*.xml`), whose
//!   `<nmr-one-d>` elements carry a nucleus, a spectrum id, the owning
//!   metabolite accession and a list of peaks.
//!
//! The file is read event by event so the multi-gigabyte metabolite dump is
//! never held in memory. Elements are matched by local name, which makes the
//! `http://www.hmdb.ca` default namespace irrelevant.

use std::io::BufRead;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::core::spectrum::{MoleculeName, ShiftSet, SpectrumRecord};
use crate::core::types::{SourceTag, DEFAULT_SPECTRUM_ID};
use crate::parsing::{open_input, uncompressed_name, ParseError, ParsedFile, ParserOptions};
use crate::utils::normalize::strip_accession;

/// File name of the HMDB metabolite dump
pub const METABOLITES_FILE: &str = "hmdb_metabolites.xml";

/// Substring identifying per-spectrum export files
const SPECTRUM_FILE_MARKER: &str = "nmr_one_d_spectrum";

/// Length of the `HMDB` prefix on raw accessions
const ACCESSION_PREFIX_LEN: usize = 4;

/// Whether `path` is an HMDB metabolite dump or 1D spectrum export
#[must_use]
pub fn is_hmdb_file(path: &Path) -> bool {
    let Some(name) = uncompressed_name(path) else {
        return false;
    };
    let Some(base) = name.strip_suffix(".xml") else {
        return false;
    };
    name == METABOLITES_FILE || base.contains(SPECTRUM_FILE_MARKER)
}

/// Parse an HMDB XML file (plain or gzip-compressed)
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be opened, or
/// `ParseError::Xml` if the document is broken before any entry was read.
pub fn parse_hmdb_file(path: &Path, options: &ParserOptions) -> Result<ParsedFile, ParseError> {
    let input = open_input(path)?;
    parse_hmdb_reader(input, options, &path.display().to_string())
}

/// Parse HMDB XML from any buffered reader
///
/// A syntax error part-way through the stream ends the parse; entries read
/// before the error are kept. If nothing was read the error is returned.
///
/// # Errors
///
/// Returns `ParseError::Xml` if the stream is malformed and no entry could be
/// extracted before the error.
pub fn parse_hmdb_reader<R: BufRead>(
    input: R,
    options: &ParserOptions,
    origin: &str,
) -> Result<ParsedFile, ParseError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut state = HmdbState::new(options, origin);
    let mut buf = Vec::new();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                if state.parsed.is_empty() {
                    return Err(ParseError::Xml(e));
                }
                warn!(
                    file = %origin,
                    position = reader.buffer_position(),
                    error = %e,
                    "XML stream ended early, keeping entries read so far"
                );
                break;
            }
        };

        match event {
            Event::Start(ref e) => state.open(e.local_name().as_ref()),
            Event::Text(ref t) => match t.unescape() {
                Ok(text) => state.text.push_str(&text),
                Err(e) => {
                    debug!(file = %origin, error = %e, "Keeping text with unknown escapes as-is");
                    state.text.push_str(&String::from_utf8_lossy(t));
                }
            },
            Event::CData(t) => state.text.push_str(&String::from_utf8_lossy(&t.into_inner())),
            Event::End(_) => state.close(),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(state.parsed)
}

/// Parse HMDB XML held in memory
///
/// # Errors
///
/// See [`parse_hmdb_reader`].
pub fn parse_hmdb_text(text: &str, options: &ParserOptions) -> Result<ParsedFile, ParseError> {
    parse_hmdb_reader(text.as_bytes(), options, "<text>")
}

#[derive(Debug)]
struct MetaboliteBuilder {
    depth: usize,
    accession: Option<String>,
    name: Option<String>,
}

#[derive(Debug)]
struct SpectrumBuilder {
    depth: usize,
    spectrum_id: Option<String>,
    database_id: Option<String>,
    nucleus: Option<String>,
    shifts: Vec<f64>,
}

/// Element stack plus the entries currently being assembled
struct HmdbState<'a> {
    options: &'a ParserOptions,
    origin: &'a str,
    path: Vec<Vec<u8>>,
    text: String,
    metabolite: Option<MetaboliteBuilder>,
    spectrum: Option<SpectrumBuilder>,
    parsed: ParsedFile,
}

impl<'a> HmdbState<'a> {
    fn new(options: &'a ParserOptions, origin: &'a str) -> Self {
        Self {
            options,
            origin,
            path: Vec::new(),
            text: String::new(),
            metabolite: None,
            spectrum: None,
            parsed: ParsedFile::default(),
        }
    }

    fn open(&mut self, name: &[u8]) {
        self.path.push(name.to_vec());
        self.text.clear();
        let depth = self.path.len();

        match name {
            b"metabolite" if self.metabolite.is_none() => {
                self.metabolite = Some(MetaboliteBuilder {
                    depth,
                    accession: None,
                    name: None,
                });
            }
            b"nmr-one-d" if self.spectrum.is_none() => {
                self.spectrum = Some(SpectrumBuilder {
                    depth,
                    spectrum_id: None,
                    database_id: None,
                    nucleus: None,
                    shifts: Vec::new(),
                });
            }
            _ => {}
        }
    }

    fn close(&mut self) {
        let depth = self.path.len();
        let Some(name) = self.path.pop() else {
            return;
        };
        let value = std::mem::take(&mut self.text);
        let value = value.trim();
        let parent_is_peak = self.path.last().is_some_and(|p| p == b"nmr-one-d-peak");

        if let Some(metabolite) = self.metabolite.as_mut() {
            if depth == metabolite.depth + 1 {
                match name.as_slice() {
                    b"accession" => metabolite.accession = Some(value.to_string()),
                    b"name" => metabolite.name = Some(value.to_string()),
                    _ => {}
                }
            } else if depth == metabolite.depth && name == b"metabolite" {
                if let Some(metabolite) = self.metabolite.take() {
                    self.finish_metabolite(metabolite);
                }
            }
        }

        if let Some(spectrum) = self.spectrum.as_mut() {
            if depth == spectrum.depth + 1 {
                match name.as_slice() {
                    b"id" => spectrum.spectrum_id = Some(value.to_string()),
                    b"database-id" => spectrum.database_id = Some(value.to_string()),
                    b"nucleus" => spectrum.nucleus = Some(value.to_string()),
                    _ => {}
                }
            } else if depth > spectrum.depth && name == b"chemical-shift" && parent_is_peak {
                match value.parse::<f64>() {
                    Ok(shift) => spectrum.shifts.push(shift),
                    Err(_) => {
                        warn!(
                            file = %self.origin,
                            value = %value,
                            "Could not convert chemical shift to a number, dropping peak"
                        );
                        self.parsed.skipped_records += 1;
                    }
                }
            } else if depth == spectrum.depth && name == b"nmr-one-d" {
                if let Some(spectrum) = self.spectrum.take() {
                    self.finish_spectrum(spectrum);
                }
            }
        }
    }

    fn finish_metabolite(&mut self, metabolite: MetaboliteBuilder) {
        let index = metabolite
            .accession
            .as_deref()
            .and_then(|a| strip_accession(a, ACCESSION_PREFIX_LEN));

        let Some(index) = index else {
            warn!(
                file = %self.origin,
                accession = ?metabolite.accession,
                "Metabolite without a usable accession, skipping"
            );
            self.parsed.skipped_records += 1;
            return;
        };

        self.parsed.names.push(MoleculeName::new(
            SourceTag::Hmdb.qualify(&index),
            metabolite.name.unwrap_or_default(),
        ));
    }

    fn finish_spectrum(&mut self, spectrum: SpectrumBuilder) {
        if spectrum.nucleus.as_deref() != Some(self.options.nucleus.as_str()) {
            debug!(
                file = %self.origin,
                nucleus = ?spectrum.nucleus,
                "Skipping spectrum for another nucleus"
            );
            return;
        }

        let index = spectrum
            .database_id
            .as_deref()
            .and_then(|a| strip_accession(a, ACCESSION_PREFIX_LEN));
        let Some(index) = index else {
            warn!(
                file = %self.origin,
                database_id = ?spectrum.database_id,
                "Spectrum without a usable database id, skipping"
            );
            self.parsed.skipped_records += 1;
            return;
        };

        let spectrum_id = spectrum
            .spectrum_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_SPECTRUM_ID.to_string());
        let molecule_id = SourceTag::Hmdb.qualify(&index);

        match SpectrumRecord::new(
            SourceTag::Hmdb,
            molecule_id.clone(),
            spectrum_id,
            ShiftSet::new(spectrum.shifts),
        ) {
            Some(record) => self.parsed.spectra.push(record),
            None => {
                warn!(
                    file = %self.origin,
                    molecule = %molecule_id,
                    "Spectrum has no usable peaks, skipping"
                );
                self.parsed.skipped_records += 1;
            }
        }
    }
}
