//! Parser for BMRB metabolomics entries in NMR-STAR format.
//!
//! An entry is a `data_<id>` block made of save frames. Each frame has
//! frame-level tags and any number of loops:
//!
//! ```text
//! data_bmse000042
//!
//! save_entry_information
//!    _Entry.Sf_category   entry_information
//!    _Entry.Title
//! ;
//! L-Alanine
//! ;
//!    loop_
//!       _Datum.Type
//!       _Datum.Count
//!       '13C chemical shifts'   3
//!    stop_
//! save_
//! ```
//!
//! Two independent scans decide whether an entry is catalogued: the entry
//! information frames must declare a `13C chemical shifts` datum, and the
//! assigned chemical shift frames must yield at least one numeric value.

use std::path::Path;

use tracing::{debug, warn};

use crate::core::spectrum::{MoleculeName, ShiftSet, SpectrumRecord};
use crate::core::types::{SourceTag, DEFAULT_SPECTRUM_ID};
use crate::parsing::{read_input_text, uncompressed_name, ParseError, ParsedFile, ParserOptions};
use crate::utils::normalize::{strip_accession, underscores_to_spaces};

const ENTRY_INFORMATION: &str = "entry_information";
const ASSIGNED_SHIFTS: &str = "assigned_chemical_shifts";

const TITLE_TAG: &str = "Entry.Title";
const DATUM_TYPE_TAG: &str = "Datum.Type";
const ATOM_TYPE_TAG: &str = "Atom_chem_shift.Atom_type";
const SHIFT_VALUE_TAG: &str = "Atom_chem_shift.Val";

/// Length of the `bmse` prefix on entry ids
const ENTRY_PREFIX_LEN: usize = 4;

/// A loop: column tags and the rows of values under them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarLoop {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StarLoop {
    /// Value of `tag` in row `row`, if the loop has that column
    #[must_use]
    pub fn value<'r>(&self, row: &'r [String], tag: &str) -> Option<&'r str> {
        let column = self.columns.iter().position(|c| c == tag)?;
        row.get(column).map(String::as_str)
    }

    #[must_use]
    pub fn has_column(&self, tag: &str) -> bool {
        self.columns.iter().any(|c| c == tag)
    }
}

/// One `save_<name>` frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveFrame {
    /// Frame name including the `save_` prefix
    pub name: String,
    /// Frame-level `(tag, value)` pairs, tags without the leading underscore
    pub tags: Vec<(String, String)>,
    pub loops: Vec<StarLoop>,
}

impl SaveFrame {
    #[must_use]
    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the frame's `*.Sf_category` tag
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|(t, _)| t.ends_with(".Sf_category"))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the frame is named after `category` or declares it
    #[must_use]
    pub fn is_category(&self, category: &str) -> bool {
        self.name
            .strip_prefix("save_")
            .is_some_and(|n| n.starts_with(category))
            || self.category() == Some(category)
    }
}

/// A parsed NMR-STAR data block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarEntry {
    /// Data block id without the `data_` prefix, e.g. `bmse000042`
    pub id: String,
    pub frames: Vec<SaveFrame>,
}

impl StarEntry {
    /// Frames of one save-frame category
    pub fn frames_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a SaveFrame> {
        self.frames.iter().filter(move |f| f.is_category(category))
    }

    /// Entry title from the entry information frame
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.frames_in(ENTRY_INFORMATION).find_map(|f| f.tag(TITLE_TAG))
    }

    /// Whether any entry information loop declares `<nucleus> chemical shifts`
    #[must_use]
    pub fn declares_shifts_for(&self, nucleus: &str) -> bool {
        let datum = format!("{nucleus} chemical shifts");
        self.frames_in(ENTRY_INFORMATION)
            .flat_map(|f| &f.loops)
            .any(|lp| {
                lp.rows
                    .iter()
                    .any(|row| lp.value(row, DATUM_TYPE_TAG) == Some(datum.as_str()))
            })
    }
}

/// Shifts collected from the assigned chemical shift frames
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignedShifts {
    pub values: Vec<f64>,
    /// Rows whose value could not be converted
    pub rejected: usize,
}

/// Collect `Atom_chem_shift.Val` from every assigned-shift row that has an atom type
///
/// With `atom_type` set, only rows of that atom type are used.
#[must_use]
pub fn collect_assigned_shifts(
    entry: &StarEntry,
    atom_type: Option<&str>,
    origin: &str,
) -> AssignedShifts {
    let mut shifts = AssignedShifts::default();

    for lp in entry
        .frames_in(ASSIGNED_SHIFTS)
        .flat_map(|f| &f.loops)
        .filter(|lp| lp.has_column(ATOM_TYPE_TAG))
    {
        for row in &lp.rows {
            let Some(row_atom) = lp.value(row, ATOM_TYPE_TAG) else {
                continue;
            };
            if atom_type.is_some_and(|wanted| wanted != row_atom) {
                continue;
            }

            let raw = lp.value(row, SHIFT_VALUE_TAG).unwrap_or_default();
            match raw.parse::<f64>() {
                Ok(value) => shifts.values.push(value),
                Err(_) => {
                    warn!(
                        file = %origin,
                        value = %raw,
                        "Could not convert chemical shift to a number, dropping row"
                    );
                    shifts.rejected += 1;
                }
            }
        }
    }

    shifts
}

/// Whether `path` is an NMR-STAR entry file
#[must_use]
pub fn is_bmrb_file(path: &Path) -> bool {
    uncompressed_name(path).is_some_and(|n| n.ends_with(".str"))
}

/// Parse a BMRB entry file into at most one spectrum and its name
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read,
/// `ParseError::MalformedEntry` if the STAR syntax is broken or the entry id
/// is unusable, and `ParseError::EmptySpectrum` if the entry declares 13C
/// shifts but none could be collected.
pub fn parse_bmrb_file(path: &Path, options: &ParserOptions) -> Result<ParsedFile, ParseError> {
    let text = read_input_text(path)?;
    parse_bmrb_text(&text, options, &path.display().to_string())
}

/// Parse a BMRB entry held in memory
///
/// # Errors
///
/// See [`parse_bmrb_file`].
pub fn parse_bmrb_text(
    text: &str,
    options: &ParserOptions,
    origin: &str,
) -> Result<ParsedFile, ParseError> {
    let entry = parse_star_text(text)?;

    let index = strip_accession(&entry.id, ENTRY_PREFIX_LEN).ok_or_else(|| {
        ParseError::MalformedEntry(format!("{origin}: unusable entry id '{}'", entry.id))
    })?;
    let molecule_id = SourceTag::Bmrb.qualify(&index);

    let shifts = collect_assigned_shifts(&entry, options.bmrb_atom_type.as_deref(), origin);
    let declared = entry.declares_shifts_for(&options.nucleus);
    let mut parsed = ParsedFile {
        skipped_records: shifts.rejected,
        ..ParsedFile::default()
    };

    if !declared {
        debug!(
            file = %origin,
            nucleus = %options.nucleus,
            "Entry does not declare chemical shifts for this nucleus, skipping"
        );
        return Ok(parsed);
    }

    let Some(record) = SpectrumRecord::new(
        SourceTag::Bmrb,
        molecule_id.clone(),
        DEFAULT_SPECTRUM_ID,
        ShiftSet::new(shifts.values),
    ) else {
        return Err(ParseError::EmptySpectrum(format!(
            "{origin}: declares {} chemical shifts but has no assigned values",
            options.nucleus
        )));
    };

    // Titles are often multi-line text fields
    let name = entry
        .title()
        .map(|t| underscores_to_spaces(&t.split_whitespace().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    parsed.spectra.push(record);
    parsed.names.push(MoleculeName::new(molecule_id, name));
    Ok(parsed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Unquoted word: keywords, tags and plain values
    Bare(String),
    /// Quoted string or semicolon-delimited text field, always a value
    Quoted(String),
}

impl Token {
    fn into_value(self) -> String {
        match self {
            Self::Bare(s) | Self::Quoted(s) => s,
        }
    }

    fn is_keyword(&self) -> bool {
        match self {
            Self::Bare(s) => {
                s == "loop_"
                    || s == "stop_"
                    || s.starts_with("save_")
                    || s.starts_with("data_")
                    || s.starts_with('_')
            }
            Self::Quoted(_) => false,
        }
    }
}

/// Parse NMR-STAR text into its data block
///
/// # Errors
///
/// Returns `ParseError::MalformedEntry` on unterminated quotes or text
/// fields, a tag without a value, or a missing `data_` block.
pub fn parse_star_text(text: &str) -> Result<StarEntry, ParseError> {
    let tokens = tokenize(text)?;
    let mut tokens = tokens.into_iter().peekable();

    let mut id = None;
    let mut frames = Vec::new();
    let mut current: Option<SaveFrame> = None;

    while let Some(token) = tokens.next() {
        let word = match token {
            Token::Bare(word) => word,
            Token::Quoted(value) => {
                debug!(value = %value, "Ignoring value outside of a tag or loop");
                continue;
            }
        };

        if let Some(block) = word.strip_prefix("data_") {
            id = Some(block.to_string());
        } else if word == "save_" {
            if let Some(frame) = current.take() {
                frames.push(frame);
            }
        } else if word.starts_with("save_") {
            if let Some(frame) = current.take() {
                frames.push(frame);
            }
            current = Some(SaveFrame {
                name: word,
                ..SaveFrame::default()
            });
        } else if word == "loop_" {
            let lp = parse_loop(&mut tokens);
            if let Some(frame) = current.as_mut() {
                frame.loops.push(lp);
            }
        } else if let Some(tag) = word.strip_prefix('_') {
            let value = match tokens.peek() {
                Some(next) if !next.is_keyword() => tokens.next().map(Token::into_value),
                _ => None,
            }
            .ok_or_else(|| ParseError::MalformedEntry(format!("tag '_{tag}' has no value")))?;
            if let Some(frame) = current.as_mut() {
                frame.tags.push((tag.to_string(), value));
            }
        } else {
            debug!(value = %word, "Ignoring value outside of a tag or loop");
        }
    }

    if let Some(frame) = current.take() {
        frames.push(frame);
    }

    let id = id.ok_or_else(|| ParseError::MalformedEntry("no data_ block".to_string()))?;
    Ok(StarEntry { id, frames })
}

/// Read loop columns and values up to `stop_` (consumed) or the next frame keyword
fn parse_loop<I: Iterator<Item = Token>>(tokens: &mut std::iter::Peekable<I>) -> StarLoop {
    let mut lp = StarLoop::default();

    while let Some(Token::Bare(word)) = tokens.peek() {
        let Some(column) = word.strip_prefix('_') else {
            break;
        };
        lp.columns.push(column.to_string());
        tokens.next();
    }

    let mut values = Vec::new();
    while let Some(token) = tokens.peek() {
        match token {
            Token::Bare(word) if word == "stop_" => {
                tokens.next();
                break;
            }
            t if t.is_keyword() => break,
            _ => {
                if let Some(token) = tokens.next() {
                    values.push(token.into_value());
                }
            }
        }
    }

    if lp.columns.is_empty() {
        return lp;
    }

    let width = lp.columns.len();
    if values.len() % width != 0 {
        warn!(
            columns = width,
            values = values.len(),
            "Loop has an incomplete trailing row, dropping it"
        );
    }
    lp.rows = values.chunks_exact(width).map(<[String]>::to_vec).collect();
    lp
}

fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((i, line)) = lines.next() {
        // 1-based for error messages
        let line_num = i + 1;

        if let Some(first) = line.strip_prefix(';') {
            let mut value = first.to_string();
            let mut closed = false;
            for (_, next) in lines.by_ref() {
                if next.starts_with(';') {
                    closed = true;
                    break;
                }
                value.push('\n');
                value.push_str(next);
            }
            if !closed {
                return Err(ParseError::MalformedEntry(format!(
                    "unterminated text field starting on line {line_num}"
                )));
            }
            tokens.push(Token::Quoted(value.trim().to_string()));
            continue;
        }

        tokenize_line(line, line_num, &mut tokens)?;
    }

    Ok(tokens)
}

fn tokenize_line(line: &str, line_num: usize, tokens: &mut Vec<Token>) -> Result<(), ParseError> {
    let mut rest = line;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() || rest.starts_with('#') {
            return Ok(());
        }

        let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"');
        if let Some(quote) = quote {
            let body = &rest[1..];
            // A quote only closes when followed by whitespace or the end of the line
            let end = body.char_indices().find_map(|(i, c)| {
                let after = &body[i + c.len_utf8()..];
                (c == quote && (after.is_empty() || after.starts_with(char::is_whitespace)))
                    .then_some(i)
            });
            let Some(end) = end else {
                return Err(ParseError::MalformedEntry(format!(
                    "unterminated quoted value on line {line_num}"
                )));
            };
            tokens.push(Token::Quoted(body[..end].to_string()));
            rest = &body[end + 1..];
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tokens.push(Token::Bare(rest[..end].to_string()));
            rest = &rest[end..];
        }
    }
}
