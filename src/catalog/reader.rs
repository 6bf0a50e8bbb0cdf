//! Turns a directory of raw files into the tables of one source.
//!
//! Files are listed in file-name order and parsed in parallel; results are
//! merged back in listing order so the output tables are deterministic
//! regardless of thread count. A file that fails to parse is logged and
//! counted, never fatal.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::codec::SourceTables;
use crate::catalog::store::CatalogError;
use crate::core::types::SourceTag;
use crate::parsing::{accepts_file, parse_file, ParseError, ParsedFile, ParserOptions};

/// What one ingest pass over a source directory did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub source: SourceTag,
    pub input_dir: PathBuf,
    /// Files matching the source's naming convention
    pub files_seen: usize,
    /// Files that contributed at least one spectrum or name
    pub files_parsed: usize,
    /// Files that parsed but held nothing usable
    pub files_skipped: usize,
    /// Files that could not be parsed at all
    pub files_failed: usize,
    pub spectra: usize,
    pub names: usize,
    /// Records dropped inside otherwise usable files
    pub skipped_records: usize,
}

impl IngestReport {
    fn new(source: SourceTag, input_dir: &Path) -> Self {
        Self {
            source,
            input_dir: input_dir.to_path_buf(),
            files_seen: 0,
            files_parsed: 0,
            files_skipped: 0,
            files_failed: 0,
            spectra: 0,
            names: 0,
            skipped_records: 0,
        }
    }
}

/// Reads every raw file of one source
pub struct SourceReader<'a> {
    source: SourceTag,
    options: &'a ParserOptions,
    parallel: bool,
}

impl<'a> SourceReader<'a> {
    pub fn new(source: SourceTag, options: &'a ParserOptions) -> Self {
        Self {
            source,
            options,
            parallel: true,
        }
    }

    /// Parse files one after another on the calling thread
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Files in `dir` belonging to this source, sorted by file name
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingSourceDir` if `dir` is not a directory,
    /// or an I/O error if it cannot be listed.
    pub fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::MissingSourceDir(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && accepts_file(self.source, &path) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Parse every file of this source under `dir`
    ///
    /// # Errors
    ///
    /// Fails only when the directory itself cannot be listed.
    pub fn read_dir(&self, dir: &Path) -> Result<(SourceTables, IngestReport), CatalogError> {
        let files = self.list_files(dir)?;
        info!(source = %self.source, dir = %dir.display(), files = files.len(), "Reading source");
        Ok(self.read_files(dir, &files))
    }

    /// Parse the given files and merge them in slice order
    pub fn read_files(&self, dir: &Path, files: &[PathBuf]) -> (SourceTables, IngestReport) {
        let parse = |path: &PathBuf| parse_file(self.source, path, self.options);
        let outcomes: Vec<Result<ParsedFile, ParseError>> = if self.parallel {
            files.par_iter().map(parse).collect()
        } else {
            files.iter().map(parse).collect()
        };

        let mut tables = SourceTables::new(self.source);
        let mut report = IngestReport::new(self.source, dir);
        report.files_seen = files.len();

        for (path, outcome) in files.iter().zip(outcomes) {
            match outcome {
                Ok(parsed) if parsed.is_empty() => {
                    debug!(file = %path.display(), "Nothing usable in file");
                    report.files_skipped += 1;
                    report.skipped_records += parsed.skipped_records;
                }
                Ok(parsed) => {
                    report.files_parsed += 1;
                    report.skipped_records += parsed.skipped_records;
                    tables.spectra.extend(parsed.spectra);
                    tables.names.extend(parsed.names);
                }
                Err(ParseError::EmptySpectrum(reason)) => {
                    warn!(file = %path.display(), "No usable chemical shifts: {reason}");
                    report.files_skipped += 1;
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to parse file, skipping");
                    report.files_failed += 1;
                }
            }
        }

        report.spectra = tables.spectra.len();
        report.names = tables.names.len();
        (tables, report)
    }
}
