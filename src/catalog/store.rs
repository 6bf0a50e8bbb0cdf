use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::codec::{read_source_tables, SourceTables};
use crate::config::PipelineConfig;
use crate::core::spectrum::{MoleculeName, ShiftSet, SpectrumRecord};
use crate::core::types::{MoleculeId, SourceTag, SpectrumKey};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog table: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing catalog file: {}", .0.display())]
    MissingCatalogFile(PathBuf),

    #[error("Source directory not found: {}", .0.display())]
    MissingSourceDir(PathBuf),

    #[error("Catalog is empty: no spectra loaded from {0} source(s)")]
    EmptyCatalog(usize),
}

/// One catalogued spectrum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub source: SourceTag,
    pub key: SpectrumKey,
    pub shifts: ShiftSet,
}

/// Spectrum and name counts of one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub spectra: usize,
    pub molecules: usize,
    pub names: usize,
}

/// In-memory union of every source's tables
///
/// Entries keep the order they were added in, which is the order sources
/// are listed in the configuration and then file order within a source.
/// The matching engine enumerates entries in this order.
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,

    /// Index: spectrum key -> index in entries vec
    key_to_index: HashMap<SpectrumKey, usize>,

    /// Index: molecule id -> indices of its spectra
    molecule_to_entries: HashMap<MoleculeId, Vec<usize>>,

    names: HashMap<MoleculeId, String>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            key_to_index: HashMap::new(),
            molecule_to_entries: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Load and merge the tables of every configured source
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingCatalogFile` if a required source has
    /// no tables, and `CatalogError::EmptyCatalog` if nothing was loaded.
    pub fn load(config: &PipelineConfig) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();

        for source in &config.sources {
            let dir = source.catalog_dir();
            match read_source_tables(dir, source.source) {
                Ok(tables) => {
                    info!(
                        source = %source.source,
                        spectra = tables.spectra.len(),
                        names = tables.names.len(),
                        "Loaded catalog tables"
                    );
                    catalog.add_tables(tables);
                }
                Err(CatalogError::MissingCatalogFile(path)) if !source.required => {
                    warn!(
                        source = %source.source,
                        file = %path.display(),
                        "Optional source has no catalog, skipping"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if catalog.is_empty() {
            return Err(CatalogError::EmptyCatalog(config.sources.len()));
        }
        Ok(catalog)
    }

    /// Build a catalog directly from tables, in the given order
    pub fn from_tables(tables: impl IntoIterator<Item = SourceTables>) -> Self {
        let mut catalog = Self::new();
        for t in tables {
            catalog.add_tables(t);
        }
        catalog
    }

    /// Add both tables of one source
    pub fn add_tables(&mut self, tables: SourceTables) {
        for record in tables.spectra {
            self.add_spectrum(record);
        }
        for name in tables.names {
            self.add_name(name);
        }
    }

    /// Add a spectrum. A key seen before keeps its position and takes the new shifts.
    pub fn add_spectrum(&mut self, record: SpectrumRecord) {
        let source = record.source;
        let (key, shifts) = record.into_parts();

        if let Some(&index) = self.key_to_index.get(&key) {
            warn!(key = %key, "Duplicate spectrum key, replacing earlier shifts");
            self.entries[index].shifts = shifts;
            return;
        }

        let index = self.entries.len();
        self.key_to_index.insert(key.clone(), index);
        self.molecule_to_entries
            .entry(key.molecule_id.clone())
            .or_default()
            .push(index);
        self.entries.push(CatalogEntry {
            source,
            key,
            shifts,
        });
    }

    /// Add a display name. A later name for the same molecule wins.
    pub fn add_name(&mut self, name: MoleculeName) {
        if let Some(previous) = self
            .names
            .insert(name.molecule_id.clone(), name.display_name)
        {
            debug!(molecule = %name.molecule_id, previous = %previous, "Replaced molecule name");
        }
    }

    /// All entries in enumeration order
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Shifts of one spectrum
    pub fn get(&self, key: &SpectrumKey) -> Option<&ShiftSet> {
        self.key_to_index
            .get(key)
            .map(|&idx| &self.entries[idx].shifts)
    }

    /// Every spectrum of one molecule, in enumeration order
    pub fn spectra_for(&self, molecule_id: &MoleculeId) -> Vec<&CatalogEntry> {
        self.molecule_to_entries
            .get(molecule_id)
            .map(|indices| indices.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Display name of a molecule, if one was loaded
    pub fn name(&self, molecule_id: &MoleculeId) -> Option<&str> {
        self.names.get(molecule_id).map(String::as_str)
    }

    /// Counts per source, in `SourceTag::ALL` order, for sources with any data
    pub fn summary(&self) -> Vec<(SourceTag, SourceSummary)> {
        let mut by_source: HashMap<SourceTag, SourceSummary> = HashMap::new();
        for entry in &self.entries {
            by_source.entry(entry.source).or_default().spectra += 1;
        }
        for id in self.molecule_to_entries.keys() {
            if let Some(tag) = self.source_of(id) {
                by_source.entry(tag).or_default().molecules += 1;
            }
        }
        for id in self.names.keys() {
            if let Some(tag) = SourceTag::of_molecule_id(id) {
                by_source.entry(tag).or_default().names += 1;
            }
        }

        SourceTag::ALL
            .into_iter()
            .filter_map(|tag| by_source.remove(&tag).map(|s| (tag, s)))
            .collect()
    }

    fn source_of(&self, id: &MoleculeId) -> Option<SourceTag> {
        self.molecule_to_entries
            .get(id)
            .and_then(|indices| indices.first())
            .map(|&i| self.entries[i].source)
    }

    /// Number of spectra in catalog
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if catalog has no spectra
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of molecules with a display name
    pub fn name_count(&self) -> usize {
        self.names.len()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::codec::write_source_tables;
    use crate::config::SourceConfig;

    fn record(source: SourceTag, index: &str, spectrum: &str, shifts: Vec<f64>) -> SpectrumRecord {
        SpectrumRecord::new(source, source.qualify(index), spectrum, shifts.into()).unwrap()
    }

    fn tables(source: SourceTag, records: Vec<SpectrumRecord>, names: &[(&str, &str)]) -> SourceTables {
        SourceTables {
            source,
            spectra: records,
            names: names
                .iter()
                .map(|(i, n)| MoleculeName::new(source.qualify(i), *n))
                .collect(),
        }
    }

    #[test]
    fn test_add_and_lookup() {
        let mut catalog = Catalog::new();
        assert!(catalog.is_empty());

        catalog.add_spectrum(record(SourceTag::Hmdb, "1", "10", vec![1.0, 2.0]));
        catalog.add_spectrum(record(SourceTag::Hmdb, "1", "11", vec![3.0]));
        catalog.add_name(MoleculeName::new(SourceTag::Hmdb.qualify("1"), "alanine"));

        assert_eq!(catalog.len(), 2);
        let key = SpectrumKey::new(SourceTag::Hmdb.qualify("1"), "11");
        assert_eq!(catalog.get(&key).unwrap().as_slice(), &[3.0]);
        assert_eq!(catalog.spectra_for(&SourceTag::Hmdb.qualify("1")).len(), 2);
        assert_eq!(catalog.name(&SourceTag::Hmdb.qualify("1")), Some("alanine"));
        assert_eq!(catalog.name(&SourceTag::Hmdb.qualify("2")), None);
    }

    #[test]
    fn test_duplicate_key_replaces_in_place() {
        let mut catalog = Catalog::new();
        catalog.add_spectrum(record(SourceTag::Mmcd, "1", "1", vec![1.0]));
        catalog.add_spectrum(record(SourceTag::Mmcd, "2", "1", vec![2.0]));
        catalog.add_spectrum(record(SourceTag::Mmcd, "1", "1", vec![9.0]));

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].shifts.as_slice(), &[9.0]);
        assert_eq!(catalog.entries()[1].key.molecule_id.as_str(), "MMCD-2");
    }

    #[test]
    fn test_from_tables_keeps_source_order() {
        let catalog = Catalog::from_tables([
            tables(SourceTag::Hmdb, vec![record(SourceTag::Hmdb, "5", "1", vec![1.0])], &[]),
            tables(SourceTag::Bmrb, vec![record(SourceTag::Bmrb, "3", "1", vec![2.0])], &[]),
        ]);
        let ids: Vec<_> = catalog
            .entries()
            .iter()
            .map(|e| e.key.molecule_id.as_str())
            .collect();
        assert_eq!(ids, vec!["HMDB-5", "BMRB-3"]);
    }

    #[test]
    fn test_summary() {
        let catalog = Catalog::from_tables([
            tables(
                SourceTag::Hmdb,
                vec![
                    record(SourceTag::Hmdb, "1", "1", vec![1.0]),
                    record(SourceTag::Hmdb, "1", "2", vec![1.0]),
                ],
                &[("1", "a"), ("9", "only a name")],
            ),
            tables(SourceTag::Bmrb, vec![record(SourceTag::Bmrb, "3", "1", vec![2.0])], &[]),
        ]);

        let summary = catalog.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].0, SourceTag::Hmdb);
        assert_eq!(
            summary[0].1,
            SourceSummary {
                spectra: 2,
                molecules: 1,
                names: 2
            }
        );
        assert_eq!(summary[1].0, SourceTag::Bmrb);
    }

    #[test]
    fn test_load_missing_required_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            sources: vec![SourceConfig::new(SourceTag::Bmrb, dir.path().join("bmrb"))],
        };
        assert!(matches!(
            Catalog::load(&config),
            Err(CatalogError::MissingCatalogFile(_))
        ));
    }

    #[test]
    fn test_load_skips_missing_optional_source() {
        let dir = tempfile::tempdir().unwrap();
        let hmdb_dir = dir.path().join("hmdb");
        write_source_tables(
            &hmdb_dir,
            &tables(SourceTag::Hmdb, vec![record(SourceTag::Hmdb, "1", "1", vec![4.0])], &[("1", "x")]),
        )
        .unwrap();

        let mut optional = SourceConfig::new(SourceTag::Mmcd, dir.path().join("mmcd"));
        optional.required = false;
        let config = PipelineConfig {
            sources: vec![SourceConfig::new(SourceTag::Hmdb, &hmdb_dir), optional],
        };

        let catalog = Catalog::load(&config).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.name(&SourceTag::Hmdb.qualify("1")), Some("x"));
    }

    #[test]
    fn test_load_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        write_source_tables(dir.path(), &SourceTables::new(SourceTag::Mmcd)).unwrap();
        let config = PipelineConfig {
            sources: vec![SourceConfig::new(SourceTag::Mmcd, dir.path())],
        };
        assert!(matches!(
            Catalog::load(&config),
            Err(CatalogError::EmptyCatalog(1))
        ));
    }
}
