use serde::{Deserialize, Serialize};

/// Spectrum id used when a source only carries one spectrum per molecule
pub const DEFAULT_SPECTRUM_ID: &str = "1";

/// Upstream database a spectrum was ingested from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Human Metabolome Database (tagged XML)
    Hmdb,
    /// Madison Metabolomics Consortium Database (flat peak lists)
    Mmcd,
    /// Biological Magnetic Resonance Bank (NMR-STAR)
    Bmrb,
}

impl SourceTag {
    /// All sources, in the order their tables are merged into a catalog
    pub const ALL: [SourceTag; 3] = [Self::Hmdb, Self::Mmcd, Self::Bmrb];

    /// Prefix used for qualified molecule ids
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Hmdb => "HMDB",
            Self::Mmcd => "MMCD",
            Self::Bmrb => "BMRB",
        }
    }

    /// Conventional name of the directory holding this source's raw files
    #[must_use]
    pub fn default_dir_name(self) -> &'static str {
        match self {
            Self::Hmdb => "hmdb_nmr_spectra",
            Self::Mmcd => "mmcd_nmr_spectra",
            Self::Bmrb => "bmrb_nmr_spectra",
        }
    }

    /// Build the qualified molecule id for a normalized accession index
    #[must_use]
    pub fn qualify(self, index: &str) -> MoleculeId {
        MoleculeId(format!("{}-{index}", self.prefix()))
    }

    /// Recover the source from a qualified molecule id
    #[must_use]
    pub fn of_molecule_id(id: &MoleculeId) -> Option<Self> {
        let (prefix, _) = id.0.split_once('-')?;
        Self::ALL.into_iter().find(|tag| tag.prefix() == prefix)
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Source-qualified molecule identifier, e.g. `HMDB-161`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoleculeId(pub String);

impl MoleculeId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique key of a catalogued spectrum
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpectrumKey {
    pub molecule_id: MoleculeId,
    pub spectrum_id: String,
}

impl SpectrumKey {
    pub fn new(molecule_id: MoleculeId, spectrum_id: impl Into<String>) -> Self {
        Self {
            molecule_id,
            spectrum_id: spectrum_id.into(),
        }
    }
}

impl std::fmt::Display for SpectrumKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.molecule_id, self.spectrum_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_and_recover_source() {
        let id = SourceTag::Bmrb.qualify("42");
        assert_eq!(id.as_str(), "BMRB-42");
        assert_eq!(SourceTag::of_molecule_id(&id), Some(SourceTag::Bmrb));
    }

    #[test]
    fn test_unknown_prefix() {
        assert_eq!(SourceTag::of_molecule_id(&MoleculeId::new("NIST-1")), None);
        assert_eq!(SourceTag::of_molecule_id(&MoleculeId::new("HMDB1")), None);
    }

    #[test]
    fn test_source_tag_serde() {
        let json = serde_json::to_string(&SourceTag::Mmcd).unwrap();
        assert_eq!(json, "\"mmcd\"");
        let tag: SourceTag = serde_json::from_str("\"hmdb\"").unwrap();
        assert_eq!(tag, SourceTag::Hmdb);
    }
}
