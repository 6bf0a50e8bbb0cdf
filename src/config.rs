//! Pipeline configuration: which sources to read and where their files live.
//!
//! A configuration is either built from a data directory laid out with the
//! conventional per-source directory names, or loaded from a JSON file:
//!
//! ```json
//! {
//!   "sources": [
//!     { "source": "hmdb", "input_dir": "hmdb_nmr_spectra" },
//!     { "source": "bmrb", "input_dir": "bmrb_nmr_spectra", "output_dir": "catalog/bmrb", "required": false }
//!   ]
//! }
//! ```
//!
//! Relative paths in a JSON file are resolved against the file's directory.
//! Sources are merged into a catalog in the order they are listed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::SourceTag;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("No sources configured")]
    NoSources,

    #[error("Source {0} is configured more than once")]
    DuplicateSource(SourceTag),
}

fn default_required() -> bool {
    true
}

/// Location of one source's raw files and catalog tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: SourceTag,
    /// Directory holding the raw files
    pub input_dir: PathBuf,
    /// Directory the catalog tables are written to; defaults to `input_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Whether matching fails when this source's tables are missing
    #[serde(default = "default_required")]
    pub required: bool,
}

impl SourceConfig {
    pub fn new(source: SourceTag, input_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            input_dir: input_dir.into(),
            output_dir: None,
            required: true,
        }
    }

    /// Directory holding `id_shifts.csv` and `id_name.csv`
    #[must_use]
    pub fn catalog_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.input_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sources: Vec<SourceConfig>,
}

impl PipelineConfig {
    /// Conventional layout under `root`: one directory per source.
    /// An empty `sources` slice selects every source.
    #[must_use]
    pub fn from_data_dir(root: &Path, sources: &[SourceTag]) -> Self {
        let selected: &[SourceTag] = if sources.is_empty() {
            &SourceTag::ALL
        } else {
            sources
        };
        Self {
            sources: selected
                .iter()
                .map(|&tag| SourceConfig::new(tag, root.join(tag.default_dir_name())))
                .collect(),
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid, lists no sources, or lists a
    /// source twice.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Keep only the listed sources; an empty slice keeps everything
    #[must_use]
    pub fn restrict(mut self, sources: &[SourceTag]) -> Self {
        if !sources.is_empty() {
            self.sources.retain(|s| sources.contains(&s.source));
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = HashSet::new();
        for s in &self.sources {
            if !seen.insert(s.source) {
                return Err(ConfigError::DuplicateSource(s.source));
            }
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for s in &mut self.sources {
            if s.input_dir.is_relative() {
                s.input_dir = base.join(&s.input_dir);
            }
            if let Some(out) = s.output_dir.as_mut() {
                if out.is_relative() {
                    *out = base.join(&*out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_dir_defaults_to_all_sources() {
        let config = PipelineConfig::from_data_dir(Path::new("/data"), &[]);
        let tags: Vec<_> = config.sources.iter().map(|s| s.source).collect();
        assert_eq!(tags, SourceTag::ALL.to_vec());
        assert_eq!(
            config.sources[0].catalog_dir(),
            Path::new("/data/hmdb_nmr_spectra")
        );
    }

    #[test]
    fn test_from_json_defaults() {
        let config = PipelineConfig::from_json(
            r#"{"sources": [{"source": "mmcd", "input_dir": "peaks", "output_dir": "out"}]}"#,
        )
        .unwrap();
        let mmcd = &config.sources[0];
        assert!(mmcd.required);
        assert_eq!(mmcd.catalog_dir(), Path::new("out"));
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let result = PipelineConfig::from_json(
            r#"{"sources": [{"source": "hmdb", "input_dir": "a"}, {"source": "hmdb", "input_dir": "b"}]}"#,
        );
        assert!(matches!(result, Err(ConfigError::DuplicateSource(SourceTag::Hmdb))));
    }

    #[test]
    fn test_empty_sources_rejected() {
        assert!(matches!(
            PipelineConfig::from_json(r#"{"sources": []}"#),
            Err(ConfigError::NoSources)
        ));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(
            &path,
            r#"{"sources": [{"source": "bmrb", "input_dir": "bmrb", "required": false}]}"#,
        )
        .unwrap();

        let config = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.sources[0].input_dir, dir.path().join("bmrb"));
        assert!(!config.sources[0].required);
    }

    #[test]
    fn test_restrict() {
        let config = PipelineConfig::from_data_dir(Path::new("d"), &[]).restrict(&[SourceTag::Bmrb]);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].source, SourceTag::Bmrb);
    }
}
