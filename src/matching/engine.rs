use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::catalog::store::{Catalog, CatalogEntry};
use crate::core::types::MoleculeId;
use crate::matching::scoring::alignment_score;

/// Default number of ranked results per query set
pub const DEFAULT_TOP_K: usize = 10;

/// Catalog entries scored per parallel work item
const CHUNK_SIZE: usize = 256;

/// One ranked catalog entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub score: f64,
    pub molecule_id: MoleculeId,
    pub spectrum_id: String,
    /// Empty when the catalog has no name for the molecule
    pub display_name: String,
}

/// Configuration for the matching engine
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Number of results returned per query set
    pub top_k: usize,
    /// Score only the first N catalog entries in enumeration order
    pub max_entries: Option<usize>,
    /// Score catalog chunks on the rayon thread pool
    pub parallel: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_entries: None,
            parallel: true,
        }
    }
}

/// Score of the entry at `index` in enumeration order
#[derive(Debug, Clone, Copy)]
struct Ranked {
    index: usize,
    score: f64,
}

/// Ascending score, then enumeration order
fn rank_order(a: &Ranked, b: &Ranked) -> std::cmp::Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.index.cmp(&b.index))
}

fn merge_top_k(mut a: Vec<Ranked>, b: Vec<Ranked>, k: usize) -> Vec<Ranked> {
    a.extend(b);
    a.sort_by(rank_order);
    a.truncate(k);
    a
}

fn local_top_k(offset: usize, entries: &[CatalogEntry], query: &[f64], k: usize) -> Vec<Ranked> {
    let scored: Vec<Ranked> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| Ranked {
            index: offset + i,
            score: alignment_score(query, &e.shifts),
        })
        .collect();
    merge_top_k(scored, Vec::new(), k)
}

/// The main matching engine
///
/// Borrows the catalog read-only; one engine can serve any number of queries.
pub struct MatchingEngine<'a> {
    catalog: &'a Catalog,
    config: MatchingConfig,
}

impl<'a> MatchingEngine<'a> {
    /// Create a new matching engine with default configuration
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            config: MatchingConfig::default(),
        }
    }

    /// Create a new matching engine with custom configuration
    pub fn with_config(catalog: &'a Catalog, config: MatchingConfig) -> Self {
        Self { catalog, config }
    }

    /// The K lowest-scoring catalog entries for one query set, best first
    ///
    /// Ties keep catalog enumeration order.
    pub fn find_matches(&self, query: &[f64]) -> Vec<MatchResult> {
        let k = self.config.top_k;
        if k == 0 {
            return Vec::new();
        }

        let entries = self.scored_entries();
        let ranked = if self.config.parallel {
            entries
                .par_chunks(CHUNK_SIZE)
                .enumerate()
                .map(|(chunk, slice)| local_top_k(chunk * CHUNK_SIZE, slice, query, k))
                .reduce(Vec::new, |a, b| merge_top_k(a, b, k))
        } else {
            local_top_k(0, entries, query, k)
        };

        debug!(
            query_len = query.len(),
            scored = entries.len(),
            returned = ranked.len(),
            "Ranked catalog"
        );

        ranked.into_iter().map(|r| self.to_result(r)).collect()
    }

    /// One ranked list per query set, in input order
    pub fn match_sets(&self, query_sets: &[Vec<f64>]) -> Vec<Vec<MatchResult>> {
        query_sets.iter().map(|q| self.find_matches(q)).collect()
    }

    /// Find the single best match
    pub fn find_best_match(&self, query: &[f64]) -> Option<MatchResult> {
        let engine = Self::with_config(
            self.catalog,
            MatchingConfig {
                top_k: 1,
                ..self.config.clone()
            },
        );
        engine.find_matches(query).into_iter().next()
    }

    fn scored_entries(&self) -> &'a [CatalogEntry] {
        let entries = self.catalog.entries();
        match self.config.max_entries {
            Some(limit) if limit < entries.len() => &entries[..limit],
            _ => entries,
        }
    }

    fn to_result(&self, ranked: Ranked) -> MatchResult {
        let entry = &self.catalog.entries()[ranked.index];
        MatchResult {
            score: ranked.score,
            molecule_id: entry.key.molecule_id.clone(),
            spectrum_id: entry.key.spectrum_id.clone(),
            display_name: self
                .catalog
                .name(&entry.key.molecule_id)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spectrum::{MoleculeName, SpectrumRecord};
    use crate::core::types::SourceTag;

    fn make_catalog(entries: &[(&str, Vec<f64>)]) -> Catalog {
        let mut catalog = Catalog::new();
        for (index, shifts) in entries {
            let id = SourceTag::Mmcd.qualify(index);
            catalog.add_spectrum(
                SpectrumRecord::new(SourceTag::Mmcd, id.clone(), "1", shifts.clone().into())
                    .unwrap(),
            );
            catalog.add_name(MoleculeName::new(id, format!("molecule {index}")));
        }
        catalog
    }

    fn ids(results: &[MatchResult]) -> Vec<&str> {
        results.iter().map(|r| r.molecule_id.as_str()).collect()
    }

    #[test]
    fn test_rank_nearest_first() {
        let catalog = make_catalog(&[("2", vec![1.5]), ("1", vec![1.0, 2.0])]);
        let results = MatchingEngine::new(&catalog).find_matches(&[1.1]);

        assert_eq!(ids(&results), vec!["MMCD-1", "MMCD-2"]);
        assert!((results[0].score - 0.1).abs() < 1e-9);
        assert!((results[1].score - 0.4).abs() < 1e-9);
        assert_eq!(results[0].display_name, "molecule 1");
    }

    #[test]
    fn test_sum_of_nearest_distances() {
        let catalog = make_catalog(&[("3", vec![3.0]), ("4", vec![1.0, 5.0, 9.0])]);
        let results = MatchingEngine::new(&catalog).find_matches(&[1.0, 5.0]);

        assert_eq!(ids(&results), vec!["MMCD-4", "MMCD-3"]);
        assert_eq!(results[0].score, 0.0);
        assert!((results[1].score - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_k_is_exactly_the_lowest_scores() {
        let entries: Vec<(String, Vec<f64>)> = (0..40_i32)
            .map(|i| (i.to_string(), vec![f64::from(i) * 0.7 % 13.0]))
            .collect();
        let borrowed: Vec<(&str, Vec<f64>)> = entries
            .iter()
            .map(|(i, s)| (i.as_str(), s.clone()))
            .collect();
        let catalog = make_catalog(&borrowed);
        let query = [6.3];

        let mut all: Vec<f64> = catalog
            .entries()
            .iter()
            .map(|e| alignment_score(&query, &e.shifts))
            .collect();
        all.sort_by(f64::total_cmp);

        let results = MatchingEngine::new(&catalog).find_matches(&query);
        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        assert_eq!(scores, all[..DEFAULT_TOP_K].to_vec());
    }

    #[test]
    fn test_fewer_entries_than_k_returns_all() {
        let catalog = make_catalog(&[("1", vec![1.0]), ("2", vec![2.0]), ("3", vec![3.0])]);
        let results = MatchingEngine::new(&catalog).find_matches(&[2.2]);
        assert_eq!(ids(&results), vec!["MMCD-2", "MMCD-3", "MMCD-1"]);
    }

    #[test]
    fn test_ties_keep_enumeration_order() {
        let catalog = make_catalog(&[("9", vec![4.0]), ("5", vec![6.0]), ("7", vec![4.0])]);
        let results = MatchingEngine::new(&catalog).find_matches(&[5.0]);
        assert_eq!(ids(&results), vec!["MMCD-9", "MMCD-5", "MMCD-7"]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let entries: Vec<(String, Vec<f64>)> = (0..1000_i32)
            .map(|i| {
                let base = f64::from(i % 97);
                (i.to_string(), vec![base, base + 12.5, base * 1.5])
            })
            .collect();
        let borrowed: Vec<(&str, Vec<f64>)> = entries
            .iter()
            .map(|(i, s)| (i.as_str(), s.clone()))
            .collect();
        let catalog = make_catalog(&borrowed);
        let query = [40.0, 52.0, 61.0];

        let parallel = MatchingEngine::new(&catalog).find_matches(&query);
        let sequential = MatchingEngine::with_config(
            &catalog,
            MatchingConfig {
                parallel: false,
                ..MatchingConfig::default()
            },
        )
        .find_matches(&query);

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_max_entries_bounds_scoring() {
        let catalog = make_catalog(&[("1", vec![10.0]), ("2", vec![1.0])]);
        let engine = MatchingEngine::with_config(
            &catalog,
            MatchingConfig {
                max_entries: Some(1),
                ..MatchingConfig::default()
            },
        );
        assert_eq!(ids(&engine.find_matches(&[1.0])), vec!["MMCD-1"]);
    }

    #[test]
    fn test_query_sets_are_independent() {
        let catalog = make_catalog(&[("1", vec![1.0]), ("2", vec![100.0])]);
        let engine = MatchingEngine::new(&catalog);
        let lists = engine.match_sets(&[vec![99.0], vec![2.0]]);

        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0][0].molecule_id.as_str(), "MMCD-2");
        assert_eq!(lists[1][0].molecule_id.as_str(), "MMCD-1");
    }

    #[test]
    fn test_find_best_match() {
        let catalog = make_catalog(&[("1", vec![1.0]), ("2", vec![2.0])]);
        let best = MatchingEngine::new(&catalog).find_best_match(&[1.9]).unwrap();
        assert_eq!(best.molecule_id.as_str(), "MMCD-2");
    }

    #[test]
    fn test_missing_name_is_empty() {
        let mut catalog = Catalog::new();
        let id = SourceTag::Bmrb.qualify("1");
        catalog.add_spectrum(SpectrumRecord::new(SourceTag::Bmrb, id, "1", vec![1.0].into()).unwrap());
        let results = MatchingEngine::new(&catalog).find_matches(&[1.0]);
        assert_eq!(results[0].display_name, "");
    }
}
