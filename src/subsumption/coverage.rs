//! Test coverage per mutant, used by coverage-based subsumption.
//!
//! Callers only rely on set operations over the returned test ids, never on
//! the ids themselves, so a real coverage source can replace the synthetic
//! fallback without changing them.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use xxhash_rust::xxh3::xxh3_64;

use crate::core::{CodeLocation, Error, Mutant, Result};

/// Set of test identifiers covering a mutant.
pub type TestSet = BTreeSet<String>;

/// Maps mutants to the tests that exercise them.
pub trait CoverageEstimator: Send + Sync {
    /// Tests covering `mutant`. Must be deterministic per location.
    fn covering_tests(&self, mutant: &Mutant) -> TestSet;

    /// Coverage for a batch, keyed by mutant id.
    fn map_mutant_coverage(&self, mutants: &[Mutant]) -> HashMap<String, TestSet> {
        mutants
            .iter()
            .map(|m| (m.id.clone(), self.covering_tests(m)))
            .collect()
    }
}

/// Coverage cache keyed by `file:line`, with a synthetic fallback.
#[derive(Debug, Default)]
pub struct CoverageMapper {
    cache: RwLock<HashMap<String, TestSet>>,
}

impl CoverageMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `{"file:line": ["test", ...]}` table.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        let table: HashMap<String, TestSet> = serde_json::from_str(&content)?;

        let mapper = Self::new();
        mapper.load_actual_coverage(table);
        Ok(mapper)
    }

    /// Seed the cache with measured coverage; seeded locations bypass the
    /// synthetic fallback.
    pub fn load_actual_coverage(&self, coverage: HashMap<String, TestSet>) {
        let count = coverage.len();
        self.cache.write().extend(coverage);
        tracing::debug!("Loaded coverage for {} locations", count);
    }

    /// Number of cached locations.
    pub fn cached_locations(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }
}

impl CoverageEstimator for CoverageMapper {
    fn covering_tests(&self, mutant: &Mutant) -> TestSet {
        let key = mutant.location.coverage_key();
        if let Some(tests) = self.cache.read().get(&key) {
            return tests.clone();
        }
        self.cache
            .write()
            .entry(key)
            .or_insert_with(|| synthetic_tests(&mutant.location))
            .clone()
    }
}

/// Placeholder coverage derived from a hash of `file:line`.
///
/// Yields 3 to 8 stable pseudo test ids per location. It carries no real
/// coverage information; load measured coverage with
/// [`CoverageMapper::load_actual_coverage`] instead.
pub fn synthetic_tests(location: &CodeLocation) -> TestSet {
    let hash = xxh3_64(location.coverage_key().as_bytes());
    let count = 3 + hash % 6;
    let stem: String = location
        .file_path
        .to_string_lossy()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '.') { '_' } else { c })
        .collect();

    (0..count)
        .map(|i| format!("test_{}_{}", stem, hash.wrapping_add(i) % 1000))
        .collect()
}

/// Jaccard index of two test sets.
///
/// Two empty sets are identical (1.0); one empty set shares nothing (0.0).
pub fn compute_similarity(a: &TestSet, b: &TestSet) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MutationOperator;
    use tempfile::TempDir;

    fn mutant(id: &str, file: &str, line: u32) -> Mutant {
        Mutant::new(
            id,
            id,
            CodeLocation::line(file, line, 1),
            MutationOperator::ArithmeticReplacement,
            "+",
            "-",
        )
    }

    fn set(ids: &[&str]) -> TestSet {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_synthetic_tests_deterministic() {
        let loc = CodeLocation::line("src/calc.py", 42, 8);
        let first = synthetic_tests(&loc);
        let second = synthetic_tests(&loc);
        assert_eq!(first, second);
        assert!((3..=8).contains(&first.len()));
        assert!(first.iter().all(|t| t.starts_with("test_src_calc_py_")));
    }

    #[test]
    fn test_synthetic_tests_ignore_column() {
        let a = synthetic_tests(&CodeLocation::line("a.js", 7, 1));
        let b = synthetic_tests(&CodeLocation::line("a.js", 7, 30));
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_mutant_coverage_keys_by_id() {
        let mapper = CoverageMapper::new();
        let coverage = mapper.map_mutant_coverage(&[mutant("m1", "a.py", 1), mutant("m2", "a.py", 1)]);
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage["m1"], coverage["m2"]);
        assert_eq!(mapper.cached_locations(), 1);
    }

    #[test]
    fn test_actual_coverage_overrides_synthetic() {
        let mapper = CoverageMapper::new();
        mapper.load_actual_coverage(HashMap::from([(
            "a.py:3".to_string(),
            set(&["test_add", "test_sub"]),
        )]));
        assert_eq!(
            mapper.covering_tests(&mutant("m1", "a.py", 3)),
            set(&["test_add", "test_sub"])
        );

        mapper.clear_cache();
        assert_eq!(mapper.cached_locations(), 0);
    }

    #[test]
    fn test_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coverage.json");
        fs::write(&path, r#"{"calc.py:10": ["t1", "t2", "t3"]}"#).unwrap();

        let mapper = CoverageMapper::from_json_file(&path).unwrap();
        assert_eq!(mapper.covering_tests(&mutant("m", "calc.py", 10)).len(), 3);
    }

    #[test]
    fn test_similarity_edge_cases() {
        let empty = TestSet::new();
        let some = set(&["a"]);
        assert_eq!(compute_similarity(&empty, &empty), 1.0);
        assert_eq!(compute_similarity(&empty, &some), 0.0);
        assert_eq!(compute_similarity(&some, &empty), 0.0);
    }

    #[test]
    fn test_similarity_jaccard() {
        let a = set(&["t1", "t2", "t3", "t4"]);
        let b = set(&["t2", "t3", "t5"]);
        assert!((compute_similarity(&a, &b) - 2.0 / 5.0).abs() < 1e-12);
        assert_eq!(compute_similarity(&a, &b), compute_similarity(&b, &a));
        assert_eq!(compute_similarity(&a, &a), 1.0);
    }
}
