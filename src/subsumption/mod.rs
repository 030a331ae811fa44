//! Redundant mutant elimination.
//!
//! Four stages run strictly in sequence, each on the previous stage's output:
//!
//! 1. Exact duplicates: same file, line, column, operator and code.
//! 2. Location clustering: one mutant per `(file, line, column)`, the
//!    highest-priority one.
//! 3. Operator subsumption: a mutant whose operator is subsumed by a nearby
//!    earlier mutant's operator is dropped.
//! 4. Coverage subsumption: a mutant whose covering tests are a proper
//!    subset of a related mutant's, with high Jaccard similarity, is dropped.
//!
//! Mutants are never modified, only removed from the working set.

mod cluster;
mod coverage;

pub use cluster::{
    best_of, group_by_file, ClusterDiversity, Clusters, MutantClusterer,
    DEFAULT_PROXIMITY_THRESHOLD,
};
pub use coverage::{compute_similarity, synthetic_tests, CoverageEstimator, CoverageMapper, TestSet};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Mutant, MutationOperator, Result};

/// Tunables of the reduction stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsumptionConfig {
    /// Maximum line distance for operator subsumption.
    pub operator_window: u32,
    /// Minimum Jaccard similarity for coverage subsumption.
    pub similarity_threshold: f64,
    /// Run the coverage comparisons on the rayon pool.
    pub parallel: bool,
}

impl Default for SubsumptionConfig {
    fn default() -> Self {
        Self {
            operator_window: 5,
            similarity_threshold: 0.90,
            parallel: true,
        }
    }
}

impl SubsumptionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Reduction stage that removed a mutant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExactDuplicate,
    LocationCluster,
    OperatorSubsumption,
    CoverageSubsumption,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ExactDuplicate => "exact duplicate",
            Stage::LocationCluster => "location cluster",
            Stage::OperatorSubsumption => "operator subsumption",
            Stage::CoverageSubsumption => "coverage subsumption",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A removed mutant and the mutant that made it redundant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Removal {
    pub mutant_id: String,
    pub stage: Stage,
    pub kept: String,
}

/// Counts from the last `filter_redundant` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsumptionStats {
    pub total_input: usize,
    pub exact_duplicates: usize,
    pub location_clustered: usize,
    pub operator_subsumed: usize,
    pub coverage_subsumed: usize,
    pub total_output: usize,
}

impl SubsumptionStats {
    /// `(1 - output/input) * 100`; 0 for an empty input.
    pub fn reduction_percent(&self) -> f64 {
        if self.total_input == 0 {
            return 0.0;
        }
        (1.0 - self.total_output as f64 / self.total_input as f64) * 100.0
    }

    pub fn total_removed(&self) -> usize {
        self.total_input - self.total_output
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct DuplicateKey {
    file: PathBuf,
    line: u32,
    column: u32,
    operator: MutationOperator,
    original: String,
    mutated: String,
}

impl DuplicateKey {
    fn of(mutant: &Mutant) -> Self {
        Self {
            file: mutant.location.file_path.clone(),
            line: mutant.location.line_start,
            column: mutant.location.column_start,
            operator: mutant.operator,
            original: mutant.original_code.clone(),
            mutated: mutant.mutated_code.clone(),
        }
    }
}

/// Removes redundant mutants in four sequential stages.
pub struct SubsumptionAnalyzer {
    config: SubsumptionConfig,
    coverage: Arc<dyn CoverageEstimator>,
    stats: SubsumptionStats,
    removals: Vec<Removal>,
}

impl SubsumptionAnalyzer {
    pub fn new(coverage: Arc<dyn CoverageEstimator>) -> Self {
        Self {
            config: SubsumptionConfig::default(),
            coverage,
            stats: SubsumptionStats::default(),
            removals: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: SubsumptionConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &SubsumptionConfig {
        &self.config
    }

    /// Run all four stages and return the surviving mutants.
    ///
    /// Survivors keep their relative input order. Statistics and the removal
    /// log are reset on every call.
    pub fn filter_redundant(&mut self, mutants: Vec<Mutant>) -> Vec<Mutant> {
        self.stats = SubsumptionStats {
            total_input: mutants.len(),
            ..Default::default()
        };
        self.removals.clear();

        let mutants = self.remove_exact_duplicates(mutants);
        self.stats.exact_duplicates = self.stats.total_input - mutants.len();
        tracing::info!(
            "Stage 1 (exact duplicates): removed {}",
            self.stats.exact_duplicates
        );

        let before = mutants.len();
        let mutants = self.cluster_by_location(mutants);
        self.stats.location_clustered = before - mutants.len();
        tracing::info!(
            "Stage 2 (location clustering): removed {}",
            self.stats.location_clustered
        );

        let before = mutants.len();
        let mutants = self.remove_operator_subsumed(mutants);
        self.stats.operator_subsumed = before - mutants.len();
        tracing::info!(
            "Stage 3 (operator subsumption): removed {}",
            self.stats.operator_subsumed
        );

        let before = mutants.len();
        let mutants = self.remove_coverage_subsumed(mutants);
        self.stats.coverage_subsumed = before - mutants.len();
        tracing::info!(
            "Stage 4 (coverage subsumption): removed {}",
            self.stats.coverage_subsumed
        );

        self.stats.total_output = mutants.len();
        tracing::info!(
            "Reduced {} mutants to {} ({:.1}% reduction)",
            self.stats.total_input,
            self.stats.total_output,
            self.stats.reduction_percent()
        );
        mutants
    }

    pub fn get_statistics(&self) -> &SubsumptionStats {
        &self.stats
    }

    /// Removals of the last run, in the order they were decided.
    pub fn removals(&self) -> &[Removal] {
        &self.removals
    }

    /// Why `mutant_id` was removed in the last run, if it was.
    pub fn explain_removal(&self, mutant_id: &str) -> Option<String> {
        let removal = self.removals.iter().find(|r| r.mutant_id == mutant_id)?;
        let reason = match removal.stage {
            Stage::ExactDuplicate => format!("exact duplicate of {}", removal.kept),
            Stage::LocationCluster => format!(
                "same location as higher-priority mutant {}",
                removal.kept
            ),
            Stage::OperatorSubsumption => format!(
                "operator subsumed by nearby mutant {}",
                removal.kept
            ),
            Stage::CoverageSubsumption => format!(
                "covering tests are a subset of those of mutant {}",
                removal.kept
            ),
        };
        Some(format!("{} removed: {}", removal.mutant_id, reason))
    }

    fn record(&mut self, removed: &Mutant, stage: Stage, kept: &str) {
        tracing::debug!("{} removed by {} (kept {})", removed.id, stage, kept);
        self.removals.push(Removal {
            mutant_id: removed.id.clone(),
            stage,
            kept: kept.to_string(),
        });
    }

    /// Drop `removed` ids from `mutants`, logging each removal.
    fn retain_survivors(
        &mut self,
        mutants: Vec<Mutant>,
        removed: &HashMap<String, String>,
        stage: Stage,
    ) -> Vec<Mutant> {
        let mut survivors = Vec::with_capacity(mutants.len() - removed.len().min(mutants.len()));
        for mutant in mutants {
            match removed.get(&mutant.id) {
                Some(kept) => self.record(&mutant, stage, kept),
                None => survivors.push(mutant),
            }
        }
        survivors
    }

    fn remove_exact_duplicates(&mut self, mutants: Vec<Mutant>) -> Vec<Mutant> {
        let mut seen: HashMap<DuplicateKey, String> = HashMap::new();
        let mut survivors = Vec::with_capacity(mutants.len());
        for mutant in mutants {
            match seen.get(&DuplicateKey::of(&mutant)) {
                Some(first) => {
                    let first = first.clone();
                    self.record(&mutant, Stage::ExactDuplicate, &first);
                }
                None => {
                    seen.insert(DuplicateKey::of(&mutant), mutant.id.clone());
                    survivors.push(mutant);
                }
            }
        }
        survivors
    }

    fn cluster_by_location(&mut self, mutants: Vec<Mutant>) -> Vec<Mutant> {
        let removed = location_losers(&mutants);
        if !removed.is_empty() && mutants.iter().all(|m| m.priority_score == 0.0) {
            tracing::warn!(
                "Location clustering on unscored mutants keeps the first mutant per location; score before reducing"
            );
        }
        self.retain_survivors(mutants, &removed, Stage::LocationCluster)
    }

    fn remove_operator_subsumed(&mut self, mutants: Vec<Mutant>) -> Vec<Mutant> {
        let window = self.config.operator_window;
        let mut removed: HashMap<String, String> = HashMap::new();

        for (_, group) in group_by_file(&mutants) {
            for (i, subsumer) in group.iter().enumerate() {
                if removed.contains_key(&subsumer.id) {
                    continue;
                }
                for candidate in &group[i + 1..] {
                    let gap = candidate.location.line_start - subsumer.location.line_start;
                    if gap > window {
                        break;
                    }
                    if removed.contains_key(&candidate.id) {
                        continue;
                    }
                    if subsumer.operator.subsumes_operator(candidate.operator) {
                        removed.insert(candidate.id.clone(), subsumer.id.clone());
                    }
                }
            }
        }

        self.retain_survivors(mutants, &removed, Stage::OperatorSubsumption)
    }

    fn remove_coverage_subsumed(&mut self, mutants: Vec<Mutant>) -> Vec<Mutant> {
        let coverage = self.coverage.map_mutant_coverage(&mutants);
        let empty = TestSet::new();
        let threshold = self.config.similarity_threshold;
        let tests_of = |m: &Mutant| coverage.get(&m.id).unwrap_or(&empty);

        // Dropped when any related mutant dominates it, even one that is
        // itself dropped.
        let dominator = |dominated: &Mutant| -> Option<(String, String)> {
            let subset = tests_of(dominated);
            if subset.is_empty() {
                return None;
            }
            mutants
                .iter()
                .filter(|m| m.id != dominated.id && m.operator.is_related_to(dominated.operator))
                .find(|m| dominates(tests_of(m), subset, threshold))
                .map(|m| (dominated.id.clone(), m.id.clone()))
        };

        let removed: HashMap<String, String> = if self.config.parallel {
            mutants.par_iter().filter_map(dominator).collect()
        } else {
            mutants.iter().filter_map(dominator).collect()
        };

        self.retain_survivors(mutants, &removed, Stage::CoverageSubsumption)
    }
}

/// Losers of every `(file, line, column)` group, mapped to the group winner.
fn location_losers(mutants: &[Mutant]) -> HashMap<String, String> {
    let mut groups: HashMap<(&Path, u32, u32), Vec<&Mutant>> = HashMap::new();
    let mut order = Vec::new();
    for mutant in mutants {
        let key = (
            mutant.file_path(),
            mutant.location.line_start,
            mutant.location.column_start,
        );
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(mutant);
    }

    let mut removed = HashMap::new();
    for key in &order {
        let group = &groups[key];
        let Some(winner) = best_of(group) else {
            continue;
        };
        for loser in group.iter().filter(|m| m.id != winner.id) {
            removed.insert(loser.id.clone(), winner.id.clone());
        }
    }
    removed
}

/// `superset` strictly contains the non-empty `subset` and their Jaccard
/// similarity reaches `threshold`.
fn dominates(superset: &TestSet, subset: &TestSet, threshold: f64) -> bool {
    !subset.is_empty()
        && subset.len() < superset.len()
        && subset.is_subset(superset)
        && compute_similarity(superset, subset) >= threshold
}

/// Set difference of `input` and `output` by id, for diagnostics.
pub fn removed_mutants<'a>(input: &'a [Mutant], output: &[Mutant]) -> Vec<&'a Mutant> {
    let kept: HashSet<&str> = output.iter().map(|m| m.id.as_str()).collect();
    input.iter().filter(|m| !kept.contains(m.id.as_str())).collect()
}
