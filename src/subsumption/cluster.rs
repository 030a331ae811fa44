//! Line-proximity clustering of mutants.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Mutant, MutationOperator};

/// Default maximum line gap inside one cluster.
pub const DEFAULT_PROXIMITY_THRESHOLD: u32 = 10;

/// Clusters keyed by sequential id.
pub type Clusters<'a> = BTreeMap<usize, Vec<&'a Mutant>>;

/// Size and operator spread of a clustering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterDiversity {
    pub total_clusters: usize,
    pub average_cluster_size: f64,
    pub max_cluster_size: usize,
    pub operator_distribution: BTreeMap<MutationOperator, usize>,
}

/// Groups mutants by file and line proximity.
#[derive(Debug, Clone, Copy)]
pub struct MutantClusterer {
    proximity_threshold: u32,
}

impl Default for MutantClusterer {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_THRESHOLD)
    }
}

impl MutantClusterer {
    pub fn new(proximity_threshold: u32) -> Self {
        Self {
            proximity_threshold,
        }
    }

    pub fn proximity_threshold(&self) -> u32 {
        self.proximity_threshold
    }

    /// Partition mutants into clusters.
    ///
    /// Within a file, a new cluster starts whenever the line gap to the
    /// previous mutant exceeds the proximity threshold.
    pub fn cluster<'a>(&self, mutants: &'a [Mutant]) -> Clusters<'a> {
        let mut clusters = Clusters::new();
        let mut next_id = 0;

        for (_, file_mutants) in group_by_file(mutants) {
            let mut current: Vec<&Mutant> = Vec::new();
            for mutant in file_mutants {
                if let Some(prev) = current.last() {
                    let gap = mutant.location.line_start - prev.location.line_start;
                    if gap > self.proximity_threshold {
                        clusters.insert(next_id, std::mem::take(&mut current));
                        next_id += 1;
                    }
                }
                current.push(mutant);
            }
            if !current.is_empty() {
                clusters.insert(next_id, current);
                next_id += 1;
            }
        }

        tracing::debug!(
            "Clustered {} mutants into {} clusters",
            mutants.len(),
            clusters.len()
        );
        clusters
    }

    /// Highest-priority mutant of every cluster, in cluster order.
    pub fn select_representatives<'a>(&self, clusters: &Clusters<'a>) -> Vec<&'a Mutant> {
        clusters.values().filter_map(|c| best_of(c)).collect()
    }

    pub fn analyze_cluster_diversity(&self, clusters: &Clusters<'_>) -> ClusterDiversity {
        if clusters.is_empty() {
            return ClusterDiversity::default();
        }

        let sizes: Vec<usize> = clusters.values().map(Vec::len).collect();
        let mut operator_distribution = BTreeMap::new();
        for mutant in clusters.values().flatten() {
            *operator_distribution.entry(mutant.operator).or_insert(0) += 1;
        }

        ClusterDiversity {
            total_clusters: clusters.len(),
            average_cluster_size: sizes.iter().sum::<usize>() as f64 / sizes.len() as f64,
            max_cluster_size: sizes.iter().copied().max().unwrap_or(0),
            operator_distribution,
        }
    }
}

/// Mutants grouped per file in first-seen file order, each group sorted by
/// start line (stable).
pub fn group_by_file<'a>(mutants: &'a [Mutant]) -> Vec<(&'a Path, Vec<&'a Mutant>)> {
    let mut index: HashMap<&Path, usize> = HashMap::new();
    let mut groups: Vec<(&Path, Vec<&Mutant>)> = Vec::new();

    for mutant in mutants {
        let file = mutant.file_path();
        let slot = *index.entry(file).or_insert_with(|| {
            groups.push((file, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(mutant);
    }

    for (_, group) in &mut groups {
        group.sort_by_key(|m| m.location.line_start);
    }
    groups
}

/// Highest `priority_score`; ties go to the earliest candidate.
pub fn best_of<'a>(candidates: &[&'a Mutant]) -> Option<&'a Mutant> {
    candidates.iter().copied().reduce(|best, candidate| {
        if candidate.priority_score > best.priority_score {
            candidate
        } else {
            best
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CodeLocation;

    fn mutant(id: &str, file: &str, line: u32, op: MutationOperator, score: f64) -> Mutant {
        Mutant::new(id, id, CodeLocation::line(file, line, 1), op, "a", "b").with_priority(score)
    }

    fn ids(mutants: &[&Mutant]) -> Vec<String> {
        mutants.iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_cluster_by_proximity() {
        let mutants = vec![
            mutant("a", "x.py", 1, MutationOperator::ArithmeticReplacement, 1.0),
            mutant("b", "x.py", 8, MutationOperator::ArithmeticReplacement, 1.0),
            mutant("c", "x.py", 30, MutationOperator::ArithmeticReplacement, 1.0),
            mutant("d", "x.py", 40, MutationOperator::ArithmeticReplacement, 1.0),
        ];
        let clusters = MutantClusterer::default().cluster(&mutants);
        assert_eq!(clusters.len(), 2);
        assert_eq!(ids(&clusters[&0]), vec!["a", "b"]);
        assert_eq!(ids(&clusters[&1]), vec!["c", "d"]);
    }

    #[test]
    fn test_cluster_separates_files() {
        let mutants = vec![
            mutant("a", "x.py", 5, MutationOperator::ArithmeticReplacement, 1.0),
            mutant("b", "y.py", 5, MutationOperator::ArithmeticReplacement, 1.0),
            mutant("c", "x.py", 6, MutationOperator::ArithmeticReplacement, 1.0),
        ];
        let clusters = MutantClusterer::default().cluster(&mutants);
        assert_eq!(clusters.len(), 2);
        assert_eq!(ids(&clusters[&0]), vec!["a", "c"]);
        assert_eq!(ids(&clusters[&1]), vec!["b"]);
    }

    #[test]
    fn test_cluster_unsorted_input() {
        let mutants = vec![
            mutant("late", "x.py", 50, MutationOperator::ArithmeticReplacement, 1.0),
            mutant("early", "x.py", 2, MutationOperator::ArithmeticReplacement, 1.0),
        ];
        let clusters = MutantClusterer::new(10).cluster(&mutants);
        assert_eq!(ids(&clusters[&0]), vec!["early"]);
        assert_eq!(ids(&clusters[&1]), vec!["late"]);
    }

    #[test]
    fn test_gap_equal_to_threshold_stays_together() {
        let mutants = vec![
            mutant("a", "x.py", 10, MutationOperator::ArithmeticReplacement, 1.0),
            mutant("b", "x.py", 20, MutationOperator::ArithmeticReplacement, 1.0),
        ];
        assert_eq!(MutantClusterer::new(10).cluster(&mutants).len(), 1);
        assert_eq!(MutantClusterer::new(9).cluster(&mutants).len(), 2);
    }

    #[test]
    fn test_select_representatives() {
        let mutants = vec![
            mutant("a", "x.py", 1, MutationOperator::ArithmeticReplacement, 4.0),
            mutant("b", "x.py", 2, MutationOperator::BoundaryCondition, 9.0),
            mutant("c", "x.py", 100, MutationOperator::LogicalOperator, 3.0),
            mutant("d", "x.py", 101, MutationOperator::LogicalOperator, 3.0),
        ];
        let clusterer = MutantClusterer::default();
        let clusters = clusterer.cluster(&mutants);
        let reps = clusterer.select_representatives(&clusters);
        assert_eq!(ids(&reps), vec!["b", "c"]);
    }

    #[test]
    fn test_cluster_diversity() {
        let mutants = vec![
            mutant("a", "x.py", 1, MutationOperator::ArithmeticReplacement, 1.0),
            mutant("b", "x.py", 2, MutationOperator::BoundaryCondition, 1.0),
            mutant("c", "x.py", 3, MutationOperator::BoundaryCondition, 1.0),
            mutant("d", "y.py", 1, MutationOperator::LogicalOperator, 1.0),
        ];
        let clusterer = MutantClusterer::default();
        let diversity = clusterer.analyze_cluster_diversity(&clusterer.cluster(&mutants));
        assert_eq!(diversity.total_clusters, 2);
        assert_eq!(diversity.max_cluster_size, 3);
        assert!((diversity.average_cluster_size - 2.0).abs() < 1e-9);
        assert_eq!(
            diversity.operator_distribution[&MutationOperator::BoundaryCondition],
            2
        );
    }

    #[test]
    fn test_empty_diversity() {
        let clusterer = MutantClusterer::default();
        let diversity = clusterer.analyze_cluster_diversity(&Clusters::new());
        assert_eq!(diversity, ClusterDiversity::default());
    }

    #[test]
    fn test_best_of_prefers_first_on_tie() {
        let a = mutant("a", "x.py", 1, MutationOperator::ArithmeticReplacement, 0.0);
        let b = mutant("b", "x.py", 1, MutationOperator::ArithmeticReplacement, 0.0);
        assert_eq!(best_of(&[&a, &b]).map(|m| m.id.as_str()), Some("a"));
        assert!(best_of(&[]).is_none());
    }
}
