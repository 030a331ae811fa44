//! Score-then-reduce driver.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{Mutant, Result};
use crate::providers::{HistoryStore, MetricsProvider};
use crate::scoring::MultiFactorScorer;
use crate::subsumption::{CoverageEstimator, Removal, SubsumptionAnalyzer, SubsumptionStats};

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Counts for the full reduction, unaffected by `truncate`.
    pub stats: SubsumptionStats,
    /// Sum of the estimated execution times of the surviving mutants.
    pub estimated_time: f64,
    /// Surviving mutants, highest priority first.
    pub mutants: Vec<Mutant>,
    pub removals: Vec<Removal>,
}

impl PipelineReport {
    /// Keep the `limit` highest-priority survivors and re-total their estimated time.
    pub fn truncate(&mut self, limit: usize) {
        self.mutants.truncate(limit);
        self.estimated_time = self.mutants.iter().map(|m| m.estimated_execution_time).sum();
    }
}

/// Scores a batch, then removes redundant mutants.
pub struct Pipeline {
    scorer: MultiFactorScorer,
    analyzer: SubsumptionAnalyzer,
}

impl Pipeline {
    pub fn new(scorer: MultiFactorScorer, analyzer: SubsumptionAnalyzer) -> Self {
        Self { scorer, analyzer }
    }

    /// Build both stages from configuration and collaborators.
    pub fn from_config(
        config: &Config,
        metrics: Arc<dyn MetricsProvider>,
        history: Arc<dyn HistoryStore>,
        coverage: Arc<dyn CoverageEstimator>,
    ) -> Result<Self> {
        config.validate()?;
        let scorer = MultiFactorScorer::new(metrics, history).with_weights(config.scoring.weights)?;
        let analyzer = SubsumptionAnalyzer::new(coverage).with_config(config.subsumption)?;
        Ok(Self::new(scorer, analyzer))
    }

    pub fn scorer(&self) -> &MultiFactorScorer {
        &self.scorer
    }

    pub fn analyzer(&self) -> &SubsumptionAnalyzer {
        &self.analyzer
    }

    /// Score `mutants`, reduce them and return the survivors by priority.
    pub fn run(&mut self, mutants: Vec<Mutant>) -> PipelineReport {
        let scored = self.scorer.score_all(mutants);
        // Survivors keep the scorer's descending order.
        let survivors = self.analyzer.filter_redundant(scored);

        PipelineReport {
            stats: self.analyzer.get_statistics().clone(),
            estimated_time: survivors.iter().map(|m| m.estimated_execution_time).sum(),
            mutants: survivors,
            removals: self.analyzer.removals().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CodeLocation, CodeMetrics, MutationOperator};
    use crate::providers::{HistoryTracker, StaticMetrics};
    use crate::subsumption::CoverageMapper;

    fn pipeline(config: &Config) -> Result<Pipeline> {
        let mut table = StaticMetrics::new();
        table.insert(
            "core.py",
            CodeMetrics {
                cyclomatic_complexity: 15,
                is_security_critical: true,
                days_since_modified: 1,
                ..Default::default()
            },
        );
        Pipeline::from_config(
            config,
            Arc::new(table),
            Arc::new(HistoryTracker::in_memory()),
            Arc::new(CoverageMapper::new()),
        )
    }

    fn mutant(id: &str, file: &str, line: u32, op: MutationOperator, mutated: &str) -> Mutant {
        Mutant::new(id, id, CodeLocation::line(file, line, 4), op, "a < b", mutated)
    }

    #[test]
    fn test_run_scores_then_reduces() {
        let mut pipeline = pipeline(&Config::default()).unwrap();
        let report = pipeline.run(vec![
            mutant("low", "util.py", 3, MutationOperator::ConditionalReplacement, "a > b"),
            mutant("high", "core.py", 3, MutationOperator::BoundaryCondition, "a <= b"),
            mutant("dup", "core.py", 3, MutationOperator::BoundaryCondition, "a <= b"),
            mutant("neg", "core.py", 5, MutationOperator::NegateConditional, "!(a < b)"),
        ]);

        let ids: Vec<&str> = report.mutants.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low"]);
        assert_eq!(report.stats.total_input, 4);
        assert_eq!(report.stats.exact_duplicates, 1);
        assert_eq!(report.stats.operator_subsumed, 1);
        assert_eq!(report.removals.len(), 2);
        assert!((report.estimated_time - 6.0).abs() < 1e-9);
        assert!(report.mutants[0].priority_score > report.mutants[1].priority_score);
    }

    #[test]
    fn test_truncate_retotals_estimated_time() {
        let mut pipeline = pipeline(&Config::default()).unwrap();
        let mut report = pipeline.run(vec![
            mutant("a", "core.py", 3, MutationOperator::BoundaryCondition, "a <= b"),
            mutant("b", "util.py", 40, MutationOperator::ArithmeticReplacement, "a - b"),
            mutant("c", "util.py", 90, MutationOperator::LogicalOperator, "a || b"),
        ]);
        assert_eq!(report.mutants.len(), 3);

        report.truncate(1);
        assert_eq!(report.mutants.len(), 1);
        assert_eq!(report.mutants[0].id, "a");
        assert!((report.estimated_time - report.mutants[0].estimated_execution_time).abs() < 1e-9);
        assert_eq!(report.stats.total_output, 3);

        report.truncate(10);
        assert_eq!(report.mutants.len(), 1);
    }

    #[test]
    fn test_from_config_rejects_bad_weights() {
        let mut config = Config::default();
        config.scoring.weights.historical = 0.9;
        assert!(pipeline(&config).is_err());
    }
}
