//! Multi-factor priority scoring.
//!
//! Every mutant in a batch gets five raw factors (historical effectiveness,
//! complexity, security, recency, bug history). Each factor is min-max
//! normalized across the batch, weighted, and scaled to a 0-10 priority.
//! Scores are batch-relative: the same mutant can score differently
//! depending on what else is in the batch.

mod factors;

pub use factors::{
    bug_history_factor, complexity_factor, historical_factor, normalize, normalize_batch,
    recency_factor, security_factor, Factor, FactorValues, Weights, UNIFORM_FACTOR,
    WEIGHT_TOLERANCE,
};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::{CodeLocation, CodeMetrics, Mutant, Result, UNKNOWN_AGE_DAYS};
use crate::providers::{HistoryStore, MetricsProvider};

/// Metrics and bug count for one file, computed once per scorer.
#[derive(Debug, Clone)]
struct FileProfile {
    metrics: CodeMetrics,
    bug_count: u32,
}

/// Per-factor detail of a score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub factor: Factor,
    pub raw: f64,
    pub normalized: f64,
    pub weight: f64,
    /// `weight * normalized * 10`; the contributions sum to the final score.
    pub contribution: f64,
    pub explanation: String,
}

/// Why a mutant received its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreExplanation {
    pub mutant_id: String,
    pub final_score: f64,
    pub factors: Vec<FactorBreakdown>,
}

/// Scores mutants from code metrics, operator history and bug history.
pub struct MultiFactorScorer {
    metrics: Arc<dyn MetricsProvider>,
    history: Arc<dyn HistoryStore>,
    weights: Weights,
    cache: Mutex<HashMap<PathBuf, FileProfile>>,
}

impl MultiFactorScorer {
    pub fn new(metrics: Arc<dyn MetricsProvider>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            metrics,
            history,
            weights: Weights::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Use custom weights. Fails unless they sum to 1.0.
    pub fn with_weights(mut self, weights: Weights) -> Result<Self> {
        weights.validate()?;
        self.weights = weights;
        Ok(self)
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Score the batch and sort it by descending priority.
    ///
    /// Ties keep their input order.
    pub fn score_all(&self, mut mutants: Vec<Mutant>) -> Vec<Mutant> {
        if mutants.is_empty() {
            return mutants;
        }
        tracing::debug!("Scoring {} mutants", mutants.len());

        let (_, normalized) = self.factor_table(&mut mutants);
        for (mutant, factors) in mutants.iter_mut().zip(&normalized) {
            mutant.set_priority(factors.weighted_score(&self.weights));
        }
        mutants.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));

        if let (Some(top), Some(bottom)) = (mutants.first(), mutants.last()) {
            tracing::info!(
                "Scored {} mutants (range {:.2} - {:.2})",
                mutants.len(),
                bottom.priority_score,
                top.priority_score
            );
        }
        mutants
    }

    /// Score one mutant as part of `mutant` plus `context`.
    ///
    /// With an empty context this is the score of a singleton batch.
    pub fn score_single(&self, mutant: &Mutant, context: &[Mutant]) -> f64 {
        let batch = with_context(mutant, context);
        self.score_all(batch)
            .into_iter()
            .find(|m| m.id == mutant.id)
            .map_or(0.0, |m| m.priority_score)
    }

    /// Per-factor breakdown of the score `mutant` gets in `mutant` plus `context`.
    pub fn explain_score(&self, mutant: &Mutant, context: &[Mutant]) -> ScoreExplanation {
        let mut batch = with_context(mutant, context);
        let (raw, normalized) = self.factor_table(&mut batch);
        let target = &batch[0];
        let raw = raw[0];
        let normalized = normalized[0];

        let factors: Vec<FactorBreakdown> = Factor::ALL
            .iter()
            .zip(self.weights.as_array())
            .map(|(&factor, weight)| FactorBreakdown {
                factor,
                raw: raw.get(factor),
                normalized: normalized.get(factor),
                weight,
                contribution: weight * normalized.get(factor) * 10.0,
                explanation: describe(factor, raw.get(factor), target),
            })
            .collect();
        let total: f64 = factors.iter().map(|f| f.contribution).sum();

        ScoreExplanation {
            mutant_id: mutant.id.clone(),
            final_score: total.clamp(0.0, 10.0),
            factors,
        }
    }

    /// Drop cached file metrics.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Files with cached metrics.
    pub fn cached_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.cache.lock().keys().cloned().collect();
        files.sort();
        files
    }

    /// Attach current provider inputs and compute raw and batch-normalized factors.
    ///
    /// Metrics and history already on a mutant are replaced, so a rescored
    /// batch reflects the latest history updates.
    fn factor_table(&self, mutants: &mut [Mutant]) -> (Vec<FactorValues>, Vec<FactorValues>) {
        let raw: Vec<FactorValues> = mutants
            .iter_mut()
            .map(|mutant| {
                let profile = self.file_profile(&mutant.location);
                mutant.code_metrics = Some(profile.metrics);
                mutant.historical_data = Some(self.history.operator_history(mutant.operator));
                FactorValues::compute(
                    mutant.code_metrics.as_ref(),
                    mutant.historical_data.as_ref(),
                    profile.bug_count,
                )
            })
            .collect();
        let normalized = normalize_batch(&raw);
        (raw, normalized)
    }

    /// Metrics for the file containing `location`, analyzed at most once.
    fn file_profile(&self, location: &CodeLocation) -> FileProfile {
        let file = location.file_path.as_path();
        let mut cache = self.cache.lock();
        if let Some(profile) = cache.get(file) {
            return profile.clone();
        }

        let metrics = match self.metrics.analyze(location) {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::warn!(
                    "Metrics unavailable for {}, using neutral values: {}",
                    file.display(),
                    e
                );
                CodeMetrics::default()
            }
        };
        let profile = FileProfile {
            metrics,
            bug_count: self.metrics.historical_bug_count(file),
        };
        cache.insert(file.to_path_buf(), profile.clone());
        profile
    }
}

/// `mutant` followed by the context minus any entry with the same id.
fn with_context(mutant: &Mutant, context: &[Mutant]) -> Vec<Mutant> {
    std::iter::once(mutant.clone())
        .chain(context.iter().filter(|m| m.id != mutant.id).cloned())
        .collect()
}

fn describe(factor: Factor, raw: f64, mutant: &Mutant) -> String {
    let metrics = mutant.code_metrics.as_ref();
    match factor {
        Factor::Historical => format!("Operator kill rate {:.0}%", raw * 100.0),
        Factor::Complexity => match metrics {
            Some(m) => format!(
                "Cyclomatic {}, cognitive {}, nesting {}",
                m.cyclomatic_complexity, m.cognitive_complexity, m.nesting_depth
            ),
            None => "No complexity data".to_string(),
        },
        Factor::Security => match metrics {
            Some(m) if m.is_security_critical => "Security-critical code".to_string(),
            Some(m) if m.is_public_api => "Public API".to_string(),
            _ => "Non-critical code".to_string(),
        },
        Factor::Recency => match metrics {
            Some(m) if m.days_since_modified < UNKNOWN_AGE_DAYS => {
                format!("Modified {} days ago", m.days_since_modified)
            }
            _ => "Modification time unknown".to_string(),
        },
        Factor::BugHistory => format!(
            "{} historical bugs in {}",
            (raw * 10.0).round() as u32,
            mutant.file_path().display()
        ),
    }
}
