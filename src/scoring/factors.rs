//! The five scoring signals and their weights.

use serde::{Deserialize, Serialize};

use crate::core::{CodeMetrics, Error, HistoricalData, Result};

/// Tolerance when checking that weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Value every mutant receives for a factor that is uniform across a batch.
pub const UNIFORM_FACTOR: f64 = 0.5;

/// Factor weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub historical: f64,
    pub complexity: f64,
    pub security: f64,
    pub recency: f64,
    pub bug_history: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            historical: 0.30,
            complexity: 0.25,
            security: 0.20,
            recency: 0.15,
            bug_history: 0.10,
        }
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Reject negative weights and weights that do not sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        if self.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::InvalidArgument(format!(
                "scoring weights must be non-negative: {self:?}"
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(Error::InvalidWeights { sum });
        }
        Ok(())
    }

    pub(crate) fn as_array(&self) -> [f64; 5] {
        [
            self.historical,
            self.complexity,
            self.security,
            self.recency,
            self.bug_history,
        ]
    }
}

/// Factor identifiers, in weight order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Historical,
    Complexity,
    Security,
    Recency,
    BugHistory,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Historical,
        Factor::Complexity,
        Factor::Security,
        Factor::Recency,
        Factor::BugHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Historical => "historical",
            Factor::Complexity => "complexity",
            Factor::Security => "security",
            Factor::Recency => "recency",
            Factor::BugHistory => "bug_history",
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One value per factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorValues {
    pub historical: f64,
    pub complexity: f64,
    pub security: f64,
    pub recency: f64,
    pub bug_history: f64,
}

impl FactorValues {
    /// Raw factors for one mutant. Missing inputs get neutral values.
    pub fn compute(
        metrics: Option<&CodeMetrics>,
        history: Option<&HistoricalData>,
        bug_count: u32,
    ) -> Self {
        Self {
            historical: historical_factor(history),
            complexity: complexity_factor(metrics),
            security: security_factor(metrics),
            recency: recency_factor(metrics),
            bug_history: bug_history_factor(bug_count),
        }
    }

    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Historical => self.historical,
            Factor::Complexity => self.complexity,
            Factor::Security => self.security,
            Factor::Recency => self.recency,
            Factor::BugHistory => self.bug_history,
        }
    }

    fn set(&mut self, factor: Factor, value: f64) {
        match factor {
            Factor::Historical => self.historical = value,
            Factor::Complexity => self.complexity = value,
            Factor::Security => self.security = value,
            Factor::Recency => self.recency = value,
            Factor::BugHistory => self.bug_history = value,
        }
    }

    /// Weighted sum scaled to 0-10.
    pub fn weighted_score(&self, weights: &Weights) -> f64 {
        Factor::ALL
            .iter()
            .zip(weights.as_array())
            .map(|(factor, weight)| weight * self.get(*factor))
            .sum::<f64>()
            * 10.0
    }
}

/// Operator kill rate; 0.5 without history.
pub fn historical_factor(history: Option<&HistoricalData>) -> f64 {
    history.map_or(0.5, HistoricalData::kill_rate)
}

/// Weighted blend of capped complexity signals; 0.5 without metrics.
///
/// Each term is capped at 1.0; the blend itself is not clamped.
pub fn complexity_factor(metrics: Option<&CodeMetrics>) -> f64 {
    let Some(m) = metrics else {
        return 0.5;
    };
    let cyclomatic = (m.cyclomatic_complexity as f64 / 20.0).min(1.0);
    let cognitive = (m.cognitive_complexity as f64 / 30.0).min(1.0);
    let nesting = (m.nesting_depth as f64 / 5.0).min(1.0);
    let params = (m.parameter_count as f64 / 8.0).min(1.0);
    0.4 * cyclomatic + 0.3 * cognitive + 0.2 * nesting + 0.1 * params
}

/// 1.0 for security-critical code, 0.3 for public API, else 0.0.
pub fn security_factor(metrics: Option<&CodeMetrics>) -> f64 {
    match metrics {
        Some(m) if m.is_security_critical => 1.0,
        Some(m) if m.is_public_api => 0.3,
        _ => 0.0,
    }
}

/// Exponential decay over file age in days; 0.0 without metrics.
pub fn recency_factor(metrics: Option<&CodeMetrics>) -> f64 {
    metrics.map_or(0.0, |m| (-(m.days_since_modified as f64) / 10.0).exp())
}

pub fn bug_history_factor(bug_count: u32) -> f64 {
    (bug_count as f64 / 10.0).min(1.0)
}

/// Min-max scale `values` into [0, 1].
///
/// A uniform column maps to 0.5 everywhere.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return vec![UNIFORM_FACTOR; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Normalize each factor independently across the batch.
pub fn normalize_batch(raw: &[FactorValues]) -> Vec<FactorValues> {
    let mut normalized = vec![FactorValues::default(); raw.len()];
    for factor in Factor::ALL {
        let column: Vec<f64> = raw.iter().map(|r| r.get(factor)).collect();
        for (slot, value) in normalized.iter_mut().zip(normalize(&column)) {
            slot.set(factor, value);
        }
    }
    normalized
}
