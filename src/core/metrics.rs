//! Scoring inputs attached to mutants: code metrics and operator history.

use serde::{Deserialize, Serialize};

use super::MutationOperator;

/// Age reported when the modification time of a file is unknown.
pub const UNKNOWN_AGE_DAYS: u32 = 999;

/// Complexity and criticality snapshot for the code around a mutant.
///
/// The default value is the neutral snapshot a metrics provider returns
/// when it cannot analyze a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeMetrics {
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub nesting_depth: u32,
    pub lines_of_code: u32,
    pub parameter_count: u32,
    pub is_public_api: bool,
    pub is_security_critical: bool,
    pub days_since_modified: u32,
}

impl Default for CodeMetrics {
    fn default() -> Self {
        Self {
            cyclomatic_complexity: 0,
            cognitive_complexity: 0,
            nesting_depth: 0,
            lines_of_code: 0,
            parameter_count: 0,
            is_public_api: false,
            is_security_critical: false,
            days_since_modified: UNKNOWN_AGE_DAYS,
        }
    }
}

impl CodeMetrics {
    /// Neutral metrics used when analysis is impossible.
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// Aggregate historical effectiveness of one mutation operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    pub operator: MutationOperator,
    pub times_generated: u64,
    pub times_killed: u64,
    pub times_survived: u64,
    /// Running average time (seconds) until a killing test fails.
    pub average_detection_time: f64,
}

impl HistoricalData {
    /// Create history with the given counters.
    pub fn new(operator: MutationOperator, generated: u64, killed: u64, survived: u64) -> Self {
        Self {
            operator,
            times_generated: generated,
            times_killed: killed,
            times_survived: survived,
            average_detection_time: 0.0,
        }
    }

    /// Set the average detection time.
    pub fn with_average_time(mut self, seconds: f64) -> Self {
        self.average_detection_time = seconds;
        self
    }

    /// Empty counters for an operator seen for the first time.
    pub fn empty(operator: MutationOperator) -> Self {
        Self::new(operator, 0, 0, 0)
    }

    /// Fraction of observed mutants that were killed.
    ///
    /// Returns 0.5 when nothing has been observed yet.
    pub fn kill_rate(&self) -> f64 {
        let total = self.times_killed + self.times_survived;
        if total == 0 {
            return 0.5;
        }
        self.times_killed as f64 / total as f64
    }

    /// Number of mutants with a kill/survive verdict.
    pub fn total_executions(&self) -> u64 {
        self.times_killed + self.times_survived
    }

    /// Record a kill and fold its time into the running average.
    pub fn record_kill(&mut self, execution_time: f64) {
        self.times_killed += 1;
        let previous = self.average_detection_time * (self.times_killed - 1) as f64;
        self.average_detection_time = (previous + execution_time) / self.times_killed as f64;
    }
}
