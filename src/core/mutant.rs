//! Mutant records exchanged with mutation testing frameworks.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use super::{CodeMetrics, Error, HistoricalData, MutationOperator, Result};

/// Estimated execution time (seconds) when nothing better is known.
pub const DEFAULT_EXECUTION_TIME: f64 = 3.0;

/// Upper bound of the priority scale.
pub const MAX_PRIORITY: f64 = 10.0;

/// Source span of a mutation (1-indexed, inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeLocation {
    pub file_path: PathBuf,
    pub line_start: u32,
    pub line_end: u32,
    pub column_start: u32,
    pub column_end: u32,
}

impl CodeLocation {
    /// Create a new location.
    pub fn new(
        file_path: impl Into<PathBuf>,
        line_start: u32,
        line_end: u32,
        column_start: u32,
        column_end: u32,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line_start,
            line_end,
            column_start,
            column_end,
        }
    }

    /// Single-line location.
    pub fn line(file_path: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self::new(file_path, line, line, column, column)
    }

    /// Key used to look up coverage for this location (`file:line`).
    pub fn coverage_key(&self) -> String {
        format!("{}:{}", self.file_path.display(), self.line_start)
    }

    /// Check that start does not come after end on either axis.
    pub fn validate(&self) -> Result<()> {
        if self.line_start > self.line_end {
            return Err(Error::InvalidArgument(format!(
                "{self}: line_start {} > line_end {}",
                self.line_start, self.line_end
            )));
        }
        if self.column_start > self.column_end {
            return Err(Error::InvalidArgument(format!(
                "{self}: column_start {} > column_end {}",
                self.column_start, self.column_end
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file_path.display(),
            self.line_start,
            self.column_start
        )
    }
}

/// Execution status of a mutant.
///
/// `Pending` is initial; `Running` leads to one of the four terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutantStatus {
    #[default]
    Pending,
    Running,
    /// A test failed - the mutant was detected.
    Killed,
    /// Every test passed - the mutant went undetected.
    Survived,
    Timeout,
    Error,
}

impl MutantStatus {
    /// Returns true for the four post-running states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Killed | Self::Survived | Self::Timeout | Self::Error
        )
    }

    /// Returns true if this status represents a detected mutant.
    pub fn is_killed(&self) -> bool {
        matches!(self, Self::Killed)
    }

    /// Returns true if this status should be counted in the mutation score.
    pub fn counts_for_score(&self) -> bool {
        matches!(self, Self::Killed | Self::Survived)
    }

    /// Check whether the lifecycle allows moving to `next`.
    pub fn can_transition_to(&self, next: MutantStatus) -> bool {
        match self {
            Self::Pending => next == Self::Running,
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }
}

fn default_estimated_time() -> f64 {
    DEFAULT_EXECUTION_TIME
}

/// Clamp to the 0-10 priority scale, mapping NaN to 0.
fn clamp_priority(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, MAX_PRIORITY)
    }
}

fn deserialize_priority<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_priority)
}

/// A single mutant produced by a mutation testing framework.
///
/// The core only writes the scoring fields (`code_metrics`,
/// `historical_data`, `priority_score`); identity and location are
/// owned by the producing framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutant {
    /// Unique identifier within a working set.
    pub id: String,
    /// Identifier assigned by the producing framework (informational).
    #[serde(default)]
    pub origin_id: String,
    pub location: CodeLocation,
    pub operator: MutationOperator,
    pub original_code: String,
    pub mutated_code: String,
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: MutantStatus,
    /// Execution time in seconds.
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub killing_tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_metrics: Option<CodeMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_data: Option<HistoricalData>,

    /// Priority on a 0-10 scale.
    #[serde(default, deserialize_with = "deserialize_priority")]
    pub priority_score: f64,
    /// Estimated execution time in seconds.
    #[serde(default = "default_estimated_time")]
    pub estimated_execution_time: f64,
}

impl Mutant {
    /// Create a pending, unscored mutant.
    pub fn new(
        id: impl Into<String>,
        origin_id: impl Into<String>,
        location: CodeLocation,
        operator: MutationOperator,
        original_code: impl Into<String>,
        mutated_code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            origin_id: origin_id.into(),
            location,
            operator,
            original_code: original_code.into(),
            mutated_code: mutated_code.into(),
            description: String::new(),
            status: MutantStatus::Pending,
            execution_time: 0.0,
            killing_tests: Vec::new(),
            error_message: None,
            code_metrics: None,
            historical_data: None,
            priority_score: 0.0,
            estimated_execution_time: DEFAULT_EXECUTION_TIME,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach code metrics.
    pub fn with_metrics(mut self, metrics: CodeMetrics) -> Self {
        self.code_metrics = Some(metrics);
        self
    }

    /// Attach operator history.
    pub fn with_history(mut self, history: HistoricalData) -> Self {
        self.historical_data = Some(history);
        self
    }

    /// Set the priority score, clamped to the 0-10 scale.
    pub fn with_priority(mut self, score: f64) -> Self {
        self.set_priority(score);
        self
    }

    /// Set the status without lifecycle checks (for ingesting finished results).
    pub fn with_status(mut self, status: MutantStatus) -> Self {
        self.status = status;
        self
    }

    /// Store a priority score, clamped to the 0-10 scale.
    pub fn set_priority(&mut self, score: f64) {
        self.priority_score = clamp_priority(score);
    }

    /// Move to `next`, enforcing the status lifecycle.
    pub fn transition(&mut self, next: MutantStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// File containing the mutant.
    pub fn file_path(&self) -> &std::path::Path {
        &self.location.file_path
    }
}

impl PartialEq for Mutant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Mutant {}

impl std::hash::Hash for Mutant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Summary of a mutation testing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationResults {
    pub project_name: String,
    pub total_mutants: usize,
    pub mutants_executed: usize,
    pub mutants_killed: usize,
    pub mutants_survived: usize,
    pub mutants_timeout: usize,
    pub mutants_error: usize,
    /// Wall time spent executing, in seconds.
    pub execution_time: f64,
    /// Time budget the run was given, in seconds.
    pub time_budget: f64,
    pub mutants: Vec<Mutant>,
}

impl MutationResults {
    /// Build a summary from mutants after execution.
    pub fn from_mutants(project_name: impl Into<String>, mutants: Vec<Mutant>, time_budget: f64) -> Self {
        let mut results = Self {
            project_name: project_name.into(),
            total_mutants: mutants.len(),
            time_budget,
            ..Default::default()
        };
        for mutant in &mutants {
            if !mutant.status.is_terminal() {
                continue;
            }
            results.mutants_executed += 1;
            results.execution_time += mutant.execution_time;
            match mutant.status {
                MutantStatus::Killed => results.mutants_killed += 1,
                MutantStatus::Survived => results.mutants_survived += 1,
                MutantStatus::Timeout => results.mutants_timeout += 1,
                MutantStatus::Error => results.mutants_error += 1,
                MutantStatus::Pending | MutantStatus::Running => {}
            }
        }
        results.mutants = mutants;
        results
    }

    /// Killed / (killed + survived), as a percentage.
    pub fn mutation_score(&self) -> f64 {
        let scored = self.mutants_killed + self.mutants_survived;
        if scored == 0 {
            return 0.0;
        }
        self.mutants_killed as f64 / scored as f64 * 100.0
    }

    /// Projected time to execute every mutant at the observed average.
    pub fn estimated_full_execution_time(&self) -> f64 {
        if self.mutants_executed == 0 {
            return 0.0;
        }
        self.execution_time / self.mutants_executed as f64 * self.total_mutants as f64
    }

    /// Percentage of the projected full run that was not spent.
    pub fn time_saved_percent(&self) -> f64 {
        let full = self.estimated_full_execution_time();
        if full == 0.0 {
            return 0.0;
        }
        (1.0 - self.execution_time / full) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mutant(id: &str) -> Mutant {
        Mutant::new(
            id,
            "pit-1",
            CodeLocation::new("src/Calc.java", 10, 10, 4, 9),
            MutationOperator::ArithmeticReplacement,
            "a + b",
            "a - b",
        )
    }

    #[test]
    fn test_mutant_new() {
        let m = mutant("m1");
        assert_eq!(m.id, "m1");
        assert_eq!(m.origin_id, "pit-1");
        assert_eq!(m.status, MutantStatus::Pending);
        assert_eq!(m.priority_score, 0.0);
        assert_eq!(m.estimated_execution_time, DEFAULT_EXECUTION_TIME);
        assert!(m.code_metrics.is_none());
    }

    #[test]
    fn test_location_display_and_key() {
        let loc = CodeLocation::new("src/a.py", 12, 14, 3, 8);
        assert_eq!(loc.to_string(), "src/a.py:12:3");
        assert_eq!(loc.coverage_key(), "src/a.py:12");
    }

    #[test]
    fn test_location_validate() {
        assert!(CodeLocation::new("a.py", 3, 5, 1, 9).validate().is_ok());
        assert!(CodeLocation::line("a.py", 3, 1).validate().is_ok());
        assert!(CodeLocation::new("a.py", 5, 3, 1, 1).validate().is_err());
        assert!(CodeLocation::new("a.py", 5, 5, 8, 2).validate().is_err());
    }

    #[test]
    fn test_priority_clamped() {
        let mut m = mutant("m1");
        m.set_priority(12.5);
        assert_eq!(m.priority_score, MAX_PRIORITY);
        m.set_priority(-1.0);
        assert_eq!(m.priority_score, 0.0);
        m.set_priority(f64::NAN);
        assert_eq!(m.priority_score, 0.0);
    }

    #[test]
    fn test_status_lifecycle() {
        let mut m = mutant("m1");
        assert!(m.transition(MutantStatus::Killed).is_err());
        m.transition(MutantStatus::Running).unwrap();
        m.transition(MutantStatus::Survived).unwrap();
        assert!(m.status.is_terminal());
        assert!(m.transition(MutantStatus::Running).is_err());
    }

    #[test]
    fn test_status_terminal_set() {
        assert!(!MutantStatus::Pending.is_terminal());
        assert!(!MutantStatus::Running.is_terminal());
        assert!(MutantStatus::Killed.is_terminal());
        assert!(MutantStatus::Survived.is_terminal());
        assert!(MutantStatus::Timeout.is_terminal());
        assert!(MutantStatus::Error.is_terminal());
    }

    #[test]
    fn test_status_counts_for_score() {
        assert!(MutantStatus::Killed.counts_for_score());
        assert!(MutantStatus::Survived.counts_for_score());
        assert!(!MutantStatus::Timeout.counts_for_score());
        assert!(!MutantStatus::Pending.counts_for_score());
    }

    #[test]
    fn test_equality_by_id() {
        let a = mutant("m1");
        let mut b = mutant("m1");
        b.mutated_code = "a * b".into();
        assert_eq!(a, b);
        assert_ne!(a, mutant("m2"));
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{
            "id": "m7",
            "location": {"file_path": "x.js", "line_start": 3, "line_end": 3,
                         "column_start": 1, "column_end": 6},
            "operator": "BOUNDARY",
            "original_code": "i < n",
            "mutated_code": "i <= n"
        }"#;
        let m: Mutant = serde_json::from_str(json).unwrap();
        assert_eq!(m.operator, MutationOperator::BoundaryCondition);
        assert_eq!(m.status, MutantStatus::Pending);
        assert_eq!(m.estimated_execution_time, DEFAULT_EXECUTION_TIME);
    }

    #[test]
    fn test_deserialized_priority_clamped() {
        let record = |score: &str| {
            format!(
                r#"{{"id": "m1", "operator": "ARITHMETIC", "original_code": "a", "mutated_code": "b",
                    "location": {{"file_path": "x.py", "line_start": 1, "line_end": 1,
                                  "column_start": 1, "column_end": 2}},
                    "priority_score": {score}}}"#
            )
        };
        let high: Mutant = serde_json::from_str(&record("42")).unwrap();
        assert_eq!(high.priority_score, MAX_PRIORITY);
        let low: Mutant = serde_json::from_str(&record("-3.5")).unwrap();
        assert_eq!(low.priority_score, 0.0);
        let mid: Mutant = serde_json::from_str(&record("6.25")).unwrap();
        assert_eq!(mid.priority_score, 6.25);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&MutantStatus::Killed).unwrap(),
            "\"killed\""
        );
        assert_eq!(
            serde_json::to_string(&MutantStatus::Timeout).unwrap(),
            "\"timeout\""
        );
    }

    #[test]
    fn test_mutation_results_summary() {
        let mutants = vec![
            mutant("a").with_status(MutantStatus::Killed),
            mutant("b").with_status(MutantStatus::Killed),
            mutant("c").with_status(MutantStatus::Survived),
            mutant("d").with_status(MutantStatus::Timeout),
            mutant("e"),
        ];
        let mut mutants = mutants;
        for m in &mut mutants {
            if m.status.is_terminal() {
                m.execution_time = 2.0;
            }
        }
        let results = MutationResults::from_mutants("demo", mutants, 60.0);
        assert_eq!(results.total_mutants, 5);
        assert_eq!(results.mutants_executed, 4);
        assert_eq!(results.mutants_killed, 2);
        assert_eq!(results.mutants_timeout, 1);
        assert!((results.mutation_score() - 200.0 / 3.0).abs() < 1e-9);
        assert!((results.estimated_full_execution_time() - 10.0).abs() < 1e-9);
        assert!((results.time_saved_percent() - 20.0).abs() < 1e-9);
    }
}
