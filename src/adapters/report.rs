//! Adapter over the standardized mutant report that PIT and Stryker runs are
//! converted to.
//!
//! Each report entry looks like:
//!
//! ```json
//! {
//!   "mutant_id": "pit-17", "file_path": "src/main/java/Calc.java",
//!   "line_number": 42, "column_number": 12, "operator_type": "MATH",
//!   "original_code": "a + b", "mutated_code": "a - b",
//!   "status": "KILLED", "execution_time_ms": 1830.0,
//!   "killing_test": "CalcTest.testAdd", "error_message": null
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::MutationFramework;
use crate::core::{
    CodeLocation, Error, Mutant, MutantStatus, MutationOperator, MutationResults, Result,
};

/// Report file looked up inside a project directory.
pub const DEFAULT_REPORT_FILE: &str = "mutants.json";

/// PIT operator names. Fully qualified and `_MUTATOR`-suffixed forms are
/// normalized before lookup.
const PIT_OPERATORS: &[(&str, MutationOperator)] = &[
    ("MATH", MutationOperator::ArithmeticReplacement),
    ("INVERT_NEGS", MutationOperator::ArithmeticReplacement),
    ("CONDITIONALS_BOUNDARY", MutationOperator::BoundaryCondition),
    ("NEGATE_CONDITIONALS", MutationOperator::NegateConditional),
    ("RETURN_VALS", MutationOperator::ReturnValueReplacement),
    ("EMPTY_RETURNS", MutationOperator::ReturnValueReplacement),
    ("FALSE_RETURNS", MutationOperator::ReturnValueReplacement),
    ("TRUE_RETURNS", MutationOperator::ReturnValueReplacement),
    ("NULL_RETURNS", MutationOperator::ReturnValueReplacement),
    ("PRIMITIVE_RETURNS", MutationOperator::ReturnValueReplacement),
    ("REMOVE_CONDITIONALS", MutationOperator::RemoveConditional),
    ("VOID_METHOD_CALLS", MutationOperator::VoidMethodCall),
    ("INCREMENTS", MutationOperator::IncrementDecrement),
];

const STRYKER_OPERATORS: &[(&str, MutationOperator)] = &[
    ("ArithmeticOperator", MutationOperator::ArithmeticReplacement),
    ("UnaryOperator", MutationOperator::ArithmeticReplacement),
    ("EqualityOperator", MutationOperator::BoundaryCondition),
    ("ConditionalExpression", MutationOperator::ConditionalReplacement),
    ("BooleanLiteral", MutationOperator::NegateConditional),
    ("LogicalOperator", MutationOperator::LogicalOperator),
    ("UpdateOperator", MutationOperator::IncrementDecrement),
    ("BlockStatement", MutationOperator::VoidMethodCall),
];

/// Frameworks whose reports this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameworkKind {
    #[serde(rename = "PIT")]
    Pit,
    #[serde(rename = "Stryker")]
    Stryker,
}

impl FrameworkKind {
    pub fn name(&self) -> &'static str {
        match self {
            FrameworkKind::Pit => "PIT",
            FrameworkKind::Stryker => "Stryker",
        }
    }

    /// Guess the framework from build files in `project`.
    pub fn detect(project: &Path) -> Option<Self> {
        let has = |file: &str| project.join(file).exists();
        if has("pom.xml") || has("build.gradle") || has("build.gradle.kts") {
            Some(FrameworkKind::Pit)
        } else if has("package.json") {
            Some(FrameworkKind::Stryker)
        } else {
            None
        }
    }

    /// Map a framework operator name; anything unknown is `OTHER`.
    pub fn map_operator(&self, name: &str) -> MutationOperator {
        let found = match self {
            FrameworkKind::Pit => {
                let key = normalize_pit_operator(name);
                PIT_OPERATORS
                    .iter()
                    .find(|(pit, _)| key == *pit || key.starts_with(&format!("{pit}_")))
                    .map(|(_, op)| *op)
            }
            FrameworkKind::Stryker => STRYKER_OPERATORS
                .iter()
                .find(|(stryker, _)| stryker.eq_ignore_ascii_case(name.trim()))
                .map(|(_, op)| *op),
        };
        found.unwrap_or(MutationOperator::FrameworkSpecific)
    }
}

impl std::fmt::Display for FrameworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for FrameworkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pit" | "pitest" => Ok(FrameworkKind::Pit),
            "stryker" => Ok(FrameworkKind::Stryker),
            other => Err(Error::adapter(format!("unknown framework: {other}"))),
        }
    }
}

/// Strip a package prefix and a `_MUTATOR` suffix.
fn normalize_pit_operator(name: &str) -> String {
    let last = name.rsplit('.').next().unwrap_or(name).trim().to_uppercase();
    last.strip_suffix("_MUTATOR").unwrap_or(&last).to_string()
}

/// One entry of a standardized mutant report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMutantReport {
    pub mutant_id: String,
    pub file_path: PathBuf,
    pub line_number: u32,
    #[serde(default)]
    pub column_number: u32,
    pub operator_type: String,
    #[serde(default)]
    pub original_code: String,
    #[serde(default)]
    pub mutated_code: String,
    /// `KILLED`, `SURVIVED`, `TIMEOUT`, `ERROR`, ... (empty when not run).
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub execution_time_ms: f64,
    #[serde(default)]
    pub killing_test: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StandardMutantReport {
    /// Recorded outcome; `Pending` when the entry has not been executed.
    pub fn outcome(&self) -> MutantStatus {
        let status = self.status.trim().to_uppercase().replace(['_', ' '], "");
        match status.as_str() {
            "KILLED" => MutantStatus::Killed,
            "SURVIVED" | "NOCOVERAGE" => MutantStatus::Survived,
            "TIMEOUT" | "TIMEDOUT" => MutantStatus::Timeout,
            "ERROR" | "RUNERROR" | "RUNTIMEERROR" | "COMPILEERROR" | "MEMORYERROR" => {
                MutantStatus::Error
            }
            _ => MutantStatus::Pending,
        }
    }

    pub fn execution_seconds(&self) -> f64 {
        self.execution_time_ms / 1000.0
    }

    /// Pending mutant described by this entry.
    pub fn to_mutant(&self, operator: MutationOperator) -> Mutant {
        let column_end = self.column_number + self.original_code.chars().count() as u32;
        let location = CodeLocation::new(
            &self.file_path,
            self.line_number,
            self.line_number,
            self.column_number,
            column_end,
        );
        let mut mutant = Mutant::new(
            &self.mutant_id,
            &self.mutant_id,
            location,
            operator,
            &self.original_code,
            &self.mutated_code,
        )
        .with_description(format!("{} at line {}", self.operator_type, self.line_number));
        if self.execution_time_ms > 0.0 {
            mutant.estimated_execution_time = self.execution_seconds();
        }
        mutant
    }

    /// Copy the recorded outcome onto a running mutant.
    fn apply_to(&self, mutant: &mut Mutant) -> Result<()> {
        let outcome = match self.outcome() {
            MutantStatus::Pending | MutantStatus::Running => MutantStatus::Error,
            status => status,
        };
        mutant.transition(outcome)?;
        mutant.execution_time = self.execution_seconds();
        mutant.killing_tests = self.killing_test.iter().cloned().collect();
        mutant.error_message = match outcome {
            MutantStatus::Error => Some(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| format!("no recorded outcome ({})", self.status)),
            ),
            _ => self.error_message.clone(),
        };
        Ok(())
    }
}

/// Read a report file (a JSON array of entries).
pub fn load_report(path: &Path) -> Result<Vec<StandardMutantReport>> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::adapter(format!("invalid report {}: {}", path.display(), e)))
}

/// Framework adapter that replays a recorded report.
///
/// `generate_mutants` loads the report and returns its entries as pending
/// mutants; `execute_mutants` replays the recorded outcome of each mutant
/// under a time budget.
#[derive(Debug)]
pub struct ReportAdapter {
    kind: FrameworkKind,
    recorded: RwLock<HashMap<String, StandardMutantReport>>,
}

impl ReportAdapter {
    pub fn new(kind: FrameworkKind) -> Self {
        Self {
            kind,
            recorded: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> FrameworkKind {
        self.kind
    }

    /// Register recorded outcomes, keyed by mutant id.
    pub fn record(&self, reports: impl IntoIterator<Item = StandardMutantReport>) {
        let mut recorded = self.recorded.write();
        for report in reports {
            recorded.insert(report.mutant_id.clone(), report);
        }
    }

    fn report_path(project: &Path) -> PathBuf {
        if project.is_file() {
            project.to_path_buf()
        } else {
            project.join(DEFAULT_REPORT_FILE)
        }
    }

    fn to_mutants(&self, reports: &[StandardMutantReport]) -> Vec<Mutant> {
        reports
            .iter()
            .map(|r| r.to_mutant(self.map_operator(&r.operator_type)))
            .collect()
    }
}

impl MutationFramework for ReportAdapter {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn generate_mutants(&self, project: &Path) -> Result<Vec<Mutant>> {
        let path = Self::report_path(project);
        let reports = load_report(&path)?;
        let mutants = self.to_mutants(&reports);
        self.record(reports);
        tracing::info!(
            "Loaded {} {} mutants from {}",
            mutants.len(),
            self.kind,
            path.display()
        );
        Ok(mutants)
    }

    fn execute_mutants(&self, mutants: Vec<Mutant>, time_budget: f64) -> Result<MutationResults> {
        let recorded = self.recorded.read();
        let mut spent = 0.0;
        let mut executed = Vec::with_capacity(mutants.len());

        for mut mutant in mutants {
            if mutant.status != MutantStatus::Pending {
                executed.push(mutant);
                continue;
            }
            let Some(report) = recorded.get(&mutant.id) else {
                tracing::warn!("No recorded outcome for mutant {}", mutant.id);
                executed.push(mutant);
                continue;
            };
            let estimate = self.estimate_execution_time(&mutant);
            if spent + estimate > time_budget {
                tracing::debug!("Budget exhausted before mutant {}", mutant.id);
                executed.push(mutant);
                continue;
            }

            mutant.transition(MutantStatus::Running)?;
            report.apply_to(&mut mutant)?;
            spent += mutant.execution_time;
            executed.push(mutant);
        }

        Ok(MutationResults::from_mutants(
            self.kind.name(),
            executed,
            time_budget,
        ))
    }

    fn map_operator(&self, framework_operator: &str) -> MutationOperator {
        self.kind.map_operator(framework_operator)
    }

    fn parse_results(&self, report: &Path) -> Result<MutationResults> {
        let reports = load_report(report)?;
        let mutants = reports
            .iter()
            .map(|r| {
                let mut mutant = r.to_mutant(self.map_operator(&r.operator_type));
                match r.outcome() {
                    MutantStatus::Pending | MutantStatus::Running => {}
                    status => {
                        mutant.status = status;
                        mutant.execution_time = r.execution_seconds();
                        mutant.killing_tests = r.killing_test.iter().cloned().collect();
                        mutant.error_message = r.error_message.clone();
                    }
                }
                mutant
            })
            .collect();

        let project = report
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.kind.name().to_string());
        Ok(MutationResults::from_mutants(project, mutants, 0.0))
    }

    fn estimate_execution_time(&self, mutant: &Mutant) -> f64 {
        mutant.estimated_execution_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, line: u32, operator: &str, status: &str, ms: f64) -> StandardMutantReport {
        StandardMutantReport {
            mutant_id: id.to_string(),
            file_path: PathBuf::from("src/main/java/Calc.java"),
            line_number: line,
            column_number: 8,
            operator_type: operator.to_string(),
            original_code: "a + b".to_string(),
            mutated_code: "a - b".to_string(),
            status: status.to_string(),
            execution_time_ms: ms,
            killing_test: (status == "KILLED").then(|| "CalcTest.testAdd".to_string()),
            error_message: None,
        }
    }

    fn write_report(dir: &Path, entries: &[StandardMutantReport]) -> PathBuf {
        let path = dir.join(DEFAULT_REPORT_FILE);
        fs::write(&path, serde_json::to_string(entries).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_pit_operator_mapping() {
        let pit = FrameworkKind::Pit;
        assert_eq!(pit.map_operator("MATH"), MutationOperator::ArithmeticReplacement);
        assert_eq!(
            pit.map_operator("CONDITIONALS_BOUNDARY_MUTATOR"),
            MutationOperator::BoundaryCondition
        );
        assert_eq!(
            pit.map_operator("org.pitest.mutationtest.NEGATE_CONDITIONALS"),
            MutationOperator::NegateConditional
        );
        assert_eq!(
            pit.map_operator("REMOVE_CONDITIONALS_ORDER_ELSE"),
            MutationOperator::RemoveConditional
        );
        assert_eq!(pit.map_operator("NULL_RETURNS"), MutationOperator::ReturnValueReplacement);
        assert_eq!(pit.map_operator("EXPERIMENTAL_SWITCH"), MutationOperator::FrameworkSpecific);
    }

    #[test]
    fn test_stryker_operator_mapping() {
        let stryker = FrameworkKind::Stryker;
        assert_eq!(stryker.map_operator("EqualityOperator"), MutationOperator::BoundaryCondition);
        assert_eq!(stryker.map_operator("UpdateOperator"), MutationOperator::IncrementDecrement);
        assert_eq!(stryker.map_operator("StringLiteral"), MutationOperator::FrameworkSpecific);
    }

    #[test]
    fn test_detect_framework() {
        let dir = TempDir::new().unwrap();
        assert_eq!(FrameworkKind::detect(dir.path()), None);

        fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(FrameworkKind::detect(dir.path()), Some(FrameworkKind::Stryker));

        fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        assert_eq!(FrameworkKind::detect(dir.path()), Some(FrameworkKind::Pit));
    }

    #[test]
    fn test_framework_from_str() {
        assert_eq!("pitest".parse::<FrameworkKind>().unwrap(), FrameworkKind::Pit);
        assert_eq!("Stryker".parse::<FrameworkKind>().unwrap(), FrameworkKind::Stryker);
        assert!("jest".parse::<FrameworkKind>().is_err());
    }

    #[test]
    fn test_report_outcome() {
        assert_eq!(entry("a", 1, "MATH", "KILLED", 0.0).outcome(), MutantStatus::Killed);
        assert_eq!(entry("a", 1, "MATH", "NO_COVERAGE", 0.0).outcome(), MutantStatus::Survived);
        assert_eq!(entry("a", 1, "MATH", "TIMED_OUT", 0.0).outcome(), MutantStatus::Timeout);
        assert_eq!(entry("a", 1, "MATH", "RuntimeError", 0.0).outcome(), MutantStatus::Error);
        assert_eq!(entry("a", 1, "MATH", "", 0.0).outcome(), MutantStatus::Pending);
    }

    #[test]
    fn test_generate_mutants_from_project() {
        let dir = TempDir::new().unwrap();
        write_report(
            dir.path(),
            &[
                entry("pit-1", 10, "MATH", "KILLED", 2000.0),
                entry("pit-2", 12, "INCREMENTS", "SURVIVED", 0.0),
            ],
        );

        let adapter = ReportAdapter::new(FrameworkKind::Pit);
        let mutants = adapter.generate_mutants(dir.path()).unwrap();
        assert_eq!(mutants.len(), 2);
        assert!(mutants.iter().all(|m| m.status == MutantStatus::Pending));
        assert_eq!(mutants[0].operator, MutationOperator::ArithmeticReplacement);
        assert_eq!(mutants[0].estimated_execution_time, 2.0);
        assert_eq!(mutants[1].estimated_execution_time, 3.0);
        assert_eq!(mutants[0].location.column_end, 13);
    }

    #[test]
    fn test_execute_respects_budget() {
        let dir = TempDir::new().unwrap();
        write_report(
            dir.path(),
            &[
                entry("pit-1", 10, "MATH", "KILLED", 2000.0),
                entry("pit-2", 20, "INCREMENTS", "SURVIVED", 2000.0),
                entry("pit-3", 30, "NEGATE_CONDITIONALS", "KILLED", 2000.0),
            ],
        );

        let adapter = ReportAdapter::new(FrameworkKind::Pit);
        let mutants = adapter.generate_mutants(dir.path()).unwrap();
        let results = adapter.execute_mutants(mutants, 5.0).unwrap();

        assert_eq!(results.mutants_executed, 2);
        assert_eq!(results.mutants_killed, 1);
        assert_eq!(results.mutants_survived, 1);
        assert_eq!(results.mutants[2].status, MutantStatus::Pending);
        assert_eq!(results.mutants[0].killing_tests, vec!["CalcTest.testAdd"]);
        assert!((results.execution_time - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_execute_unrecorded_outcome_is_error() {
        let adapter = ReportAdapter::new(FrameworkKind::Stryker);
        adapter.record([entry("s-1", 3, "ArithmeticOperator", "", 100.0)]);
        let mutant = entry("s-1", 3, "ArithmeticOperator", "", 100.0)
            .to_mutant(MutationOperator::ArithmeticReplacement);

        let results = adapter.execute_mutants(vec![mutant], 60.0).unwrap();
        assert_eq!(results.mutants_error, 1);
        assert!(results.mutants[0].error_message.is_some());
    }

    #[test]
    fn test_parse_results() {
        let dir = TempDir::new().unwrap();
        let path = write_report(
            dir.path(),
            &[
                entry("pit-1", 10, "MATH", "KILLED", 1000.0),
                entry("pit-2", 11, "MATH", "KILLED", 1000.0),
                entry("pit-3", 12, "MATH", "SURVIVED", 1000.0),
                entry("pit-4", 13, "MATH", "TIMEOUT", 5000.0),
            ],
        );

        let results = ReportAdapter::new(FrameworkKind::Pit)
            .parse_results(&path)
            .unwrap();
        assert_eq!(results.project_name, "mutants");
        assert_eq!(results.total_mutants, 4);
        assert_eq!(results.mutants_timeout, 1);
        assert!((results.mutation_score() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_report() {
        let adapter = ReportAdapter::new(FrameworkKind::Pit);
        let result = adapter.generate_mutants(Path::new("/nonexistent/project"));
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }
}
