//! Mutation testing framework adapters.
//!
//! The scorer and analyzer never talk to a framework directly; drivers go
//! through [`MutationFramework`].

mod report;

pub use report::{
    load_report, FrameworkKind, ReportAdapter, StandardMutantReport, DEFAULT_REPORT_FILE,
};

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::core::{
    Error, Mutant, MutationOperator, MutationResults, Result, DEFAULT_EXECUTION_TIME,
};

/// Capabilities a mutation testing framework exposes to the pipeline.
pub trait MutationFramework: Send + Sync {
    /// Framework name (e.g. "PIT").
    fn name(&self) -> &str;

    /// Produce pending mutants for the project at `project`.
    fn generate_mutants(&self, project: &Path) -> Result<Vec<Mutant>>;

    /// Execute `mutants` in order within `time_budget` seconds.
    ///
    /// Mutants that do not fit in the remaining budget stay pending.
    fn execute_mutants(&self, mutants: Vec<Mutant>, time_budget: f64) -> Result<MutationResults>;

    /// Translate a framework operator name into the shared enumeration.
    fn map_operator(&self, framework_operator: &str) -> MutationOperator;

    /// Read a finished framework report.
    fn parse_results(&self, report: &Path) -> Result<MutationResults>;

    /// Expected execution time of one mutant in seconds.
    fn estimate_execution_time(&self, _mutant: &Mutant) -> f64 {
        DEFAULT_EXECUTION_TIME
    }
}

/// Read a JSON array of mutant records and check the batch invariants.
pub fn load_mutants(path: &Path) -> Result<Vec<Mutant>> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    let mutants: Vec<Mutant> = serde_json::from_str(&content)?;
    validate_batch(&mutants)?;
    tracing::debug!("Loaded {} mutants from {}", mutants.len(), path.display());
    Ok(mutants)
}

/// Ids must be unique and every location well-formed.
pub fn validate_batch(mutants: &[Mutant]) -> Result<()> {
    let mut seen = HashSet::with_capacity(mutants.len());
    for mutant in mutants {
        if !seen.insert(mutant.id.as_str()) {
            return Err(Error::InvalidArgument(format!(
                "duplicate mutant id: {}",
                mutant.id
            )));
        }
        mutant.location.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CodeLocation;
    use tempfile::TempDir;

    fn mutant(id: &str, location: CodeLocation) -> Mutant {
        Mutant::new(id, id, location, MutationOperator::LogicalOperator, "&&", "||")
    }

    #[test]
    fn test_load_mutants() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mutants.json");
        let mutants = vec![
            mutant("m1", CodeLocation::line("a.py", 1, 4)),
            mutant("m2", CodeLocation::line("a.py", 2, 4)),
        ];
        fs::write(&path, serde_json::to_string(&mutants).unwrap()).unwrap();

        let loaded = load_mutants(&path).unwrap();
        assert_eq!(loaded, mutants);
    }

    #[test]
    fn test_load_mutants_missing_file() {
        let result = load_mutants(Path::new("/nonexistent/mutants.json"));
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn test_validate_batch_rejects_duplicate_ids() {
        let batch = vec![
            mutant("m1", CodeLocation::line("a.py", 1, 4)),
            mutant("m1", CodeLocation::line("a.py", 9, 4)),
        ];
        assert!(matches!(
            validate_batch(&batch),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_batch_rejects_inverted_span() {
        let batch = vec![mutant("m1", CodeLocation::new("a.py", 9, 2, 1, 1))];
        assert!(validate_batch(&batch).is_err());
    }
}
