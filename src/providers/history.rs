//! Historical operator effectiveness, persisted as a JSON table.
//!
//! The table is keyed by operator (`"ARITHMETIC"`, `"BOUNDARY"`, ...):
//!
//! ```json
//! {
//!   "ARITHMETIC": {"generated": 150, "killed": 120, "survived": 30, "avg_time": 2.4}
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::{Error, HistoricalData, Mutant, MutantStatus, MutationOperator, Result};

/// Source of per-operator history for scoring.
pub trait HistoryStore: Send + Sync {
    /// History for `operator`. Never fails; unknown operators get a neutral default.
    fn operator_history(&self, operator: MutationOperator) -> HistoricalData;

    /// Fold the outcomes of executed mutants into the counters.
    fn update(&self, mutants: &[Mutant]);
}

/// Persisted counters for a single operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRecord {
    pub generated: u64,
    pub killed: u64,
    pub survived: u64,
    pub avg_time: f64,
}

/// Per-operator summary for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorStats {
    pub kill_rate: f64,
    pub total_executions: u64,
    pub avg_time: f64,
}

/// Typical kill rates reported in mutation testing literature:
/// (operator, generated, killed, survived).
const LITERATURE_DEFAULTS: &[(MutationOperator, u64, u64, u64)] = &[
    (MutationOperator::ArithmeticReplacement, 100, 75, 25),
    (MutationOperator::BoundaryCondition, 100, 85, 15),
    (MutationOperator::ConditionalReplacement, 100, 70, 30),
    (MutationOperator::NegateConditional, 100, 80, 20),
    (MutationOperator::ReturnValueReplacement, 100, 65, 35),
    (MutationOperator::RemoveConditional, 100, 60, 40),
    (MutationOperator::IncrementDecrement, 100, 72, 28),
    (MutationOperator::LogicalOperator, 100, 78, 22),
    (MutationOperator::VoidMethodCall, 100, 45, 55),
];

const DEFAULT_DETECTION_TIME: f64 = 3.0;

/// History returned for operators without any record.
pub fn unknown_operator_history(operator: MutationOperator) -> HistoricalData {
    HistoricalData::new(operator, 10, 5, 5).with_average_time(DEFAULT_DETECTION_TIME)
}

fn literature_table() -> BTreeMap<MutationOperator, HistoricalData> {
    LITERATURE_DEFAULTS
        .iter()
        .map(|&(op, generated, killed, survived)| {
            (
                op,
                HistoricalData::new(op, generated, killed, survived)
                    .with_average_time(DEFAULT_DETECTION_TIME),
            )
        })
        .collect()
}

/// File-backed history store.
#[derive(Debug)]
pub struct HistoryTracker {
    path: Option<PathBuf>,
    data: RwLock<BTreeMap<MutationOperator, HistoricalData>>,
}

impl Default for HistoryTracker {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl HistoryTracker {
    /// Store seeded with literature defaults that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(literature_table()),
        }
    }

    /// Open the store at `path`.
    ///
    /// A missing or unreadable file yields the literature defaults; entries
    /// with unknown operator keys are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = if path.exists() {
            match load_table(&path) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!(
                        "Could not load history from {}, using defaults: {}",
                        path.display(),
                        e
                    );
                    literature_table()
                }
            }
        } else {
            tracing::debug!("No history at {}, using defaults", path.display());
            literature_table()
        };

        Self {
            path: Some(path),
            data: RwLock::new(data),
        }
    }

    /// Path backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the table to its backing file.
    ///
    /// In-memory state is kept as-is when the write fails.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let table: BTreeMap<String, HistoryRecord> = self
            .data
            .read()
            .iter()
            .map(|(op, hist)| {
                (
                    op.as_str().to_string(),
                    HistoryRecord {
                        generated: hist.times_generated,
                        killed: hist.times_killed,
                        survived: hist.times_survived,
                        avg_time: hist.average_detection_time,
                    },
                )
            })
            .collect();

        let result = serde_json::to_vec_pretty(&table)
            .map_err(Error::from)
            .and_then(|content| atomic_write(path, &content));
        if let Err(e) = &result {
            tracing::error!("Error saving history to {}: {}", path.display(), e);
        }
        result.map_err(|e| Error::persistence(path, e.to_string()))
    }

    /// Kill rate, executions and average time per operator key.
    pub fn stats_summary(&self) -> BTreeMap<String, OperatorStats> {
        self.data
            .read()
            .iter()
            .map(|(op, hist)| {
                (
                    op.as_str().to_string(),
                    OperatorStats {
                        kill_rate: hist.kill_rate(),
                        total_executions: hist.total_executions(),
                        avg_time: hist.average_detection_time,
                    },
                )
            })
            .collect()
    }

    /// Snapshot of all records.
    pub fn snapshot(&self) -> Vec<HistoricalData> {
        self.data.read().values().cloned().collect()
    }
}

impl HistoryStore for HistoryTracker {
    fn operator_history(&self, operator: MutationOperator) -> HistoricalData {
        self.data
            .read()
            .get(&operator)
            .cloned()
            .unwrap_or_else(|| unknown_operator_history(operator))
    }

    fn update(&self, mutants: &[Mutant]) {
        let mut data = self.data.write();
        for mutant in mutants.iter().filter(|m| m.status.is_terminal()) {
            let hist = data
                .entry(mutant.operator)
                .or_insert_with(|| HistoricalData::empty(mutant.operator));
            hist.times_generated += 1;
            match mutant.status {
                MutantStatus::Killed => hist.record_kill(mutant.execution_time),
                MutantStatus::Survived => hist.times_survived += 1,
                _ => {}
            }
        }
    }
}

fn load_table(path: &Path) -> Result<BTreeMap<MutationOperator, HistoricalData>> {
    let content = fs::read_to_string(path)?;
    let raw: BTreeMap<String, HistoryRecord> = serde_json::from_str(&content)?;

    let mut table = BTreeMap::new();
    for (key, record) in raw {
        let operator = match key.parse::<MutationOperator>() {
            Ok(op) => op,
            Err(e) => {
                tracing::warn!("Skipping history entry: {}", e);
                continue;
            }
        };
        table.insert(
            operator,
            HistoricalData::new(operator, record.generated, record.killed, record.survived)
                .with_average_time(record.avg_time),
        );
    }
    Ok(table)
}

/// Write content to a file atomically.
///
/// Writes to a temporary sibling first, then renames it over the target.
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let temp_path = parent.join(format!(".impt-history-{}.tmp", std::process::id()));

    let mut file = File::create(&temp_path)?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CodeLocation;
    use tempfile::TempDir;

    fn executed(id: &str, op: MutationOperator, status: MutantStatus, time: f64) -> Mutant {
        let mut m = Mutant::new(
            id,
            id,
            CodeLocation::line("Calc.java", 1, 1),
            op,
            "x",
            "y",
        )
        .with_status(status);
        m.execution_time = time;
        m
    }

    #[test]
    fn test_defaults_loaded() {
        let tracker = HistoryTracker::in_memory();
        let hist = tracker.operator_history(MutationOperator::BoundaryCondition);
        assert_eq!(hist.times_generated, 100);
        assert!((hist.kill_rate() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_operator_default() {
        let tracker = HistoryTracker::in_memory();
        let hist = tracker.operator_history(MutationOperator::FrameworkSpecific);
        assert_eq!(hist.times_generated, 10);
        assert_eq!(hist.times_killed, 5);
        assert_eq!(hist.times_survived, 5);
    }

    #[test]
    fn test_update_counts_terminal_mutants() {
        let tracker = HistoryTracker::in_memory();
        tracker.update(&[
            executed("a", MutationOperator::FrameworkSpecific, MutantStatus::Killed, 2.0),
            executed("b", MutationOperator::FrameworkSpecific, MutantStatus::Killed, 4.0),
            executed("c", MutationOperator::FrameworkSpecific, MutantStatus::Survived, 1.0),
            executed("d", MutationOperator::FrameworkSpecific, MutantStatus::Timeout, 9.0),
            executed("e", MutationOperator::FrameworkSpecific, MutantStatus::Pending, 0.0),
        ]);

        let hist = tracker.operator_history(MutationOperator::FrameworkSpecific);
        assert_eq!(hist.times_generated, 4);
        assert_eq!(hist.times_killed, 2);
        assert_eq!(hist.times_survived, 1);
        assert!((hist.average_detection_time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_is_monotonic() {
        let tracker = HistoryTracker::in_memory();
        let before = tracker.operator_history(MutationOperator::ArithmeticReplacement);
        tracker.update(&[executed(
            "a",
            MutationOperator::ArithmeticReplacement,
            MutantStatus::Survived,
            1.0,
        )]);
        let after = tracker.operator_history(MutationOperator::ArithmeticReplacement);
        assert!(after.times_generated > before.times_generated);
        assert!(after.times_survived > before.times_survived);
        assert_eq!(after.times_killed, before.times_killed);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let tracker = HistoryTracker::open(&path);
        tracker.update(&[executed(
            "a",
            MutationOperator::LogicalOperator,
            MutantStatus::Killed,
            1.5,
        )]);
        tracker.save().unwrap();

        let reloaded = HistoryTracker::open(&path);
        let hist = reloaded.operator_history(MutationOperator::LogicalOperator);
        assert_eq!(hist.times_generated, 101);
        assert_eq!(hist.times_killed, 79);
    }

    #[test]
    fn test_unknown_keys_skipped_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"{
                "BOUNDARY": {"generated": 4, "killed": 3, "survived": 1, "avg_time": 1.0},
                "SWAP_ARGS": {"generated": 9, "killed": 9, "survived": 0, "avg_time": 1.0}
            }"#,
        )
        .unwrap();

        let tracker = HistoryTracker::open(&path);
        let hist = tracker.operator_history(MutationOperator::BoundaryCondition);
        assert_eq!(hist.times_generated, 4);
        assert_eq!(tracker.snapshot().len(), 1);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();

        let tracker = HistoryTracker::open(&path);
        let hist = tracker.operator_history(MutationOperator::VoidMethodCall);
        assert_eq!(hist.times_killed, 45);
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("history.json");

        let tracker = HistoryTracker::open(&path);
        tracker.update(&[executed(
            "a",
            MutationOperator::NegateConditional,
            MutantStatus::Killed,
            1.0,
        )]);
        assert!(matches!(tracker.save(), Err(Error::Persistence { .. })));

        let hist = tracker.operator_history(MutationOperator::NegateConditional);
        assert_eq!(hist.times_killed, 81);
    }

    #[test]
    fn test_stats_summary() {
        let tracker = HistoryTracker::in_memory();
        let summary = tracker.stats_summary();
        let arithmetic = &summary["ARITHMETIC"];
        assert!((arithmetic.kill_rate - 0.75).abs() < 1e-9);
        assert_eq!(arithmetic.total_executions, 100);
    }
}
