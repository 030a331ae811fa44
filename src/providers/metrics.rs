//! Code metrics providers.
//!
//! The scorer asks a [`MetricsProvider`] for a [`CodeMetrics`] snapshot per
//! file. Providers may fail; the scorer substitutes neutral metrics and keeps
//! going.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{CodeLocation, CodeMetrics, Error, Result, UNKNOWN_AGE_DAYS};

/// Source of complexity/security/recency attributes for code locations.
pub trait MetricsProvider: Send + Sync {
    /// Metrics for the code at `location`.
    fn analyze(&self, location: &CodeLocation) -> Result<CodeMetrics>;

    /// Number of bugs historically recorded against `file`.
    fn historical_bug_count(&self, _file: &Path) -> u32 {
        0
    }
}

/// Provider that always reports neutral metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralMetrics;

impl MetricsProvider for NeutralMetrics {
    fn analyze(&self, _location: &CodeLocation) -> Result<CodeMetrics> {
        Ok(CodeMetrics::neutral())
    }
}

/// Metrics and bug counts supplied up front, keyed by file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticMetrics {
    pub files: HashMap<PathBuf, CodeMetrics>,
    pub bug_counts: HashMap<PathBuf, u32>,
}

impl StaticMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from JSON (`{"files": {...}, "bug_counts": {...}}`).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Register metrics for a file.
    pub fn insert(&mut self, file: impl Into<PathBuf>, metrics: CodeMetrics) {
        self.files.insert(file.into(), metrics);
    }

    /// Register a bug count for a file.
    pub fn insert_bug_count(&mut self, file: impl Into<PathBuf>, count: u32) {
        self.bug_counts.insert(file.into(), count);
    }
}

impl MetricsProvider for StaticMetrics {
    fn analyze(&self, location: &CodeLocation) -> Result<CodeMetrics> {
        Ok(self
            .files
            .get(&location.file_path)
            .cloned()
            .unwrap_or_default())
    }

    fn historical_bug_count(&self, file: &Path) -> u32 {
        self.bug_counts.get(file).copied().unwrap_or(0)
    }
}

const SECURITY_KEYWORDS: &[&str] = &["password", "auth", "token", "crypto", "hash", "encrypt"];
const INDENT_WIDTH: usize = 4;
const MAX_NESTING: u32 = 6;

/// Text-level estimator that reads source files directly.
///
/// Counts branch keywords for cyclomatic complexity, derives cognitive
/// complexity from it, measures nesting from indentation and takes the file
/// age from its modification time.
#[derive(Debug, Default)]
pub struct HeuristicAnalyzer {
    root: Option<PathBuf>,
    bug_history: RwLock<HashMap<PathBuf, u32>>,
}

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative mutant paths against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Merge externally sourced bug counts (file -> count).
    pub fn load_bug_history(&self, bug_data: HashMap<PathBuf, u32>) {
        self.bug_history.write().extend(bug_data);
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        match &self.root {
            Some(root) if file.is_relative() => root.join(file),
            _ => file.to_path_buf(),
        }
    }

    /// Estimate metrics from source text.
    pub fn analyze_source(source: &str) -> CodeMetrics {
        let cyclomatic = 1 + branch_pattern().find_iter(source).count() as u32;
        let lowered = source.to_lowercase();

        CodeMetrics {
            cyclomatic_complexity: cyclomatic,
            cognitive_complexity: (cyclomatic as f64 * 1.3) as u32,
            nesting_depth: estimate_nesting(source),
            lines_of_code: source.lines().filter(|l| !l.trim().is_empty()).count() as u32,
            parameter_count: max_parameter_count(source),
            is_public_api: public_pattern().is_match(source),
            is_security_critical: SECURITY_KEYWORDS.iter().any(|k| lowered.contains(k)),
            days_since_modified: UNKNOWN_AGE_DAYS,
        }
    }
}

impl MetricsProvider for HeuristicAnalyzer {
    fn analyze(&self, location: &CodeLocation) -> Result<CodeMetrics> {
        let path = self.resolve(&location.file_path);
        if !path.exists() {
            return Err(Error::FileNotFound { path });
        }
        let source = fs::read_to_string(&path)
            .map_err(|e| Error::analysis(&path, e.to_string()))?;

        let mut metrics = Self::analyze_source(&source);
        metrics.days_since_modified = file_age_days(&path).unwrap_or(UNKNOWN_AGE_DAYS);
        Ok(metrics)
    }

    fn historical_bug_count(&self, file: &Path) -> u32 {
        self.bug_history.read().get(file).copied().unwrap_or(0)
    }
}

fn branch_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:if|elif|else|while|for|case|catch|except|match)\b|&&|\|\||\?")
            .expect("valid regex")
    })
}

fn public_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(?:public|pub|export)\b").expect("valid regex"))
}

fn signature_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:\bfn|\bdef|\bfunction|\b(?:public|private|protected|static)[\w<>\[\],\s]*?)\s+\w+\s*\(([^)]*)\)",
        )
        .expect("valid regex")
    })
}

fn estimate_nesting(source: &str) -> u32 {
    let max_indent = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.chars()
                .take_while(|c| c.is_whitespace())
                .map(|c| if c == '\t' { INDENT_WIDTH } else { 1 })
                .sum::<usize>()
        })
        .max()
        .unwrap_or(0);
    ((max_indent / INDENT_WIDTH) as u32).min(MAX_NESTING)
}

fn max_parameter_count(source: &str) -> u32 {
    signature_pattern()
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|params| {
            params
                .as_str()
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .filter(|p| !matches!(*p, "self" | "&self" | "&mut self" | "this" | "cls"))
                .count() as u32
        })
        .max()
        .unwrap_or(0)
}

fn file_age_days(path: &Path) -> Option<u32> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let modified: DateTime<Utc> = modified.into();
    let days = (Utc::now() - modified).num_days().max(0);
    Some(days as u32)
}
