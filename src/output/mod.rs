//! Output formatters for prioritization results.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::OutputFormat;
use crate::core::{Mutant, Result};
use crate::pipeline::PipelineReport;
use crate::providers::OperatorStats;
use crate::scoring::ScoreExplanation;
use crate::subsumption::{ClusterDiversity, SubsumptionStats};

/// Output format enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Json,
    Markdown,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Format::Text,
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
        }
    }
}

impl Format {
    pub fn format<T: Render, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, data)?;
                writeln!(writer)?;
                Ok(())
            }
            Format::Markdown => data.render(writer, Style::Markdown),
            Format::Text => data.render(writer, Style::Text),
        }
    }
}

/// Human-readable flavour of a rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    Text,
    Markdown,
}

/// Types with a human-readable rendering next to their JSON form.
pub trait Render: Serialize {
    fn render<W: Write>(&self, writer: &mut W, style: Style) -> Result<()>;
}

/// Scored mutants, highest priority first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub mutants: Vec<Mutant>,
}

/// One proximity cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub id: usize,
    pub file: PathBuf,
    pub line_start: u32,
    pub line_end: u32,
    pub size: usize,
    pub representative: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    pub proximity_threshold: u32,
    pub diversity: ClusterDiversity,
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryReport {
    pub path: Option<PathBuf>,
    /// Mutants folded in by this invocation.
    pub recorded: usize,
    pub operators: BTreeMap<String, OperatorStats>,
}

fn heading<W: Write>(writer: &mut W, style: Style, title: &str) -> Result<()> {
    match style {
        Style::Markdown => writeln!(writer, "## {title}\n")?,
        Style::Text => writeln!(writer, "{title}\n{}", "=".repeat(title.len()))?,
    }
    Ok(())
}

fn field<W: Write>(writer: &mut W, style: Style, name: &str, value: impl std::fmt::Display) -> Result<()> {
    match style {
        Style::Markdown => writeln!(writer, "- **{name}**: {value}")?,
        Style::Text => writeln!(writer, "{name}: {value}")?,
    }
    Ok(())
}

/// Write rows as a markdown table or as space-aligned columns.
fn table<W: Write>(writer: &mut W, style: Style, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
    if rows.is_empty() {
        writeln!(writer, "(none)")?;
        return Ok(());
    }
    match style {
        Style::Markdown => {
            writeln!(writer, "| {} |", headers.join(" | "))?;
            writeln!(writer, "|{}", " --- |".repeat(headers.len()))?;
            for row in rows {
                writeln!(writer, "| {} |", row.join(" | "))?;
            }
        }
        Style::Text => {
            let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
            for row in rows {
                for (width, cell) in widths.iter_mut().zip(row) {
                    *width = (*width).max(cell.chars().count());
                }
            }
            let line = |cells: Vec<&str>| -> String {
                cells
                    .iter()
                    .zip(&widths)
                    .map(|(cell, &width)| format!("{cell:<width$}"))
                    .collect::<Vec<_>>()
                    .join("  ")
                    .trim_end()
                    .to_string()
            };
            writeln!(writer, "{}", line(headers.to_vec()))?;
            for row in rows {
                writeln!(writer, "{}", line(row.iter().map(String::as_str).collect()))?;
            }
        }
    }
    writeln!(writer)?;
    Ok(())
}

fn mutant_rows(mutants: &[Mutant]) -> Vec<Vec<String>> {
    mutants
        .iter()
        .enumerate()
        .map(|(rank, m)| {
            vec![
                (rank + 1).to_string(),
                m.id.clone(),
                m.location.to_string(),
                m.operator.as_str().to_string(),
                format!("{:.2}", m.priority_score),
                format!("{:.1}s", m.estimated_execution_time),
            ]
        })
        .collect()
}

const MUTANT_HEADERS: &[&str] = &["#", "ID", "Location", "Operator", "Priority", "Est. time"];

fn render_stats<W: Write>(writer: &mut W, style: Style, stats: &SubsumptionStats) -> Result<()> {
    field(writer, style, "Input mutants", stats.total_input)?;
    field(writer, style, "Exact duplicates", stats.exact_duplicates)?;
    field(writer, style, "Location clustered", stats.location_clustered)?;
    field(writer, style, "Operator subsumed", stats.operator_subsumed)?;
    field(writer, style, "Coverage subsumed", stats.coverage_subsumed)?;
    field(writer, style, "Output mutants", stats.total_output)?;
    field(
        writer,
        style,
        "Reduction",
        format!("{:.1}%", stats.reduction_percent()),
    )?;
    writeln!(writer)?;
    Ok(())
}

impl Render for PipelineReport {
    fn render<W: Write>(&self, writer: &mut W, style: Style) -> Result<()> {
        heading(writer, style, "Reduction")?;
        render_stats(writer, style, &self.stats)?;
        field(
            writer,
            style,
            "Estimated execution time",
            format!("{:.1}s", self.estimated_time),
        )?;
        writeln!(writer)?;
        heading(writer, style, "Prioritized mutants")?;
        table(writer, style, MUTANT_HEADERS, &mutant_rows(&self.mutants))
    }
}

impl Render for ScoreReport {
    fn render<W: Write>(&self, writer: &mut W, style: Style) -> Result<()> {
        heading(writer, style, "Scored mutants")?;
        table(writer, style, MUTANT_HEADERS, &mutant_rows(&self.mutants))
    }
}

impl Render for ScoreExplanation {
    fn render<W: Write>(&self, writer: &mut W, style: Style) -> Result<()> {
        heading(writer, style, &format!("Score of {}", self.mutant_id))?;
        field(writer, style, "Final score", format!("{:.2}", self.final_score))?;
        writeln!(writer)?;
        let rows: Vec<Vec<String>> = self
            .factors
            .iter()
            .map(|f| {
                vec![
                    f.factor.to_string(),
                    format!("{:.3}", f.raw),
                    format!("{:.3}", f.normalized),
                    format!("{:.2}", f.weight),
                    format!("{:.2}", f.contribution),
                    f.explanation.clone(),
                ]
            })
            .collect();
        table(
            writer,
            style,
            &["Factor", "Raw", "Normalized", "Weight", "Contribution", "Why"],
            &rows,
        )
    }
}

impl Render for ClusterReport {
    fn render<W: Write>(&self, writer: &mut W, style: Style) -> Result<()> {
        heading(writer, style, "Clusters")?;
        field(writer, style, "Proximity threshold", self.proximity_threshold)?;
        field(writer, style, "Clusters", self.diversity.total_clusters)?;
        field(
            writer,
            style,
            "Average size",
            format!("{:.2}", self.diversity.average_cluster_size),
        )?;
        field(writer, style, "Largest", self.diversity.max_cluster_size)?;
        writeln!(writer)?;
        let rows: Vec<Vec<String>> = self
            .clusters
            .iter()
            .map(|c| {
                vec![
                    c.id.to_string(),
                    c.file.display().to_string(),
                    format!("{}-{}", c.line_start, c.line_end),
                    c.size.to_string(),
                    c.representative.clone(),
                ]
            })
            .collect();
        table(
            writer,
            style,
            &["ID", "File", "Lines", "Size", "Representative"],
            &rows,
        )
    }
}

impl Render for HistoryReport {
    fn render<W: Write>(&self, writer: &mut W, style: Style) -> Result<()> {
        heading(writer, style, "Operator history")?;
        if let Some(path) = &self.path {
            field(writer, style, "Store", path.display())?;
        }
        if self.recorded > 0 {
            field(writer, style, "Recorded", self.recorded)?;
        }
        writeln!(writer)?;
        let rows: Vec<Vec<String>> = self
            .operators
            .iter()
            .map(|(op, stats)| {
                vec![
                    op.clone(),
                    format!("{:.1}%", stats.kill_rate * 100.0),
                    stats.total_executions.to_string(),
                    format!("{:.2}s", stats.avg_time),
                ]
            })
            .collect();
        table(
            writer,
            style,
            &["Operator", "Kill rate", "Executions", "Avg time"],
            &rows,
        )
    }
}
