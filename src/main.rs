//! impt CLI - Mutation prioritization and redundancy elimination.

use std::io::stdout;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use impt::adapters::{self, FrameworkKind, MutationFramework, ReportAdapter};
use impt::cli::{Cli, Command, HistoryAction, InputArgs, OutputFormat};
use impt::config::Config;
use impt::core::{Error, Mutant, Result};
use impt::output::{ClusterReport, ClusterSummary, Format, HistoryReport, ScoreReport};
use impt::pipeline::Pipeline;
use impt::providers::{
    HeuristicAnalyzer, HistoryStore, HistoryTracker, MetricsProvider, StaticMetrics,
};
use impt::scoring::MultiFactorScorer;
use impt::subsumption::{best_of, CoverageEstimator, CoverageMapper, MutantClusterer};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(".")?,
    };
    if let Some(path) = &cli.history {
        config.history.path = path.clone();
    }

    let format = match cli.format {
        Some(OutputFormat::Json) => Format::Json,
        Some(OutputFormat::Markdown) => Format::Markdown,
        Some(OutputFormat::Text) => Format::Text,
        None => config.output.format.into(),
    };
    let mut out = stdout().lock();

    match cli.command {
        Command::Prioritize(args) => {
            let mutants = load_input(&args.input)?;
            let mut pipeline = Pipeline::from_config(
                &config,
                metrics_provider(cli.metrics.as_deref())?,
                Arc::new(HistoryTracker::open(&config.history.path)),
                coverage_estimator(cli.coverage.as_deref())?,
            )?;
            let mut report = pipeline.run(mutants);
            if let Some(limit) = args.limit {
                report.truncate(limit);
            }
            format.format(&report, &mut out)?;
        }
        Command::Score(input) => {
            let mutants = load_input(&input)?;
            let scorer = scorer(&config, cli.metrics.as_deref())?;
            let report = ScoreReport {
                mutants: scorer.score_all(mutants),
            };
            format.format(&report, &mut out)?;
        }
        Command::Explain(args) => {
            let mutants = load_input(&args.input)?;
            let target = mutants
                .iter()
                .find(|m| m.id == args.id)
                .ok_or_else(|| Error::InvalidArgument(format!("no mutant with id {}", args.id)))?;
            let scorer = scorer(&config, cli.metrics.as_deref())?;
            let explanation = scorer.explain_score(target, &mutants);
            format.format(&explanation, &mut out)?;
        }
        Command::Clusters(args) => {
            let mutants = load_input(&args.input)?;
            let scored = scorer(&config, cli.metrics.as_deref())?.score_all(mutants);
            let threshold = args
                .threshold
                .unwrap_or(config.clustering.proximity_threshold);
            let report = cluster_report(&MutantClusterer::new(threshold), &scored);
            format.format(&report, &mut out)?;
        }
        Command::History(history) => {
            let tracker = HistoryTracker::open(&config.history.path);
            let recorded = match history.action {
                HistoryAction::Show => 0,
                HistoryAction::Update(input) => {
                    let executed: Vec<Mutant> = load_outcomes(&input)?
                        .into_iter()
                        .filter(|m| m.status.is_terminal())
                        .collect();
                    tracker.update(&executed);
                    tracker.save()?;
                    executed.len()
                }
            };
            let report = HistoryReport {
                path: tracker.path().map(Path::to_path_buf),
                recorded,
                operators: tracker.stats_summary(),
            };
            format.format(&report, &mut out)?;
        }
    }

    Ok(())
}

fn scorer(config: &Config, metrics: Option<&Path>) -> Result<MultiFactorScorer> {
    MultiFactorScorer::new(
        metrics_provider(metrics)?,
        Arc::new(HistoryTracker::open(&config.history.path)),
    )
    .with_weights(config.scoring.weights)
}

fn metrics_provider(table: Option<&Path>) -> Result<Arc<dyn MetricsProvider>> {
    Ok(match table {
        Some(path) => Arc::new(StaticMetrics::from_json_file(path)?),
        None => Arc::new(HeuristicAnalyzer::new()),
    })
}

fn coverage_estimator(table: Option<&Path>) -> Result<Arc<dyn CoverageEstimator>> {
    Ok(match table {
        Some(path) => Arc::new(CoverageMapper::from_json_file(path)?),
        None => Arc::new(CoverageMapper::new()),
    })
}

/// Pending mutants from a mutant array or a framework report.
fn load_input(input: &InputArgs) -> Result<Vec<Mutant>> {
    match input.framework {
        Some(framework) => {
            let mutants = ReportAdapter::new(FrameworkKind::from(framework))
                .generate_mutants(&input.mutants)?;
            adapters::validate_batch(&mutants)?;
            Ok(mutants)
        }
        None => adapters::load_mutants(&input.mutants),
    }
}

/// Mutants with their recorded outcomes.
fn load_outcomes(input: &InputArgs) -> Result<Vec<Mutant>> {
    match input.framework {
        Some(framework) => {
            let results =
                ReportAdapter::new(FrameworkKind::from(framework)).parse_results(&input.mutants)?;
            adapters::validate_batch(&results.mutants)?;
            Ok(results.mutants)
        }
        None => adapters::load_mutants(&input.mutants),
    }
}

fn cluster_report(clusterer: &MutantClusterer, mutants: &[Mutant]) -> ClusterReport {
    let clusters = clusterer.cluster(mutants);
    let summaries = clusters
        .iter()
        .filter_map(|(id, members)| {
            let representative = best_of(members)?;
            let lines = members.iter().map(|m| m.location.line_start);
            Some(ClusterSummary {
                id: *id,
                file: representative.location.file_path.clone(),
                line_start: lines.clone().min().unwrap_or_default(),
                line_end: lines.max().unwrap_or_default(),
                size: members.len(),
                representative: representative.id.clone(),
            })
        })
        .collect();

    ClusterReport {
        proximity_threshold: clusterer.proximity_threshold(),
        diversity: clusterer.analyze_cluster_diversity(&clusters),
        clusters: summaries,
    }
}
