//! impt - Mutation testing prioritization.
//!
//! impt ranks generated mutants by how likely they are to reveal a weak
//! test suite, then removes mutants that are redundant with a
//! higher-priority one: exact duplicates, mutants sharing a location,
//! mutants whose operator is subsumed by a nearby one, and mutants whose
//! covering tests are a near-identical subset of another's.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use impt::config::Config;
//! use impt::pipeline::Pipeline;
//! use impt::providers::{HeuristicAnalyzer, HistoryTracker};
//! use impt::subsumption::CoverageMapper;
//!
//! let config = Config::default();
//! let mutants = impt::adapters::load_mutants("mutants.json".as_ref()).unwrap();
//! let mut pipeline = Pipeline::from_config(
//!     &config,
//!     Arc::new(HeuristicAnalyzer::new()),
//!     Arc::new(HistoryTracker::open(&config.history.path)),
//!     Arc::new(CoverageMapper::new()),
//! )
//! .unwrap();
//! let report = pipeline.run(mutants);
//! println!("{} mutants left", report.mutants.len());
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod output;
pub mod pipeline;
pub mod providers;
pub mod scoring;
pub mod subsumption;

pub use core::{CodeLocation, Error, Mutant, MutationOperator, Result};
pub use pipeline::{Pipeline, PipelineReport};
pub use scoring::MultiFactorScorer;
pub use subsumption::SubsumptionAnalyzer;
