//! Core types shared by scoring and subsumption.

mod error;
mod metrics;
mod mutant;
mod operator;

pub use error::{Error, Result};
pub use metrics::{CodeMetrics, HistoricalData, UNKNOWN_AGE_DAYS};
pub use mutant::{
    CodeLocation, Mutant, MutantStatus, MutationResults, DEFAULT_EXECUTION_TIME, MAX_PRIORITY,
};
pub use operator::{MutationOperator, OperatorFamily};
