//! Collaborators the scorer consults: code metrics and operator history.

mod history;
mod metrics;

pub use history::{
    unknown_operator_history, HistoryRecord, HistoryStore, HistoryTracker, OperatorStats,
};
pub use metrics::{HeuristicAnalyzer, MetricsProvider, NeutralMetrics, StaticMetrics};
