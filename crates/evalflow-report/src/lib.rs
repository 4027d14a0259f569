//! # evalflow-report
//!
//! Converts raw evaluation provider responses into typed records.
//!
//! The provider's response shape is not guaranteed stable, so every entry
//! point here is total: malformed input turns into defaults or visible
//! `ERROR` entries, never into an error value or a panic.
//!
//! ## Key Types
//!
//! - [`EvaluationReport`] - One provider response (status, message, metrics)
//! - [`MetricEvaluation`] - One scored metric

mod coerce;
mod metric;
mod report;

pub use metric::{
    MetricEvaluation, STATUS_COMPLETED, STATUS_ERROR, STATUS_FAILED, STATUS_UNKNOWN,
};
pub use report::EvaluationReport;
