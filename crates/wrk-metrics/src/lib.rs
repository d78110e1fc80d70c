// Numan Thabit 2025
#![deny(missing_docs)]
//! wrk-metrics: turns captured `wrk` output into typed run metrics and renders reports.

/// Results envelope persisted between a run and its report.
pub mod envelope;
/// Library error type.
pub mod error;
/// Text-to-metrics extraction.
pub mod extract;
/// Structured metrics for one load-generation run.
pub mod metrics;
/// Cross-run aggregation plus text and HTML renderers.
pub mod report;
/// Named extraction rules over wrk output.
pub mod rules;
/// Time unit normalization.
pub mod units;

pub use envelope::{ResultsEnvelope, RunRecord};
pub use error::ReportError;
pub use extract::{extract, highlight_lines};
pub use metrics::{error_rate_percent, Percentile, RunMetrics, SocketErrors};
pub use report::{ParsedRun, ReportAggregator};
