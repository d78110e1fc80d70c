// Numan Thabit 2025
//! Turns parsed runs into comparison rows and hands them to the renderers.

use tracing::warn;

use crate::{
    envelope::ResultsEnvelope,
    extract::extract,
    metrics::{Percentile, RunMetrics},
};

/// HTML dashboard renderer.
pub mod html;
/// Plain-text report renderer.
pub mod text;

/// Placeholder for values wrk did not report.
pub const NOT_AVAILABLE: &str = "N/A";

/// Percentile ranks compared across runs.
pub const COMPARED_PERCENTILES: [Percentile; 4] = [
    Percentile::P50,
    Percentile::P90,
    Percentile::P95,
    Percentile::P99,
];

/// A run whose stdout has been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRun {
    /// Key of the run in the results envelope.
    pub name: String,
    /// Command that produced the output.
    pub command: String,
    /// Metrics extracted from `raw_output`.
    pub metrics: RunMetrics,
    /// Captured stdout.
    pub raw_output: String,
    /// Wall-clock time of the run in seconds, zero when unknown.
    pub execution_time_secs: f64,
}

impl ParsedRun {
    /// Parses `raw_output` into a run.
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        raw_output: impl Into<String>,
    ) -> Self {
        let raw_output = raw_output.into();
        Self {
            name: name.into(),
            command: command.into(),
            metrics: extract(&raw_output),
            raw_output,
            execution_time_secs: 0.0,
        }
    }

    /// Name with underscores turned into spaces.
    pub fn display_name(&self) -> String {
        self.name.replace('_', " ")
    }
}

/// One labelled row of the side-by-side comparison table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SummaryRow {
    /// Metric name.
    pub metric: &'static str,
    /// Formatted value per run, in run order.
    pub values: Vec<String>,
}

/// Collects parsed runs for presentation.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    runs: Vec<ParsedRun>,
}

impl ReportAggregator {
    /// Wraps already-parsed runs.
    pub fn from_runs(runs: Vec<ParsedRun>) -> Self {
        Self { runs }
    }

    /// Parses every record of the envelope that captured stdout.
    pub fn from_envelope(envelope: &ResultsEnvelope) -> Self {
        let mut runs = Vec::with_capacity(envelope.len());
        for (name, record) in envelope.iter() {
            let Some(stdout) = record.stdout.as_deref() else {
                warn!(
                    test = name,
                    error = record.error.as_deref().unwrap_or("<none>"),
                    "no stdout captured; skipping run"
                );
                continue;
            };
            let mut run = ParsedRun::new(name, record.command.as_str(), stdout);
            run.execution_time_secs = record.execution_time.unwrap_or(0.0);
            if run.metrics.is_empty() {
                warn!(test = name, "wrk output parsing yielded no metrics");
            }
            runs.push(run);
        }
        Self { runs }
    }

    /// Runs in envelope order.
    pub fn runs(&self) -> &[ParsedRun] {
        &self.runs
    }

    /// True when no run had output.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Two or more runs are rendered side by side.
    pub fn is_comparison(&self) -> bool {
        self.runs.len() >= 2
    }

    /// Comparison table, one row per metric and one column per run.
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        vec![
            self.row("RPS", |m| format_opt(m.requests_per_second_reported, 1)),
            self.row("Avg Latency (ms)", |m| format_opt(m.latency_avg_ms, 1)),
            self.row("Total Requests", |m| {
                m.total_requests
                    .map(group_thousands)
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string())
            }),
            self.row("Successful Requests", |m| {
                group_thousands(m.successful_requests())
            }),
            self.row("Failed Requests", |m| group_thousands(m.failed_requests())),
            self.row("Error Rate (%)", |m| format!("{:.2}", m.error_rate_percent())),
            self.row("Transfer (MB/s)", |m| format_opt(m.transfer_rate_mb_per_sec, 2)),
        ]
    }

    fn row(&self, metric: &'static str, cell: impl Fn(&RunMetrics) -> String) -> SummaryRow {
        SummaryRow {
            metric,
            values: self.runs.iter().map(|run| cell(&run.metrics)).collect(),
        }
    }
}

/// Formats `value` with `precision` decimals, or `N/A`.
pub fn format_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(value) => format!("{value:.precision$}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RunRecord;
    use chrono::NaiveDate;

    fn record(stdout: Option<&str>) -> RunRecord {
        let at = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        RunRecord {
            command: "wrk".into(),
            stdout: stdout.map(str::to_string),
            stderr: None,
            return_code: Some(0),
            execution_time: Some(301.5),
            timestamp: Some(at),
            test_name: None,
            description: None,
            error: None,
        }
    }

    #[test]
    fn grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn skips_records_without_stdout() {
        let mut envelope = ResultsEnvelope::new();
        envelope.insert("GET_verify_number", record(Some("100 requests in 10.00s")));
        envelope.insert("POST_pagos", record(None));

        let aggregator = ReportAggregator::from_envelope(&envelope);
        assert_eq!(aggregator.runs().len(), 1);
        assert!(!aggregator.is_comparison());
        let run = &aggregator.runs()[0];
        assert_eq!(run.display_name(), "GET verify number");
        assert_eq!(run.execution_time_secs, 301.5);
        assert_eq!(run.metrics.requests_per_second_observed, Some(10.0));
    }

    #[test]
    fn spanish_envelope_feeds_the_same_extractor() {
        let envelope = ResultsEnvelope::from_json(
            r#"{"GET_verify_number": {
                "comando": "wrk -t32 get",
                "stdout": "  7020000 requests in 5.00m, 3.10GB read\nRequests/sec:  23400.00\n",
                "execution_time": 301.2,
                "nombre_prueba": "GET Verify Number"
            }}"#,
        )
        .expect("parse");
        let aggregator = ReportAggregator::from_envelope(&envelope);
        let run = &aggregator.runs()[0];
        assert_eq!(run.command, "wrk -t32 get");
        assert_eq!(run.execution_time_secs, 301.2);
        assert_eq!(run.metrics.total_requests, Some(7_020_000));
        assert_eq!(run.metrics.requests_per_second_observed, Some(23_400.0));
    }

    #[test]
    fn summary_rows_side_by_side() {
        let aggregator = ReportAggregator::from_runs(vec![
            ParsedRun::new(
                "a",
                "wrk a",
                "2000 requests in 10.00s\nRequests/sec: 200.00\nSocket errors: connect 20, read 0, write 0, timeout 0",
            ),
            ParsedRun::new("b", "wrk b", ""),
        ]);
        let rows = aggregator.summary_rows();
        let rps = rows.iter().find(|row| row.metric == "RPS").unwrap();
        assert_eq!(rps.values, vec!["200.0", "N/A"]);
        let errors = rows.iter().find(|row| row.metric == "Error Rate (%)").unwrap();
        assert_eq!(errors.values, vec!["1.00", "0.00"]);
        let failed = rows.iter().find(|row| row.metric == "Failed Requests").unwrap();
        assert_eq!(failed.values, vec!["20", "0"]);
    }
}
