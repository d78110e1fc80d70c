// Numan Thabit 2025
use std::fmt::{self, Write};

use chrono::NaiveDateTime;

use super::{format_opt, group_thousands, ReportAggregator, NOT_AVAILABLE};
use crate::metrics::error_rate_percent;

/// File name prefix of text reports.
pub const REPORT_PREFIX: &str = "load_test_report_";

const HEAVY_RULE: &str =
    "================================================================================";
const LIGHT_RULE: &str = "------------------------------------------------------------";

/// Renders the detailed plain-text report.
pub fn render(aggregator: &ReportAggregator, generated_at: NaiveDateTime) -> String {
    let mut out = String::new();
    write_report(&mut out, aggregator, generated_at).expect("writing to a String cannot fail");
    out
}

/// Writes the detailed plain-text report into `out`.
pub fn write_report<W: Write>(
    out: &mut W,
    aggregator: &ReportAggregator,
    generated_at: NaiveDateTime,
) -> fmt::Result {
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out, "LOAD TEST DETAILED REPORT")?;
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out)?;

    for run in aggregator.runs() {
        let m = &run.metrics;
        writeln!(out)?;
        writeln!(out, "{LIGHT_RULE}")?;
        writeln!(out, "TEST: {}", run.display_name().to_uppercase())?;
        writeln!(out, "{LIGHT_RULE}")?;

        let total = m
            .total_requests
            .map(group_thousands)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        writeln!(out, "Total Requests: {total}")?;
        writeln!(out, "Duration: {} seconds", format_opt(m.duration_seconds, 2))?;
        writeln!(
            out,
            "Requests/sec: {}",
            format_opt(m.requests_per_second_reported, 2)
        )?;
        writeln!(
            out,
            "Requests/sec (observed): {}",
            format_opt(m.requests_per_second_observed, 2)
        )?;
        writeln!(out, "Transfer/sec: {} MB", format_opt(m.transfer_rate_mb_per_sec, 2))?;
        writeln!(out, "Total Transfer: {} MB", format_opt(m.transfer_total_mb, 2))?;
        writeln!(out)?;

        writeln!(out, "LATENCY STATISTICS:")?;
        writeln!(out, "  Average: {} ms", format_opt(m.latency_avg_ms, 2))?;
        writeln!(out, "  Std Dev: {} ms", format_opt(m.latency_stdev_ms, 2))?;
        writeln!(out, "  Max: {} ms", format_opt(m.latency_max_ms, 2))?;
        writeln!(out)?;

        if !m.percentiles.is_empty() {
            writeln!(out, "LATENCY PERCENTILES:")?;
            for (rank, millis) in &m.percentiles {
                writeln!(out, "  {rank}: {millis:.2} ms")?;
            }
            writeln!(out)?;
        }

        writeln!(out, "ERROR STATISTICS:")?;
        writeln!(out, "  Connect: {}", m.socket_errors.connect)?;
        writeln!(out, "  Read: {}", m.socket_errors.read)?;
        writeln!(out, "  Write: {}", m.socket_errors.write)?;
        writeln!(out, "  Timeout: {}", m.socket_errors.timeout)?;
        writeln!(out, "  Total Errors: {}", m.total_errors())?;
        if m.total_requests.is_some_and(|total| total > 0) {
            writeln!(out, "  Error Rate: {:.2}%", m.error_rate_percent())?;
        }
        if let Some(non_2xx) = m.non_2xx_3xx_responses {
            writeln!(out, "  Non-2xx/3xx Responses: {}", group_thousands(non_2xx))?;
        }
        writeln!(out, "  Successful Requests: {}", group_thousands(m.successful_requests()))?;
        writeln!(out, "  Failed Requests: {}", group_thousands(m.failed_requests()))?;
        writeln!(out, "  Total Attempted: {}", group_thousands(m.total_attempted()))?;

        if let Some(codes) = &m.status_code_distribution {
            writeln!(out)?;
            writeln!(out, "STATUS CODE DISTRIBUTION:")?;
            for (code, count) in codes {
                // Same guarded divisor as the error rate.
                let share = error_rate_percent(*count, m.total_requests);
                writeln!(out, "  HTTP {code}: {} ({share:.1}%)", group_thousands(*count))?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ParsedRun;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn renders_sections_and_placeholders() {
        let output = "\
  10000 requests in 10.00s, 1.00MB read
  Socket errors: connect 0, read 2, write 0, timeout 3
Requests/sec:   1000.00
=== GET VERIFY NUMBER RESULTS ===
200: 9500 requests
500: 500 requests
";
        let aggregator = ReportAggregator::from_runs(vec![ParsedRun::new(
            "GET_verify_number",
            "wrk",
            output,
        )]);
        let report = render(&aggregator, generated_at());

        assert!(report.contains("Generated: 2025-06-01 12:00:00"));
        assert!(report.contains("TEST: GET VERIFY NUMBER"));
        assert!(report.contains("Total Requests: 10,000"));
        assert!(report.contains("  Average: N/A ms"));
        assert!(report.contains("  Total Errors: 5"));
        assert!(report.contains("  Error Rate: 0.05%"));
        assert!(report.contains("  HTTP 200: 9,500 (95.0%)"));
        assert!(report.contains("  HTTP 500: 500 (5.0%)"));
        assert!(!report.contains("LATENCY PERCENTILES"));
    }

    #[test]
    fn error_rate_line_needs_completed_requests() {
        let aggregator = ReportAggregator::from_runs(vec![ParsedRun::new(
            "broken",
            "wrk",
            "Socket errors: connect 5, read 0, write 0, timeout 0",
        )]);
        let report = render(&aggregator, generated_at());
        assert!(report.contains("Total Requests: N/A"));
        assert!(report.contains("  Failed Requests: 5"));
        assert!(!report.contains("Error Rate"));
    }
}
