// Numan Thabit 2025
use crate::{metrics::RunMetrics, rules};

const HIGHLIGHT_KEYS: [&str; 4] = ["Requests/sec:", "Latency", "requests in", "Transfer/sec"];

/// Parses the captured stdout of one wrk run.
///
/// Total over arbitrary input: unrecognized or missing sections leave their
/// fields absent, and the socket error counters default to zero.
pub fn extract(raw: &str) -> RunMetrics {
    let mut metrics = RunMetrics::default();

    if let Some((requests, seconds)) = rules::summary(raw) {
        metrics.total_requests = Some(requests);
        metrics.duration_seconds = Some(seconds);
        if seconds > 0.0 {
            // Subnormal durations overflow the division.
            metrics.requests_per_second_observed =
                Some(requests as f64 / seconds).filter(|rate| rate.is_finite());
        }
    }

    metrics.requests_per_second_reported = rules::requests_per_sec(raw);
    metrics.transfer_rate_mb_per_sec = rules::transfer_per_sec(raw);
    metrics.transfer_total_mb = rules::transfer_total(raw);

    if let Some([avg, stdev, max]) = rules::latency(raw) {
        metrics.latency_avg_ms = avg;
        metrics.latency_stdev_ms = stdev;
        metrics.latency_max_ms = max;
    }

    // Repeated ranks overwrite: the last row printed wins.
    for (rank, millis) in rules::percentiles(raw) {
        metrics.percentiles.insert(rank, millis);
    }

    metrics.socket_errors = rules::socket_errors(raw).unwrap_or_default();
    metrics.non_2xx_3xx_responses = rules::non_2xx(raw);
    metrics.status_code_distribution = rules::status_codes(raw);

    metrics
}

/// Lines worth echoing to the console after a run.
pub fn highlight_lines(raw: &str) -> Vec<&str> {
    raw.lines()
        .filter(|line| HIGHLIGHT_KEYS.iter().any(|key| line.contains(key)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Percentile, SocketErrors};

    const WRK_OUTPUT: &str = r#"
Running 1m test @ http://localhost
  1 threads and 10 connections
  Thread Stats   Avg      Stdev     Max   +/- Stdev
    Latency     2.50ms    1.00ms  10.00ms   75.00%
    Req/Sec     4.00k   500.00     5.50k    70.00%
  Latency Distribution
     50%    2.00ms
     75%    3.00ms
     99%    8.00ms

  240000 requests in 60.00s, 18.00MB read
Requests/sec:   4000.00
Transfer/sec:     300.00KB
"#;

    #[test]
    fn collects_standard_sections() {
        let metrics = extract(WRK_OUTPUT);
        assert_eq!(metrics.total_requests, Some(240_000));
        assert_eq!(metrics.duration_seconds, Some(60.0));
        assert_eq!(metrics.requests_per_second_observed, Some(4_000.0));
        assert_eq!(metrics.requests_per_second_reported, Some(4_000.0));
        assert_eq!(metrics.latency_avg_ms, Some(2.5));
        assert_eq!(metrics.latency_max_ms, Some(10.0));
        assert_eq!(metrics.percentile(Percentile::P99), Some(8.0));
        assert_eq!(metrics.percentiles.len(), 3);
        assert_eq!(metrics.transfer_total_mb, Some(18.0));
        // KB transfer rates are not recognized
        assert_eq!(metrics.transfer_rate_mb_per_sec, None);
        assert_eq!(metrics.socket_errors, SocketErrors::default());
        assert_eq!(metrics.status_code_distribution, None);
    }

    #[test]
    fn empty_input_is_all_absent() {
        let metrics = extract("");
        assert!(metrics.is_empty());
        assert_eq!(metrics.total_errors(), 0);
        assert_eq!(metrics.total_attempted(), 0);
    }

    #[test]
    fn zero_duration_leaves_rate_absent() {
        let metrics = extract("10 requests in 0.00s, 0.01MB read");
        assert_eq!(metrics.total_requests, Some(10));
        assert_eq!(metrics.duration_seconds, Some(0.0));
        assert_eq!(metrics.requests_per_second_observed, None);
    }

    #[test]
    fn tiny_duration_never_yields_infinite_rate() {
        let raw = format!("10 requests in 0.{}1s", "0".repeat(320));
        let metrics = extract(&raw);
        assert_eq!(metrics.total_requests, Some(10));
        assert!(metrics.duration_seconds.is_some_and(|secs| secs > 0.0));
        assert_eq!(metrics.requests_per_second_observed, None);

        let json = serde_json::to_string(&metrics).expect("serialize");
        let back: crate::metrics::RunMetrics = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, metrics);
    }

    #[test]
    fn duplicate_percentile_last_wins() {
        let metrics = extract("50% 1.00ms\n50% 4.00ms\n");
        assert_eq!(metrics.percentile(Percentile::P50), Some(4.0));
    }

    #[test]
    fn highlight_lines_filter() {
        let lines = highlight_lines(WRK_OUTPUT);
        assert_eq!(
            lines,
            vec![
                "    Latency     2.50ms    1.00ms  10.00ms   75.00%",
                "  Latency Distribution",
                "  240000 requests in 60.00s, 18.00MB read",
                "Requests/sec:   4000.00",
                "Transfer/sec:     300.00KB",
            ]
        );
    }
}
