// Numan Thabit 2025
//! One named rule per section of wrk output.
//!
//! Each rule either matches completely or yields `None`; partial matches never
//! leak out. Rules are independent, so a missing section never hides another.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    metrics::{Percentile, SocketErrors},
    units,
};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("extraction rule must compile")
}

/// `240000 requests in 60.00s, 18.00MB read`
pub static SUMMARY: Lazy<Regex> =
    Lazy::new(|| compile(r"(\d+) requests in ([\d.]+(?:us|µs|μs|ms|s|m|h))\b"));
/// `Requests/sec:   4000.00`
pub static REQUESTS_PER_SEC: Lazy<Regex> = Lazy::new(|| compile(r"Requests/sec:\s+([\d.]+)"));
/// `Transfer/sec:     3.00MB`
pub static TRANSFER_PER_SEC: Lazy<Regex> = Lazy::new(|| compile(r"Transfer/sec:\s+([\d.]+)MB"));
/// `18.00MB read`
pub static TRANSFER_TOTAL: Lazy<Regex> = Lazy::new(|| compile(r"([\d.]+)MB read"));
/// `Latency     2.50ms    1.00ms  10.00ms   75.00%`
pub static LATENCY: Lazy<Regex> = Lazy::new(|| {
    compile(r"Latency\s+([\d.]+\w+)\s+([\d.]+\w+)\s+([\d.]+\w+)\s+([\d.]+)%")
});
/// `     99%    8.00ms`; a bare value is already in milliseconds.
pub static PERCENTILE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(\d+(?:\.\d+)?)%[ \t]+([\d.]+(?:us|µs|μs|ms|s|m|h)?)\b")
});
/// `Socket errors: connect 12, read 3, write 0, timeout 40`
pub static SOCKET_ERRORS: Lazy<Regex> = Lazy::new(|| {
    compile(r"Socket errors: connect (\d+), read (\d+), write (\d+), timeout (\d+)")
});
/// `Non-2xx or 3xx responses: 517`
pub static NON_2XX: Lazy<Regex> = Lazy::new(|| compile(r"Non-2xx or 3xx responses: (\d+)"));
/// `=== POST PAGOS RESULTS ===`, printed by the enhanced Lua scripts.
pub static ENHANCED_MARKER: Lazy<Regex> =
    Lazy::new(|| compile(r"(?m)^[ \t]*=== [^\n]+ RESULTS ===[ \t]*\r?$"));
/// `200: 9500 requests`
pub static STATUS_LINE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?m)^[ \t]*(\d+):[ \t]+(\d+)[ \t]+requests"));

/// End of the status section: a blank line (LF or CRLF) or the latency block.
pub static STATUS_SECTION_END: Lazy<Regex> =
    Lazy::new(|| compile(r"\r?\n[ \t]*\r?\n|\nLatency Stats"));

const STATUS_HEADING: &str = "Status Code Distribution:";

/// Completed requests and the run duration in seconds.
pub fn summary(text: &str) -> Option<(u64, f64)> {
    let caps = SUMMARY.captures(text)?;
    let requests = caps[1].parse().ok()?;
    let seconds = units::to_seconds(&caps[2])?;
    Some((requests, seconds))
}

/// Throughput wrk reports for the whole run.
pub fn requests_per_sec(text: &str) -> Option<f64> {
    first_float(&REQUESTS_PER_SEC, text)
}

/// `Transfer/sec` in MB. Other units are not recognized.
pub fn transfer_per_sec(text: &str) -> Option<f64> {
    first_float(&TRANSFER_PER_SEC, text)
}

/// Total MB read.
pub fn transfer_total(text: &str) -> Option<f64> {
    first_float(&TRANSFER_TOTAL, text)
}

/// Average, standard deviation and max latency in milliseconds.
///
/// The trailing `+/- Stdev` percentage is discarded. Each value is absent on
/// its own if its unit is not recognized.
pub fn latency(text: &str) -> Option<[Option<f64>; 3]> {
    let caps = LATENCY.captures(text)?;
    Some([
        units::to_millis(&caps[1]),
        units::to_millis(&caps[2]),
        units::to_millis(&caps[3]),
    ])
}

/// Every percentile row in the text, in order of appearance.
pub fn percentiles(text: &str) -> Vec<(Percentile, f64)> {
    PERCENTILE
        .captures_iter(text)
        .filter_map(|caps| {
            let rank = Percentile::from_rank(&caps[1])?;
            let millis = units::to_millis(&caps[2])?;
            Some((rank, millis))
        })
        .collect()
}

/// The socket error line, if present and fully numeric.
pub fn socket_errors(text: &str) -> Option<SocketErrors> {
    let caps = SOCKET_ERRORS.captures(text)?;
    Some(SocketErrors {
        connect: caps[1].parse().ok()?,
        read: caps[2].parse().ok()?,
        write: caps[3].parse().ok()?,
        timeout: caps[4].parse().ok()?,
    })
}

/// Count of responses outside 2xx/3xx.
pub fn non_2xx(text: &str) -> Option<u64> {
    NON_2XX.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Status code tallies from an enhanced results block.
///
/// `None` without a marker. With a marker, the `Status Code Distribution:`
/// section is scanned when present (up to a blank line or `Latency Stats`),
/// otherwise everything after the marker.
pub fn status_codes(text: &str) -> Option<BTreeMap<u16, u64>> {
    let marker = ENHANCED_MARKER.find(text)?;
    let block = &text[marker.end()..];
    let section = match block.find(STATUS_HEADING) {
        Some(idx) => {
            let body = &block[idx + STATUS_HEADING.len()..];
            let end = STATUS_SECTION_END
                .find(body)
                .map_or(body.len(), |found| found.start());
            &body[..end]
        }
        None => block,
    };

    let mut codes = BTreeMap::new();
    for caps in STATUS_LINE.captures_iter(section) {
        let (Ok(code), Ok(count)) = (caps[1].parse::<u16>(), caps[2].parse::<u64>()) else {
            continue;
        };
        codes.insert(code, count);
    }
    Some(codes)
}

fn first_float(rule: &Regex, text: &str) -> Option<f64> {
    rule.captures(text)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_rule() {
        let (requests, seconds) =
            summary("  240000 requests in 60.00s, 18.00MB read").expect("summary");
        assert_eq!(requests, 240_000);
        assert_eq!(seconds, 60.0);

        let (_, seconds) = summary("1500000 requests in 5.00m, 1.20GB read").expect("minutes");
        assert_eq!(seconds, 300.0);

        assert!(summary("requests in 60.00s").is_none());
    }

    #[test]
    fn requests_per_sec_rule() {
        assert_eq!(requests_per_sec("Requests/sec:   4000.25"), Some(4000.25));
        assert_eq!(requests_per_sec("Requests/sec:"), None);
    }

    #[test]
    fn transfer_rules() {
        assert_eq!(transfer_per_sec("Transfer/sec:      3.50MB"), Some(3.5));
        assert_eq!(transfer_per_sec("Transfer/sec:    300.00KB"), None);
        assert_eq!(transfer_total("240000 requests in 60.00s, 18.25MB read"), Some(18.25));
    }

    #[test]
    fn latency_rule() {
        let [avg, stdev, max] =
            latency("    Latency     2.50ms    1.00ms  1.20s   75.00%").expect("latency");
        assert_eq!(avg, Some(2.5));
        assert_eq!(stdev, Some(1.0));
        assert_eq!(max, Some(1_200.0));

        let [avg, _, _] = latency("Latency 850.00us 10.00us 2.00ms 90.00%").expect("micros");
        assert_eq!(avg, Some(0.85));

        assert!(latency("  Latency Distribution").is_none());
    }

    #[test]
    fn percentile_rule_stays_on_one_line() {
        let found = percentiles("  Req/Sec  4.00k  500.00  5.50k  70.00%\n  240000 requests in 60.00s");
        assert!(found.is_empty());

        assert_eq!(percentiles("50% 120\n"), vec![(Percentile::P50, 120.0)]);
        assert!(percentiles("50% 120kb\n").is_empty());

        let found = percentiles("     50%    2.00ms\n     99.900%  1.50s\n");
        assert_eq!(
            found,
            vec![
                (Percentile::P50, 2.0),
                (Percentile::from_rank("99.9").unwrap(), 1_500.0)
            ]
        );
    }

    #[test]
    fn socket_errors_rule() {
        let errors = socket_errors("  Socket errors: connect 12, read 3, write 1, timeout 40")
            .expect("errors");
        assert_eq!(errors.connect, 12);
        assert_eq!(errors.total(), 56);
        assert!(socket_errors("Socket errors: connect 1, read 2").is_none());
    }

    #[test]
    fn non_2xx_rule() {
        assert_eq!(non_2xx("  Non-2xx or 3xx responses: 517"), Some(517));
    }

    #[test]
    fn status_codes_need_marker() {
        assert_eq!(status_codes("200: 9500 requests"), None);

        let text = "=== GET VERIFY NUMBER RESULTS ===\n200: 9500 requests\n500: 500 requests\n";
        let codes = status_codes(text).expect("block");
        assert_eq!(codes, BTreeMap::from([(200, 9_500), (500, 500)]));
    }

    #[test]
    fn status_section_stops_at_latency_stats() {
        let text = "\
=== POST PAGOS RESULTS ===
Total Requests: 10000
Status Code Distribution:
  200: 9000 requests
  503: 1000 requests
Latency Stats:
  404: 7 requests
";
        let codes = status_codes(text).expect("block");
        assert_eq!(codes, BTreeMap::from([(200, 9_000), (503, 1_000)]));
    }

    #[test]
    fn status_section_stops_at_crlf_blank_line() {
        let text = "=== GET VERIFY NUMBER RESULTS ===\r\n\
Status Code Distribution:\r\n\
  200: 5 requests\r\n\
\r\n\
  404: 7 requests\r\n";
        let codes = status_codes(text).expect("block");
        assert_eq!(codes, BTreeMap::from([(200, 5)]));
    }

    #[test]
    fn marker_without_lines_is_empty_not_absent() {
        let codes = status_codes("=== POST PAGOS RESULTS ===\nnothing here\n").expect("block");
        assert!(codes.is_empty());
    }
}
