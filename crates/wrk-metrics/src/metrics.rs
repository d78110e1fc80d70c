// Numan Thabit 2025
use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Structured metrics extracted from one wrk run.
///
/// Every field is independently optional. `None` means the corresponding
/// section was not found in the captured output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Requests completed during the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_requests: Option<u64>,
    /// Measured wall-clock duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// `total_requests / duration_seconds`; absent when the duration is zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_second_observed: Option<f64>,
    /// Throughput as reported by wrk itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_second_reported: Option<f64>,
    /// `Transfer/sec` in megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_rate_mb_per_sec: Option<f64>,
    /// Total megabytes read over the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_total_mb: Option<f64>,
    /// Average latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_avg_ms: Option<f64>,
    /// Latency standard deviation in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_stdev_ms: Option<f64>,
    /// Maximum latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_max_ms: Option<f64>,
    /// Latency at each reported percentile, in milliseconds.
    #[serde(default)]
    pub percentiles: BTreeMap<Percentile, f64>,
    /// Connection-level failures. All zero when wrk did not report any.
    #[serde(default)]
    pub socket_errors: SocketErrors,
    /// Responses wrk counted outside the 2xx/3xx range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_2xx_3xx_responses: Option<u64>,
    /// HTTP status tallies from an enhanced results block.
    ///
    /// `None` when no block was emitted; `Some` (possibly empty) otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code_distribution: Option<BTreeMap<u16, u64>>,
}

impl RunMetrics {
    /// Sum of all socket error counters.
    pub fn total_errors(&self) -> u64 {
        self.socket_errors.total()
    }

    /// Requests that completed. Zero when the summary line was missing.
    pub fn successful_requests(&self) -> u64 {
        self.total_requests.unwrap_or(0)
    }

    /// Connections that never got established.
    ///
    /// May exceed [`successful_requests`](Self::successful_requests) when the
    /// target is overloaded.
    pub fn failed_requests(&self) -> u64 {
        self.socket_errors.connect
    }

    /// Successful plus failed requests.
    pub fn total_attempted(&self) -> u64 {
        self.successful_requests()
            .saturating_add(self.failed_requests())
    }

    /// Socket error rate as a percentage of completed requests.
    pub fn error_rate_percent(&self) -> f64 {
        error_rate_percent(self.total_errors(), self.total_requests)
    }

    /// Latency recorded for `percentile`, if wrk printed it.
    pub fn percentile(&self, percentile: Percentile) -> Option<f64> {
        self.percentiles.get(&percentile).copied()
    }

    /// True when nothing at all was recognized in the output.
    pub fn is_empty(&self) -> bool {
        self.total_requests.is_none()
            && self.requests_per_second_reported.is_none()
            && self.transfer_rate_mb_per_sec.is_none()
            && self.transfer_total_mb.is_none()
            && self.latency_avg_ms.is_none()
            && self.percentiles.is_empty()
            && self.socket_errors.total() == 0
            && self.non_2xx_3xx_responses.is_none()
            && self.status_code_distribution.is_none()
    }
}

/// `total_errors / total_requests * 100`.
///
/// A zero or missing request count is replaced by 1 so the result stays
/// finite; with no completed requests the rate can exceed 100%.
pub fn error_rate_percent(total_errors: u64, total_requests: Option<u64>) -> f64 {
    let divisor = match total_requests {
        Some(0) | None => 1,
        Some(count) => count,
    };
    total_errors as f64 / divisor as f64 * 100.0
}

/// Socket error counters as printed by wrk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketErrors {
    /// Failed connection attempts.
    pub connect: u64,
    /// Read errors.
    pub read: u64,
    /// Write errors.
    pub write: u64,
    /// Request timeouts.
    pub timeout: u64,
}

impl SocketErrors {
    /// Sum of the four counters.
    pub fn total(&self) -> u64 {
        self.connect
            .saturating_add(self.read)
            .saturating_add(self.write)
            .saturating_add(self.timeout)
    }
}

/// A percentile rank such as p50 or p99.9, kept in thousandths of a percent.
///
/// Serializes as its label (`"p50"`, `"p99.9"`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct Percentile(u32);

impl Percentile {
    /// Median.
    pub const P50: Self = Self(50_000);
    /// 75th percentile.
    pub const P75: Self = Self(75_000);
    /// 90th percentile.
    pub const P90: Self = Self(90_000);
    /// 95th percentile.
    pub const P95: Self = Self(95_000);
    /// 99th percentile.
    pub const P99: Self = Self(99_000);

    /// Parses the numeric part of a rank as printed by wrk, e.g. `50` or `99.900`.
    ///
    /// Digits beyond the third decimal are dropped.
    pub fn from_rank(raw: &str) -> Option<Self> {
        let (whole, fraction) = match raw.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (raw, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let whole: u32 = whole.parse().ok()?;
        let mut thousandths = 0u32;
        let mut scale = 100u32;
        for digit in fraction.bytes().take(3) {
            thousandths += u32::from(digit - b'0') * scale;
            scale /= 10;
        }
        whole
            .checked_mul(1_000)
            .and_then(|base| base.checked_add(thousandths))
            .map(Self)
    }

    /// The rank as a floating point percentage.
    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 1_000.0
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 1_000;
        let fraction = self.0 % 1_000;
        if fraction == 0 {
            return write!(f, "p{whole}");
        }
        let digits = format!("{fraction:03}");
        write!(f, "p{whole}.{}", digits.trim_end_matches('0'))
    }
}

/// Error returned when a percentile label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid percentile label '{0}'")]
pub struct ParsePercentileError(String);

impl FromStr for Percentile {
    type Err = ParsePercentileError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        label
            .strip_prefix('p')
            .and_then(Percentile::from_rank)
            .ok_or_else(|| ParsePercentileError(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_rate_guard_stays_finite() {
        let rate = error_rate_percent(5, Some(0));
        assert!(rate.is_finite());
        assert_eq!(rate, 500.0);
        assert_eq!(error_rate_percent(5, None), 500.0);
        assert_eq!(error_rate_percent(25, Some(1_000)), 2.5);
    }

    #[test]
    fn derived_counts_follow_socket_errors() {
        let metrics = RunMetrics {
            total_requests: Some(100),
            socket_errors: SocketErrors {
                connect: 250,
                read: 3,
                write: 0,
                timeout: 7,
            },
            ..RunMetrics::default()
        };
        assert_eq!(metrics.total_errors(), 260);
        assert_eq!(metrics.successful_requests(), 100);
        assert_eq!(metrics.failed_requests(), 250);
        assert_eq!(metrics.total_attempted(), 350);
        assert!(metrics.failed_requests() > metrics.successful_requests());
    }

    #[test]
    fn percentile_labels() {
        assert_eq!(Percentile::from_rank("50"), Some(Percentile::P50));
        assert_eq!(Percentile::from_rank("99.000"), Some(Percentile::P99));
        assert_eq!(Percentile::from_rank("99.900").unwrap().to_string(), "p99.9");
        assert_eq!(Percentile::from_rank("99.999").unwrap().to_string(), "p99.999");
        assert_eq!("p90".parse::<Percentile>(), Ok(Percentile::P90));
        assert_eq!("p99.9".parse::<Percentile>().unwrap().as_f64(), 99.9);
        assert!("90".parse::<Percentile>().is_err());
        assert!(Percentile::from_rank(".5").is_none());
    }

    #[test]
    fn percentiles_serialize_as_labels() {
        let mut metrics = RunMetrics::default();
        metrics.percentiles.insert(Percentile::P50, 120.0);
        let json = serde_json::to_value(&metrics).expect("serialize");
        assert_eq!(json["percentiles"]["p50"], 120.0);
        assert!(json.get("total_requests").is_none());
        assert!(json.get("status_code_distribution").is_none());

        let back: RunMetrics = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, metrics);
    }

    #[test]
    fn empty_distribution_is_distinct_from_absent() {
        let metrics = RunMetrics {
            status_code_distribution: Some(BTreeMap::new()),
            ..RunMetrics::default()
        };
        let json = serde_json::to_value(&metrics).expect("serialize");
        assert_eq!(json["status_code_distribution"], serde_json::json!({}));
    }
}
