// Numan Thabit 2025
//! wrk prints times as a number followed by `us`, `ms`, `s`, `m` or `h`.
//! Everything is normalized to milliseconds here.

const MICROS: [&str; 3] = ["us", "µs", "μs"];

/// Normalizes a wrk time token such as `1500us`, `1.5ms` or `0.0015s` to milliseconds.
///
/// Suffixes are tried longest-first so that `ms` is never read as `s`. A bare
/// number is already in milliseconds. Unknown suffixes yield `None`.
pub fn to_millis(token: &str) -> Option<f64> {
    let token = token.trim();

    for suffix in MICROS {
        if let Some(number) = token.strip_suffix(suffix) {
            return parse_number(number).map(|value| value / 1_000.0);
        }
    }
    if let Some(number) = token.strip_suffix("ms") {
        return parse_number(number);
    }
    if let Some(number) = token.strip_suffix('s') {
        return parse_number(number).map(|value| value * 1_000.0);
    }
    if let Some(number) = token.strip_suffix('m') {
        return parse_number(number).map(|value| value * 60_000.0);
    }
    if let Some(number) = token.strip_suffix('h') {
        return parse_number(number).map(|value| value * 3_600_000.0);
    }
    parse_number(token)
}

/// Same normalization as [`to_millis`], expressed in seconds.
pub fn to_seconds(token: &str) -> Option<f64> {
    to_millis(token).map(|millis| millis / 1_000.0)
}

fn parse_number(raw: &str) -> Option<f64> {
    if raw.is_empty() || !raw.chars().all(|ch| ch.is_ascii_digit() || ch == '.') {
        return None;
    }
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}
