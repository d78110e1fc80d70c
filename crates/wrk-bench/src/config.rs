// Numan Thabit 2025
use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use humantime::format_duration;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use tokio::fs;

/// Load-generation settings plus the catalog of named test cases.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct BenchConfig {
    #[serde(default = "default_wrk_bin")]
    pub wrk_bin: PathBuf,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default = "default_connections")]
    pub connections: u32,
    /// Ask wrk for its latency distribution table.
    #[serde(default = "default_latency")]
    pub latency: bool,
    #[serde(default)]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub duration: Option<Duration>,
    #[serde(default)]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub cooldown: Option<Duration>,
    #[serde(default = "default_cases")]
    pub cases: Vec<TestCase>,
}

/// One wrk invocation against one endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    /// Selector used on the command line (`get`, `post`).
    pub key: String,
    /// Envelope key the results are stored under.
    pub result_key: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub script: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            wrk_bin: default_wrk_bin(),
            threads: default_threads(),
            connections: default_connections(),
            latency: default_latency(),
            duration: None,
            timeout: None,
            cooldown: None,
            cases: default_cases(),
        }
    }
}

impl BenchConfig {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {} as TOML", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that serde cannot express. Run again after CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if self.cases.is_empty() {
            return Err(anyhow!("config defines no test cases"));
        }
        // wrk's -d flag only takes whole seconds.
        let duration = self.duration();
        if duration.is_zero() || duration.subsec_nanos() != 0 {
            return Err(anyhow!(
                "wrk duration must be a positive whole number of seconds, got {}",
                format_duration(duration)
            ));
        }
        for (idx, case) in self.cases.iter().enumerate() {
            if case.key == BOTH {
                return Err(anyhow!("test case key '{BOTH}' is reserved"));
            }
            if self.cases[..idx].iter().any(|other| other.key == case.key) {
                return Err(anyhow!("duplicate test case key '{}'", case.key));
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.duration.unwrap_or_else(|| Duration::from_secs(300))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or_else(|| Duration::from_secs(400))
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown.unwrap_or_else(|| Duration::from_secs(10))
    }

    /// Cases selected by `selector`: a single key, or `both` for the whole catalog.
    pub fn select(&self, selector: &str) -> Result<Vec<&TestCase>> {
        if selector == BOTH {
            return Ok(self.cases.iter().collect());
        }
        self.cases
            .iter()
            .find(|case| case.key == selector)
            .map(|case| vec![case])
            .ok_or_else(|| {
                let known: Vec<&str> = self.cases.iter().map(|case| case.key.as_str()).collect();
                anyhow!(
                    "unknown test case '{}'; available: {}, {BOTH}",
                    selector,
                    known.join(", ")
                )
            })
    }
}

/// Selector that runs every configured case in order.
pub const BOTH: &str = "both";

fn default_wrk_bin() -> PathBuf {
    PathBuf::from("wrk")
}

fn default_threads() -> u32 {
    32
}

fn default_connections() -> u32 {
    50_000
}

fn default_latency() -> bool {
    true
}

fn default_cases() -> Vec<TestCase> {
    vec![
        TestCase {
            key: "get".into(),
            result_key: "GET_verify_number".into(),
            name: "GET Verify Number".into(),
            description: "GET request against the number verification endpoint".into(),
            url: "http://127.0.0.1:8080/gateway/user/verify/number?username=65663503".into(),
            script: PathBuf::from("scripts/get_verify_number_enhanced.lua"),
        },
        TestCase {
            key: "post".into(),
            result_key: "POST_pagos".into(),
            name: "POST Pagos".into(),
            description: "POST request against the payment processing endpoint".into(),
            url: "http://127.0.0.1:8443/api/pagos/ProcessMessage".into(),
            script: PathBuf::from("scripts/post_pagos_enhanced.lua"),
        },
    ]
}
