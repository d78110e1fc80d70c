// Numan Thabit 2025
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDateTime};
use tokio::fs;
use tracing::{info, warn};
use wrk_metrics::{
    envelope::artifact_name,
    report::{html, text},
    ReportAggregator, ResultsEnvelope,
};

/// Paths of the artifacts written for one envelope.
#[derive(Debug)]
pub struct GeneratedReport {
    pub text: PathBuf,
    pub dashboard: PathBuf,
}

/// Resolves the envelope to report on: the explicit path, else the newest one in `dir`.
pub fn resolve_results(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    ResultsEnvelope::latest_in(dir)?.ok_or_else(|| {
        anyhow!(
            "no results files found in {}; run the load tests first",
            dir.display()
        )
    })
}

/// Writes the text report and the HTML dashboard for `results` into `out_dir`.
pub async fn generate(results: &Path, out_dir: &Path) -> Result<GeneratedReport> {
    info!(path = %results.display(), "using results file");
    let envelope = ResultsEnvelope::load(results)?;
    let aggregator = ReportAggregator::from_envelope(&envelope);
    if aggregator.is_empty() {
        return Err(anyhow!("no valid test data found in {}", results.display()));
    }
    if !aggregator.is_comparison() {
        warn!("single run available; rendering single-run dashboard");
    }
    write_artifacts(&aggregator, out_dir, Local::now().naive_local()).await
}

async fn write_artifacts(
    aggregator: &ReportAggregator,
    out_dir: &Path,
    at: NaiveDateTime,
) -> Result<GeneratedReport> {
    fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create report directory {}", out_dir.display()))?;

    let text_path = out_dir.join(artifact_name(text::REPORT_PREFIX, "txt", at));
    fs::write(&text_path, text::render(aggregator, at))
        .await
        .with_context(|| format!("failed to write report to {}", text_path.display()))?;
    info!(path = %text_path.display(), "detailed report saved");

    let dashboard_path = out_dir.join(artifact_name(html::DASHBOARD_PREFIX, "html", at));
    let dashboard = html::render(aggregator, at)?;
    fs::write(&dashboard_path, dashboard)
        .await
        .with_context(|| format!("failed to write dashboard to {}", dashboard_path.display()))?;
    info!(path = %dashboard_path.display(), "dashboard saved");

    Ok(GeneratedReport {
        text: text_path,
        dashboard: dashboard_path,
    })
}
