// Numan Thabit 2025
use std::{
    path::Path,
    process::Stdio,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use humantime::format_duration;
use tokio::{
    io::{AsyncReadExt, BufReader},
    process::Command,
    time::{sleep, timeout},
};
use tracing::{info, warn};
use wrk_metrics::{highlight_lines, ResultsEnvelope, RunRecord};

use crate::config::{BenchConfig, TestCase};

/// Arguments passed to wrk for `case`, binary excluded.
pub fn wrk_args(config: &BenchConfig, case: &TestCase) -> Vec<String> {
    let mut args = vec![
        format!("-t{}", config.threads),
        format!("-c{}", config.connections),
        format!("-d{}s", config.duration().as_secs()),
    ];
    if config.latency {
        args.push("--latency".to_string());
    }
    args.push("-s".to_string());
    args.push(case.script.display().to_string());
    args.push(case.url.clone());
    args
}

/// Command line as recorded in the results envelope.
pub fn command_line(config: &BenchConfig, case: &TestCase) -> String {
    let mut parts = vec![config.wrk_bin.display().to_string()];
    parts.extend(wrk_args(config, case));
    parts.join(" ")
}

/// Fails when any selected case points at a missing Lua script.
pub fn verify_scripts(cases: &[&TestCase]) -> Result<()> {
    let missing: Vec<String> = cases
        .iter()
        .filter(|case| !case.script.exists())
        .map(|case| case.script.display().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("missing wrk Lua scripts: {}", missing.join(", ")))
    }
}

/// Runs the selected cases one after another, pausing between runs so they do
/// not compete for the local machine.
pub async fn run_cases(config: &BenchConfig, cases: &[&TestCase]) -> Result<ResultsEnvelope> {
    verify_scripts(cases)?;

    let mut envelope = ResultsEnvelope::new();
    for (idx, case) in cases.iter().enumerate() {
        info!(
            phase = idx + 1,
            total = cases.len(),
            test = %case.name,
            threads = config.threads,
            connections = config.connections,
            duration = %format_duration(config.duration()),
            url = %case.url,
            "starting wrk run"
        );

        let record = run_case(config, case).await;
        log_record(case, &record);
        envelope.insert(case.result_key.clone(), record);

        if idx + 1 < cases.len() && !config.cooldown().is_zero() {
            info!(
                cooldown = %format_duration(config.cooldown()),
                "cooldown before next run"
            );
            sleep(config.cooldown()).await;
        }
    }
    Ok(envelope)
}

/// Executes one wrk run. Launch failures and timeouts are captured in the
/// returned record instead of aborting the batch.
pub async fn run_case(config: &BenchConfig, case: &TestCase) -> RunRecord {
    let command = command_line(config, case);
    let mut record = match execute(config, case).await {
        Ok(captured) => RunRecord {
            command,
            stdout: Some(captured.stdout),
            stderr: Some(captured.stderr),
            return_code: captured.return_code,
            execution_time: Some(captured.elapsed.as_secs_f64()),
            timestamp: Some(Local::now().naive_local()),
            test_name: None,
            description: None,
            error: None,
        },
        Err(err) => {
            warn!(test = %case.name, error = %format!("{err:#}"), "wrk run failed");
            RunRecord::failed(command, format!("{err:#}"), Local::now().naive_local())
        }
    };
    record.test_name = Some(case.name.clone());
    record.description = Some(case.description.clone());
    record
}

struct Captured {
    stdout: String,
    stderr: String,
    return_code: Option<i32>,
    elapsed: Duration,
}

async fn execute(config: &BenchConfig, case: &TestCase) -> Result<Captured> {
    let wrk_bin = config.wrk_bin.as_path();
    let start = Instant::now();

    let mut cmd = Command::new(wrk_bin);
    cmd.kill_on_drop(true);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.args(wrk_args(config, case));

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed running {}", wrk_bin.display()))?;

    let stdout = child
        .stdout
        .take()
        .context("failed to capture wrk stdout")?;
    let stderr = child
        .stderr
        .take()
        .context("failed to capture wrk stderr")?;

    let stdout_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok::<String, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
    });

    let stderr_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok::<String, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
    });

    let status = match timeout(config.timeout(), child.wait()).await {
        Ok(status_res) => {
            status_res.with_context(|| format!("failed waiting for {}", wrk_bin.display()))?
        }
        Err(_) => {
            let timeout_str = format_duration(config.timeout()).to_string();
            warn!(test = %case.name, timeout = %timeout_str, "wrk exceeded timeout; terminating");
            if let Err(err) = child.start_kill() {
                warn!(%err, "failed to signal wrk for shutdown; retrying with kill()");
                child
                    .kill()
                    .await
                    .context("failed to kill timed out wrk process")?;
            }
            child
                .wait()
                .await
                .context("failed to await wrk termination after timeout")?;
            stdout_task.abort();
            stderr_task.abort();
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            return Err(anyhow!("Timeout after {timeout_str}"));
        }
    };

    let stdout = stdout_task
        .await
        .context("failed to join wrk stdout task")??;
    let stderr = stderr_task
        .await
        .context("failed to join wrk stderr task")??;

    Ok(Captured {
        stdout,
        stderr,
        return_code: status.code(),
        elapsed: start.elapsed(),
    })
}

fn log_record(case: &TestCase, record: &RunRecord) {
    let Some(stdout) = record.stdout.as_deref() else {
        return;
    };
    info!(
        test = %case.name,
        elapsed_secs = record.execution_time.unwrap_or_default(),
        return_code = ?record.return_code,
        "wrk run complete"
    );
    for line in highlight_lines(stdout) {
        info!(test = %case.name, "{}", line.trim());
    }
    if let Some(stderr) = record.stderr.as_deref().filter(|s| !s.trim().is_empty()) {
        warn!(test = %case.name, stderr = %stderr.trim(), "wrk wrote to stderr");
    }
}

/// Persists `envelope` as `load_test_results_<stamp>.json` under `dir`.
pub fn persist(envelope: &ResultsEnvelope, dir: &Path) -> Result<std::path::PathBuf> {
    let name = wrk_metrics::envelope::artifact_name(
        wrk_metrics::envelope::RESULTS_PREFIX,
        "json",
        Local::now().naive_local(),
    );
    let path = dir.join(name);
    envelope
        .save(&path)
        .with_context(|| format!("failed to persist results to {}", path.display()))?;
    Ok(path)
}
