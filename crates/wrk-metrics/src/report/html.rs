// Numan Thabit 2025
//! Interactive HTML dashboard.
//!
//! The page pulls Chart.js from a CDN; every number on it comes from the
//! serialized run views below.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use minijinja::{context, Environment};
use serde::Serialize;

use super::{format_opt, group_thousands, ReportAggregator, SummaryRow, COMPARED_PERCENTILES};
use crate::{error::ReportError, metrics::SocketErrors};

/// File name prefix of HTML dashboards.
pub const DASHBOARD_PREFIX: &str = "load_test_dashboard_";

const TEMPLATE_NAME: &str = "dashboard.html";

#[derive(Debug, Serialize)]
struct RunView<'a> {
    name: &'a str,
    display_name: String,
    command: &'a str,
    raw_output: &'a str,
    execution_time_secs: f64,
    execution_time_display: String,
    total_requests: Option<u64>,
    duration_seconds: Option<f64>,
    rps: Option<f64>,
    rps_display: String,
    latency_avg_ms: Option<f64>,
    latency_stdev_ms: Option<f64>,
    latency_max_ms: Option<f64>,
    transfer_mb_per_sec: Option<f64>,
    successful: u64,
    failed: u64,
    error_rate: f64,
    total_errors: u64,
    socket_errors: SocketErrors,
    percentiles: Vec<Option<f64>>,
    status_codes: Option<&'a BTreeMap<u16, u64>>,
}

/// Renders the dashboard: a comparison layout for two or more runs, a
/// single-run layout otherwise.
pub fn render(
    aggregator: &ReportAggregator,
    generated_at: NaiveDateTime,
) -> Result<String, ReportError> {
    if aggregator.is_empty() {
        return Err(ReportError::NoRuns);
    }

    let runs: Vec<RunView<'_>> = aggregator
        .runs()
        .iter()
        .map(|run| {
            let m = &run.metrics;
            RunView {
                name: &run.name,
                display_name: run.display_name(),
                command: &run.command,
                raw_output: &run.raw_output,
                execution_time_secs: run.execution_time_secs,
                execution_time_display: format!("{:.2}", run.execution_time_secs),
                total_requests: m.total_requests,
                duration_seconds: m.duration_seconds,
                rps: m.requests_per_second_reported,
                rps_display: format_opt(m.requests_per_second_reported, 1),
                latency_avg_ms: m.latency_avg_ms,
                latency_stdev_ms: m.latency_stdev_ms,
                latency_max_ms: m.latency_max_ms,
                transfer_mb_per_sec: m.transfer_rate_mb_per_sec,
                successful: m.successful_requests(),
                failed: m.failed_requests(),
                error_rate: m.error_rate_percent(),
                total_errors: m.total_errors(),
                socket_errors: m.socket_errors,
                percentiles: COMPARED_PERCENTILES
                    .iter()
                    .map(|rank| m.percentile(*rank))
                    .collect(),
                status_codes: m.status_code_distribution.as_ref(),
            }
        })
        .collect();

    let percentile_labels: Vec<String> =
        COMPARED_PERCENTILES.iter().map(ToString::to_string).collect();

    let summary_rows: Vec<SummaryRow> = if aggregator.is_comparison() {
        aggregator.summary_rows()
    } else {
        single_run_rows(aggregator)
    };

    let title = if aggregator.is_comparison() {
        "Load Test Comparison Dashboard".to_string()
    } else {
        format!("Load Test Results - {}", runs[0].display_name)
    };

    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, DASHBOARD_TEMPLATE)?;
    let template = env.get_template(TEMPLATE_NAME)?;
    let html = template.render(context! {
        title => title,
        generated_at => generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        comparison => aggregator.is_comparison(),
        runs => runs,
        percentile_labels => percentile_labels,
        summary_rows => summary_rows,
    })?;
    Ok(html)
}

fn single_run_rows(aggregator: &ReportAggregator) -> Vec<SummaryRow> {
    let m = &aggregator.runs()[0].metrics;
    let row = |metric: &'static str, value: String| SummaryRow {
        metric,
        values: vec![value],
    };
    vec![
        row(
            "Total Requests",
            m.total_requests
                .map(group_thousands)
                .unwrap_or_else(|| super::NOT_AVAILABLE.to_string()),
        ),
        row("Duration (s)", format_opt(m.duration_seconds, 1)),
        row("RPS", format_opt(m.requests_per_second_reported, 1)),
        row("Avg Latency (ms)", format_opt(m.latency_avg_ms, 1)),
        row("Error Rate (%)", format!("{:.2}", m.error_rate_percent())),
    ]
}

const DASHBOARD_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }}</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
    <style>
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }
        .header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; border-radius: 10px; margin-bottom: 30px; text-align: center; }
        .header h1 { margin: 0; font-size: 2.2em; }
        .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(380px, 1fr)); gap: 20px; margin-bottom: 30px; }
        .card { background: white; border-radius: 10px; box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1); padding: 20px; }
        .card h3 { color: #667eea; margin-top: 0; }
        .stat { font-size: 2.4em; font-weight: bold; color: #FF6B6B; text-align: center; }
        table { width: 100%; border-collapse: collapse; }
        th { background: #4ECDC4; color: white; padding: 8px; }
        td { padding: 8px; text-align: center; border-bottom: 1px solid #eee; }
        tr:nth-child(even) td { background: #F7F7F7; }
        .command-box { background: #f8f9fa; border-left: 4px solid #667eea; padding: 15px; margin: 10px 0; border-radius: 5px; font-family: 'Courier New', monospace; font-size: 14px; overflow-x: auto; }
        pre { white-space: pre-wrap; }
        .muted { color: #888; }
        .footer { text-align: center; margin-top: 30px; padding: 20px; background: #333; color: white; border-radius: 10px; }
    </style>
</head>
<body>
    <div class="header">
        <h1>{{ title }}</h1>
        <p>Generated {{ generated_at }}</p>
    </div>

    <div class="grid">
    {% if comparison %}
        <div class="card"><h3>Requests per Second</h3><canvas id="rps"></canvas></div>
        <div class="card"><h3>Average Latency (ms)</h3><canvas id="latency"></canvas></div>
        <div class="card"><h3>Successful vs Failed</h3><canvas id="connections"></canvas></div>
        <div class="card"><h3>Error Rate (%)</h3><canvas id="error-rate"></canvas></div>
        <div class="card"><h3>Latency Percentiles (ms)</h3><canvas id="percentiles"></canvas></div>
        <div class="card"><h3>Total Requests</h3><canvas id="total-requests"></canvas></div>
        {% for run in runs %}
        <div class="card"><h3>Socket Errors - {{ run.display_name }}</h3>
            {% if run.total_errors > 0 %}<canvas id="errors-{{ loop.index0 }}"></canvas>{% else %}<p class="muted">No socket errors reported</p>{% endif %}
        </div>
        {% endfor %}
    {% else %}
        <div class="card"><h3>Requests/sec</h3>
            <div class="stat">{{ runs[0].rps_display }}</div>
        </div>
        <div class="card"><h3>Latency Statistics (ms)</h3><canvas id="latency-stats"></canvas></div>
        <div class="card"><h3>Error Rate (%)</h3><canvas id="error-rate"></canvas></div>
    {% endif %}
        {% for run in runs %}{% if run.status_codes is not none %}
        <div class="card"><h3>Status Codes - {{ run.display_name }}</h3><canvas id="status-{{ loop.index0 }}"></canvas></div>
        {% endif %}{% endfor %}
        <div class="card">
            <h3>Performance Summary</h3>
            <table>
                <tr><th>Metric</th>{% if comparison %}{% for run in runs %}<th>{{ run.display_name }}</th>{% endfor %}{% else %}<th>Value</th>{% endif %}</tr>
                {% for row in summary_rows %}
                <tr><td>{{ row.metric }}</td>{% for value in row["values"] %}<td>{{ value }}</td>{% endfor %}</tr>
                {% endfor %}
            </table>
        </div>
    </div>

    {% for run in runs %}
    <div class="card" style="margin-bottom: 20px;">
        <h3>{{ run.display_name }}</h3>
        <div class="command-box">{{ run.command }}</div>
        <p class="muted">Execution time: {{ run.execution_time_display }} s</p>
        <details><summary>Raw wrk output</summary><pre>{{ run.raw_output }}</pre></details>
    </div>
    {% endfor %}

    <div class="footer">wrk-bench load test dashboard</div>

    <script>
        const runs = {{ runs|tojson }};
        const percentileLabels = {{ percentile_labels|tojson }};
        const palette = ['#FF6B6B', '#4ECDC4', '#FFE66D', '#95E1D3', '#F38BA8', '#A8E6CF', '#FFD93D', '#98D8C8'];
        const names = runs.map(r => r.display_name);
        const colors = runs.map((_, i) => palette[i % palette.length]);

        function bar(id, labels, datasets, showLegend) {
            const el = document.getElementById(id);
            if (!el) return;
            new Chart(el, {
                type: 'bar',
                data: { labels: labels, datasets: datasets },
                options: { plugins: { legend: { display: !!showLegend } } }
            });
        }

        function pie(id, labels, values) {
            const el = document.getElementById(id);
            if (!el) return;
            new Chart(el, {
                type: 'pie',
                data: { labels: labels, datasets: [{ data: values, backgroundColor: palette }] }
            });
        }

        {% if comparison %}
        bar('rps', names, [{ label: 'RPS', data: runs.map(r => r.rps), backgroundColor: colors }]);
        bar('latency', names, [{ label: 'Avg latency', data: runs.map(r => r.latency_avg_ms), backgroundColor: colors }]);
        bar('connections', names, [
            { label: 'Successful', data: runs.map(r => r.successful), backgroundColor: '#4ECDC4' },
            { label: 'Failed', data: runs.map(r => r.failed), backgroundColor: '#FF6B6B' }
        ], true);
        bar('error-rate', names, [{ label: 'Error rate', data: runs.map(r => r.error_rate), backgroundColor: colors }]);
        bar('percentiles', percentileLabels, runs.map((r, i) => ({
            label: r.display_name, data: r.percentiles, backgroundColor: colors[i]
        })), true);
        bar('total-requests', names, [{ label: 'Total requests', data: runs.map(r => r.total_requests), backgroundColor: colors }]);
        runs.forEach((r, i) => {
            const e = r.socket_errors;
            pie('errors-' + i, ['Connect', 'Read', 'Write', 'Timeout'], [e.connect, e.read, e.write, e.timeout]);
        });
        {% else %}
        const run = runs[0];
        bar('latency-stats', ['Average', 'Max', 'Std Dev'], [{
            label: 'Latency', data: [run.latency_avg_ms, run.latency_max_ms, run.latency_stdev_ms],
            backgroundColor: ['#4ECDC4', '#FFE66D', '#FF6B6B']
        }]);
        bar('error-rate', ['Error Rate'], [{ label: 'Error rate', data: [run.error_rate], backgroundColor: '#FFA07A' }]);
        {% endif %}
        runs.forEach((r, i) => {
            if (!r.status_codes) return;
            const codes = Object.keys(r.status_codes);
            pie('status-' + i, codes.map(c => 'HTTP ' + c), codes.map(c => r.status_codes[c]));
        });
    </script>
</body>
</html>
"##;
