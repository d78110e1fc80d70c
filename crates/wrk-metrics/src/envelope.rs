// Numan Thabit 2025
use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::error::ReportError;

/// File name prefix of persisted result envelopes.
pub const RESULTS_PREFIX: &str = "load_test_results_";
/// Prefix used by the Spanish-language orchestrator for the same envelope.
pub const LEGACY_RESULTS_PREFIX: &str = "resultados_pruebas_carga_";

/// What the orchestrator captured for one named test case.
///
/// Records written with Spanish keys (`comando`, `nombre_prueba`,
/// `descripcion`) load into the same fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Full wrk command line. Empty when the writer did not record it.
    #[serde(default, alias = "comando")]
    pub command: String,
    /// Captured standard output. Missing when the run never completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Captured standard error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Process exit code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    /// Wall-clock time spent in the run, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    /// Local time the record was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
    /// Human readable test name.
    #[serde(default, alias = "nombre_prueba", skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    /// What the test exercises.
    #[serde(default, alias = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Why the run produced no output (timeout, spawn failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    /// Record for a run that failed before producing output.
    pub fn failed(command: impl Into<String>, error: impl Into<String>, at: NaiveDateTime) -> Self {
        Self {
            command: command.into(),
            stdout: None,
            stderr: None,
            return_code: None,
            execution_time: None,
            timestamp: Some(at),
            test_name: None,
            description: None,
            error: Some(error.into()),
        }
    }
}

/// JSON object of run records keyed by test name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsEnvelope {
    runs: Vec<(String, RunRecord)>,
}

impl ResultsEnvelope {
    /// Empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the record stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, record: RunRecord) {
        let name = name.into();
        match self.runs.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = record,
            None => self.runs.push((name, record)),
        }
    }

    /// Record stored under `name`.
    pub fn get(&self, name: &str) -> Option<&RunRecord> {
        self.runs
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, record)| record)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RunRecord)> {
        self.runs.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True when no record was stored.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Parses an envelope from JSON text, keeping the key order of the document.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
        let mut envelope = Self::new();
        for (name, value) in object {
            envelope.insert(name, serde_json::from_value(value)?);
        }
        Ok(envelope)
    }

    /// Reads an envelope from disk.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let raw = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ReportError::Envelope {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the envelope as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let io_err = |source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(io_err)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    /// Most recent envelope in `dir`, judged by the stamp in its file name.
    ///
    /// Both `load_test_results_*` and `resultados_pruebas_carga_*` files count.
    pub fn latest_in(dir: &Path) -> Result<Option<PathBuf>, ReportError> {
        let entries = fs::read_dir(dir).map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let latest = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let stamp = results_stamp(entry.file_name().to_str()?)?.to_string();
                Some((stamp, entry.path()))
            })
            .max()
            .map(|(_, path)| path);
        Ok(latest)
    }
}

fn results_stamp(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(".json")?;
    [RESULTS_PREFIX, LEGACY_RESULTS_PREFIX]
        .into_iter()
        .find_map(|prefix| stem.strip_prefix(prefix))
}

impl Serialize for ResultsEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.runs.len()))?;
        for (name, record) in &self.runs {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

/// `<prefix><YYYYmmdd_HHMMSS>.<extension>`
pub fn artifact_name(prefix: &str, extension: &str, at: NaiveDateTime) -> String {
    format!("{prefix}{}.{extension}", at.format("%Y%m%d_%H%M%S"))
}
