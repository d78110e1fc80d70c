// Numan Thabit 2025
use std::path::PathBuf;

/// Failures while loading, saving, or rendering run results.
///
/// Extraction never fails; these only cover the envelope and renderer boundaries.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Reading or writing a results artifact failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The results envelope is not valid JSON or has the wrong shape.
    #[error("invalid results envelope {path}: {source}")]
    Envelope {
        /// Envelope path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Serializing the envelope failed.
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The dashboard template failed to render.
    #[error("template: {0}")]
    Template(#[from] minijinja::Error),
    /// No runs with captured output were available.
    #[error("no parsed runs to report")]
    NoRuns,
}
