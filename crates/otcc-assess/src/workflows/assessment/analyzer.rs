//! Port to the external document analyzer.
//!
//! The lifecycle only ever talks to an [`Analyzer`]; the production implementation shells
//! out to a subprocess (see [`super::subprocess`]) while tests substitute in-process fakes.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::domain::{AssessmentId, AssessmentResult};

/// Everything the analyzer needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub assessment_id: AssessmentId,
    pub document_paths: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

/// Incremental progress reported by the analyzer while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub progress: i64,
    pub status: String,
}

#[derive(Deserialize)]
struct RawProgress {
    progress: f64,
    #[serde(default)]
    status: Option<String>,
}

impl ProgressEvent {
    /// Parses one line of analyzer output. Anything that is not a progress object yields `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }

        let raw: RawProgress = serde_json::from_str(trimmed).ok()?;
        if !raw.progress.is_finite() || raw.progress <= 0.0 {
            return None;
        }

        Some(Self {
            // Fractional percentages are truncated.
            progress: raw.progress.trunc() as i64,
            status: raw
                .status
                .filter(|status| !status.trim().is_empty())
                .unwrap_or_else(|| "Processing".to_string()),
        })
    }
}

/// Channel the analyzer pushes progress into; the receiving side may be dropped at any time.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Failures of a single analysis attempt. None of these reach clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("analyzer could not be launched: {0}")]
    Launch(String),
    #[error("{}", describe_exit(.0))]
    ProcessFailed(Option<i32>),
    #[error("analyzer exited cleanly but wrote no results file")]
    ResultsMissing,
    #[error("analyzer results file is malformed: {0}")]
    ResultsMalformed(String),
    #[error("analyzer did not finish within the configured timeout")]
    Timeout,
    #[error("analyzer i/o failed: {0}")]
    Io(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("analyzer exited with code {code}"),
        None => "analyzer was terminated by a signal".to_string(),
    }
}

impl AnalysisError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Launch(_) => "launch",
            Self::ProcessFailed(_) => "process_failed",
            Self::ResultsMissing => "results_missing",
            Self::ResultsMalformed(_) => "results_malformed",
            Self::Timeout => "timeout",
            Self::Io(_) => "io",
        }
    }
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Runs one analysis. Progress may be sent at any point before the future resolves.
    async fn run(
        &self,
        request: AnalysisRequest,
        progress: ProgressSender,
    ) -> Result<AssessmentResult, AnalysisError>;
}
