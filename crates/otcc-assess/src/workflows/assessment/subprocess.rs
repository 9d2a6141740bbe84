use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::analyzer::{AnalysisError, AnalysisRequest, Analyzer, ProgressEvent, ProgressSender};
use super::domain::{AssessmentId, AssessmentResult};

/// File the analyzer must leave in its output directory before exiting 0.
pub const RESULTS_FILE: &str = "results.json";

/// Launches the analyzer as a child process:
/// `<program> <args..> --assessment-id <id> --documents <json array> --output-dir <dir>`.
///
/// The child is killed if the returned future is dropped, so callers can bound the run
/// with `tokio::time::timeout`.
#[derive(Debug, Clone)]
pub struct SubprocessAnalyzer {
    program: PathBuf,
    args: Vec<String>,
}

impl SubprocessAnalyzer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, request: &AnalysisRequest) -> Result<Command, AnalysisError> {
        let documents = absolute_paths(&request.document_paths)?;
        let documents = serde_json::to_string(&documents)
            .map_err(|err| AnalysisError::Launch(format!("cannot encode document list: {err}")))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--assessment-id")
            .arg(request.assessment_id.as_str())
            .arg("--documents")
            .arg(documents)
            .arg("--output-dir")
            .arg(&request.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(command)
    }
}

#[async_trait]
impl Analyzer for SubprocessAnalyzer {
    async fn run(
        &self,
        request: AnalysisRequest,
        progress: ProgressSender,
    ) -> Result<AssessmentResult, AnalysisError> {
        info!(
            assessment_id = %request.assessment_id,
            program = %self.program.display(),
            documents = request.document_paths.len(),
            "launching analyzer"
        );

        let mut child = self
            .command(&request)?
            .spawn()
            .map_err(|err| AnalysisError::Launch(err.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::Launch("analyzer stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AnalysisError::Launch("analyzer stderr not captured".to_string()))?;

        let id = &request.assessment_id;
        let (status, (), ()) = tokio::join!(
            child.wait(),
            forward_progress(stdout, id, progress),
            log_diagnostics(stderr, id),
        );
        let status = status.map_err(|err| AnalysisError::Io(err.to_string()))?;

        if !status.success() {
            warn!(assessment_id = %id, code = ?status.code(), "analyzer exited unsuccessfully");
            return Err(AnalysisError::ProcessFailed(status.code()));
        }

        read_results(&request.output_dir).await
    }
}

async fn forward_progress<R>(stdout: R, id: &AssessmentId, progress: ProgressSender)
where
    R: AsyncRead + Unpin,
{
    drain_lines(stdout, id, "stdout", |line| match ProgressEvent::parse_line(line) {
        // A closed receiver only means nobody is listening any more.
        Some(event) => {
            let _ = progress.send(event);
        }
        None => debug!(assessment_id = %id, output = %line, "analyzer output"),
    })
    .await;
}

async fn log_diagnostics<R>(stderr: R, id: &AssessmentId)
where
    R: AsyncRead + Unpin,
{
    drain_lines(stderr, id, "stderr", |line| {
        if !line.trim().is_empty() {
            warn!(assessment_id = %id, output = %line, "analyzer stderr");
        }
    })
    .await;
}

/// Reads the pipe to EOF, handing each line to `on_line`. Bytes that are not UTF-8 are
/// replaced rather than rejected; the pipe stays open until the child closes it.
async fn drain_lines<R, F>(stream: R, id: &AssessmentId, stream_name: &str, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(stream);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                on_line(line.trim_end_matches(['\n', '\r']));
            }
            Err(err) => {
                warn!(
                    assessment_id = %id,
                    stream = stream_name,
                    error = %err,
                    "analyzer output unreadable; discarding the rest"
                );
                if let Err(err) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    debug!(assessment_id = %id, stream = stream_name, error = %err, "analyzer pipe closed");
                }
                break;
            }
        }
    }
}

/// Loads and validates `results.json` from the output directory.
pub async fn read_results(output_dir: &Path) -> Result<AssessmentResult, AnalysisError> {
    let path = output_dir.join(RESULTS_FILE);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(AnalysisError::ResultsMissing),
        Err(err) => return Err(AnalysisError::Io(format!("{}: {err}", path.display()))),
    };

    let result: AssessmentResult = serde_json::from_slice(&bytes)
        .map_err(|err| AnalysisError::ResultsMalformed(err.to_string()))?;
    result.validate().map_err(AnalysisError::ResultsMalformed)?;

    debug!(path = %path.display(), "analyzer results loaded");
    Ok(result)
}

fn absolute_paths(paths: &[PathBuf]) -> Result<Vec<String>, AnalysisError> {
    let cwd = std::env::current_dir().map_err(|err| AnalysisError::Io(err.to_string()))?;
    Ok(paths
        .iter()
        .map(|path| {
            if path.is_absolute() {
                path.display().to_string()
            } else {
                cwd.join(path).display().to_string()
            }
        })
        .collect())
}
