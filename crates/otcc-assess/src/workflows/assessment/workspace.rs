use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AssessmentId, AssessmentResult, CompanyId, Document, DocumentCategory, DocumentId};
use super::subprocess::RESULTS_FILE;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const REPORT_FILE: &str = "report.json";

/// Snapshot of the documents under assessment, written when processing starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub assessment_id: AssessmentId,
    pub company_id: CompanyId,
    pub created_at: DateTime<Utc>,
    pub documents: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: DocumentId,
    pub path: PathBuf,
    pub name: String,
    pub category: DocumentCategory,
}

impl Manifest {
    pub fn new(assessment_id: AssessmentId, company_id: CompanyId, documents: &[Document]) -> Self {
        Self {
            assessment_id,
            company_id,
            created_at: Utc::now(),
            documents: documents
                .iter()
                .map(|document| ManifestEntry {
                    id: document.id.clone(),
                    path: document.path.clone(),
                    name: document.original_name.clone(),
                    category: document.category,
                })
                .collect(),
        }
    }

    pub fn document_paths(&self) -> Vec<PathBuf> {
        self.documents.iter().map(|entry| entry.path.clone()).collect()
    }
}

/// Per-assessment directories under a common root:
/// `<root>/<id>/{manifest.json, results.json, report.json}`.
#[derive(Debug, Clone)]
pub struct AssessmentWorkspace {
    root: PathBuf,
}

impl AssessmentWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, id: &AssessmentId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Creates the assessment directory and writes its manifest.
    pub async fn prepare(&self, manifest: &Manifest) -> std::io::Result<PathBuf> {
        let dir = self.dir(&manifest.assessment_id);
        tokio::fs::create_dir_all(&dir).await?;
        let bytes = serde_json::to_vec_pretty(manifest).map_err(std::io::Error::other)?;
        tokio::fs::write(dir.join(MANIFEST_FILE), bytes).await?;
        Ok(dir)
    }

    pub async fn write_results(
        &self,
        id: &AssessmentId,
        result: &AssessmentResult,
    ) -> std::io::Result<PathBuf> {
        let dir = self.dir(id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(RESULTS_FILE);
        let bytes = serde_json::to_vec_pretty(result).map_err(std::io::Error::other)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Returns the report artifact, writing it on first request.
    pub async fn materialize_report(
        &self,
        id: &AssessmentId,
        result: &AssessmentResult,
    ) -> std::io::Result<Vec<u8>> {
        let path = self.dir(id).join(REPORT_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => return Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        let bytes = serde_json::to_vec_pretty(result).map_err(std::io::Error::other)?;
        tokio::fs::create_dir_all(self.dir(id)).await?;
        tokio::fs::write(&path, &bytes).await?;
        Ok(bytes)
    }

    pub async fn read_manifest(&self, id: &AssessmentId) -> std::io::Result<Manifest> {
        let bytes = tokio::fs::read(self.dir(id).join(MANIFEST_FILE)).await?;
        serde_json::from_slice(&bytes).map_err(std::io::Error::other)
    }
}

/// Download name offered for a report.
pub fn report_file_name(id: &AssessmentId) -> String {
    format!("OTCC_Assessment_Report_{id}.json")
}
