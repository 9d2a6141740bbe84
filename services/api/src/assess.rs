//! One-shot local assessment: register files, run the analyzer in-process, print the outcome.

use clap::Args;
use otcc_assess::config::{AppConfig, ConfigError};
use otcc_assess::error::AppError;
use otcc_assess::telemetry;
use otcc_assess::workflows::assessment::{
    AssessmentId, AssessmentResult, AssessmentService, AssessmentStatus, AssessmentSubmission,
    CompanyDraft, ComplianceStatus, DocumentDraft, DocumentRef, SubprocessAnalyzer,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Company the documents belong to
    #[arg(long)]
    pub(crate) company: String,
    /// Documents to assess (PDF, DOCX, XLSX, TXT, MD, PNG, or JPG)
    #[arg(required = true)]
    pub(crate) files: Vec<PathBuf>,
    /// Override the analyzer timeout in seconds
    #[arg(long)]
    pub(crate) timeout_secs: Option<u64>,
}

pub(crate) async fn run_assessment(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs {
        company,
        files,
        timeout_secs,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(secs) = timeout_secs {
        if secs == 0 {
            return Err(ConfigError::InvalidAnalyzerTimeout {
                value: secs.to_string(),
            }
            .into());
        }
        config.assessment.analyzer_timeout = Duration::from_secs(secs);
    }
    telemetry::init(&config.telemetry)?;

    let service = AssessmentService::from_config(&config.assessment);
    let company = service.registry().create_company(CompanyDraft {
        name: company,
        profile: Default::default(),
    })?;

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let draft = document_draft(&company.id, path)?;
        let document = service.registry().register_document(draft)?;
        println!(
            "- Registered {} ({}, {} bytes)",
            document.original_name,
            document.category.label(),
            document.size
        );
        documents.push(DocumentRef::Id(document.id));
    }

    let submitted = service.submit(AssessmentSubmission {
        company_id: Some(company.id.clone()),
        documents,
    })?;
    let id = submitted.assessment.id.clone();
    println!("\nAssessment {} started for {}", id, company.name);

    wait_for_completion(&service, &id).await?;
    let result = service.results(&id)?;
    render_result(&result);
    println!(
        "\nResults written to {}",
        config
            .assessment
            .assessment_dir
            .join(id.as_str())
            .join("results.json")
            .display()
    );
    Ok(())
}

fn document_draft(
    company_id: &otcc_assess::workflows::assessment::CompanyId,
    path: PathBuf,
) -> Result<DocumentDraft, AppError> {
    let size = std::fs::metadata(&path)?.len();
    let mimetype = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(DocumentDraft {
        company_id: company_id.clone(),
        original_name: file_name(&path),
        path,
        size,
        mimetype,
        category: None,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn wait_for_completion(
    service: &AssessmentService<SubprocessAnalyzer>,
    id: &AssessmentId,
) -> Result<(), AppError> {
    let mut last = None;
    loop {
        let view = service.status(id)?;
        let snapshot = (view.progress, view.message.clone());
        if last.as_ref() != Some(&snapshot) {
            println!("  [{:>3}%] {}", view.progress, view.message);
            last = Some(snapshot);
        }
        if view.status == AssessmentStatus::Completed {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn render_result(result: &AssessmentResult) {
    let compliance = result
        .compliance_status
        .unwrap_or_else(|| ComplianceStatus::from_score(result.overall_score));
    println!(
        "\nOverall score {:.1} ({:?})",
        result.overall_score, compliance
    );

    println!("Domain scores:");
    for entry in &result.domain_scores {
        println!("  - {}: {:.1}", entry.domain, entry.score);
    }

    if !result.findings.is_empty() {
        println!("Findings:");
        for finding in &result.findings {
            println!(
                "  - [{}] {:?} impact: {}",
                finding.control_id, finding.impact, finding.issue
            );
            println!("    Recommendation: {}", finding.recommendation);
        }
    }

    if !result.recommendations.is_empty() {
        println!("Recommendations:");
        for recommendation in &result.recommendations {
            println!(
                "  - {} ({:?} impact / {:?} effort, +{}% compliance)",
                recommendation.title,
                recommendation.impact,
                recommendation.effort,
                recommendation.compliance_improvement
            );
        }
    }
}
