use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

opaque_id!(
    /// Identifier for one assessment run.
    AssessmentId
);
opaque_id!(
    /// Identifier for the company an assessment or document belongs to.
    CompanyId
);
opaque_id!(DocumentId);
opaque_id!(FacilityId);

/// Fixed categories a supporting document may be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    Policy,
    Procedure,
    Architecture,
    Inventory,
    Logs,
    Other,
}

impl DocumentCategory {
    /// Infers a category from keywords in the original file name.
    pub fn infer(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        if lower.contains("policy") {
            Self::Policy
        } else if lower.contains("procedure") {
            Self::Procedure
        } else if lower.contains("diagram") || lower.contains("arch") {
            Self::Architecture
        } else if lower.contains("invent") {
            Self::Inventory
        } else if lower.contains("log") {
            Self::Logs
        } else {
            Self::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Policy => "Policy",
            Self::Procedure => "Procedure",
            Self::Architecture => "Architecture",
            Self::Inventory => "Inventory",
            Self::Logs => "Logs",
            Self::Other => "Other",
        }
    }
}

/// Supporting evidence supplied by the upload layer. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub path: PathBuf,
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
    pub category: DocumentCategory,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Queued,
    Processing,
    Completed,
}

/// Live record for one assessment. `status == Completed` iff `result` is present iff
/// `progress == 100`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: AssessmentId,
    pub company_id: CompanyId,
    pub document_ids: Vec<DocumentId>,
    pub status: AssessmentStatus,
    pub progress: u8,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<AssessmentResult>,
}

impl Assessment {
    pub fn is_completed(&self) -> bool {
        self.status == AssessmentStatus::Completed
    }

    pub fn status_view(&self) -> AssessmentStatusView {
        AssessmentStatusView {
            id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Poll payload served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStatusView {
    pub id: AssessmentId,
    pub status: AssessmentStatus,
    pub progress: u8,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
    #[serde(rename = "Partially Compliant")]
    PartiallyCompliant,
    Compliant,
}

impl ComplianceStatus {
    pub fn from_score(score: f64) -> Self {
        if score < 50.0 {
            Self::NonCompliant
        } else {
            Self::PartiallyCompliant
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainScore {
    pub domain: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub control_id: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    pub issue: String,
    pub impact: Impact,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub impact: Impact,
    pub effort: Effort,
    pub description: String,
    pub compliance_improvement: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_implement: Option<String>,
}

/// Outcome of one assessment, produced either by the analyzer or by the fallback generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub overall_score: f64,
    pub domain_scores: Vec<DomainScore>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls_assessed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_analyzed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_status: Option<ComplianceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_date: Option<String>,
}

impl AssessmentResult {
    /// Rejects results whose scores fall outside 0-100.
    pub fn validate(&self) -> Result<(), String> {
        check_score("overallScore", self.overall_score)?;
        for entry in &self.domain_scores {
            check_score(&format!("domain score for '{}'", entry.domain), entry.score)?;
        }
        for recommendation in &self.recommendations {
            if recommendation.compliance_improvement > 100 {
                return Err(format!(
                    "complianceImprovement for '{}' exceeds 100",
                    recommendation.title
                ));
            }
        }
        Ok(())
    }
}

fn check_score(label: &str, score: f64) -> Result<(), String> {
    if score.is_finite() && (0.0..=100.0).contains(&score) {
        Ok(())
    } else {
        Err(format!("{label} {score} is outside 0-100"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_categories_from_file_names() {
        assert_eq!(
            DocumentCategory::infer("OT-Security-Policy-v3.pdf"),
            DocumentCategory::Policy
        );
        assert_eq!(
            DocumentCategory::infer("incident_procedure.docx"),
            DocumentCategory::Procedure
        );
        assert_eq!(
            DocumentCategory::infer("plant_network_diagram.png"),
            DocumentCategory::Architecture
        );
        assert_eq!(
            DocumentCategory::infer("ArchOverview.md"),
            DocumentCategory::Architecture
        );
        assert_eq!(
            DocumentCategory::infer("asset_inventory.xlsx"),
            DocumentCategory::Inventory
        );
        assert_eq!(DocumentCategory::infer("firewall.log.txt"), DocumentCategory::Logs);
        assert_eq!(DocumentCategory::infer("notes.txt"), DocumentCategory::Other);
    }

    #[test]
    fn parses_analyzer_result_payload() {
        let raw = r#"{
            "overallScore": 62.5,
            "domainScores": [{"domain": "Cybersecurity Governance", "score": 70}],
            "findings": [{
                "controlId": "1-1-3",
                "domain": "Cybersecurity Governance",
                "subdomain": "Cybersecurity Policies and Procedures",
                "issue": "No periodic review",
                "impact": "High",
                "recommendation": "Review annually"
            }],
            "recommendations": [{
                "title": "Review policies",
                "impact": "Medium",
                "effort": "Medium",
                "description": "Create a review cadence",
                "complianceImprovement": 5
            }],
            "controlsAssessed": 6,
            "documentsAnalyzed": 2,
            "complianceStatus": "Partially Compliant",
            "assessmentDate": "2025-10-01T12:00:00"
        }"#;

        let result: AssessmentResult = serde_json::from_str(raw).expect("payload parses");
        assert_eq!(result.findings[0].impact, Impact::High);
        assert_eq!(
            result.compliance_status,
            Some(ComplianceStatus::PartiallyCompliant)
        );
        assert!(result.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_scores() {
        let result = AssessmentResult {
            overall_score: 104.0,
            domain_scores: Vec::new(),
            findings: Vec::new(),
            recommendations: Vec::new(),
            controls_assessed: None,
            documents_analyzed: None,
            compliance_status: None,
            assessment_date: None,
        };
        let err = result.validate().expect_err("score above 100 rejected");
        assert!(err.contains("overallScore"));
    }

    #[test]
    fn status_view_serializes_camel_case() {
        let assessment = Assessment {
            id: AssessmentId::from("a-1"),
            company_id: CompanyId::from("c-1"),
            document_ids: vec![DocumentId::from("d-1")],
            status: AssessmentStatus::Processing,
            progress: 40,
            message: "Analyzing document 2 of 3".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            result: None,
        };

        let json = serde_json::to_value(assessment.status_view()).expect("serializes");
        assert_eq!(json["status"], "processing");
        assert_eq!(json["progress"], 40);
        assert!(json["completedAt"].is_null());
        assert!(json.get("startedAt").is_some());
    }
}
