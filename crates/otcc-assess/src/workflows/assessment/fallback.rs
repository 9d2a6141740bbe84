//! Synthetic results used when the analyzer cannot deliver one.
//!
//! Only the scores are random. Findings and recommendations are fixed so downstream
//! consumers see a stable shape.

use chrono::Utc;
use rand::Rng;

use super::domain::{
    AssessmentResult, ComplianceStatus, DomainScore, Effort, Finding, Impact, Recommendation,
};

/// The four OTCC domains with the jitter range applied to each around the overall score.
pub const FALLBACK_DOMAINS: [(&str, i32, i32); 4] = [
    ("Cybersecurity Governance", -10, 15),
    ("Cybersecurity Defense", -15, 5),
    ("Cybersecurity Resilience", -5, 10),
    ("Third-Party Cybersecurity", -25, -5),
];

/// Inclusive bounds of the synthetic overall score.
pub const OVERALL_SCORE_RANGE: (i32, i32) = (40, 59);

const CONTROLS_ASSESSED: u32 = 10;

#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn generate(&self) -> AssessmentResult {
        self.generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> AssessmentResult {
        let overall = rng.gen_range(OVERALL_SCORE_RANGE.0..=OVERALL_SCORE_RANGE.1);

        let domain_scores = FALLBACK_DOMAINS
            .iter()
            .map(|(domain, low, high)| DomainScore {
                domain: (*domain).to_string(),
                score: f64::from((overall + rng.gen_range(*low..=*high)).clamp(0, 100)),
            })
            .collect();

        let overall_score = f64::from(overall);
        AssessmentResult {
            overall_score,
            domain_scores,
            findings: findings(),
            recommendations: recommendations(),
            controls_assessed: Some(CONTROLS_ASSESSED),
            documents_analyzed: None,
            compliance_status: Some(ComplianceStatus::from_score(overall_score)),
            assessment_date: Some(Utc::now().to_rfc3339()),
        }
    }
}

fn findings() -> Vec<Finding> {
    vec![
        Finding {
            control_id: "1-1-3".to_string(),
            domain: "Cybersecurity Governance".to_string(),
            subdomain: Some("Cybersecurity Policies and Procedures".to_string()),
            issue: "No evidence of periodic review for OT/ICS policies".to_string(),
            impact: Impact::High,
            recommendation: "Establish a formal review process for OT/ICS cybersecurity policies"
                .to_string(),
        },
        Finding {
            control_id: "2-11-1".to_string(),
            domain: "Cybersecurity Defense".to_string(),
            subdomain: Some("Cybersecurity Event Logs and Monitoring Management".to_string()),
            issue: "Insufficient cybersecurity event logs and audit trails".to_string(),
            impact: Impact::Critical,
            recommendation: "Implement comprehensive logging across all OT/ICS assets".to_string(),
        },
        Finding {
            control_id: "4-1-1".to_string(),
            domain: "Third-Party Cybersecurity".to_string(),
            subdomain: Some("Third-Party Cybersecurity".to_string()),
            issue: "No formal process for cybersecurity in OT/ICS procurement".to_string(),
            impact: Impact::Medium,
            recommendation: "Establish cybersecurity requirements for OT/ICS vendors".to_string(),
        },
    ]
}

fn recommendations() -> Vec<Recommendation> {
    vec![
        Recommendation {
            title: "Implement Event Logging".to_string(),
            impact: Impact::High,
            effort: Effort::Medium,
            description: "Implement comprehensive logging across all OT/ICS assets and establish centralized monitoring.".to_string(),
            compliance_improvement: 15,
            estimated_cost: Some("$20-30K".to_string()),
            time_to_implement: Some("4-6 weeks".to_string()),
        },
        Recommendation {
            title: "Develop Third-Party Security Program".to_string(),
            impact: Impact::Medium,
            effort: Effort::Medium,
            description: "Establish formal cybersecurity requirements for OT/ICS vendors and implement security assessments.".to_string(),
            compliance_improvement: 10,
            estimated_cost: Some("$15-25K".to_string()),
            time_to_implement: Some("6-8 weeks".to_string()),
        },
        Recommendation {
            title: "Establish Policy Review Process".to_string(),
            impact: Impact::Medium,
            effort: Effort::Low,
            description: "Create a documented review cadence for all OT/ICS cybersecurity policies.".to_string(),
            compliance_improvement: 5,
            estimated_cost: Some("$5-10K".to_string()),
            time_to_implement: Some("2-3 weeks".to_string()),
        },
    ]
}
