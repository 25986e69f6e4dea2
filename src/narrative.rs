//! Rationale and next-step text for an assessment

use crate::escalation::{EscalationStatus, RiskLevel};
use crate::scoring::TriggeredRule;
use serde::{Deserialize, Serialize};

/// Number of rules named in the rationale
pub const RATIONALE_RULE_LIMIT: usize = 3;

const NO_RISK_RATIONALE: &str =
    "This transaction has been assessed as LOW risk with no significant risk factors identified.";

const LOW_RISK_STEPS: &[&str] = &[
    "Complete standard verification checks",
    "Process transaction within normal SLA",
];

const MEDIUM_RISK_STEPS: &[&str] = &[
    "Complete enhanced due diligence review",
    "Verify all required documentation",
    "Document review findings before approval",
];

const ELEVATED_RISK_STEPS: &[&str] = &[
    "Escalate to senior compliance officer",
    "Collect all mandatory documentation",
    "Consider filing SAR if warranted",
    "Do not process until full review complete",
];

/// Human-readable part of an assessment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Narrative {
    pub rationale: String,
    pub next_steps: Vec<String>,
    pub processing_recommendation: String,
}

/// Produces rationale, next steps and processing recommendation
pub struct NarrativeGenerator;

impl NarrativeGenerator {
    pub fn generate(
        risk_level: RiskLevel,
        escalation_status: EscalationStatus,
        score: u8,
        triggered_rules: &[TriggeredRule],
    ) -> Narrative {
        Narrative {
            rationale: Self::rationale(risk_level, score, triggered_rules),
            next_steps: Self::next_steps(risk_level),
            processing_recommendation: Self::processing_recommendation(
                risk_level,
                escalation_status,
            ),
        }
    }

    /// Names the first rules in evaluation order and counts the rest
    pub fn rationale(
        risk_level: RiskLevel,
        score: u8,
        triggered_rules: &[TriggeredRule],
    ) -> String {
        if triggered_rules.is_empty() {
            return NO_RISK_RATIONALE.to_string();
        }

        let shown = triggered_rules.len().min(RATIONALE_RULE_LIMIT);
        let named = triggered_rules[..shown]
            .iter()
            .map(|r| r.rule_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut rationale = format!(
            "This transaction has been assessed as {} risk (score: {}/100) due to: {}.",
            risk_level.as_str().to_uppercase(),
            score,
            named
        );

        let remaining = triggered_rules.len() - shown;
        if remaining > 0 {
            rationale.push_str(&format!(
                " Additionally, {} other risk factors were identified.",
                remaining
            ));
        }
        rationale
    }

    pub fn next_steps(risk_level: RiskLevel) -> Vec<String> {
        let steps = match risk_level {
            RiskLevel::Low => LOW_RISK_STEPS,
            RiskLevel::Medium => MEDIUM_RISK_STEPS,
            RiskLevel::High | RiskLevel::Critical => ELEVATED_RISK_STEPS,
        };
        steps.iter().map(|s| s.to_string()).collect()
    }

    pub fn processing_recommendation(
        risk_level: RiskLevel,
        escalation_status: EscalationStatus,
    ) -> String {
        format!(
            "{} RISK: {}",
            risk_level.as_str().to_uppercase(),
            escalation_status.humanized()
        )
    }
}
