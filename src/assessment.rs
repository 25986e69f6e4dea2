//! Assessment output and the deterministic pipeline that produces it

use crate::catalog::RuleCatalog;
use crate::checklist::{ChecklistBuilder, ChecklistItem, DocumentPriority};
use crate::escalation::{EscalationResolver, EscalationStatus, RiskLevel};
use crate::narrative::{Narrative, NarrativeGenerator};
use crate::scoring::{ScoringEngine, TriggeredRule};
use crate::TransactionInput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Final verdict returned for a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub triggered_rules: Vec<TriggeredRule>,
    pub rationale: String,
    pub checklist_items: Vec<ChecklistItem>,
    pub escalation_status: EscalationStatus,
    pub next_steps: Vec<String>,
    pub processing_recommendation: String,
}

impl RiskAssessment {
    /// Documents that must be collected before processing
    pub fn mandatory_documents(&self) -> Vec<&ChecklistItem> {
        self.checklist_items
            .iter()
            .filter(|i| i.required && i.priority == DocumentPriority::Mandatory)
            .collect()
    }

    /// Check if the transaction may proceed without compliance review
    pub fn is_cleared(&self) -> bool {
        self.escalation_status == EscalationStatus::ProceedStandard
    }

    /// Export as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Verdict computed purely from the rule catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeterministicVerdict {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub escalation_status: EscalationStatus,
    pub triggered_rules: Vec<TriggeredRule>,
    pub checklist_items: Vec<ChecklistItem>,
    pub narrative: Narrative,
}

impl DeterministicVerdict {
    /// Run scoring, checklist, escalation and narrative in order
    pub fn compute(catalog: &RuleCatalog, input: &TransactionInput) -> Self {
        let evaluation = ScoringEngine::new(catalog).evaluate(input);
        let checklist_items =
            ChecklistBuilder::new(catalog).build(&evaluation.triggered_rules, input);
        let (risk_level, escalation_status) =
            EscalationResolver::new(catalog).resolve(evaluation.score);
        let narrative = NarrativeGenerator::generate(
            risk_level,
            escalation_status,
            evaluation.score,
            &evaluation.triggered_rules,
        );

        Self {
            score: evaluation.score,
            risk_level,
            escalation_status,
            triggered_rules: evaluation.triggered_rules,
            checklist_items,
            narrative,
        }
    }

    /// SHA-256 over score, triggered rules and checklist, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update([self.score]);
        for rule in &self.triggered_rules {
            hasher.update(rule.rule_id.as_bytes());
            hasher.update([0u8]);
            hasher.update(rule.points_added.to_be_bytes());
        }
        hasher.update([0xffu8]);
        for item in &self.checklist_items {
            hasher.update(item.id.as_bytes());
            hasher.update([0u8]);
            hasher.update(item.document.as_bytes());
            hasher.update([0u8]);
            hasher.update(item.priority.as_str().as_bytes());
            hasher.update([u8::from(item.required)]);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn into_assessment(
        self,
        transaction_id: String,
        timestamp: DateTime<Utc>,
    ) -> RiskAssessment {
        RiskAssessment {
            transaction_id,
            timestamp,
            risk_score: self.score,
            risk_level: self.risk_level,
            triggered_rules: self.triggered_rules,
            rationale: self.narrative.rationale,
            checklist_items: self.checklist_items,
            escalation_status: self.escalation_status,
            next_steps: self.narrative.next_steps,
            processing_recommendation: self.narrative.processing_recommendation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input() -> TransactionInput {
        let mut input = TransactionInput::new(
            15_000.0,
            "EUR",
            "Malta",
            "Germany",
            "Trade Finance",
            "Medium Enterprise",
        );
        input.is_pep = true;
        input
    }

    #[test]
    fn test_compute_pipeline() {
        let catalog = RuleCatalog::default();
        let verdict = DeterministicVerdict::compute(&catalog, &create_input());

        // Malta 12 + elevated amount 10 + trade finance 10 + PEP 25
        assert_eq!(verdict.score, 57);
        assert_eq!(verdict.risk_level, RiskLevel::High);
        assert_eq!(verdict.escalation_status, EscalationStatus::EscalateLevel2);
        assert_eq!(verdict.triggered_rules.len(), 4);
        assert_eq!(verdict.checklist_items.len(), 4);
        assert!(verdict.narrative.rationale.contains("HIGH risk (score: 57/100)"));
        assert!(verdict
            .narrative
            .rationale
            .contains("Additionally, 1 other risk factors were identified."));
    }

    #[test]
    fn test_repeatable() {
        let catalog = RuleCatalog::default();
        let input = create_input();

        let first = DeterministicVerdict::compute(&catalog, &input);
        let second = DeterministicVerdict::compute(&catalog, &input);

        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_inputs() {
        let catalog = RuleCatalog::default();
        let mut input = create_input();
        let baseline = DeterministicVerdict::compute(&catalog, &input).fingerprint();

        input.is_new_customer = true;
        let changed = DeterministicVerdict::compute(&catalog, &input).fingerprint();

        assert_ne!(baseline, changed);
    }

    #[test]
    fn test_into_assessment() {
        let catalog = RuleCatalog::default();
        let verdict = DeterministicVerdict::compute(&catalog, &create_input());
        let now = Utc::now();

        let assessment = verdict.clone().into_assessment("TXN-TEST".to_string(), now);

        assert_eq!(assessment.transaction_id, "TXN-TEST");
        assert_eq!(assessment.timestamp, now);
        assert_eq!(assessment.risk_score, verdict.score);
        assert_eq!(assessment.rationale, verdict.narrative.rationale);
        assert_eq!(assessment.mandatory_documents().len(), 4);
        assert!(!assessment.is_cleared());
    }

    #[test]
    fn test_json_export() {
        let catalog = RuleCatalog::default();
        let assessment = DeterministicVerdict::compute(&catalog, &create_input())
            .into_assessment("TXN-JSON".to_string(), Utc::now());

        let json = assessment.to_json().unwrap();
        assert!(json.contains("\"transactionId\": \"TXN-JSON\""));
        assert!(json.contains("\"escalationStatus\": \"escalate_level_2\""));
        assert!(json.contains("\"checklistItems\""));

        let parsed: RiskAssessment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, assessment);
    }
}
