//! Reconciliation of model-generated verdicts with the deterministic baseline
//!
//! A candidate that matches the output contract is taken as-is. Anything
//! else is merged field by field over the deterministic verdict: a field the
//! candidate supplies (present, non-empty and of the right type) wins, every
//! other field comes from the rule engine. Transaction id and timestamp are
//! always assigned here.

use crate::assessment::{DeterministicVerdict, RiskAssessment};
use crate::catalog::RuleCatalog;
use crate::checklist::{ChecklistItem, DocumentPriority};
use crate::escalation::{EscalationResolver, EscalationStatus, RiskLevel};
use crate::scoring::{whole_number, TriggeredRule, MAX_SCORE};
use crate::TransactionInput;
use chrono::Utc;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// What came back from the external model call
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    /// Response parsed as JSON; shape not yet checked
    Parsed(Value),
    /// Response text was not valid JSON
    ParseFailed { reason: String },
    /// The call itself failed
    CallFailed { reason: String },
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)\A(?:```(?:json)?)?\s*(.*?)\s*(?:```)?\s*\z")
            .expect("code fence pattern is valid")
    })
}

/// Parse raw model text; an opening or closing markdown fence is stripped
pub fn parse_model_response(raw: &str) -> ModelOutcome {
    let trimmed = raw.trim();
    let body = code_fence()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    if body.is_empty() {
        return ModelOutcome::ParseFailed {
            reason: "model returned empty content".to_string(),
        };
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => ModelOutcome::Parsed(value),
        Err(e) => ModelOutcome::ParseFailed {
            reason: e.to_string(),
        },
    }
}

/// How far to trust a merged verdict
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Take supplied fields without checking the result as a whole
    #[default]
    Lenient,
    /// Reject any final verdict that breaks the assessment invariants
    Strict,
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(MergePolicy::Lenient),
            "strict" => Ok(MergePolicy::Strict),
            other => Err(format!("unknown merge policy '{}'", other)),
        }
    }
}

/// Why the deterministic verdict was used in full
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FallbackReason {
    CallFailed(String),
    ParseFailed(String),
    /// Candidate failed shape validation and supplied no usable field
    ShapeInvalid(String),
    /// Strict policy found the reconciled verdict inconsistent
    InvariantViolations(Vec<String>),
}

/// Where the final verdict came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerdictSource {
    External,
    Merged {
        overridden: Vec<String>,
        shape_error: String,
    },
    Deterministic {
        reason: FallbackReason,
    },
}

impl VerdictSource {
    pub fn kind(&self) -> &'static str {
        match self {
            VerdictSource::External => "external",
            VerdictSource::Merged { .. } => "merged",
            VerdictSource::Deterministic { .. } => "deterministic",
        }
    }
}

/// Final verdict plus how it was reached
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub assessment: RiskAssessment,
    pub source: VerdictSource,
    /// Fingerprint of the deterministic verdict, when one was computed
    pub baseline_fingerprint: Option<String>,
}

/// The output contract as a model must supply it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateAssessment {
    #[allow(dead_code)]
    transaction_id: String,
    #[allow(dead_code)]
    timestamp: String,
    #[serde(deserialize_with = "whole_number")]
    risk_score: u8,
    risk_level: RiskLevel,
    triggered_rules: Vec<TriggeredRule>,
    rationale: String,
    checklist_items: Vec<ChecklistItem>,
    escalation_status: EscalationStatus,
    next_steps: Vec<String>,
    processing_recommendation: String,
}

/// `riskScore` as supplied on its own during a merge
struct SuppliedScore(u8);

impl<'de> Deserialize<'de> for SuppliedScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        whole_number(deserializer).map(SuppliedScore)
    }
}

fn validate_shape(candidate: &Value) -> Result<CandidateAssessment, String> {
    let parsed: CandidateAssessment =
        serde_json::from_value(candidate.clone()).map_err(|e| e.to_string())?;
    if parsed.risk_score > MAX_SCORE {
        return Err(format!(
            "riskScore {} outside 0..={}",
            parsed.risk_score, MAX_SCORE
        ));
    }
    Ok(parsed)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Typed value of a candidate field, if it is present and usable
fn supplied<T: DeserializeOwned>(
    fields: Option<&Map<String, Value>>,
    key: &str,
    overridden: &mut Vec<String>,
) -> Option<T> {
    let value = fields?.get(key)?;
    if is_blank(value) {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(typed) => {
            overridden.push(key.to_string());
            Some(typed)
        }
        Err(e) => {
            debug!(field = key, error = %e, "candidate field unusable");
            None
        }
    }
}

/// Merges model candidates with the deterministic verdict
pub struct Reconciler<'a> {
    catalog: &'a RuleCatalog,
    policy: MergePolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(catalog: &'a RuleCatalog, policy: MergePolicy) -> Self {
        Self { catalog, policy }
    }

    /// Produce the final verdict for `input`
    pub fn reconcile(
        &self,
        input: &TransactionInput,
        transaction_id: String,
        outcome: ModelOutcome,
    ) -> Reconciliation {
        let candidate = match outcome {
            ModelOutcome::Parsed(value) => value,
            ModelOutcome::ParseFailed { reason } => {
                warn!(transaction_id = %transaction_id, %reason, "model response unparseable");
                return self.fallback(input, transaction_id, FallbackReason::ParseFailed(reason));
            }
            ModelOutcome::CallFailed { reason } => {
                warn!(transaction_id = %transaction_id, %reason, "model call failed");
                return self.fallback(input, transaction_id, FallbackReason::CallFailed(reason));
            }
        };

        match validate_shape(&candidate) {
            Ok(valid) => {
                let assessment = RiskAssessment {
                    transaction_id,
                    timestamp: Utc::now(),
                    risk_score: valid.risk_score,
                    risk_level: valid.risk_level,
                    triggered_rules: valid.triggered_rules,
                    rationale: valid.rationale,
                    checklist_items: valid.checklist_items,
                    escalation_status: valid.escalation_status,
                    next_steps: valid.next_steps,
                    processing_recommendation: valid.processing_recommendation,
                };
                self.enforce_policy(input, assessment, VerdictSource::External, None)
            }
            Err(shape_error) => {
                warn!(
                    transaction_id = %transaction_id,
                    error = %shape_error,
                    "model response failed shape validation"
                );
                self.merge(input, transaction_id, &candidate, shape_error)
            }
        }
    }

    fn merge(
        &self,
        input: &TransactionInput,
        transaction_id: String,
        candidate: &Value,
        shape_error: String,
    ) -> Reconciliation {
        let baseline = DeterministicVerdict::compute(self.catalog, input);
        let fingerprint = baseline.fingerprint();
        let fields = candidate.as_object();
        let mut overridden = Vec::new();

        let assessment = RiskAssessment {
            risk_score: supplied(fields, "riskScore", &mut overridden)
                .map(|SuppliedScore(score)| score)
                .unwrap_or(baseline.score),
            risk_level: supplied(fields, "riskLevel", &mut overridden)
                .unwrap_or(baseline.risk_level),
            triggered_rules: supplied(fields, "triggeredRules", &mut overridden)
                .unwrap_or(baseline.triggered_rules),
            rationale: supplied(fields, "rationale", &mut overridden)
                .unwrap_or(baseline.narrative.rationale),
            checklist_items: supplied(fields, "checklistItems", &mut overridden)
                .unwrap_or(baseline.checklist_items),
            escalation_status: supplied(fields, "escalationStatus", &mut overridden)
                .unwrap_or(baseline.escalation_status),
            next_steps: supplied(fields, "nextSteps", &mut overridden)
                .unwrap_or(baseline.narrative.next_steps),
            processing_recommendation: supplied(fields, "processingRecommendation", &mut overridden)
                .unwrap_or(baseline.narrative.processing_recommendation),
            transaction_id,
            timestamp: Utc::now(),
        };

        debug!(
            transaction_id = %assessment.transaction_id,
            baseline = %fingerprint,
            overridden = ?overridden,
            "merged candidate over deterministic verdict"
        );

        let source = if overridden.is_empty() {
            VerdictSource::Deterministic {
                reason: FallbackReason::ShapeInvalid(shape_error),
            }
        } else {
            VerdictSource::Merged {
                overridden,
                shape_error,
            }
        };
        self.enforce_policy(input, assessment, source, Some(fingerprint))
    }

    fn enforce_policy(
        &self,
        input: &TransactionInput,
        assessment: RiskAssessment,
        source: VerdictSource,
        baseline_fingerprint: Option<String>,
    ) -> Reconciliation {
        if self.policy == MergePolicy::Strict {
            let violations = self.invariant_violations(&assessment);
            if !violations.is_empty() {
                warn!(
                    transaction_id = %assessment.transaction_id,
                    violations = ?violations,
                    "reconciled verdict rejected by strict policy"
                );
                return self.fallback(
                    input,
                    assessment.transaction_id,
                    FallbackReason::InvariantViolations(violations),
                );
            }
        }

        Reconciliation {
            assessment,
            source,
            baseline_fingerprint,
        }
    }

    fn fallback(
        &self,
        input: &TransactionInput,
        transaction_id: String,
        reason: FallbackReason,
    ) -> Reconciliation {
        let baseline = DeterministicVerdict::compute(self.catalog, input);
        let fingerprint = baseline.fingerprint();
        Reconciliation {
            assessment: baseline.into_assessment(transaction_id, Utc::now()),
            source: VerdictSource::Deterministic { reason },
            baseline_fingerprint: Some(fingerprint),
        }
    }

    /// Invariants every deterministic verdict satisfies
    pub fn invariant_violations(&self, assessment: &RiskAssessment) -> Vec<String> {
        let mut violations = Vec::new();
        let resolver = EscalationResolver::new(self.catalog);

        if assessment.risk_score > MAX_SCORE {
            violations.push(format!("riskScore {} exceeds {}", assessment.risk_score, MAX_SCORE));
        } else if !resolver.is_consistent(
            assessment.risk_score,
            assessment.risk_level,
            assessment.escalation_status,
        ) {
            let (level, status) = resolver.resolve(assessment.risk_score);
            if assessment.risk_level != level {
                violations.push(format!(
                    "riskLevel {} inconsistent with score {} (expected {})",
                    assessment.risk_level, assessment.risk_score, level
                ));
            }
            if assessment.escalation_status != status {
                violations.push(format!(
                    "escalationStatus {} inconsistent with score {} (expected {})",
                    assessment.escalation_status, assessment.risk_score, status
                ));
            }
        }

        for baseline in &self.catalog.documents.always_required {
            let present = assessment.checklist_items.iter().any(|item| {
                item.document == baseline.document
                    && item.required
                    && item.priority == DocumentPriority::Mandatory
            });
            if !present {
                violations.push(format!("checklist lacks mandatory '{}'", baseline.document));
            }
        }

        let mut seen = HashSet::new();
        for item in &assessment.checklist_items {
            if !seen.insert(item.id.as_str()) {
                violations.push(format!("duplicate checklist id {}", item.id));
            }
        }

        violations
    }
}
