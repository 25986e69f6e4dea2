//! # Transaction Compliance Analyst
//!
//! A deterministic AML/KYC risk assessment engine for financial transactions.
//!
//! ## Features
//!
//! - **Rule Scoring**: Tiered jurisdiction, purpose and counterparty rules with a capped score
//! - **Documentation Checklists**: Required documents derived from the rules that fired
//! - **Escalation Mapping**: Fixed score bands for risk level and operational action
//! - **Narrative**: Rationale, next steps and a processing recommendation
//! - **Reconciliation**: Merges untrusted model-generated verdicts with the rule engine
//!
//! Risk tables and point values are illustrative and carry no regulatory weight.

pub mod assessment;
pub mod catalog;
pub mod checklist;
pub mod config;
pub mod escalation;
pub mod narrative;
pub mod reconcile;
pub mod scoring;

pub use assessment::{DeterministicVerdict, RiskAssessment};
pub use catalog::RuleCatalog;
pub use checklist::{ChecklistItem, DocumentPriority};
pub use config::{AnalystConfig, ModelSettings};
pub use escalation::{EscalationStatus, RiskLevel};
pub use reconcile::{
    parse_model_response, FallbackReason, MergePolicy, ModelOutcome, Reconciliation,
    VerdictSource,
};
pub use scoring::{RuleTrigger, Severity, TriggeredRule};

use reconcile::Reconciler;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Assessment errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AssessmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid rule catalog: {0}")]
    InvalidCatalog(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AssessmentError {
    fn from(e: serde_json::Error) -> Self {
        AssessmentError::Serialization(e.to_string())
    }
}

/// Transaction submitted for assessment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub source_jurisdiction: String,
    pub destination_jurisdiction: String,
    pub purpose: String,
    pub counterparty_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_name: Option<String>,
    #[serde(default)]
    pub is_new_customer: bool,
    #[serde(default, rename = "isPEP")]
    pub is_pep: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_signals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

impl TransactionInput {
    /// Create an input with the required fields; flags default to false
    pub fn new(
        amount: f64,
        currency: impl Into<String>,
        source_jurisdiction: impl Into<String>,
        destination_jurisdiction: impl Into<String>,
        purpose: impl Into<String>,
        counterparty_type: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: None,
            amount,
            currency: currency.into(),
            source_jurisdiction: source_jurisdiction.into(),
            destination_jurisdiction: destination_jurisdiction.into(),
            purpose: purpose.into(),
            counterparty_type: counterparty_type.into(),
            counterparty_name: None,
            is_new_customer: false,
            is_pep: false,
            frequency_signals: None,
            additional_notes: None,
        }
    }

    /// Check the amount invariant. Unknown category values are not errors.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        if !self.amount.is_finite() {
            return Err(AssessmentError::InvalidInput(format!(
                "amount {} is not a finite number",
                self.amount
            )));
        }
        if self.amount < 0.0 {
            return Err(AssessmentError::InvalidInput(format!(
                "amount {} must not be negative",
                self.amount
            )));
        }
        Ok(())
    }

    /// Caller-supplied id, or a freshly generated one
    pub fn resolve_transaction_id(&self) -> String {
        match self.transaction_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_transaction_id(),
        }
    }
}

/// Random identifier of the form `TXN-1A2B3C4D`
pub fn generate_transaction_id() -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("TXN-{}", token[..8].to_uppercase())
}

/// Input that passed validation and is waiting on the model call
#[derive(Debug, Clone)]
pub struct PreparedAssessment {
    pub transaction_id: String,
    pub model: ModelSettings,
}

/// Compliance analyst: runs the rule engine and reconciles model verdicts
#[derive(Debug, Clone)]
pub struct ComplianceAnalyst {
    catalog: Arc<RuleCatalog>,
    config: AnalystConfig,
}

impl ComplianceAnalyst {
    /// Create an analyst with the built-in catalog and default configuration
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(RuleCatalog::default()),
            config: AnalystConfig::default(),
        }
    }

    /// Create an analyst, loading the catalog named by the configuration
    pub fn with_config(config: AnalystConfig) -> Result<Self, AssessmentError> {
        let catalog = config.load_catalog()?;
        Ok(Self {
            catalog: Arc::new(catalog),
            config,
        })
    }

    /// Create an analyst around an explicit catalog
    pub fn with_catalog(
        catalog: RuleCatalog,
        config: AnalystConfig,
    ) -> Result<Self, AssessmentError> {
        catalog.validate()?;
        Ok(Self {
            catalog: Arc::new(catalog),
            config,
        })
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &AnalystConfig {
        &self.config
    }

    /// Run the rule engine only
    pub fn evaluate(
        &self,
        input: &TransactionInput,
    ) -> Result<DeterministicVerdict, AssessmentError> {
        input.validate()?;
        Ok(DeterministicVerdict::compute(&self.catalog, input))
    }

    /// Full assessment from the rule engine, no model involved
    pub fn assess_deterministic(
        &self,
        input: &TransactionInput,
    ) -> Result<RiskAssessment, AssessmentError> {
        let verdict = self.evaluate(input)?;
        let assessment =
            verdict.into_assessment(input.resolve_transaction_id(), chrono::Utc::now());
        info!(
            transaction_id = %assessment.transaction_id,
            score = assessment.risk_score,
            level = %assessment.risk_level,
            escalation = %assessment.escalation_status,
            "deterministic assessment complete"
        );
        Ok(assessment)
    }

    /// Validate input and configuration ahead of the model call
    pub fn prepare(&self, input: &TransactionInput) -> Result<PreparedAssessment, AssessmentError> {
        input.validate()?;
        self.config.model.require_api_key()?;
        Ok(PreparedAssessment {
            transaction_id: input.resolve_transaction_id(),
            model: self.config.model.clone(),
        })
    }

    /// Reconcile the model outcome into the final assessment
    pub fn complete(
        &self,
        prepared: PreparedAssessment,
        input: &TransactionInput,
        outcome: ModelOutcome,
    ) -> Reconciliation {
        let reconciliation = Reconciler::new(&self.catalog, self.config.merge_policy).reconcile(
            input,
            prepared.transaction_id,
            outcome,
        );
        let assessment = &reconciliation.assessment;
        info!(
            transaction_id = %assessment.transaction_id,
            score = assessment.risk_score,
            level = %assessment.risk_level,
            escalation = %assessment.escalation_status,
            source = reconciliation.source.kind(),
            baseline = reconciliation.baseline_fingerprint.as_deref().unwrap_or("-"),
            "assessment complete"
        );
        reconciliation
    }

    /// Prepare and complete in one step
    pub fn assess(
        &self,
        input: &TransactionInput,
        outcome: ModelOutcome,
    ) -> Result<RiskAssessment, AssessmentError> {
        let prepared = self.prepare(input)?;
        Ok(self.complete(prepared, input, outcome).assessment)
    }
}

impl Default for ComplianceAnalyst {
    fn default() -> Self {
        Self::new()
    }
}
