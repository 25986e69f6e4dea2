//! Deterministic rule evaluation and scoring
//!
//! Categories are evaluated in a fixed order and each contributes at most one
//! rule. The order is observable: it is the order of `triggered_rules`, and
//! the narrative names the first rules in that order.

use crate::catalog::{RuleCatalog, Tier};
use crate::TransactionInput;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Upper bound of the aggregate score
pub const MAX_SCORE: u8 = 100;

/// Rule severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every rule the scorer can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTrigger {
    HighRiskSourceCountry,
    MediumRiskSourceCountry,
    HighRiskDestinationCountry,
    MediumRiskDestinationCountry,
    HighAmount,
    ElevatedAmount,
    HighRiskPurpose,
    MediumRiskPurpose,
    HighRiskCounterparty,
    PoliticallyExposedPerson,
    NewCustomer,
    Structuring,
}

impl RuleTrigger {
    pub const ALL: [RuleTrigger; 12] = [
        RuleTrigger::HighRiskSourceCountry,
        RuleTrigger::MediumRiskSourceCountry,
        RuleTrigger::HighRiskDestinationCountry,
        RuleTrigger::MediumRiskDestinationCountry,
        RuleTrigger::HighAmount,
        RuleTrigger::ElevatedAmount,
        RuleTrigger::HighRiskPurpose,
        RuleTrigger::MediumRiskPurpose,
        RuleTrigger::HighRiskCounterparty,
        RuleTrigger::PoliticallyExposedPerson,
        RuleTrigger::NewCustomer,
        RuleTrigger::Structuring,
    ];

    pub fn rule_id(&self) -> &'static str {
        match self {
            RuleTrigger::HighRiskSourceCountry => "COUNTRY_HIGH_RISK_SRC",
            RuleTrigger::MediumRiskSourceCountry => "COUNTRY_MEDIUM_RISK_SRC",
            RuleTrigger::HighRiskDestinationCountry => "COUNTRY_HIGH_RISK_DST",
            RuleTrigger::MediumRiskDestinationCountry => "COUNTRY_MEDIUM_RISK_DST",
            RuleTrigger::HighAmount => "AMOUNT_HIGH",
            RuleTrigger::ElevatedAmount => "AMOUNT_ELEVATED",
            RuleTrigger::HighRiskPurpose => "PURPOSE_HIGH_RISK",
            RuleTrigger::MediumRiskPurpose => "PURPOSE_MEDIUM_RISK",
            RuleTrigger::HighRiskCounterparty => "COUNTERPARTY_HIGH_RISK",
            RuleTrigger::PoliticallyExposedPerson => "PEP_FLAG",
            RuleTrigger::NewCustomer => "NEW_CUSTOMER",
            RuleTrigger::Structuring => "STRUCTURING",
        }
    }

    pub fn rule_name(&self) -> &'static str {
        match self {
            RuleTrigger::HighRiskSourceCountry => "High-Risk Source Country",
            RuleTrigger::MediumRiskSourceCountry => "Medium-Risk Source Country",
            RuleTrigger::HighRiskDestinationCountry => "High-Risk Destination Country",
            RuleTrigger::MediumRiskDestinationCountry => "Medium-Risk Destination Country",
            RuleTrigger::HighAmount => "High Transaction Amount",
            RuleTrigger::ElevatedAmount => "Elevated Transaction Amount",
            RuleTrigger::HighRiskPurpose => "High-Risk Transaction Purpose",
            RuleTrigger::MediumRiskPurpose => "Medium-Risk Transaction Purpose",
            RuleTrigger::HighRiskCounterparty => "High-Risk Counterparty Type",
            RuleTrigger::PoliticallyExposedPerson => "Politically Exposed Person",
            RuleTrigger::NewCustomer => "New Customer Flag",
            RuleTrigger::Structuring => "Potential Structuring Detected",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RuleTrigger::NewCustomer => Severity::Low,
            RuleTrigger::MediumRiskSourceCountry
            | RuleTrigger::MediumRiskDestinationCountry
            | RuleTrigger::ElevatedAmount
            | RuleTrigger::MediumRiskPurpose => Severity::Medium,
            RuleTrigger::HighRiskSourceCountry
            | RuleTrigger::HighRiskDestinationCountry
            | RuleTrigger::HighAmount
            | RuleTrigger::HighRiskPurpose
            | RuleTrigger::HighRiskCounterparty => Severity::High,
            RuleTrigger::PoliticallyExposedPerson | RuleTrigger::Structuring => Severity::Critical,
        }
    }

    pub fn from_rule_id(rule_id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.rule_id() == rule_id)
    }
}

/// A rule that fired during evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredRule {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub description: String,
    #[serde(deserialize_with = "whole_number")]
    pub points_added: u32,
}

/// Accepts `20` and `20.0` alike; rejects fractions, negatives and overflow
pub(crate) fn whole_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, found {}",
            value
        )));
    }
    T::try_from(value as u64)
        .map_err(|_| serde::de::Error::custom(format!("{} is out of range", value)))
}

impl TriggeredRule {
    fn from_trigger(trigger: RuleTrigger, description: String, points: u32) -> Self {
        Self {
            rule_id: trigger.rule_id().to_string(),
            rule_name: trigger.rule_name().to_string(),
            severity: trigger.severity(),
            description,
            points_added: points,
        }
    }

    /// The trigger this rule was produced by, if it is one of ours
    pub fn trigger(&self) -> Option<RuleTrigger> {
        RuleTrigger::from_rule_id(&self.rule_id)
    }
}

/// Outcome of rule evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleEvaluation {
    /// Clamped aggregate score (0-100)
    pub score: u8,
    /// Rules in evaluation order
    pub triggered_rules: Vec<TriggeredRule>,
}

impl RuleEvaluation {
    /// Sum of points before clamping
    pub fn raw_points(&self) -> u32 {
        self.triggered_rules
            .iter()
            .fold(0u32, |acc, r| acc.saturating_add(r.points_added))
    }

    pub fn has_triggered(&self, trigger: RuleTrigger) -> bool {
        self.triggered_rules
            .iter()
            .any(|r| r.rule_id == trigger.rule_id())
    }
}

/// Evaluates a transaction against a rule catalog
pub struct ScoringEngine<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(catalog: &'a RuleCatalog) -> Self {
        Self { catalog }
    }

    /// Score a transaction
    pub fn evaluate(&self, input: &TransactionInput) -> RuleEvaluation {
        self.note_unrecognized(input);

        let mut triggered_rules = Vec::new();
        let mut points = 0u32;

        // 1. Source jurisdiction
        if let Some(rule) = self.check_source_jurisdiction(input) {
            points = points.saturating_add(rule.points_added);
            triggered_rules.push(rule);
        }

        // 2. Destination jurisdiction
        if let Some(rule) = self.check_destination_jurisdiction(input) {
            points = points.saturating_add(rule.points_added);
            triggered_rules.push(rule);
        }

        // 3. Amount
        if let Some(rule) = self.check_amount(input) {
            points = points.saturating_add(rule.points_added);
            triggered_rules.push(rule);
        }

        // 4. Purpose
        if let Some(rule) = self.check_purpose(input) {
            points = points.saturating_add(rule.points_added);
            triggered_rules.push(rule);
        }

        // 5. Counterparty type (high tier only)
        if let Some(rule) = self.check_counterparty(input) {
            points = points.saturating_add(rule.points_added);
            triggered_rules.push(rule);
        }

        // 6. Politically exposed person
        if let Some(rule) = self.check_pep(input) {
            points = points.saturating_add(rule.points_added);
            triggered_rules.push(rule);
        }

        // 7. New customer
        if let Some(rule) = self.check_new_customer(input) {
            points = points.saturating_add(rule.points_added);
            triggered_rules.push(rule);
        }

        // 8. Frequency signal
        if let Some(rule) = self.check_structuring(input) {
            points = points.saturating_add(rule.points_added);
            triggered_rules.push(rule);
        }

        for rule in &triggered_rules {
            debug!(rule_id = %rule.rule_id, points = rule.points_added, "rule triggered");
        }

        RuleEvaluation {
            score: points.min(u32::from(MAX_SCORE)) as u8,
            triggered_rules,
        }
    }

    fn check_source_jurisdiction(&self, input: &TransactionInput) -> Option<TriggeredRule> {
        let source = &input.source_jurisdiction;
        let points = &self.catalog.points;
        match self.catalog.source_countries.tier_of(source)? {
            Tier::High => Some(TriggeredRule::from_trigger(
                RuleTrigger::HighRiskSourceCountry,
                format!("Source jurisdiction {} is classified as high-risk", source),
                points.source_high,
            )),
            Tier::Medium => Some(TriggeredRule::from_trigger(
                RuleTrigger::MediumRiskSourceCountry,
                format!("Source jurisdiction {} has elevated AML risk", source),
                points.source_medium,
            )),
        }
    }

    fn check_destination_jurisdiction(&self, input: &TransactionInput) -> Option<TriggeredRule> {
        let destination = &input.destination_jurisdiction;
        let points = &self.catalog.points;
        match self.catalog.destination_countries.tier_of(destination)? {
            Tier::High => Some(TriggeredRule::from_trigger(
                RuleTrigger::HighRiskDestinationCountry,
                format!(
                    "Destination jurisdiction {} is classified as high-risk",
                    destination
                ),
                points.destination_high,
            )),
            Tier::Medium => Some(TriggeredRule::from_trigger(
                RuleTrigger::MediumRiskDestinationCountry,
                format!("Destination jurisdiction {} has elevated AML risk", destination),
                points.destination_medium,
            )),
        }
    }

    fn check_amount(&self, input: &TransactionInput) -> Option<TriggeredRule> {
        let thresholds = &self.catalog.thresholds;
        let points = &self.catalog.points;

        if input.amount >= thresholds.amount_high {
            Some(TriggeredRule::from_trigger(
                RuleTrigger::HighAmount,
                format!(
                    "Transaction amount of {} {} meets the {} high-value threshold",
                    input.amount, input.currency, thresholds.amount_high
                ),
                points.amount_high,
            ))
        } else if input.amount >= thresholds.amount_medium {
            Some(TriggeredRule::from_trigger(
                RuleTrigger::ElevatedAmount,
                format!(
                    "Transaction amount of {} {} meets the {} reporting threshold",
                    input.amount, input.currency, thresholds.amount_medium
                ),
                points.amount_medium,
            ))
        } else {
            None
        }
    }

    fn check_purpose(&self, input: &TransactionInput) -> Option<TriggeredRule> {
        let purpose = &input.purpose;
        let points = &self.catalog.points;
        match self.catalog.purposes.tier_of(purpose)? {
            Tier::High => Some(TriggeredRule::from_trigger(
                RuleTrigger::HighRiskPurpose,
                format!("Transaction purpose \"{}\" is classified as high-risk", purpose),
                points.purpose_high,
            )),
            Tier::Medium => Some(TriggeredRule::from_trigger(
                RuleTrigger::MediumRiskPurpose,
                format!(
                    "Transaction purpose \"{}\" requires additional scrutiny",
                    purpose
                ),
                points.purpose_medium,
            )),
        }
    }

    fn check_counterparty(&self, input: &TransactionInput) -> Option<TriggeredRule> {
        let counterparty_type = &input.counterparty_type;
        if !self.catalog.counterparty_types.is_high_risk(counterparty_type) {
            return None;
        }
        Some(TriggeredRule::from_trigger(
            RuleTrigger::HighRiskCounterparty,
            format!(
                "Counterparty type \"{}\" is classified as high-risk",
                counterparty_type
            ),
            self.catalog.points.counterparty_high,
        ))
    }

    fn check_pep(&self, input: &TransactionInput) -> Option<TriggeredRule> {
        if !input.is_pep {
            return None;
        }
        Some(TriggeredRule::from_trigger(
            RuleTrigger::PoliticallyExposedPerson,
            "Counterparty or beneficial owner is a Politically Exposed Person".to_string(),
            self.catalog.points.pep,
        ))
    }

    fn check_new_customer(&self, input: &TransactionInput) -> Option<TriggeredRule> {
        if !input.is_new_customer {
            return None;
        }
        Some(TriggeredRule::from_trigger(
            RuleTrigger::NewCustomer,
            "Customer has limited transaction history".to_string(),
            self.catalog.points.new_customer,
        ))
    }

    fn check_structuring(&self, input: &TransactionInput) -> Option<TriggeredRule> {
        let signal = input.frequency_signals.as_deref()?;
        if !signal.contains(self.catalog.thresholds.structuring_marker.as_str()) {
            return None;
        }
        Some(TriggeredRule::from_trigger(
            RuleTrigger::Structuring,
            "Multiple transactions just under reporting threshold suggest potential structuring"
                .to_string(),
            self.catalog.points.structuring,
        ))
    }

    fn note_unrecognized(&self, input: &TransactionInput) {
        let vocabulary = &self.catalog.vocabulary;
        let fields = [
            ("source_jurisdiction", &input.source_jurisdiction, &vocabulary.countries),
            (
                "destination_jurisdiction",
                &input.destination_jurisdiction,
                &vocabulary.countries,
            ),
            ("purpose", &input.purpose, &vocabulary.purposes),
            (
                "counterparty_type",
                &input.counterparty_type,
                &vocabulary.counterparty_types,
            ),
            ("currency", &input.currency, &vocabulary.currencies),
        ];
        for (field, value, known) in fields {
            if !known.is_empty() && !known.contains(value.as_str()) {
                debug!(field, value = %value, "value not in catalog vocabulary");
            }
        }

        if let Some(signal) = input.frequency_signals.as_deref() {
            let known = &vocabulary.frequency_signals;
            if !known.is_empty() && !known.contains(signal) {
                debug!(
                    field = "frequency_signals",
                    value = signal,
                    "value not in catalog vocabulary"
                );
            }
        }
    }
}
