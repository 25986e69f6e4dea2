//! Documentation checklist generation

use crate::catalog::{DocumentCategory, DocumentTemplate, RuleCatalog};
use crate::scoring::{RuleTrigger, TriggeredRule};
use crate::TransactionInput;
use serde::{Deserialize, Serialize};

/// Prefix of every checklist item id
pub const CHECKLIST_ID_PREFIX: &str = "DOC-";

/// How strongly a document is asked for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentPriority {
    Mandatory,
    Recommended,
    Optional,
}

impl DocumentPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentPriority::Mandatory => "mandatory",
            DocumentPriority::Recommended => "recommended",
            DocumentPriority::Optional => "optional",
        }
    }
}

/// A document requested from the customer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub document: String,
    pub required: bool,
    pub priority: DocumentPriority,
    pub reason: String,
}

/// Document category a trigger contributes to, if any
pub fn document_category(trigger: RuleTrigger) -> Option<DocumentCategory> {
    match trigger {
        RuleTrigger::HighRiskDestinationCountry => Some(DocumentCategory::HighRiskCountry),
        RuleTrigger::HighAmount => Some(DocumentCategory::HighAmount),
        RuleTrigger::PoliticallyExposedPerson => Some(DocumentCategory::PoliticallyExposedPerson),
        RuleTrigger::NewCustomer => Some(DocumentCategory::NewCustomer),
        RuleTrigger::Structuring => Some(DocumentCategory::Structuring),
        _ => None,
    }
}

/// Expands triggered rules into a documentation checklist
pub struct ChecklistBuilder<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> ChecklistBuilder<'a> {
    pub fn new(catalog: &'a RuleCatalog) -> Self {
        Self { catalog }
    }

    /// Build the checklist. Items are emitted in rule order, after the baseline.
    pub fn build(
        &self,
        triggered_rules: &[TriggeredRule],
        input: &TransactionInput,
    ) -> Vec<ChecklistItem> {
        let mut items = Vec::new();

        for template in &self.catalog.documents.always_required {
            push_item(
                &mut items,
                template,
                true,
                "Standard KYC requirement for all transactions".to_string(),
            );
        }

        for rule in triggered_rules {
            let Some(trigger) = rule.trigger() else {
                continue;
            };
            let Some(category) = document_category(trigger) else {
                continue;
            };

            let reason = reason_for(category, input);
            for template in self.catalog.documents.templates(category) {
                // Onboarding documents are only required when mandatory
                let required = match category {
                    DocumentCategory::NewCustomer => {
                        template.priority == DocumentPriority::Mandatory
                    }
                    _ => true,
                };
                push_item(&mut items, template, required, reason.clone());
            }
        }

        items
    }
}

fn push_item(
    items: &mut Vec<ChecklistItem>,
    template: &DocumentTemplate,
    required: bool,
    reason: String,
) {
    items.push(ChecklistItem {
        id: format!("{}{}", CHECKLIST_ID_PREFIX, items.len() + 1),
        document: template.document.clone(),
        required,
        priority: template.priority,
        reason,
    });
}

fn reason_for(category: DocumentCategory, input: &TransactionInput) -> String {
    match category {
        DocumentCategory::HighRiskCountry => format!(
            "Required for transactions involving high-risk jurisdiction {}",
            input.destination_jurisdiction
        ),
        DocumentCategory::HighAmount => format!(
            "Required for high-value transactions ({} {})",
            input.amount, input.currency
        ),
        DocumentCategory::PoliticallyExposedPerson => match input.counterparty_name.as_deref() {
            Some(name) if !name.trim().is_empty() => {
                format!("Required for transactions involving PEPs ({})", name)
            }
            _ => "Required for transactions involving PEPs".to_string(),
        },
        DocumentCategory::NewCustomer => "Required for new customer onboarding".to_string(),
        DocumentCategory::Structuring => match input.frequency_signals.as_deref() {
            Some(signal) => format!(
                "Required due to potential structuring activity ({})",
                signal
            ),
            None => "Required due to potential structuring activity".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoringEngine;
    use std::collections::HashSet;

    fn create_input() -> TransactionInput {
        TransactionInput::new(
            500.0,
            "USD",
            "United States",
            "United Kingdom",
            "Payroll",
            "Individual Freelancer",
        )
    }

    fn build(catalog: &RuleCatalog, input: &TransactionInput) -> Vec<ChecklistItem> {
        let evaluation = ScoringEngine::new(catalog).evaluate(input);
        ChecklistBuilder::new(catalog).build(&evaluation.triggered_rules, input)
    }

    #[test]
    fn test_baseline_only() {
        let catalog = RuleCatalog::default();
        let items = build(&catalog, &create_input());

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "DOC-1");
        assert_eq!(items[0].document, "Proof of Identity (KYC)");
        assert!(items[0].required);
        assert_eq!(items[0].priority, DocumentPriority::Mandatory);
    }

    #[test]
    fn test_high_risk_destination_documents() {
        let catalog = RuleCatalog::default();
        let mut input = create_input();
        input.destination_jurisdiction = "Myanmar".to_string();

        let items = build(&catalog, &input);

        assert_eq!(items.len(), 4);
        assert_eq!(items[1].document, "Enhanced Due Diligence Report");
        assert!(items[1..].iter().all(|i| i.required));
        assert!(items[1].reason.contains("Myanmar"));
    }

    #[test]
    fn test_high_risk_source_adds_no_documents() {
        let catalog = RuleCatalog::default();
        let mut input = create_input();
        input.source_jurisdiction = "Myanmar".to_string();
        input.amount = 20_000.0;

        let items = build(&catalog, &input);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_new_customer_required_follows_priority() {
        let catalog = RuleCatalog::default();
        let mut input = create_input();
        input.is_new_customer = true;

        let items = build(&catalog, &input);

        assert_eq!(items.len(), 3);
        assert_eq!(items[1].document, "Customer Onboarding Form");
        assert!(items[1].required);
        assert_eq!(items[2].priority, DocumentPriority::Recommended);
        assert!(!items[2].required);
    }

    #[test]
    fn test_recommended_documents_forced_required_outside_onboarding() {
        let mut catalog = RuleCatalog::default();
        catalog.documents.high_amount[1].priority = DocumentPriority::Recommended;
        let mut input = create_input();
        input.amount = 75_000.0;

        let items = build(&catalog, &input);

        assert_eq!(items[2].priority, DocumentPriority::Recommended);
        assert!(items[2].required);
    }

    #[test]
    fn test_order_follows_rules_and_ids_are_sequential() {
        let catalog = RuleCatalog::default();
        let mut input = create_input();
        input.amount = 80_000.0;
        input.destination_jurisdiction = "Iran".to_string();
        input.is_pep = true;
        input.counterparty_name = Some("Minister X".to_string());
        input.is_new_customer = true;
        input.frequency_signals = Some("Multiple sub-10k transfers in 24h".to_string());

        let items = build(&catalog, &input);
        let documents: Vec<&str> = items.iter().map(|i| i.document.as_str()).collect();

        assert_eq!(items.len(), 1 + 3 + 2 + 3 + 2 + 2);
        assert_eq!(documents[1], "Enhanced Due Diligence Report");
        assert_eq!(documents[4], "Source of Funds Statement");
        assert_eq!(documents[6], "PEP Declaration Form");
        assert_eq!(documents[9], "Customer Onboarding Form");
        assert_eq!(documents[11], "Transaction History Explanation");
        assert!(items[6].reason.contains("Minister X"));
        assert!(items[11].reason.contains("sub-10k"));

        for (index, item) in items.iter().enumerate() {
            assert_eq!(item.id, format!("DOC-{}", index + 1));
        }
    }

    #[test]
    fn test_no_deduplication_across_categories() {
        let mut catalog = RuleCatalog::default();
        catalog.documents.structuring = catalog.documents.high_amount.clone();
        let mut input = create_input();
        input.amount = 60_000.0;
        input.frequency_signals = Some("sub-10k".to_string());

        let items = build(&catalog, &input);
        let funds = items
            .iter()
            .filter(|i| i.document == "Source of Funds Statement")
            .count();
        assert_eq!(funds, 2);

        let ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), items.len());
    }

    #[test]
    fn test_foreign_rules_ignored() {
        let catalog = RuleCatalog::default();
        let foreign = TriggeredRule {
            rule_id: "ROUND_TRIP".to_string(),
            rule_name: "Round Trip".to_string(),
            severity: crate::scoring::Severity::High,
            description: "Round-trip transactions detected".to_string(),
            points_added: 25,
        };

        let items = ChecklistBuilder::new(&catalog).build(&[foreign], &create_input());
        assert_eq!(items.len(), 1);
    }
}
