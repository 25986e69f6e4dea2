//! Rule catalog for compliance risk assessment
//!
//! Holds the risk-tiered value lists, point weights, amount thresholds,
//! score bands and document templates consulted by every assessment stage.
//! A catalog is built once, validated, and shared read-only afterwards.

use crate::checklist::DocumentPriority;
use crate::AssessmentError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Tier a value occupies within one risk dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    High,
    Medium,
}

/// High and medium risk lists for one dimension
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskTiers {
    pub high: HashSet<String>,
    pub medium: HashSet<String>,
}

impl RiskTiers {
    pub fn new(high: &[&str], medium: &[&str]) -> Self {
        Self {
            high: high.iter().map(|v| v.to_string()).collect(),
            medium: medium.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Look up a value; the high list is consulted first and wins
    pub fn tier_of(&self, value: &str) -> Option<Tier> {
        if self.high.contains(value) {
            Some(Tier::High)
        } else if self.medium.contains(value) {
            Some(Tier::Medium)
        } else {
            None
        }
    }

    pub fn is_high_risk(&self, value: &str) -> bool {
        self.high.contains(value)
    }

    fn overlap(&self) -> Vec<&str> {
        let mut shared: Vec<&str> = self
            .high
            .intersection(&self.medium)
            .map(String::as_str)
            .collect();
        shared.sort_unstable();
        shared
    }
}

/// Points added per triggered risk factor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskPoints {
    pub source_high: u32,
    pub source_medium: u32,
    pub destination_high: u32,
    pub destination_medium: u32,
    pub amount_high: u32,
    pub amount_medium: u32,
    pub purpose_high: u32,
    pub purpose_medium: u32,
    pub counterparty_high: u32,
    /// Catalogued but never evaluated by the deterministic scorer
    pub counterparty_medium: u32,
    pub pep: u32,
    pub new_customer: u32,
    pub structuring: u32,
}

impl Default for RiskPoints {
    fn default() -> Self {
        Self {
            source_high: 25,
            source_medium: 12,
            destination_high: 20,
            destination_medium: 10,
            amount_high: 20,
            amount_medium: 10,
            purpose_high: 20,
            purpose_medium: 10,
            counterparty_high: 20,
            counterparty_medium: 8,
            pep: 25,
            new_customer: 10,
            structuring: 30,
        }
    }
}

/// Amount thresholds and pattern markers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    /// Inclusive lower bound of the high-amount band
    pub amount_high: f64,
    /// Inclusive lower bound of the elevated-amount band
    pub amount_medium: f64,
    /// Substring of the frequency signal that indicates structuring
    pub structuring_marker: String,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            amount_high: 50_000.0,
            amount_medium: 10_000.0,
            structuring_marker: "sub-10k".to_string(),
        }
    }
}

/// Upper bounds (inclusive) of the risk level bands; anything above is critical
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskLevelBands {
    pub low_max: u8,
    pub medium_max: u8,
    pub high_max: u8,
}

impl Default for RiskLevelBands {
    fn default() -> Self {
        Self {
            low_max: 25,
            medium_max: 50,
            high_max: 75,
        }
    }
}

/// Upper bounds (inclusive) of the escalation bands; anything above blocks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscalationBands {
    pub proceed_standard_max: u8,
    pub enhanced_due_diligence_max: u8,
    pub escalate_level_2_max: u8,
    pub escalate_level_3_max: u8,
}

impl Default for EscalationBands {
    fn default() -> Self {
        Self {
            proceed_standard_max: 25,
            enhanced_due_diligence_max: 50,
            escalate_level_2_max: 75,
            escalate_level_3_max: 90,
        }
    }
}

/// A document a trigger category asks for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentTemplate {
    pub document: String,
    pub priority: DocumentPriority,
}

impl DocumentTemplate {
    fn mandatory(document: &str) -> Self {
        Self {
            document: document.to_string(),
            priority: DocumentPriority::Mandatory,
        }
    }

    fn recommended(document: &str) -> Self {
        Self {
            document: document.to_string(),
            priority: DocumentPriority::Recommended,
        }
    }
}

/// Trigger categories that contribute documents to the checklist
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentCategory {
    HighRiskCountry,
    HighAmount,
    PoliticallyExposedPerson,
    NewCustomer,
    Structuring,
}

/// Document templates keyed by trigger category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRequirements {
    /// Baseline identity documents present on every checklist
    pub always_required: Vec<DocumentTemplate>,
    pub high_risk_country: Vec<DocumentTemplate>,
    pub high_amount: Vec<DocumentTemplate>,
    pub politically_exposed_person: Vec<DocumentTemplate>,
    pub new_customer: Vec<DocumentTemplate>,
    pub structuring: Vec<DocumentTemplate>,
}

impl DocumentRequirements {
    pub fn templates(&self, category: DocumentCategory) -> &[DocumentTemplate] {
        match category {
            DocumentCategory::HighRiskCountry => &self.high_risk_country,
            DocumentCategory::HighAmount => &self.high_amount,
            DocumentCategory::PoliticallyExposedPerson => &self.politically_exposed_person,
            DocumentCategory::NewCustomer => &self.new_customer,
            DocumentCategory::Structuring => &self.structuring,
        }
    }
}

impl Default for DocumentRequirements {
    fn default() -> Self {
        Self {
            always_required: vec![DocumentTemplate::mandatory("Proof of Identity (KYC)")],
            high_risk_country: vec![
                DocumentTemplate::mandatory("Enhanced Due Diligence Report"),
                DocumentTemplate::mandatory("Proof of Residency"),
                DocumentTemplate::mandatory("Purpose of Transaction Declaration"),
            ],
            high_amount: vec![
                DocumentTemplate::mandatory("Source of Funds Statement"),
                DocumentTemplate::mandatory("Bank Statement (last 3 months)"),
            ],
            politically_exposed_person: vec![
                DocumentTemplate::mandatory("PEP Declaration Form"),
                DocumentTemplate::mandatory("Enhanced Source of Wealth Documentation"),
                DocumentTemplate::mandatory("Senior Management Approval"),
            ],
            new_customer: vec![
                DocumentTemplate::mandatory("Customer Onboarding Form"),
                DocumentTemplate::recommended("Reference from Existing Customer/Bank"),
            ],
            structuring: vec![
                DocumentTemplate::mandatory("Transaction History Explanation"),
                DocumentTemplate::mandatory("Suspicious Activity Report (internal)"),
            ],
        }
    }
}

/// Values the intake layer is expected to offer. Only used for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vocabulary {
    pub countries: HashSet<String>,
    pub purposes: HashSet<String>,
    pub counterparty_types: HashSet<String>,
    pub currencies: HashSet<String>,
    pub frequency_signals: HashSet<String>,
}

const HIGH_RISK_COUNTRIES: &[&str] = &[
    "Cayman Islands",
    "Nigeria",
    "Iran",
    "North Korea",
    "Syria",
    "Russia",
    "Belarus",
    "Myanmar",
    "Afghanistan",
    "Yemen",
    "Venezuela",
    "Panama",
    "British Virgin Islands",
    "Seychelles",
    "Vanuatu",
    "Marshall Islands",
];

const MEDIUM_RISK_COUNTRIES: &[&str] = &[
    "Philippines",
    "Indonesia",
    "Vietnam",
    "Thailand",
    "Mexico",
    "Colombia",
    "UAE",
    "Qatar",
    "Bahrain",
    "Malta",
    "Cyprus",
    "Mauritius",
    "Bahamas",
];

// Strong AML frameworks plus other commonly seen jurisdictions
const OTHER_COUNTRIES: &[&str] = &[
    "United States",
    "United Kingdom",
    "Singapore",
    "Japan",
    "Australia",
    "Canada",
    "Germany",
    "France",
    "Netherlands",
    "Switzerland",
    "New Zealand",
    "Hong Kong",
    "South Korea",
    "Sweden",
    "Norway",
    "Denmark",
    "Finland",
    "India",
    "China",
    "Brazil",
    "South Africa",
    "Kenya",
    "Ghana",
    "Egypt",
    "Morocco",
    "Saudi Arabia",
    "Israel",
    "Turkey",
    "Poland",
    "Czech Republic",
    "Hungary",
    "Romania",
    "Bulgaria",
    "Croatia",
    "Slovenia",
    "Estonia",
    "Latvia",
    "Lithuania",
    "Ireland",
    "Portugal",
    "Spain",
    "Italy",
    "Greece",
    "Austria",
    "Belgium",
    "Luxembourg",
];

const HIGH_RISK_PURPOSES: &[&str] = &[
    "Gambling",
    "Investment",
    "Shell Company Transfer",
    "Crypto Trading",
    "Real Estate",
];

const MEDIUM_RISK_PURPOSES: &[&str] = &[
    "Trade Finance",
    "B2B Payment",
    "Loan Repayment",
    "Charity/Donation",
];

const OTHER_PURPOSES: &[&str] = &[
    "Payroll",
    "Remittance",
    "Freelance Payment",
    "E-commerce",
    "Other",
];

const HIGH_RISK_COUNTERPARTY_TYPES: &[&str] =
    &["Shell Company", "Crypto Exchange", "Unknown/Unverified"];

const MEDIUM_RISK_COUNTERPARTY_TYPES: &[&str] = &["Large Corporate", "Financial Institution"];

const OTHER_COUNTERPARTY_TYPES: &[&str] = &[
    "Individual Freelancer",
    "Small Business (SMB)",
    "Medium Enterprise",
    "NGO/Non-Profit",
    "Government Entity",
];

const CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "SGD", "PHP", "THB", "IDR", "MYR", "VND", "INR", "USDC", "USDT", "DAI",
    "BUSD",
];

const FREQUENCY_SIGNALS: &[&str] = &[
    "First transaction",
    "Regular monthly pattern",
    "Multiple sub-10k transfers in 24h",
    "Multiple sub-10k transfers in 7 days",
    "Sudden increase in transaction volume",
    "Round-trip transactions detected",
    "Unusual timing pattern",
    "No previous history",
];

fn set_of(groups: &[&[&str]]) -> HashSet<String> {
    groups
        .iter()
        .flat_map(|group| group.iter())
        .map(|v| v.to_string())
        .collect()
}

impl Vocabulary {
    fn load_defaults() -> Self {
        Self {
            countries: set_of(&[HIGH_RISK_COUNTRIES, MEDIUM_RISK_COUNTRIES, OTHER_COUNTRIES]),
            purposes: set_of(&[HIGH_RISK_PURPOSES, MEDIUM_RISK_PURPOSES, OTHER_PURPOSES]),
            counterparty_types: set_of(&[
                HIGH_RISK_COUNTERPARTY_TYPES,
                MEDIUM_RISK_COUNTERPARTY_TYPES,
                OTHER_COUNTERPARTY_TYPES,
            ]),
            currencies: set_of(&[CURRENCIES]),
            frequency_signals: set_of(&[FREQUENCY_SIGNALS]),
        }
    }
}

/// Complete rule catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleCatalog {
    pub source_countries: RiskTiers,
    pub destination_countries: RiskTiers,
    pub purposes: RiskTiers,
    pub counterparty_types: RiskTiers,
    pub points: RiskPoints,
    pub thresholds: Thresholds,
    pub risk_level_bands: RiskLevelBands,
    pub escalation_bands: EscalationBands,
    pub documents: DocumentRequirements,
    #[serde(default)]
    pub vocabulary: Vocabulary,
}

impl RuleCatalog {
    /// Parse and validate a catalog from JSON
    pub fn from_json_str(json: &str) -> Result<Self, AssessmentError> {
        let catalog: RuleCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read, parse and validate a catalog file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AssessmentError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AssessmentError::Configuration(format!(
                "cannot read catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// Export as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check the catalog's internal invariants
    pub fn validate(&self) -> Result<(), AssessmentError> {
        let dimensions = [
            ("source_countries", &self.source_countries),
            ("destination_countries", &self.destination_countries),
            ("purposes", &self.purposes),
            ("counterparty_types", &self.counterparty_types),
        ];
        for (name, tiers) in dimensions {
            let shared = tiers.overlap();
            if !shared.is_empty() {
                return Err(AssessmentError::InvalidCatalog(format!(
                    "{} lists {:?} as both high and medium risk",
                    name, shared
                )));
            }
        }

        let thresholds = &self.thresholds;
        if !thresholds.amount_medium.is_finite()
            || !thresholds.amount_high.is_finite()
            || thresholds.amount_medium < 0.0
            || thresholds.amount_medium > thresholds.amount_high
        {
            return Err(AssessmentError::InvalidCatalog(format!(
                "amount thresholds must satisfy 0 <= medium ({}) <= high ({})",
                thresholds.amount_medium, thresholds.amount_high
            )));
        }
        if thresholds.structuring_marker.is_empty() {
            return Err(AssessmentError::InvalidCatalog(
                "structuring marker must not be empty".to_string(),
            ));
        }

        let levels = &self.risk_level_bands;
        if !is_ascending(&[levels.low_max, levels.medium_max, levels.high_max]) {
            return Err(AssessmentError::InvalidCatalog(format!(
                "risk level bands must ascend within 0..=100: {:?}",
                levels
            )));
        }

        let escalation = &self.escalation_bands;
        if !is_ascending(&[
            escalation.proceed_standard_max,
            escalation.enhanced_due_diligence_max,
            escalation.escalate_level_2_max,
            escalation.escalate_level_3_max,
        ]) {
            return Err(AssessmentError::InvalidCatalog(format!(
                "escalation bands must ascend within 0..=100: {:?}",
                escalation
            )));
        }

        match self.documents.always_required.first() {
            Some(baseline) if baseline.priority == DocumentPriority::Mandatory => Ok(()),
            _ => Err(AssessmentError::InvalidCatalog(
                "a mandatory baseline identity document is required".to_string(),
            )),
        }
    }
}

fn is_ascending(bounds: &[u8]) -> bool {
    bounds.windows(2).all(|w| w[0] < w[1]) && bounds.iter().all(|b| *b <= 100)
}

impl Default for RuleCatalog {
    fn default() -> Self {
        let countries = RiskTiers::new(HIGH_RISK_COUNTRIES, MEDIUM_RISK_COUNTRIES);
        Self {
            source_countries: countries.clone(),
            destination_countries: countries,
            purposes: RiskTiers::new(HIGH_RISK_PURPOSES, MEDIUM_RISK_PURPOSES),
            counterparty_types: RiskTiers::new(
                HIGH_RISK_COUNTERPARTY_TYPES,
                MEDIUM_RISK_COUNTERPARTY_TYPES,
            ),
            points: RiskPoints::default(),
            thresholds: Thresholds::default(),
            risk_level_bands: RiskLevelBands::default(),
            escalation_bands: EscalationBands::default(),
            documents: DocumentRequirements::default(),
            vocabulary: Vocabulary::load_defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = RuleCatalog::default();
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_tier_lookup() {
        let catalog = RuleCatalog::default();

        assert_eq!(catalog.source_countries.tier_of("Nigeria"), Some(Tier::High));
        assert_eq!(catalog.source_countries.tier_of("Malta"), Some(Tier::Medium));
        assert_eq!(catalog.source_countries.tier_of("Germany"), None);
        assert_eq!(catalog.purposes.tier_of("Payroll"), None);
        assert!(catalog.counterparty_types.is_high_risk("Shell Company"));
        assert!(!catalog.counterparty_types.is_high_risk("Large Corporate"));
    }

    #[test]
    fn test_unknown_value_has_no_tier() {
        let catalog = RuleCatalog::default();

        assert_eq!(catalog.destination_countries.tier_of("Atlantis"), None);
        assert_eq!(catalog.destination_countries.tier_of(""), None);
        // Lookups are exact
        assert_eq!(catalog.destination_countries.tier_of("nigeria"), None);
    }

    #[test]
    fn test_overlapping_tiers_rejected() {
        let mut catalog = RuleCatalog::default();
        catalog.purposes.medium.insert("Gambling".to_string());

        let err = catalog.validate().unwrap_err();
        assert!(matches!(err, AssessmentError::InvalidCatalog(_)));
        assert!(err.to_string().contains("Gambling"));
    }

    #[test]
    fn test_inverted_amount_thresholds_rejected() {
        let mut catalog = RuleCatalog::default();
        catalog.thresholds.amount_medium = 75_000.0;

        assert!(matches!(
            catalog.validate(),
            Err(AssessmentError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_band_ordering_rejected() {
        let mut catalog = RuleCatalog::default();
        catalog.escalation_bands.escalate_level_3_max = 70;
        assert!(catalog.validate().is_err());

        let mut catalog = RuleCatalog::default();
        catalog.risk_level_bands.high_max = 120;
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_missing_baseline_document_rejected() {
        let mut catalog = RuleCatalog::default();
        catalog.documents.always_required.clear();

        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_document_templates_by_category() {
        let documents = DocumentRequirements::default();

        assert_eq!(documents.templates(DocumentCategory::HighRiskCountry).len(), 3);
        assert_eq!(documents.templates(DocumentCategory::HighAmount).len(), 2);
        assert_eq!(
            documents.templates(DocumentCategory::PoliticallyExposedPerson).len(),
            3
        );
        let onboarding = documents.templates(DocumentCategory::NewCustomer);
        assert_eq!(onboarding[1].priority, DocumentPriority::Recommended);
    }

    #[test]
    fn test_json_reload() {
        let catalog = RuleCatalog::default();
        let json = catalog.to_json().unwrap();

        let reloaded = RuleCatalog::from_json_str(&json).unwrap();
        assert_eq!(reloaded, catalog);
    }

    #[test]
    fn test_json_without_vocabulary() {
        let mut value = serde_json::to_value(RuleCatalog::default()).unwrap();
        value.as_object_mut().unwrap().remove("vocabulary");

        let catalog = RuleCatalog::from_json_str(&value.to_string()).unwrap();
        assert!(catalog.vocabulary.countries.is_empty());
        assert!(catalog.source_countries.is_high_risk("Iran"));
    }

    #[test]
    fn test_load_from_file() {
        let mut catalog = RuleCatalog::default();
        catalog.points.pep = 40;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(catalog.to_json().unwrap().as_bytes()).unwrap();

        let loaded = RuleCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.points.pep, 40);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RuleCatalog::from_json_file(dir.path().join("absent.json"));

        assert!(matches!(result, Err(AssessmentError::Configuration(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = RuleCatalog::from_json_str("{ not json");
        assert!(matches!(result, Err(AssessmentError::Serialization(_))));
    }
}
