//! Score band mapping to risk level and escalation action
//!
//! The risk level table and the escalation table are independent: the
//! high/critical boundary of one does not line up with the level 3/block
//! boundary of the other.

use crate::catalog::RuleCatalog;
use serde::{Deserialize, Serialize};

/// Risk level of an assessment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,      // 0-25
    Medium,   // 26-50
    High,     // 51-75
    Critical, // 76-100
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational action assigned to a transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    ProceedStandard,
    EnhancedDueDiligence,
    #[serde(rename = "escalate_level_2")]
    EscalateLevel2,
    #[serde(rename = "escalate_level_3")]
    EscalateLevel3,
    BlockPendingReview,
}

impl EscalationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationStatus::ProceedStandard => "proceed_standard",
            EscalationStatus::EnhancedDueDiligence => "enhanced_due_diligence",
            EscalationStatus::EscalateLevel2 => "escalate_level_2",
            EscalationStatus::EscalateLevel3 => "escalate_level_3",
            EscalationStatus::BlockPendingReview => "block_pending_review",
        }
    }

    /// Label shown to operations staff
    pub fn label(&self) -> &'static str {
        match self {
            EscalationStatus::ProceedStandard => "Proceed with Standard Checks",
            EscalationStatus::EnhancedDueDiligence => "Enhanced Due Diligence Required",
            EscalationStatus::EscalateLevel2 => "Escalate to Level 2 Compliance Review",
            EscalationStatus::EscalateLevel3 => "Escalate to Level 3 / Senior Compliance",
            EscalationStatus::BlockPendingReview => "Block Transaction - Pending Full Review",
        }
    }

    /// `escalate_level_2` becomes `ESCALATE LEVEL 2`
    pub fn humanized(&self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }

    pub fn blocks_processing(&self) -> bool {
        matches!(self, EscalationStatus::BlockPendingReview)
    }
}

impl std::fmt::Display for EscalationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps scores to levels and actions using the catalog's band tables
pub struct EscalationResolver<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> EscalationResolver<'a> {
    pub fn new(catalog: &'a RuleCatalog) -> Self {
        Self { catalog }
    }

    pub fn risk_level(&self, score: u8) -> RiskLevel {
        let bands = &self.catalog.risk_level_bands;
        if score <= bands.low_max {
            RiskLevel::Low
        } else if score <= bands.medium_max {
            RiskLevel::Medium
        } else if score <= bands.high_max {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn escalation_status(&self, score: u8) -> EscalationStatus {
        let bands = &self.catalog.escalation_bands;
        if score <= bands.proceed_standard_max {
            EscalationStatus::ProceedStandard
        } else if score <= bands.enhanced_due_diligence_max {
            EscalationStatus::EnhancedDueDiligence
        } else if score <= bands.escalate_level_2_max {
            EscalationStatus::EscalateLevel2
        } else if score <= bands.escalate_level_3_max {
            EscalationStatus::EscalateLevel3
        } else {
            EscalationStatus::BlockPendingReview
        }
    }

    pub fn resolve(&self, score: u8) -> (RiskLevel, EscalationStatus) {
        (self.risk_level(score), self.escalation_status(score))
    }

    /// Whether a level/status pair is what the bands give for `score`
    pub fn is_consistent(&self, score: u8, level: RiskLevel, status: EscalationStatus) -> bool {
        self.resolve(score) == (level, status)
    }
}
