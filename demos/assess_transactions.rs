//! Compliance assessment example
//!
//! This example runs the rule engine over a few transactions and shows how
//! model responses are reconciled with the deterministic verdict.
//!
//! Set `RUST_LOG=transaction_compliance_analyst=debug` to see rule hits.

use transaction_compliance_analyst::{
    parse_model_response, AnalystConfig, ComplianceAnalyst, MergePolicy, ModelOutcome,
    ModelSettings, RiskAssessment, TransactionInput,
};

fn print_assessment(assessment: &RiskAssessment) {
    println!("   Transaction ID: {}", assessment.transaction_id);
    println!("   Risk Score: {}/100", assessment.risk_score);
    println!("   Risk Level: {}", assessment.risk_level);
    println!("   Escalation: {}", assessment.escalation_status.label());
    println!("   Recommendation: {}", assessment.processing_recommendation);
    for rule in &assessment.triggered_rules {
        println!(
            "   - [{}] {} (+{})",
            rule.severity, rule.rule_name, rule.points_added
        );
    }
    println!("   Documents:");
    for item in &assessment.checklist_items {
        println!(
            "   - {} {} ({})",
            item.id,
            item.document,
            item.priority.as_str()
        );
    }
    println!("   Rationale: {}", assessment.rationale);
    println!();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    println!("=== Transaction Compliance Analyst ===\n");

    let analyst = ComplianceAnalyst::new();

    // Example 1: Routine payroll transfer
    println!("1. Low Risk Payroll Transfer");
    let mut payroll = TransactionInput::new(
        500.0,
        "USD",
        "United States",
        "United Kingdom",
        "Payroll",
        "Individual Freelancer",
    );
    payroll.transaction_id = Some("TXN-2024-11-06-001".to_string());
    match analyst.assess_deterministic(&payroll) {
        Ok(assessment) => print_assessment(&assessment),
        Err(e) => println!("   Error: {}\n", e),
    }

    // Example 2: Politically exposed counterparty in a medium-risk corridor
    println!("2. Politically Exposed Person");
    let mut trade = TransactionInput::new(
        15_000.0,
        "EUR",
        "Malta",
        "Germany",
        "Trade Finance",
        "Medium Enterprise",
    );
    trade.is_pep = true;
    trade.counterparty_name = Some("Minister of Finance".to_string());
    match analyst.assess_deterministic(&trade) {
        Ok(assessment) => print_assessment(&assessment),
        Err(e) => println!("   Error: {}\n", e),
    }

    // Example 3: New customer investing through a shell company
    println!("3. Critical Risk Investment");
    let mut investment = TransactionInput::new(
        60_000.0,
        "USD",
        "Nigeria",
        "Singapore",
        "Investment",
        "Shell Company",
    );
    investment.is_new_customer = true;
    match analyst.assess_deterministic(&investment) {
        Ok(assessment) => print_assessment(&assessment),
        Err(e) => println!("   Error: {}\n", e),
    }

    // Example 4: Invalid amount
    println!("4. Invalid Transaction (Negative Amount)");
    let invalid = TransactionInput::new(-1000.0, "USD", "Japan", "Canada", "Other", "Other");
    if let Err(e) = analyst.assess_deterministic(&invalid) {
        println!("   Error: {}\n", e);
    }

    // Reconciliation needs a configured model credential
    let config = AnalystConfig {
        merge_policy: MergePolicy::Strict,
        model: ModelSettings {
            api_key: Some("sk-demo".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let reviewed = match ComplianceAnalyst::with_config(config) {
        Ok(analyst) => analyst,
        Err(e) => {
            println!("Configuration error: {}", e);
            return;
        }
    };

    // Example 5: Fenced model response that only rewrites the rationale
    println!("5. Partial Model Response");
    let raw = concat!(
        "```json\n",
        "{\"rationale\": \"Shell company counterparty with no trading history.\"}\n",
        "```"
    );
    match reviewed.prepare(&investment) {
        Ok(prepared) => {
            let reconciliation =
                reviewed.complete(prepared, &investment, parse_model_response(raw));
            println!("   Source: {}", reconciliation.source.kind());
            print_assessment(&reconciliation.assessment);
        }
        Err(e) => println!("   Error: {}\n", e),
    }

    // Example 6: Model downgrades a critical transaction
    println!("6. Inconsistent Model Response (Strict Policy)");
    let raw = r#"{"riskLevel": "low", "escalationStatus": "proceed_standard"}"#;
    match reviewed.prepare(&investment) {
        Ok(prepared) => {
            let reconciliation =
                reviewed.complete(prepared, &investment, parse_model_response(raw));
            println!("   Source: {}", reconciliation.source.kind());
            println!("   Reason: {:?}", reconciliation.source);
            print_assessment(&reconciliation.assessment);
        }
        Err(e) => println!("   Error: {}\n", e),
    }

    // Example 7: Model call failed outright
    println!("7. Model Call Failure");
    let outcome = ModelOutcome::CallFailed {
        reason: "connection timed out".to_string(),
    };
    match reviewed.assess(&payroll, outcome) {
        Ok(assessment) => match assessment.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => println!("   Error: {}", e),
        },
        Err(e) => println!("   Error: {}", e),
    }

    println!("\n=== Assessment Complete ===");
}
