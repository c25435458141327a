//! Tests for rules and the feedback they produce

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use umpire::analyzer::feedback::{CORRECTION_PREAMBLE, ERRORS_HEADER};
use umpire::prelude::*;
use umpire::{Category, Circuit, Details, Explanation, FeedbackGenerator, Rule, RulesEngine};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_fixture(name: &str) -> Value {
    let content = std::fs::read_to_string(fixture_path(name)).expect("fixture exists");
    serde_json::from_str(&content).expect("fixture is valid JSON")
}

#[test]
fn test_error_document_layout() {
    let umpire = Umpire::with_builtin_library().unwrap();
    let evaluation = umpire.evaluate(&load_fixture("invalid_amplifier.json"), &Goals::new());
    let doc = &evaluation.feedback.document;

    assert!(!evaluation.passed());
    assert!(doc.starts_with(CORRECTION_PREAMBLE));
    assert!(doc.contains(ERRORS_HEADER));
    assert!(doc.contains("### Connection Errors"));
    assert!(doc.contains("### Component Errors"));
    assert!(!doc.contains("### Format Errors"));

    // Connection problems come before component problems.
    let floating = doc.find("Net `floating_bias`.").unwrap();
    let mismatch = doc.find("NMOS/PMOS Mismatch").unwrap();
    assert!(floating < mismatch);
    assert!(doc.contains("Change the `block_type` of `ACTIVE_LOAD` to a PMOS equivalent"));
}

#[test]
fn test_every_diagnostic_is_rendered() {
    let umpire = Umpire::with_builtin_library().unwrap();
    let evaluation = umpire.evaluate(&load_fixture("invalid_amplifier.json"), &Goals::new());
    let items = evaluation.feedback.document.matches("- **Rule ").count();
    assert_eq!(items, evaluation.diagnostics.len());
}

#[test]
fn test_fatal_feedback_names_payload_problem() {
    let umpire = Umpire::with_builtin_library().unwrap();
    let evaluation = umpire.evaluate(&load_fixture("missing_connections.json"), &Goals::new());
    let doc = &evaluation.feedback.document;

    assert!(doc.contains("### Format Errors"));
    assert!(doc.contains("(FATAL)"));
    assert!(doc.contains("The entire netlist payload is malformed"));
    assert!(doc.contains("`connections`"));
}

#[test]
fn test_goal_feedback_names_component() {
    let umpire = Umpire::with_builtin_library().unwrap();
    let goals = Goals::new().with("inputType", "differential");
    let evaluation = umpire.evaluate(&load_fixture("single_ended_amplifier.json"), &goals);
    let doc = &evaluation.feedback.document;

    assert!(doc.contains("### Goal Mismatches"));
    assert!(doc.contains("`CS_STAGE`"));
    assert!(doc.contains("DifferentialPairN"));
}

#[test]
fn test_warning_only_feedback_is_not_pass() {
    let umpire = Umpire::with_builtin_library().unwrap();
    let mut candidate = load_fixture("valid_amplifier.json");
    let records = candidate.as_array_mut().unwrap();
    records.retain(|r| r["id"] != "TAIL_BIAS");
    records[0]["connections"]["i_in_bias"] = Value::from("GND");

    let evaluation = umpire.evaluate(&candidate, &Goals::new());
    assert_eq!(evaluation.stats.warning, 1);
    assert!(evaluation.accepted);
    assert!(evaluation.feedback.document.contains("(WARNING)"));
    assert!(!evaluation.feedback.document.contains("PASS"));
}

/// Flags nets named after the component they hang off.
struct SelfNamedNetRule;

impl Rule for SelfNamedNetRule {
    fn id(&self) -> &str {
        "X1"
    }

    fn name(&self) -> &str {
        "Self-named net"
    }

    fn description(&self) -> &str {
        "A net should not reuse a component id as its name"
    }

    fn category(&self) -> Category {
        Category::Connection
    }

    fn check(&self, circuit: &Circuit<'_>, _goals: &Goals) -> Vec<Diagnostic> {
        circuit
            .net_map()
            .iter()
            .filter(|(net, _)| circuit.get_component(net).is_some())
            .map(|(net, _)| {
                Diagnostic::warning(self.category(), self.id(), Details::new().with("net_name", net))
            })
            .collect()
    }
}

#[test]
fn test_custom_rule_uses_fallback_formatter() {
    let mut engine = RulesEngine::with_default_rules();
    engine.add_rule(Arc::new(SelfNamedNetRule));
    let umpire = Umpire::with_builtin_library().unwrap().with_engine(engine).unwrap();

    let mut candidate = load_fixture("valid_amplifier.json");
    candidate[2]["connections"]["i_out_bias"] = Value::from("INPUT_STAGE");
    candidate[0]["connections"]["i_in_bias"] = Value::from("INPUT_STAGE");

    let evaluation = umpire.evaluate(&candidate, &Goals::new());
    assert_eq!(evaluation.diagnostics.len(), 1);
    assert_eq!(evaluation.diagnostics[0].rule_id, "X1");
    assert!(evaluation.feedback.document.contains("Rule X1: Uncategorized Error"));
    assert!(evaluation.feedback.document.contains("INPUT_STAGE"));
}

#[test]
fn test_custom_rule_with_registered_formatter() {
    let mut engine = RulesEngine::with_default_rules();
    engine.add_rule(Arc::new(SelfNamedNetRule));
    let mut feedback = FeedbackGenerator::new();
    feedback.registry_mut().register("X1", |details: &Details| Explanation {
        title: "Self-Named Net".to_string(),
        location: format!("Net `{}`.", details.text("net_name").unwrap_or("unknown")),
        problem: "The net reuses a component id.".to_string(),
        fix: "Rename the net.".to_string(),
    });
    let umpire = Umpire::with_builtin_library()
        .unwrap()
        .with_engine(engine)
        .unwrap()
        .with_feedback(feedback);

    let mut candidate = load_fixture("valid_amplifier.json");
    candidate[2]["connections"]["i_out_bias"] = Value::from("INPUT_STAGE");
    candidate[0]["connections"]["i_in_bias"] = Value::from("INPUT_STAGE");

    let doc = umpire.evaluate(&candidate, &Goals::new()).feedback.document;
    assert!(doc.contains("- **Rule X1: Self-Named Net** (WARNING)"));
    assert!(doc.contains("Net `INPUT_STAGE`."));
}
