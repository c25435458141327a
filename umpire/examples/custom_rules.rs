//! Example: extending the rule set with a custom rule and formatter.
//! Run with: cargo run --example custom_rules [path/to/netlist.json]

use std::path::Path;
use std::sync::Arc;
use umpire::library::roles;
use umpire::{
    Category, Circuit, Details, Diagnostic, Explanation, FeedbackGenerator, Goals, Rule,
    RulesEngine, Umpire, UmpireError,
};

/// Warns when more than one bias source is present.
struct SingleBiasRule;

impl Rule for SingleBiasRule {
    fn id(&self) -> &str {
        "B1"
    }

    fn name(&self) -> &str {
        "Single Bias Source"
    }

    fn description(&self) -> &str {
        "A simple amplifier should be biased from one source"
    }

    fn category(&self) -> Category {
        Category::Component
    }

    fn check(&self, circuit: &Circuit<'_>, _goals: &Goals) -> Vec<Diagnostic> {
        let mut sources: Vec<&str> = circuit
            .components_with_role(roles::BIAS_SOURCE)
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        if sources.len() <= 1 {
            return Vec::new();
        }
        sources.sort_unstable();
        vec![Diagnostic::warning(
            self.category(),
            self.id(),
            Details::new().with("sources", sources),
        )]
    }
}

fn main() -> Result<(), UmpireError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/valid_amplifier.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example custom_rules [path/to/netlist.json]");
        std::process::exit(1);
    }

    let mut engine = RulesEngine::with_default_rules();
    engine.add_rule(Arc::new(SingleBiasRule));

    let mut feedback = FeedbackGenerator::new();
    feedback.registry_mut().register("B1", |details: &Details| Explanation {
        title: "Multiple Bias Sources".to_string(),
        location: "Circuit-wide.".to_string(),
        problem: format!("Bias sources found: {}.", details.list("sources").join(", ")),
        fix: "Keep one bias source and share its output net.".to_string(),
    });

    let umpire = Umpire::with_builtin_library()?
        .with_engine(engine)?
        .with_feedback(feedback);

    let candidate: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let evaluation = umpire.evaluate(&candidate, &Goals::new());

    println!("Custom validation found {} problems for {}", evaluation.diagnostics.len(), path.display());
    for diagnostic in &evaluation.diagnostics {
        let explanation = umpire.explain(diagnostic);
        println!("  [{}] {}: {}", diagnostic.level, diagnostic.rule_id, explanation.problem);
    }

    if !evaluation.accepted {
        std::process::exit(1);
    }
    Ok(())
}
