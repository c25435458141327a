//! Core evaluation logic shared by the CLI and library callers.
//! No file or network access happens during an evaluation.

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::analyzer::feedback::{Explanation, Feedback, FeedbackGenerator};
use crate::analyzer::rules::{rule_ids, Details, Diagnostic, Rule, RulesEngine, Severity};
use crate::analyzer::sanity::{check_instances, run_sanity_checks};
use crate::library::{builtin_library, Library, LibraryError};
use crate::netlist::{parse_candidate, Circuit, ComponentInstance, Goals};

#[derive(Debug, thiserror::Error)]
pub enum UmpireError {
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),
    #[error("Unknown rule '{0}' (available: {1})")]
    UnknownRule(String, String),
}

/// Options for evaluation runs.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// Rule ids to run; empty runs every rule.
    pub rules: Vec<String>,
    /// Warnings also block acceptance.
    pub strict_mode: bool,
}

/// Diagnostic counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckStats {
    pub fatal: usize,
    pub error: usize,
    pub warning: usize,
}

impl CheckStats {
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let mut stats = Self::default();
        for d in diagnostics {
            match d.level {
                Severity::Fatal => stats.fatal += 1,
                Severity::Error => stats.error += 1,
                Severity::Warning => stats.warning += 1,
            }
        }
        stats
    }

    /// No FATAL or ERROR diagnostics. Warnings never block acceptance here.
    pub fn is_acceptable(&self) -> bool {
        self.fatal == 0 && self.error == 0
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.fatal + self.error + self.warning
    }
}

/// Result of a single rule pass together with its rendered feedback.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub diagnostics: Vec<Diagnostic>,
    pub stats: CheckStats,
    pub feedback: Feedback,
    pub accepted: bool,
}

impl Evaluation {
    pub fn has_fatal(&self) -> bool {
        self.stats.fatal > 0
    }

    pub fn passed(&self) -> bool {
        self.feedback.passed
    }
}

/// The netlist evaluator.
pub struct Umpire {
    library: Library,
    engine: RulesEngine,
    feedback: FeedbackGenerator,
    options: CheckOptions,
}

impl Umpire {
    /// Evaluator over `library` with the default rules and formatters.
    /// A [`Library`] is validated non-empty when it is built.
    pub fn new(library: Library) -> Self {
        Self {
            library,
            engine: RulesEngine::with_default_rules(),
            feedback: FeedbackGenerator::new(),
            options: CheckOptions::default(),
        }
    }

    pub fn with_builtin_library() -> Result<Self, UmpireError> {
        Ok(Self::new(builtin_library()?))
    }

    /// Fails when `options.rules` names an id the engine does not have.
    pub fn with_options(mut self, options: CheckOptions) -> Result<Self, UmpireError> {
        validate_selection(&self.engine, &options)?;
        self.options = options;
        Ok(self)
    }

    /// Fails when the current rule selection is not covered by `engine`.
    pub fn with_engine(mut self, engine: RulesEngine) -> Result<Self, UmpireError> {
        validate_selection(&engine, &self.options)?;
        self.engine = engine;
        Ok(self)
    }

    pub fn with_feedback(mut self, feedback: FeedbackGenerator) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.engine.rules()
    }

    /// Check a decoded candidate. A sanity failure yields exactly one FATAL
    /// and no rule runs.
    pub fn check(&self, candidate: &Value, goals: &Goals) -> Vec<Diagnostic> {
        match run_sanity_checks(candidate, &self.library) {
            Ok(instances) => self.run_rules(&instances, goals),
            Err(fatal) => {
                tracing::debug!("Sanity gate rejected candidate: {}", fatal.rule_id);
                vec![fatal]
            }
        }
    }

    /// Check an already typed netlist.
    pub fn check_netlist(&self, instances: &[ComponentInstance], goals: &Goals) -> Vec<Diagnostic> {
        match check_instances(instances, &self.library) {
            Ok(()) => self.run_rules(instances, goals),
            Err(fatal) => {
                tracing::debug!("Sanity gate rejected netlist: {}", fatal.rule_id);
                vec![fatal]
            }
        }
    }

    /// Check raw generator output, extracting the JSON payload first.
    pub fn check_text(&self, text: &str, goals: &Goals) -> Vec<Diagnostic> {
        match parse_candidate(text) {
            Ok(candidate) => self.check(&candidate, goals),
            Err(e) => {
                tracing::debug!("Could not extract a netlist: {}", e);
                vec![Diagnostic::fatal(
                    rule_ids::UNPARSEABLE,
                    Details::new().with("reason", e.to_string()),
                )]
            }
        }
    }

    pub fn evaluate(&self, candidate: &Value, goals: &Goals) -> Evaluation {
        self.finish(self.check(candidate, goals))
    }

    pub fn evaluate_netlist(&self, instances: &[ComponentInstance], goals: &Goals) -> Evaluation {
        self.finish(self.check_netlist(instances, goals))
    }

    pub fn evaluate_text(&self, text: &str, goals: &Goals) -> Evaluation {
        self.finish(self.check_text(text, goals))
    }

    /// Explanation for one diagnostic, as it would appear in the feedback.
    pub fn explain(&self, diagnostic: &Diagnostic) -> Explanation {
        self.feedback.registry().explain(diagnostic)
    }

    /// Render feedback for an existing diagnostic list.
    pub fn render_feedback(&self, diagnostics: &[Diagnostic]) -> Feedback {
        self.feedback.render(diagnostics)
    }

    fn run_rules(&self, instances: &[ComponentInstance], goals: &Goals) -> Vec<Diagnostic> {
        let circuit = Circuit::new(instances, &self.library);
        let stats = circuit.stats();
        tracing::debug!(
            "Evaluating {} components on {} nets",
            stats.component_count,
            stats.net_count
        );
        self.engine.analyze_selected(&circuit, goals, &self.options.rules)
    }

    fn finish(&self, diagnostics: Vec<Diagnostic>) -> Evaluation {
        let stats = CheckStats::from_diagnostics(&diagnostics);
        let accepted = stats.is_acceptable() && !(self.options.strict_mode && stats.warning > 0);
        let feedback = self.feedback.render(&diagnostics);
        Evaluation {
            diagnostics,
            stats,
            feedback,
            accepted,
        }
    }
}

fn validate_selection(engine: &RulesEngine, options: &CheckOptions) -> Result<(), UmpireError> {
    match engine.find_unknown(&options.rules) {
        Some(id) => {
            let available: Vec<&str> = engine.rules().map(|r| r.id()).collect();
            Err(UmpireError::UnknownRule(id.to_string(), available.join(", ")))
        }
        None => Ok(()),
    }
}

/// Parse a `key=value` goal assignment.
pub fn parse_goal_assignment(assignment: &str) -> Result<(String, String), UmpireError> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| UmpireError::InvalidGoal(format!("expected key=value, got '{}'", assignment)))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(UmpireError::InvalidGoal(format!("empty goal name in '{}'", assignment)));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Load goals from a JSON object file. Scalar values are kept as strings.
pub fn load_goals_from_file(path: &Path) -> Result<Goals, UmpireError> {
    let content = std::fs::read_to_string(path)?;
    let raw: serde_json::Map<String, Value> = serde_json::from_str(&content)?;

    let mut goals = Goals::new();
    for (key, value) in raw {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(UmpireError::InvalidGoal(format!(
                    "goal '{}' must be a scalar, got {}",
                    key, other
                )))
            }
        };
        goals.insert(key, value);
    }
    tracing::info!("Loaded {} goal(s) from {:?}", goals.len(), path.file_name());
    Ok(goals)
}
