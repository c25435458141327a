//! Feedback Generator
//!
//! Turns a diagnostic list into a Markdown report meant to be pasted into a
//! follow-up prompt. Each diagnostic is explained by a formatter looked up by
//! rule id; unknown rule ids fall back to a generic formatter that prints the
//! raw details.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::analyzer::rules::{rule_ids, Category, Details, Diagnostic};

pub const PASS_HEADER: &str = "## Umpire Feedback: PASS";
pub const ERRORS_HEADER: &str = "## Umpire Feedback: ERRORS DETECTED";
pub const CORRECTION_PREAMBLE: &str = "You are an expert AI. Your previous circuit design contained errors. \
Please provide a corrected JSON netlist that fixes the following problems.";

const UNKNOWN: &str = "unknown";

/// Human-readable explanation of one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub title: String,
    pub location: String,
    pub problem: String,
    pub fix: String,
}

impl Explanation {
    pub fn new(
        title: impl Into<String>,
        location: impl Into<String>,
        problem: impl Into<String>,
        fix: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            problem: problem.into(),
            fix: fix.into(),
        }
    }
}

pub type Formatter = Box<dyn Fn(&Details) -> Explanation + Send + Sync>;

/// Rule id -> formatter, with a guaranteed fallback.
pub struct FormatterRegistry {
    formatters: HashMap<String, Formatter>,
    fallback: Formatter,
}

impl FormatterRegistry {
    /// Registry holding only the generic fallback.
    pub fn new() -> Self {
        Self {
            formatters: HashMap::new(),
            fallback: Box::new(explain_generic),
        }
    }

    /// Registry with a formatter for every built-in diagnostic.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(rule_ids::UNPARSEABLE, explain_unparseable);
        registry.register(rule_ids::NOT_A_LIST, explain_not_a_list);
        registry.register(rule_ids::NOT_A_RECORD, explain_not_a_record);
        registry.register(rule_ids::MALFORMED_RECORD, explain_malformed_record);
        registry.register(rule_ids::UNKNOWN_BLOCK, explain_unknown_block);
        registry.register(rule_ids::DUPLICATE_ID, explain_duplicate_id);
        registry.register(rule_ids::FLOATING_NET, explain_floating_net);
        registry.register(rule_ids::LOAD_MISMATCH, explain_load_mismatch);
        registry.register(rule_ids::MISSING_LOAD, explain_missing_load);
        registry.register(rule_ids::MISSING_BIAS, explain_missing_bias);
        registry.register(rule_ids::GOAL_INPUT_TYPE, explain_goal_input_type);
        registry
    }

    pub fn register<F>(&mut self, rule_id: impl Into<String>, formatter: F)
    where
        F: Fn(&Details) -> Explanation + Send + Sync + 'static,
    {
        self.formatters.insert(rule_id.into(), Box::new(formatter));
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.formatters.contains_key(rule_id)
    }

    pub fn explain(&self, diagnostic: &Diagnostic) -> Explanation {
        match self.formatters.get(&diagnostic.rule_id) {
            Some(formatter) => formatter(&diagnostic.details),
            None => (self.fallback)(&diagnostic.details),
        }
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Rendered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// True only when there were no diagnostics at all.
    pub passed: bool,
    pub document: String,
}

#[derive(Default)]
pub struct FeedbackGenerator {
    registry: FormatterRegistry,
}

impl FeedbackGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: FormatterRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FormatterRegistry {
        &mut self.registry
    }

    /// Render the report. Sections follow [`Category`] order; diagnostics keep
    /// the order they are given in, which is the sorted order for engine
    /// output.
    pub fn render(&self, diagnostics: &[Diagnostic]) -> Feedback {
        if diagnostics.is_empty() {
            return Feedback {
                passed: true,
                document: format!("{}\n\nNo errors found.\n", PASS_HEADER),
            };
        }

        let mut doc = String::new();
        doc.push_str(CORRECTION_PREAMBLE);
        doc.push_str("\n\n");
        doc.push_str(ERRORS_HEADER);
        doc.push_str("\n\n");
        doc.push_str(&summary_line(diagnostics));
        doc.push_str("\n\n");

        for category in Category::ALL {
            let in_section: Vec<&Diagnostic> = diagnostics
                .iter()
                .filter(|d| d.category == category)
                .collect();
            if in_section.is_empty() {
                continue;
            }

            let (heading, blurb) = section_heading(category);
            doc.push_str(&format!("### {}\n{}\n\n", heading, blurb));
            for diagnostic in in_section {
                doc.push_str(&self.render_item(diagnostic));
            }
            doc.push('\n');
        }

        Feedback {
            passed: false,
            document: doc.trim_end().to_string() + "\n",
        }
    }

    fn render_item(&self, diagnostic: &Diagnostic) -> String {
        let explanation = self.registry.explain(diagnostic);
        format!(
            "- **Rule {}: {}** ({})\n  - **Location**: {}\n  - **Problem**: {}\n  - **Fix**: {}\n---\n",
            diagnostic.rule_id,
            explanation.title,
            diagnostic.level,
            explanation.location,
            explanation.problem,
            explanation.fix
        )
    }
}

fn section_heading(category: Category) -> (&'static str, &'static str) {
    match category {
        Category::Format => (
            "Format Errors",
            "The netlist could not be analyzed because its structure is invalid.",
        ),
        Category::Connection => (
            "Connection Errors",
            "These are problems with how components are wired together.",
        ),
        Category::Component => (
            "Component Errors",
            "These are problems with the choice or absence of components.",
        ),
        Category::Goal => (
            "Goal Mismatches",
            "These are places where the design does not meet the stated design goals.",
        ),
    }
}

fn summary_line(diagnostics: &[Diagnostic]) -> String {
    use crate::analyzer::rules::Severity;

    let count = |level: Severity| diagnostics.iter().filter(|d| d.level == level).count();
    let plural = |n: usize, word: &str| {
        if n == 1 {
            format!("{} {}", n, word)
        } else {
            format!("{} {}s", n, word)
        }
    };
    format!(
        "Found {}: {}, {}, {}.",
        plural(diagnostics.len(), "problem"),
        plural(count(Severity::Fatal), "fatal error"),
        plural(count(Severity::Error), "error"),
        plural(count(Severity::Warning), "warning"),
    )
}

fn text_or_unknown<'a>(details: &'a Details, key: &str) -> &'a str {
    details.text(key).unwrap_or(UNKNOWN)
}

fn index_or_unknown(details: &Details, key: &str) -> String {
    details
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|i| i.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn backticked(items: &[&str]) -> String {
    items
        .iter()
        .map(|i| format!("`{}`", i))
        .collect::<Vec<_>>()
        .join(", ")
}

// Formatters

fn explain_generic(details: &Details) -> Explanation {
    Explanation::new(
        "Uncategorized Error",
        "See details.",
        format!("`{}`", details.to_canonical_json()),
        "Review the reported details and correct the netlist accordingly.",
    )
}

fn explain_unparseable(details: &Details) -> Explanation {
    Explanation::new(
        "Unparseable Output",
        "The whole response.",
        format!(
            "No valid JSON netlist could be read from the response ({}).",
            text_or_unknown(details, "reason")
        ),
        "Return the netlist as a JSON array inside a single ```json ... ``` code block.",
    )
}

fn explain_not_a_list(details: &Details) -> Explanation {
    Explanation::new(
        "Netlist Is Not a Component List",
        "The whole netlist.",
        format!(
            "The netlist must be a non-empty JSON array of components, but a {} was provided.",
            text_or_unknown(details, "found")
        ),
        "Output a JSON array (list) of components, not an object or a dictionary with a top-level key.",
    )
}

fn explain_not_a_record(details: &Details) -> Explanation {
    Explanation::new(
        "Malformed Netlist Payload",
        format!("Entry #{} of the netlist.", index_or_unknown(details, "index")),
        format!(
            "The entire netlist payload is malformed: entry #{} is a {} instead of a component object.",
            index_or_unknown(details, "index"),
            text_or_unknown(details, "found")
        ),
        "Resubmit the complete netlist; every entry must be an object with `id`, `block_type` and `connections`.",
    )
}

fn explain_malformed_record(details: &Details) -> Explanation {
    let mut fields = details.list("missing");
    let invalid = details.list("invalid");
    let mut problem = format!(
        "The entire netlist payload is malformed: record #{}",
        index_or_unknown(details, "index")
    );
    if let Some(id) = details.text("component_id") {
        problem.push_str(&format!(" (`{}`)", id));
    }
    if !fields.is_empty() {
        problem.push_str(&format!(" is missing {}", backticked(&fields)));
    }
    if !invalid.is_empty() {
        if !fields.is_empty() {
            problem.push_str(" and");
        }
        problem.push_str(&format!(" has wrongly typed {}", backticked(&invalid)));
    }
    fields.extend(invalid);
    if fields.is_empty() {
        problem.push_str(" does not match the component format");
    }
    problem.push('.');

    Explanation::new(
        "Malformed Netlist Payload",
        format!("Record #{} of the netlist.", index_or_unknown(details, "index")),
        problem,
        "Resubmit the complete netlist: each component must be an object with a string `id`, a string `block_type`, and a `connections` object mapping terminal names to net names.",
    )
}

fn explain_unknown_block(details: &Details) -> Explanation {
    Explanation::new(
        "Unknown Block Type",
        format!("Component `{}`.", text_or_unknown(details, "component_id")),
        format!(
            "It uses `block_type` '{}', which is not in the library.",
            text_or_unknown(details, "block_type")
        ),
        "Correct the typo or use one of the block types listed in the library.",
    )
}

fn explain_duplicate_id(details: &Details) -> Explanation {
    let id = text_or_unknown(details, "component_id");
    Explanation::new(
        "Duplicate Component Id",
        format!("Component `{}`.", id),
        format!("More than one component uses the id `{}`.", id),
        "Give every component a unique `id`.",
    )
}

fn explain_floating_net(details: &Details) -> Explanation {
    Explanation::new(
        "Floating Net",
        format!("Net `{}`.", text_or_unknown(details, "net_name")),
        format!(
            "This net is only connected to terminal `{}` on component `{}`.",
            text_or_unknown(details, "terminal"),
            text_or_unknown(details, "component_id")
        ),
        "Connect this net to a second terminal, or wire the terminal to an existing net.",
    )
}

fn explain_load_mismatch(details: &Details) -> Explanation {
    let load = text_or_unknown(details, "load_id");
    Explanation::new(
        "NMOS/PMOS Mismatch",
        format!("The load component `{}`.", load),
        format!(
            "This component is an incorrect load type for the NMOS gain stage `{}`. They are connected via net `{}`.",
            text_or_unknown(details, "stage_id"),
            text_or_unknown(details, "net_name")
        ),
        format!(
            "Change the `block_type` of `{}` to a PMOS equivalent (e.g., `CurrentMirrorP`).",
            load
        ),
    )
}

fn explain_missing_load(details: &Details) -> Explanation {
    Explanation::new(
        "Missing Essential Component",
        "Circuit-wide.",
        format!(
            "The design has a gain stage but no component with the `{}` role.",
            text_or_unknown(details, "missing_role")
        ),
        "Add a component that fulfills this role (e.g., a `CurrentMirrorP` load on the gain stage outputs).",
    )
}

fn explain_missing_bias(details: &Details) -> Explanation {
    Explanation::new(
        "Missing Essential Component (Warning)",
        "Circuit-wide.",
        format!(
            "The design is likely missing a `{}` component.",
            text_or_unknown(details, "missing_role")
        ),
        "Add a component with this role (e.g., `SimpleBiasN` on the gain stage bias input).",
    )
}

fn explain_goal_input_type(details: &Details) -> Explanation {
    let found = details.list("found");
    let problem = if found.is_empty() {
        format!(
            "The design goal was `{}`, but no component provides a differential input.",
            text_or_unknown(details, "goal")
        )
    } else {
        format!(
            "The design goal was `{}`, but single-ended input components were used instead: {}.",
            text_or_unknown(details, "goal"),
            backticked(&found)
        )
    };
    Explanation::new(
        "Goal Mismatch",
        "The input stage of the circuit.",
        problem,
        "Replace the input stage with a component that has the `DIFFERENTIAL_INPUT` role (e.g., `DifferentialPairN`).",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::Severity;

    fn floating(net: &str) -> Diagnostic {
        Diagnostic::error(
            Category::Connection,
            "C1",
            Details::new()
                .with("net_name", net)
                .with("component_id", "INPUT_STAGE")
                .with("terminal", "i_in_bias"),
        )
    }

    #[test]
    fn test_pass_document() {
        let feedback = FeedbackGenerator::new().render(&[]);
        assert!(feedback.passed);
        assert_eq!(feedback.document, "## Umpire Feedback: PASS\n\nNo errors found.\n");
    }

    #[test]
    fn test_error_document_groups_by_category() {
        let diagnostics = vec![
            floating("floating_bias"),
            Diagnostic::warning(
                Category::Component,
                "S1.2",
                Details::new().with("missing_role", "BIAS_SOURCE"),
            ),
        ];
        let feedback = FeedbackGenerator::new().render(&diagnostics);
        assert!(!feedback.passed);

        let doc = &feedback.document;
        assert!(doc.starts_with(CORRECTION_PREAMBLE));
        assert!(doc.contains(ERRORS_HEADER));
        assert!(!doc.contains(PASS_HEADER));
        let conn = doc.find("### Connection Errors").unwrap();
        let comp = doc.find("### Component Errors").unwrap();
        assert!(conn < comp);
        assert!(!doc.contains("### Goal Mismatches"));
        assert!(doc.contains("- **Rule C1: Floating Net** (ERROR)"));
        assert!(doc.contains("Net `floating_bias`."));
        assert!(doc.contains("(WARNING)"));
        assert!(doc.contains("Found 2 problems: 0 fatal errors, 1 error, 1 warning."));
    }

    #[test]
    fn test_goal_category_gets_own_section() {
        let diagnostics = vec![Diagnostic::error(
            Category::Goal,
            "G1",
            Details::new().with("goal", "differential input").with("found", vec!["CS1"]),
        )];
        let doc = FeedbackGenerator::new().render(&diagnostics).document;
        assert!(doc.contains("### Goal Mismatches"));
        assert!(doc.contains("`CS1`"));
    }

    #[test]
    fn test_unknown_rule_uses_fallback() {
        let diagnostics = vec![Diagnostic::error(
            Category::Component,
            "X9",
            Details::new().with("thing", 3),
        )];
        let doc = FeedbackGenerator::new().render(&diagnostics).document;
        assert!(doc.contains("Rule X9: Uncategorized Error"));
        assert!(doc.contains("`{\"thing\":3}`"));
    }

    #[test]
    fn test_formatters_tolerate_missing_fields() {
        let registry = FormatterRegistry::with_defaults();
        for rule_id in ["F0.0", "F0.1", "F0.2", "F0.3", "F0.4", "F0.5", "C1", "K1", "S1.1", "S1.2", "G1"] {
            assert!(registry.contains(rule_id), "no formatter for {}", rule_id);
            let diagnostic = Diagnostic::new(Severity::Error, Category::Component, rule_id, Details::new());
            let explanation = registry.explain(&diagnostic);
            assert!(!explanation.problem.is_empty());
            assert!(!explanation.fix.is_empty());
        }
    }

    #[test]
    fn test_malformed_record_names_fields() {
        let details = Details::new()
            .with("index", 2)
            .with("missing", vec!["connections"])
            .with("invalid", Vec::<&str>::new());
        let explanation = explain_malformed_record(&details);
        assert_eq!(
            explanation.problem,
            "The entire netlist payload is malformed: record #2 is missing `connections`."
        );
    }

    #[test]
    fn test_custom_formatter_registration() {
        let mut generator = FeedbackGenerator::new();
        generator.registry_mut().register("X9", |d: &Details| {
            Explanation::new("Custom", "Here.", format!("{:?}", d.text("what")), "Fix it.")
        });
        let diagnostics = vec![Diagnostic::error(
            Category::Component,
            "X9",
            Details::new().with("what", "thing"),
        )];
        let doc = generator.render(&diagnostics).document;
        assert!(doc.contains("Rule X9: Custom"));
        assert!(doc.contains("Some(\"thing\")"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let diagnostics = vec![floating("a"), floating("b")];
        let generator = FeedbackGenerator::new();
        assert_eq!(generator.render(&diagnostics), generator.render(&diagnostics));
    }
}
