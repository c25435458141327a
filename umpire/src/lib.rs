//! Umpire - netlist validation for generated analog circuits
//!
//! This library checks a candidate netlist (a list of component instances
//! wired together by named nets) against a component library, and reports
//! structural and semantic mistakes such as floating nets, incompatible
//! load devices, missing essential blocks and unmet design goals. The result
//! is rendered as a Markdown feedback document that can be handed back to
//! the generator that produced the netlist.
//!
//! # Quick Start
//!
//! ```no_run
//! use umpire::{Goals, Umpire};
//!
//! let umpire = Umpire::with_builtin_library().unwrap();
//! let candidate = serde_json::json!([
//!     {"id": "CS", "block_type": "CommonSourceN",
//!      "connections": {"v_in": "IN", "i_out": "OUT", "pwr_gnd": "GND"}}
//! ]);
//!
//! let evaluation = umpire.evaluate(&candidate, &Goals::new());
//! for diagnostic in &evaluation.diagnostics {
//!     println!("{} {}", diagnostic.level, diagnostic.rule_id);
//! }
//! println!("{}", evaluation.feedback.document);
//! ```
//!
//! # Features
//!
//! - **Sanity gate**: payload shape, unknown block types, duplicate ids
//! - **Rules**: floating nets, stage/load device compatibility, essential
//!   roles, input-topology goals
//! - **Feedback**: categorized Markdown report with a fix per problem
//! - **Prompts**: generation and correction prompts for the surrounding loop

pub mod analyzer;
pub mod core;
pub mod library;
pub mod netlist;
pub mod prompts;

// Re-export main types
pub use analyzer::feedback::{Explanation, Feedback, FeedbackGenerator, FormatterRegistry};
pub use analyzer::rules::{Category, Details, Diagnostic, Rule, RulesEngine, Severity};
pub use crate::core::{
    load_goals_from_file, parse_goal_assignment, CheckOptions, CheckStats, Evaluation, Umpire,
    UmpireError,
};
pub use library::{
    builtin_library, load_library_from_file, ComponentSpec, DeviceType, Library, LibraryError,
    RoleVocabulary, TerminalKind,
};
pub use netlist::{parse_candidate, CandidateError, Circuit, ComponentInstance, Goals};
pub use prompts::{build_correction_prompt, build_generation_prompt};

/// Check raw generator text with the built-in library (convenience wrapper).
pub fn evaluate_text(text: &str, goals: &Goals) -> Result<Evaluation, UmpireError> {
    Ok(Umpire::with_builtin_library()?.evaluate_text(text, goals))
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CheckOptions, CheckStats, Diagnostic, Evaluation, Goals, Severity, Umpire, UmpireError,
    };
}
