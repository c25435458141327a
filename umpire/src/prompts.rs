//! Prompt builders for the generate / check / correct loop.
//!
//! The generator is never called from here; these functions only render the
//! text a caller sends to it.

use crate::analyzer::feedback::Feedback;
use crate::library::{Library, LibraryError};

const FORMAT_INSTRUCTIONS: &str = r#"IMPORTANT: Output a JSON array (list) of components, not an object or a dictionary. Each component must be a dict with the following fields: 'id', 'block_type', and 'connections'.
- 'id': a unique string identifier for the component.
- 'block_type': the type of the component (e.g., 'DifferentialPairN', 'CurrentMirrorP', etc.).
- 'connections': a dictionary mapping terminal names to net names.

Below is the library of allowed components and their terminal names. Use only these block types and terminal names in your netlist."#;

const EXAMPLE_OUTPUT: &str = r#"```json
[
  {
    "id": "INPUT_STAGE",
    "block_type": "DifferentialPairN",
    "connections": {
      "v_in+": "IN+",
      "v_in-": "IN-",
      "i_out1": "n1",
      "i_out2": "n2",
      "i_in_bias": "nbias",
      "pwr_vdd": "VDD",
      "pwr_gnd": "GND"
    }
  },
  {
    "id": "ACTIVE_LOAD",
    "block_type": "CurrentMirrorP",
    "connections": {
      "i_in_ref": "n1",
      "i_out_load": "n2",
      "pwr_vdd": "VDD"
    }
  }
]
```"#;

fn library_context(library: &Library) -> Result<String, LibraryError> {
    Ok(format!(
        "{}\n\n```json\n{}\n```\n\nExample output:\n{}",
        FORMAT_INSTRUCTIONS,
        library.to_pretty_json()?,
        EXAMPLE_OUTPUT
    ))
}

/// First prompt of a run: library, format rules and the user's specification.
pub fn build_generation_prompt(library: &Library, specs: &str) -> Result<String, LibraryError> {
    Ok(format!(
        r#"You are an expert analog circuit designer AI. Your task is to generate a valid JSON netlist based on the following user specifications.

{}

--- USER SPECIFICATIONS ---
{}

---------------------------

Please generate the JSON netlist now, following the example format exactly."#,
        library_context(library)?,
        specs.trim_end()
    ))
}

/// Follow-up prompt carrying the previous output and its feedback document.
pub fn build_correction_prompt(
    library: &Library,
    previous_output: &str,
    feedback: &Feedback,
) -> Result<String, LibraryError> {
    Ok(format!(
        r#"You are an expert analog circuit designer AI.
{}

Below is the previous design output and the Umpire's feedback.
Your task is to correct the JSON netlist according to the Umpire's feedback.

--- PREVIOUS LLM OUTPUT ---
{}

--- UMPIRE FEEDBACK (FAILED TESTS) ---
{}

Please provide a corrected JSON netlist, enclosed in a single ```json ... ``` code block, that addresses all the Umpire's feedback and follows the example format exactly."#,
        library_context(library)?,
        previous_output.trim_end(),
        feedback.document.trim_end()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::feedback::{FeedbackGenerator, ERRORS_HEADER};
    use crate::analyzer::rules::{Category, Details, Diagnostic};
    use crate::library::builtin_library;
    use crate::netlist::parse_candidate;

    #[test]
    fn test_generation_prompt_embeds_library_and_specs() {
        let library = builtin_library().unwrap();
        let prompt = build_generation_prompt(&library, "A differential amplifier.\n").unwrap();
        assert!(prompt.contains("\"CurrentMirrorN_Load\""));
        assert!(prompt.contains("--- USER SPECIFICATIONS ---\nA differential amplifier.\n"));
        assert!(prompt.ends_with("following the example format exactly."));
    }

    #[test]
    fn test_example_output_is_a_valid_candidate() {
        let value = parse_candidate(EXAMPLE_OUTPUT).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_correction_prompt_carries_feedback() {
        let library = builtin_library().unwrap();
        let diagnostics = vec![Diagnostic::error(
            Category::Component,
            "S1.1",
            Details::new().with("missing_role", "LOAD_ACTIVE"),
        )];
        let feedback = FeedbackGenerator::new().render(&diagnostics);
        let prompt = build_correction_prompt(&library, "```json\n[]\n```", &feedback).unwrap();

        let previous = prompt.find("--- PREVIOUS LLM OUTPUT ---").unwrap();
        let umpire = prompt.find("--- UMPIRE FEEDBACK (FAILED TESTS) ---").unwrap();
        assert!(previous < umpire);
        assert!(prompt[umpire..].contains(ERRORS_HEADER));
        assert!(prompt.contains("Rule S1.1"));
    }
}
