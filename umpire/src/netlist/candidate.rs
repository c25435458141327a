//! Candidate envelope parsing.
//!
//! Generators usually wrap the netlist in prose and a fenced ```json block.
//! This module pulls the payload out of that text and decodes it into a
//! `serde_json::Value` for the sanity gate. The engine itself never looks at
//! the envelope.

use serde_json::Value;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    #[error("No JSON code block (```json) found in the generator output")]
    NoJsonBlock,
    #[error("Found the start of a JSON code block but no closing fence")]
    UnterminatedBlock,
    #[error("Failed to parse JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Locate the JSON payload inside raw generator text.
///
/// Uses the first ```json fenced block when present; otherwise accepts the
/// whole text if it already looks like a bare JSON document.
pub fn extract_json_block(text: &str) -> Result<&str, CandidateError> {
    if let Some(start) = text.find(JSON_FENCE) {
        let body_start = start + JSON_FENCE.len();
        let body_len = text[body_start..]
            .find(FENCE)
            .ok_or(CandidateError::UnterminatedBlock)?;
        return Ok(text[body_start..body_start + body_len].trim());
    }

    let trimmed = text.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        Ok(trimmed)
    } else {
        Err(CandidateError::NoJsonBlock)
    }
}

/// Extract and decode the candidate payload.
pub fn parse_candidate(text: &str) -> Result<Value, CandidateError> {
    let payload = extract_json_block(text)?;
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_extracted() {
        let text = "Here is the design:\n```json\n[{\"id\": \"A\"}]\n```\nThanks.";
        assert_eq!(extract_json_block(text).unwrap(), "[{\"id\": \"A\"}]");
    }

    #[test]
    fn test_first_block_wins() {
        let text = "```json\n[1]\n```\nand\n```json\n[2]\n```";
        assert_eq!(parse_candidate(text).unwrap(), serde_json::json!([1]));
    }

    #[test]
    fn test_bare_document_accepted() {
        let value = parse_candidate("  [ {\"id\": \"A\"} ]\n").unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_prose_only_rejected() {
        assert!(matches!(
            parse_candidate("I could not design that circuit."),
            Err(CandidateError::NoJsonBlock)
        ));
    }

    #[test]
    fn test_unterminated_block_rejected() {
        assert!(matches!(
            parse_candidate("```json\n[1, 2"),
            Err(CandidateError::UnterminatedBlock)
        ));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            parse_candidate("```json\n[1, 2,,]\n```"),
            Err(CandidateError::InvalidJson(_))
        ));
    }
}
