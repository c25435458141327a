//! Sanity gate.
//!
//! Structural checks that run before any rule. The first failure is returned
//! as a single FATAL diagnostic; no rule sees a payload that fails here.
//!
//! Order of checks:
//! 1. the payload is a non-empty array (`F0.1`)
//! 2. every element is an object (`F0.2`) carrying `id`, `block_type` and
//!    `connections` of the right types (`F0.3`)
//! 3. every block type resolves in the library (`F0.4`)
//! 4. component ids are unique (`F0.5`)

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use crate::analyzer::rules::{rule_ids, Details, Diagnostic};
use crate::library::Library;
use crate::netlist::ComponentInstance;

const BLOCK_TYPE_KEYS: [&str; 2] = ["block_type", "blockType"];

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check a decoded candidate and convert it into component instances.
pub fn run_sanity_checks(
    candidate: &Value,
    library: &Library,
) -> Result<Vec<ComponentInstance>, Diagnostic> {
    let entries = match candidate {
        Value::Array(entries) if !entries.is_empty() => entries,
        Value::Array(_) => {
            return Err(Diagnostic::fatal(
                rule_ids::NOT_A_LIST,
                Details::new().with("found", "empty array"),
            ))
        }
        other => {
            return Err(Diagnostic::fatal(
                rule_ids::NOT_A_LIST,
                Details::new().with("found", json_kind(other)),
            ))
        }
    };

    // Shape pass over the whole payload first, so a malformed payload is
    // never reported as an unknown block.
    let mut instances = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let Value::Object(record) = entry else {
            return Err(Diagnostic::fatal(
                rule_ids::NOT_A_RECORD,
                Details::new()
                    .with("index", index)
                    .with("found", json_kind(entry)),
            ));
        };
        instances.push(parse_record(index, record)?);
    }

    check_instances(&instances, library)?;
    Ok(instances)
}

/// Library-level checks shared by JSON and typed inputs.
pub fn check_instances(instances: &[ComponentInstance], library: &Library) -> Result<(), Diagnostic> {
    if instances.is_empty() {
        return Err(Diagnostic::fatal(
            rule_ids::NOT_A_LIST,
            Details::new().with("found", "empty array"),
        ));
    }

    if let Some(unknown) = instances.iter().find(|c| !library.contains(&c.block_type)) {
        return Err(Diagnostic::fatal(
            rule_ids::UNKNOWN_BLOCK,
            Details::new()
                .with("component_id", unknown.id.as_str())
                .with("block_type", unknown.block_type.as_str()),
        ));
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = instances.iter().find(|c| !seen.insert(c.id.as_str())) {
        return Err(Diagnostic::fatal(
            rule_ids::DUPLICATE_ID,
            Details::new().with("component_id", duplicate.id.as_str()),
        ));
    }

    Ok(())
}

fn parse_record(index: usize, record: &Map<String, Value>) -> Result<ComponentInstance, Diagnostic> {
    let mut missing: Vec<&str> = Vec::new();
    let mut invalid: Vec<&str> = Vec::new();

    let id = match record.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(_) => {
            invalid.push("id");
            None
        }
        None => {
            missing.push("id");
            None
        }
    };

    let block_type = match BLOCK_TYPE_KEYS.iter().find_map(|k| record.get(*k)) {
        Some(Value::String(block_type)) => Some(block_type.clone()),
        Some(_) => {
            invalid.push("block_type");
            None
        }
        None => {
            missing.push("block_type");
            None
        }
    };

    let connections = match record.get("connections") {
        Some(Value::Object(map)) => {
            let mut connections = BTreeMap::new();
            for (terminal, net) in map {
                match net {
                    Value::String(net) => {
                        connections.insert(terminal.clone(), net.clone());
                    }
                    _ => {
                        invalid.push("connections");
                        break;
                    }
                }
            }
            Some(connections)
        }
        Some(_) => {
            invalid.push("connections");
            None
        }
        None => {
            missing.push("connections");
            None
        }
    };

    match (id, block_type, connections) {
        (Some(id), Some(block_type), Some(connections)) if invalid.is_empty() => {
            Ok(ComponentInstance {
                id,
                block_type,
                connections,
            })
        }
        (id, _, _) => {
            let mut details = Details::new()
                .with("index", index)
                .with("missing", missing)
                .with("invalid", invalid);
            if let Some(id) = id {
                details = details.with("component_id", id);
            }
            Err(Diagnostic::fatal(rule_ids::MALFORMED_RECORD, details))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::{Category, Severity};
    use crate::library::builtin_library;
    use serde_json::json;

    fn gate(candidate: Value) -> Result<Vec<ComponentInstance>, Diagnostic> {
        let library = builtin_library().unwrap();
        run_sanity_checks(&candidate, &library)
    }

    #[test]
    fn test_rejects_non_list() {
        let err = gate(json!({"components": []})).unwrap_err();
        assert_eq!(err.rule_id, "F0.1");
        assert_eq!(err.level, Severity::Fatal);
        assert_eq!(err.category, Category::Format);
        assert_eq!(err.details.text("found"), Some("object"));
    }

    #[test]
    fn test_rejects_empty_list() {
        let err = gate(json!([])).unwrap_err();
        assert_eq!(err.rule_id, "F0.1");
        assert_eq!(err.details.text("found"), Some("empty array"));
    }

    #[test]
    fn test_rejects_non_record_entry() {
        let err = gate(json!([{"id": "A", "block_type": "SimpleBiasN", "connections": {}}, "oops"])).unwrap_err();
        assert_eq!(err.rule_id, "F0.2");
        assert_eq!(err.details.get("index"), Some(&json!(1)));
    }

    #[test]
    fn test_reports_missing_connections() {
        let err = gate(json!([{"id": "A", "block_type": "SimpleBiasN"}])).unwrap_err();
        assert_eq!(err.rule_id, "F0.3");
        assert_eq!(err.details.list("missing"), vec!["connections"]);
        assert_eq!(err.details.text("component_id"), Some("A"));
    }

    #[test]
    fn test_shape_errors_win_over_unknown_blocks() {
        let err = gate(json!([
            {"id": "A", "block_type": "NoSuchBlock", "connections": {}},
            {"id": "B", "connections": {}}
        ]))
        .unwrap_err();
        assert_eq!(err.rule_id, "F0.3");
        assert_eq!(err.details.list("missing"), vec!["block_type"]);
    }

    #[test]
    fn test_reports_wrong_field_types() {
        let err = gate(json!([{"id": 7, "block_type": "SimpleBiasN", "connections": {"pwr_gnd": 1}}])).unwrap_err();
        assert_eq!(err.rule_id, "F0.3");
        assert_eq!(err.details.list("invalid"), vec!["id", "connections"]);
        assert!(err.details.list("missing").is_empty());
    }

    #[test]
    fn test_reports_unknown_block_type() {
        let err = gate(json!([{"id": "X1", "block_type": "Opamp9000", "connections": {}}])).unwrap_err();
        assert_eq!(err.rule_id, "F0.4");
        assert_eq!(err.details.text("component_id"), Some("X1"));
        assert_eq!(err.details.text("block_type"), Some("Opamp9000"));
    }

    #[test]
    fn test_reports_duplicate_ids() {
        let err = gate(json!([
            {"id": "A", "block_type": "SimpleBiasN", "connections": {}},
            {"id": "A", "block_type": "CurrentMirrorP", "connections": {}}
        ]))
        .unwrap_err();
        assert_eq!(err.rule_id, "F0.5");
        assert_eq!(err.details.text("component_id"), Some("A"));
    }

    #[test]
    fn test_accepts_camel_case_block_type() {
        let instances = gate(json!([{"id": "A", "blockType": "SimpleBiasN", "connections": {"pwr_gnd": "GND"}}])).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].block_type, "SimpleBiasN");
        assert_eq!(instances[0].net_of("pwr_gnd"), Some("GND"));
    }
}
