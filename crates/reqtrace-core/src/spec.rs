//! Spec document loading: the ordered list of expected transitions.

use crate::classify::Status;
use crate::document::{self, DocValue};
use eyre::{Result, bail};
use serde::Serialize;
use std::path::Path;

/// One expected state transition from the spec document.
///
/// `status` and `status_detail` start empty and are populated exclusively by
/// the classifier; everything else is read-only after loading.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransitionSpec {
    pub id: String,
    #[serde(rename = "from")]
    pub from_state: String,
    #[serde(rename = "to")]
    pub to_state: String,
    pub trigger: String,
    /// Guard conditions, in document order.
    pub conditions: Vec<String>,
    pub safety_critical: bool,
    /// Name of the test function expected to cover this transition.
    pub test_function: String,
    /// Hint for which source file should hold the test (informational).
    pub test_file: String,
    /// Requirement identifier this transition traces to.
    pub requirement: String,
    pub description: String,

    /// Verdict assigned by the classifier.
    pub status: Option<Status>,
    /// Human-readable evidence for the verdict.
    pub status_detail: String,
}

/// The parsed spec document: transitions in document order plus the
/// free-form metadata mapping.
#[derive(Debug, Clone, Default)]
pub struct SpecDocument {
    pub transitions: Vec<TransitionSpec>,
    pub metadata: Vec<(String, DocValue)>,
}

impl SpecDocument {
    /// Load and interpret a spec document from disk.
    ///
    /// Fails on unreadable or unparsable input and on documents with zero
    /// transitions; those are structural errors the caller cannot classify
    /// around.
    pub fn load(path: &Path) -> Result<Self> {
        let doc = document::load_document(path)?;
        let spec = Self::from_value(&doc);
        if spec.transitions.is_empty() {
            bail!("No transitions found in spec document {}", path.display());
        }
        Ok(spec)
    }

    /// Interpret an already-parsed document tree.
    pub fn from_value(doc: &DocValue) -> Self {
        let transitions = doc
            .get("transitions")
            .and_then(DocValue::as_seq)
            .map(|items| items.iter().map(transition_from_value).collect())
            .unwrap_or_default();

        let metadata = doc
            .get("metadata")
            .and_then(DocValue::as_map)
            .map(|entries| entries.to_vec())
            .unwrap_or_default();

        SpecDocument {
            transitions,
            metadata,
        }
    }
}

fn transition_from_value(value: &DocValue) -> TransitionSpec {
    let text = |key: &str| {
        value
            .get(key)
            .map(DocValue::scalar_string)
            .unwrap_or_default()
    };

    let conditions = value
        .get("conditions")
        .and_then(DocValue::as_seq)
        .map(|items| items.iter().map(DocValue::scalar_string).collect())
        .unwrap_or_default();

    TransitionSpec {
        id: text("id"),
        from_state: text("from"),
        to_state: text("to"),
        trigger: text("trigger"),
        conditions,
        safety_critical: value
            .get("safety_critical")
            .and_then(DocValue::as_bool)
            .unwrap_or(false),
        test_function: text("test_function"),
        test_file: text("test_file"),
        requirement: text("requirement"),
        description: text("description"),
        status: None,
        status_detail: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_subset;
    use indoc::indoc;

    #[test]
    fn test_from_value_maps_fields() {
        let doc = parse_subset(indoc! {r#"
            metadata:
              version: 3

            transitions:
              - id: T1
                from: IDLE
                to: CONNECTED
                trigger: "plug inserted"
                conditions:
                  - "contactor open"
                safety_critical: true
                test_function: test_idle_to_connected
                test_file: test_state_transitions.c
                requirement: REQ-ST-001
                description: "Vehicle plug-in"
        "#});

        let spec = SpecDocument::from_value(&doc);
        assert_eq!(spec.transitions.len(), 1);
        assert_eq!(spec.metadata.len(), 1);

        let t = &spec.transitions[0];
        assert_eq!(t.id, "T1");
        assert_eq!(t.from_state, "IDLE");
        assert_eq!(t.to_state, "CONNECTED");
        assert_eq!(t.trigger, "plug inserted");
        assert_eq!(t.conditions, ["contactor open"]);
        assert!(t.safety_critical);
        assert_eq!(t.test_function, "test_idle_to_connected");
        assert_eq!(t.requirement, "REQ-ST-001");
        assert_eq!(t.status, None);
        assert_eq!(t.status_detail, "");
    }

    #[test]
    fn test_from_value_missing_fields_default() {
        let doc = parse_subset(indoc! {"
            transitions:
              - id: T9
        "});
        let spec = SpecDocument::from_value(&doc);
        let t = &spec.transitions[0];
        assert_eq!(t.id, "T9");
        assert_eq!(t.test_function, "");
        assert!(!t.safety_critical);
        assert!(t.conditions.is_empty());
    }

    #[test]
    fn test_from_value_preserves_document_order() {
        let doc = parse_subset(indoc! {"
            transitions:
              - id: T3
              - id: T1
              - id: T2
        "});
        let spec = SpecDocument::from_value(&doc);
        let ids: Vec<&str> = spec.transitions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["T3", "T1", "T2"]);
    }

    #[test]
    fn test_load_rejects_empty_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.yaml");
        std::fs::write(&path, "metadata:\n  version: 1\n").unwrap();
        assert!(SpecDocument::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_missing_file() {
        assert!(SpecDocument::load(Path::new("/nonexistent/spec.yaml")).is_err());
    }
}
