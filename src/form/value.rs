//! Field value objects and the status snapshot shared by machines and the aggregator

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Rich-content value produced by an editing surface
///
/// Carries two projections: the plain text used by validity predicates and
/// the serializable document used for persistence. Values are never mutated
/// in place; every edit produces a new `FieldValue`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    text: String,
    document: Value,
}

impl FieldValue {
    /// Create a value from both projections as reported by the editing surface
    pub fn new(text: impl Into<String>, document: Value) -> Self {
        Self {
            text: text.into(),
            document,
        }
    }

    /// Create a value holding a single paragraph of plain text
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let paragraph = if text.is_empty() {
            json!({ "type": "paragraph" })
        } else {
            json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": text }],
            })
        };
        Self {
            document: json!({ "type": "doc", "content": [paragraph] }),
            text,
        }
    }

    /// Plain-text projection
    pub fn text_content(&self) -> &str {
        &self.text
    }

    /// Serializable projection
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// String encoding of the serializable projection
    pub fn serialized(&self) -> String {
        self.document.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::plain("")
    }
}

/// Complete status snapshot emitted by a field machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStatus {
    pub field_name: String,
    /// Empty until the field holds a value
    pub serialized_data: String,
    pub is_clean: bool,
    pub is_valid: bool,
}

impl FieldStatus {
    /// Placeholder for a declared field that has not reported yet
    pub fn pending(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            serialized_data: String::new(),
            is_clean: false,
            is_valid: false,
        }
    }

    /// Clean and valid at the same time
    pub fn is_ready(&self) -> bool {
        self.is_clean && self.is_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod field_value {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_plain_exposes_text() {
            let value = FieldValue::plain("hello");
            assert_eq!(value.text_content(), "hello");
            assert!(!value.is_empty());
        }

        #[test]
        fn test_plain_document_shape() {
            let value = FieldValue::plain("hello");
            assert_eq!(
                value.document(),
                &json!({
                    "type": "doc",
                    "content": [{
                        "type": "paragraph",
                        "content": [{ "type": "text", "text": "hello" }],
                    }],
                })
            );
        }

        #[test]
        fn test_empty_plain_has_bare_paragraph() {
            let value = FieldValue::plain("");
            assert!(value.is_empty());
            assert_eq!(
                value.document(),
                &json!({ "type": "doc", "content": [{ "type": "paragraph" }] })
            );
        }

        #[test]
        fn test_default_is_empty_plain() {
            assert_eq!(FieldValue::default(), FieldValue::plain(""));
        }

        #[test]
        fn test_serialized_is_compact_json() {
            let value = FieldValue::new("x", json!({ "type": "doc" }));
            assert_eq!(value.serialized(), r#"{"type":"doc"}"#);
        }

        #[test]
        fn test_projections_are_independent() {
            // A surface may report text that differs from what the document renders
            let doc = json!({ "type": "doc", "content": [{ "type": "image" }] });
            let value = FieldValue::new("", doc);
            assert!(value.is_empty());
            assert!(value.serialized().contains("image"));
        }
    }

    mod field_status {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_pending_is_not_ready() {
            let status = FieldStatus::pending("question");
            assert_eq!(status.field_name, "question");
            assert_eq!(status.serialized_data, "");
            assert!(!status.is_clean);
            assert!(!status.is_valid);
            assert!(!status.is_ready());
        }

        #[test]
        fn test_ready_requires_both_flags() {
            let mut status = FieldStatus::pending("question");
            status.is_clean = true;
            assert!(!status.is_ready());
            status.is_valid = true;
            assert!(status.is_ready());
            status.is_clean = false;
            assert!(!status.is_ready());
        }

        #[test]
        fn test_serde_uses_snake_case_keys() {
            let status = FieldStatus::pending("context");
            let json = serde_json::to_value(&status).unwrap();
            assert_eq!(
                json,
                json!({
                    "field_name": "context",
                    "serialized_data": "",
                    "is_clean": false,
                    "is_valid": false,
                })
            );
        }
    }
}
