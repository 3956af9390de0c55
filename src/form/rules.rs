//! Pluggable validity predicates and cleaning transformations

use serde_json::Value;

use super::value::FieldValue;

/// Validity predicate applied to every new field value
pub trait Validity: Send + Sync {
    fn is_valid(&self, value: &FieldValue) -> bool;
}

impl<F> Validity for F
where
    F: Fn(&FieldValue) -> bool + Send + Sync,
{
    fn is_valid(&self, value: &FieldValue) -> bool {
        self(value)
    }
}

/// Text projection has at least one character
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmpty;

impl Validity for NonEmpty {
    fn is_valid(&self, value: &FieldValue) -> bool {
        !value.is_empty()
    }
}

/// Text projection has at least `n` characters
#[derive(Debug, Clone, Copy)]
pub struct MinLength(pub usize);

impl Validity for MinLength {
    fn is_valid(&self, value: &FieldValue) -> bool {
        value.text_content().chars().count() >= self.0
    }
}

/// Text projection has at most `n` characters
#[derive(Debug, Clone, Copy)]
pub struct MaxLength(pub usize);

impl Validity for MaxLength {
    fn is_valid(&self, value: &FieldValue) -> bool {
        value.text_content().chars().count() <= self.0
    }
}

/// Every inner predicate holds
#[derive(Default)]
pub struct AllOf(pub Vec<Box<dyn Validity>>);

impl AllOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl Validity + 'static) -> Self {
        self.0.push(Box::new(rule));
        self
    }
}

impl Validity for AllOf {
    fn is_valid(&self, value: &FieldValue) -> bool {
        self.0.iter().all(|rule| rule.is_valid(value))
    }
}

/// Transformation applied by a cleaning pass
pub trait Cleaner: Send + Sync {
    fn clean(&self, value: &FieldValue) -> FieldValue;
}

/// Leaves the value untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Cleaner for Identity {
    fn clean(&self, value: &FieldValue) -> FieldValue {
        value.clone()
    }
}

/// Strips leading and trailing whitespace
///
/// The document keeps its structure: only the text nodes at either end are
/// trimmed, and those left empty are removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimWhitespace;

impl Cleaner for TrimWhitespace {
    fn clean(&self, value: &FieldValue) -> FieldValue {
        let trimmed = value.text_content().trim();
        if trimmed.len() == value.text_content().len() {
            return value.clone();
        }
        let mut document = value.document().clone();
        trim_edge(&mut document, Edge::Start);
        trim_edge(&mut document, Edge::End);
        FieldValue::new(trimmed, document)
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Start,
    End,
}

/// Trim text nodes from one end of the tree. Returns true once a node with
/// visible text has been reached.
fn trim_edge(node: &mut Value, edge: Edge) -> bool {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        let trimmed = match edge {
            Edge::Start => text.trim_start(),
            Edge::End => text.trim_end(),
        }
        .to_string();
        let reached = !trimmed.is_empty();
        node["text"] = Value::String(trimmed);
        return reached;
    }
    let Some(children) = node.get_mut("content").and_then(Value::as_array_mut) else {
        return false;
    };
    match edge {
        Edge::Start => {
            let mut i = 0;
            while i < children.len() {
                let reached = trim_edge(&mut children[i], edge);
                if is_empty_text(&children[i]) {
                    children.remove(i);
                } else {
                    i += 1;
                }
                if reached {
                    return true;
                }
            }
        }
        Edge::End => {
            let mut i = children.len();
            while i > 0 {
                i -= 1;
                let reached = trim_edge(&mut children[i], edge);
                if is_empty_text(&children[i]) {
                    children.remove(i);
                }
                if reached {
                    return true;
                }
            }
        }
    }
    false
}

fn is_empty_text(node: &Value) -> bool {
    node.get("text")
        .and_then(Value::as_str)
        .is_some_and(str::is_empty)
}
