use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use super::extract::ExtractedDocument;

/// Deduplicated, lowercased, trimmed and sorted tokens of one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedSet(Vec<String>);

impl NormalizedSet {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique = tokens
            .into_iter()
            .map(|token| token.as_ref().to_lowercase().trim().to_string())
            .collect::<BTreeSet<String>>();
        Self(unique.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    /// Newline-joined form used for similarity comparison.
    pub fn joined(&self) -> String {
        self.0.join("\n")
    }
}

/// How the comparison payload was located inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRoot {
    Field,
    MissingField,
    Sequence,
    Unsupported,
    Unparseable,
}

pub fn normalize(document: &ExtractedDocument, field: &str) -> NormalizedSet {
    normalize_with_root(document, field).0
}

pub(crate) fn normalize_with_root(
    document: &ExtractedDocument,
    field: &str,
) -> (NormalizedSet, PayloadRoot) {
    let Some(value) = document.value() else {
        return (NormalizedSet::default(), PayloadRoot::Unparseable);
    };

    let (payload, root) = match value {
        Value::Object(map) => match map.get(field) {
            Some(payload) => (Some(payload), PayloadRoot::Field),
            None => (None, PayloadRoot::MissingField),
        },
        Value::Array(_) => (Some(value), PayloadRoot::Sequence),
        _ => (None, PayloadRoot::Unsupported),
    };

    let mut tokens = Vec::<String>::new();
    if let Some(payload) = payload {
        collect_tokens(payload, &mut tokens);
    }
    (NormalizedSet::from_tokens(tokens), root)
}

fn collect_tokens(value: &Value, tokens: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(name) = map.get("name") {
                tokens.push(display_form(name));
            }
            for child in map.values() {
                collect_tokens(child, tokens);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_tokens(item, tokens);
            }
        }
        Value::String(text) => tokens.push(text.clone()),
        Value::Number(_) | Value::Bool(_) | Value::Null => {}
    }
}

/// String form of a `name` value; non-strings render as literals.
fn display_form(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => literal_form(other),
    }
}

fn literal_form(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => quote_literal(text),
        Value::Array(items) => {
            let inner = items.iter().map(literal_form).collect::<Vec<_>>();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner = map
                .iter()
                .map(|(key, child)| format!("{}: {}", quote_literal(key), literal_form(child)))
                .collect::<Vec<_>>();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn quote_literal(text: &str) -> String {
    if text.contains('\'') && !text.contains('"') {
        format!("\"{}\"", text.replace('\\', "\\\\"))
    } else {
        format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}
