//! Case-insensitive search over keys and primitive values
//!
//! Paths come back in the dotted form [`SaveDocument::get`] takes, with
//! array indices as segments.

use serde::Serialize;
use serde_json::Value;

use crate::document::SaveDocument;
use crate::format::number_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Key,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub path: String,
    pub match_type: MatchType,
    pub matched_text: String,
}

/// Every key and every string, number or bool containing `query`, in
/// document order. A blank query matches nothing.
pub fn search(doc: &SaveDocument, query: &str) -> Vec<SearchMatch> {
    let query = query.trim().to_lowercase();
    let mut matches = Vec::new();
    if !query.is_empty() {
        search_value(doc.root(), "", &query, &mut matches);
    }
    matches
}

fn search_value(value: &Value, path: &str, query: &str, matches: &mut Vec<SearchMatch>) {
    let entries: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => return,
    };

    for (key, child) in entries {
        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };

        if key.to_lowercase().contains(query) {
            matches.push(SearchMatch {
                path: child_path.clone(),
                match_type: MatchType::Key,
                matched_text: key,
            });
        }

        if let Some(text) = primitive_text(child) {
            if text.to_lowercase().contains(query) {
                matches.push(SearchMatch {
                    path: child_path.clone(),
                    match_type: MatchType::Value,
                    matched_text: text,
                });
            }
        }

        search_value(child, &child_path, query, matches);
    }
}

fn primitive_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
