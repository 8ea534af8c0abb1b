use serde::Serialize;
use serde_json::Value;

use crate::store::ResultStore;

/// One row of the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultFileSummary {
    pub filename: String,
    pub keyword: String,
    pub item_count: usize,
    pub created_at: String,
}

impl ResultFileSummary {
    pub fn from_document(filename: &str, doc: &Value) -> Self {
        Self {
            filename: filename.to_string(),
            keyword: string_field(doc, "keyword", "Unknown"),
            item_count: doc.get("data").and_then(Value::as_array).map_or(0, Vec::len),
            created_at: string_field(doc, "createdAt", "N/A"),
        }
    }
}

fn string_field(doc: &Value, key: &str, default: &str) -> String {
    match doc.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Summaries of every stored result, newest first. Files that cannot be read
/// or parsed, or that hold anything but a JSON object, are left out. An
/// unreadable store gives an empty list.
pub async fn list_history(store: &ResultStore) -> Vec<ResultFileSummary> {
    let names = match store.list_all().await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(error = %e, "could not list result store");
            return Vec::new();
        }
    };

    let mut summaries = Vec::with_capacity(names.len());
    for name in names {
        match store.read_one(&name).await {
            Ok(doc) if doc.is_object() => summaries.push(ResultFileSummary::from_document(&name, &doc)),
            Ok(_) => tracing::debug!(file = %name, "skipping result that is not a JSON object"),
            Err(e) => tracing::debug!(file = %name, error = %e, "skipping unreadable result"),
        }
    }
    summaries
}
