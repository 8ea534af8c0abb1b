use serde_json::Value;

use crate::error::StoreError;
use crate::store::ResultStore;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Result file not found.")]
    NotFound,

    #[error("Error reading file: {0}")]
    Unreadable(String),
}

/// Load one stored result for display.
pub async fn view(store: &ResultStore, filename: &str) -> Result<Value, ViewError> {
    match store.read_one(filename).await {
        Ok(doc) => Ok(doc),
        Err(StoreError::NotFound(_) | StoreError::Forbidden(_)) => Err(ViewError::NotFound),
        Err(StoreError::Corrupt(msg)) => Err(ViewError::Unreadable(msg)),
        Err(other) => Err(ViewError::Unreadable(other.to_string())),
    }
}
