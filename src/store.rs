use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;

pub const RESULT_EXTENSION: &str = ".json";

type StoreResult<T> = std::result::Result<T, StoreError>;

/// Raw bytes of a stored result, ready to be sent as an attachment.
#[derive(Debug)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Flat directory of scrape results, one pretty-printed JSON file per scrape.
///
/// There is no locking: distinct file names never clash, and `write` refuses
/// to replace a file that already exists.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Open the store, creating the directory if it is missing.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `document` under `filename`. Fails with `AlreadyExists` rather
    /// than overwriting an earlier result.
    pub async fn write(&self, filename: &str, document: &Value) -> StoreResult<PathBuf> {
        let path = self.resolve(filename)?;
        let mut body = serde_json::to_vec_pretty(document)?;
        body.push(b'\n');

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = write_all(&mut file, &body).await {
            // Never leave a truncated result behind.
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), bytes = body.len(), "result written");
        Ok(path)
    }

    /// Load and parse one result file.
    pub async fn read_one(&self, filename: &str) -> StoreResult<Value> {
        let bytes = self.read_result_bytes(filename).await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Names of all result files, newest first (names end in a timestamp).
    pub async fn list_all(&self) -> StoreResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                if name.ends_with(RESULT_EXTENSION) {
                    names.push(name);
                }
            }
        }

        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Raw file contents for an attachment download.
    pub async fn read_for_download(&self, filename: &str) -> StoreResult<Download> {
        let bytes = self.read_result_bytes(filename).await?;
        Ok(Download {
            filename: filename.to_string(),
            bytes,
        })
    }

    async fn read_result_bytes(&self, filename: &str) -> StoreResult<Vec<u8>> {
        let path = self.resolve(filename)?;
        if !filename.ends_with(RESULT_EXTENSION) {
            return Err(StoreError::NotFound(filename.to_string()));
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::IsADirectory => {
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Map a bare file name to a path inside the store. The store is flat, so
    /// anything that is not a single normal path component is rejected.
    pub fn resolve(&self, filename: &str) -> StoreResult<PathBuf> {
        let forbidden = || StoreError::Forbidden(filename.to_string());

        if filename.is_empty() || filename.contains(['/', '\\', '\0']) {
            return Err(forbidden());
        }

        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(filename)),
            _ => Err(forbidden()),
        }
    }
}

async fn write_all(file: &mut tokio::fs::File, body: &[u8]) -> std::io::Result<()> {
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, ResultStore) {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn resolve_rejects_traversal() {
        let (_dir, store) = store();
        for bad in ["../etc/passwd", "..", ".", "a/b.json", "a\\b.json", "/etc/passwd", ""] {
            assert!(
                matches!(store.resolve(bad), Err(StoreError::Forbidden(_))),
                "{bad:?} should be forbidden"
            );
        }
        assert!(store.resolve("shopee_bag_20240101-000000.json").is_ok());
    }

    #[tokio::test]
    async fn write_preserves_non_ascii_and_is_pretty() {
        let (_dir, store) = store();
        let doc = json!({ "keyword": "áo khoác", "data": [] });
        let path = store.write("x.json", &doc).await.unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("áo khoác"));
        assert!(text.contains("\n  \"keyword\""));
    }

    #[tokio::test]
    async fn write_refuses_to_overwrite() {
        let (_dir, store) = store();
        store.write("x.json", &json!({})).await.unwrap();
        let err = store.write("x.json", &json!({ "a": 1 })).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn read_one_requires_json_extension() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("notes.txt"), "{}").unwrap();
        assert!(matches!(store.read_one("notes.txt").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.read_one("missing.json").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn read_one_reports_corrupt_json() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        assert!(matches!(store.read_one("bad.json").await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn list_all_ignores_other_files_and_directories() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("c.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        assert_eq!(store.list_all().await.unwrap(), vec!["b.json", "a.json"]);
    }

    #[tokio::test]
    async fn list_all_on_missing_root_is_empty() {
        let (dir, store) = store();
        std::fs::remove_dir(dir.path()).unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
