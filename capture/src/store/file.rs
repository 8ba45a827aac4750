use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{Entries, KvStore};

/// [`KvStore`] persisted as one JSON object on disk.
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename, so a crash leaves either the old or the new object.
pub struct FileKv {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read store at {}", self.path.display()))
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Entries::new());
        }
        match serde_json::from_slice::<Value>(&bytes)
            .with_context(|| format!("parse store at {}", self.path.display()))?
        {
            Value::Object(map) => Ok(map),
            _ => bail!("store at {} is not a JSON object", self.path.display()),
        }
    }

    async fn persist(&self, entries: &Entries) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("create store directory {}", dir.display()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace store at {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileKv {
    async fn get(&self, keys: &[&str]) -> Result<Entries> {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        let mut found = Entries::new();
        for key in keys {
            if let Some(value) = all.remove(*key) {
                found.insert(key.to_string(), value);
            }
        }
        Ok(found)
    }

    async fn set(&self, entries: Entries) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        for (key, value) in entries {
            all.insert(key, value);
        }
        self.persist(&all).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        let before = all.len();
        for key in keys {
            all.remove(*key);
        }
        if all.len() == before {
            return Ok(());
        }
        self.persist(&all).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempdir().expect("tempdir");
        let kv = FileKv::new(dir.path().join("nested/storage.json"));
        assert!(kv.get(&["anything"]).await.expect("get").is_empty());
        assert!(kv.keys().await.expect("keys").is_empty());
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/storage.json");

        let mut entries = Entries::new();
        entries.insert("a".to_string(), serde_json::json!([1, 2]));
        entries.insert("b".to_string(), serde_json::json!("x"));
        FileKv::new(&path).set(entries).await.expect("set");

        let reopened = FileKv::new(&path);
        let found = reopened.get(&["a", "missing"]).await.expect("get");
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"], serde_json::json!([1, 2]));

        reopened.remove(&["a"]).await.expect("remove");
        assert_eq!(reopened.keys().await.expect("keys"), vec!["b".to_string()]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn rejects_non_object_files() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2, 3]").expect("write");
        assert!(FileKv::new(&path).get(&["a"]).await.is_err());
    }
}
