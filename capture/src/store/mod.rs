//! Persistent storage for curated turns.
//!
//! [`KvStore`] is the raw key-value contract (JSON values, string keys)
//! the way an extension storage area exposes it. [`TurnStore`] layers the
//! record semantics on top: one ordered, duplicate-free turn list per page
//! URL, the page's last summary, and nothing else.

pub mod file;
pub mod memory;

use anyhow::{Context, Result};
use async_trait::async_trait;
use crossai_types::Turn;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

pub use file::FileKv;
pub use memory::MemoryKv;

pub type Entries = Map<String, Value>;

/// Global usage counter key.
pub const USAGE_KEY: &str = "usage";

const SUMMARY_SUFFIX: &str = " last_summary";

/// Key holding the last summary produced for `url`.
pub fn summary_key(url: &str) -> String {
    format!("{url}{SUMMARY_SUFFIX}")
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Values for the requested keys; absent keys are simply missing from the map.
    async fn get(&self, keys: &[&str]) -> Result<Entries>;

    async fn set(&self, entries: Entries) -> Result<()>;

    async fn remove(&self, keys: &[&str]) -> Result<()>;

    async fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Clone)]
pub struct TurnStore {
    kv: Arc<dyn KvStore>,
    write_gate: Arc<Mutex<()>>,
}

impl TurnStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn kv(&self) -> Arc<dyn KvStore> {
        self.kv.clone()
    }

    async fn raw_turns(&self, url: &str) -> Result<Vec<Value>> {
        let mut entries = self
            .kv
            .get(&[url])
            .await
            .with_context(|| format!("read stored turns for {url}"))?;
        Ok(match entries.remove(url) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        })
    }

    /// Stored turns for `url` in save order. Records that do not decode
    /// are skipped.
    pub async fn turns(&self, url: &str) -> Result<Vec<Turn>> {
        let raw = self.raw_turns(url).await?;
        Ok(decode_turns(url, raw))
    }

    pub async fn contains(&self, url: &str, turn: &Turn) -> Result<bool> {
        Ok(self.turns(url).await?.iter().any(|t| t == turn))
    }

    pub async fn stored_count(&self, url: &str) -> Result<usize> {
        Ok(self.turns(url).await?.len())
    }

    /// Append `turn` unless an equal one is already stored. Returns whether
    /// anything was written.
    pub async fn insert(&self, url: &str, turn: &Turn) -> Result<bool> {
        let _guard = self.write_gate.lock().await;
        let mut raw = self.raw_turns(url).await?;
        let exists = raw
            .iter()
            .filter_map(|v| Turn::from_value(v.clone()).ok())
            .any(|t| &t == turn);
        if exists {
            return Ok(false);
        }

        raw.push(serde_json::to_value(turn)?);
        let mut entries = Entries::new();
        entries.insert(url.to_string(), Value::Array(raw));
        self.kv
            .set(entries)
            .await
            .with_context(|| format!("save turn for {url}"))?;
        tracing::debug!(url, title = %turn.title(), "saved turn");
        Ok(true)
    }

    /// Remove every stored turn for `url`. The last summary is kept.
    pub async fn clear(&self, url: &str) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        self.kv
            .remove(&[url])
            .await
            .with_context(|| format!("clear stored turns for {url}"))?;
        tracing::info!(url, "cleared stored turns");
        Ok(())
    }

    pub async fn last_summary(&self, url: &str) -> Result<Option<String>> {
        let key = summary_key(url);
        let mut entries = self.kv.get(&[key.as_str()]).await?;
        Ok(match entries.remove(&key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        })
    }

    /// Replace the stored summary for `url`.
    pub async fn set_last_summary(&self, url: &str, summary: &str) -> Result<()> {
        let mut entries = Entries::new();
        entries.insert(summary_key(url), Value::String(summary.to_string()));
        self.kv
            .set(entries)
            .await
            .with_context(|| format!("save summary for {url}"))
    }

    /// Page URLs with at least one stored turn, sorted.
    pub async fn urls(&self) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        for key in self.kv.keys().await? {
            if key == USAGE_KEY || key.ends_with(SUMMARY_SUFFIX) {
                continue;
            }
            if self.stored_count(&key).await? > 0 {
                urls.push(key);
            }
        }
        urls.sort();
        Ok(urls)
    }
}

fn decode_turns(url: &str, raw: Vec<Value>) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(raw.len());
    for value in raw {
        match Turn::from_value(value) {
            Ok(turn) => turns.push(turn),
            Err(e) => tracing::warn!(url, err = ?e, "skipping unreadable stored turn"),
        }
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossai_types::PlatformId;

    const URL: &str = "https://claude.ai/chat/1";

    fn store() -> TurnStore {
        TurnStore::new(Arc::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let store = store();
        let turn = Turn::new("q", PlatformId::Claude, "a");
        assert!(store.insert(URL, &turn).await.unwrap());
        assert!(!store.insert(URL, &turn).await.unwrap());
        assert_eq!(store.turns(URL).await.unwrap(), vec![turn]);
    }

    #[tokio::test]
    async fn keeps_save_order_per_url() {
        let store = store();
        let first = Turn::new("1", PlatformId::Claude, "a");
        let second = Turn::new("2", PlatformId::Claude, "b");
        store.insert(URL, &first).await.unwrap();
        store.insert(URL, &second).await.unwrap();
        store
            .insert("https://claude.ai/chat/2", &first)
            .await
            .unwrap();

        assert_eq!(store.turns(URL).await.unwrap(), vec![first, second]);
        assert_eq!(store.stored_count("https://claude.ai/chat/2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_drops_turns_but_not_summary() {
        let store = store();
        store
            .insert(URL, &Turn::new("q", PlatformId::Claude, "a"))
            .await
            .unwrap();
        store.set_last_summary(URL, "sum").await.unwrap();

        store.clear(URL).await.unwrap();
        assert_eq!(store.stored_count(URL).await.unwrap(), 0);
        assert_eq!(store.last_summary(URL).await.unwrap().as_deref(), Some("sum"));
    }

    #[tokio::test]
    async fn summary_is_replaced_not_appended() {
        let store = store();
        assert!(store.last_summary(URL).await.unwrap().is_none());
        store.set_last_summary(URL, "first").await.unwrap();
        store.set_last_summary(URL, "second").await.unwrap();
        assert_eq!(
            store.last_summary(URL).await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn unreadable_records_are_skipped_and_preserved() {
        let kv = Arc::new(MemoryKv::new());
        let mut seed = Entries::new();
        seed.insert(
            URL.to_string(),
            serde_json::json!(["legacy |Response->| text", {"user": "q", "assistant": {"claude": "a"}}]),
        );
        kv.set(seed).await.unwrap();

        let store = TurnStore::new(kv.clone());
        assert_eq!(store.stored_count(URL).await.unwrap(), 1);

        store
            .insert(URL, &Turn::new("q2", PlatformId::Claude, "a2"))
            .await
            .unwrap();
        let raw = kv.get(&[URL]).await.unwrap();
        assert_eq!(raw[URL].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn non_array_values_read_as_empty() {
        let kv = Arc::new(MemoryKv::new());
        let mut seed = Entries::new();
        seed.insert(URL.to_string(), Value::String("oops".to_string()));
        kv.set(seed).await.unwrap();
        assert!(TurnStore::new(kv).turns(URL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn urls_skip_auxiliary_keys() {
        let store = store();
        store
            .insert(URL, &Turn::new("q", PlatformId::Claude, "a"))
            .await
            .unwrap();
        store.set_last_summary(URL, "s").await.unwrap();
        let mut usage = Entries::new();
        usage.insert(USAGE_KEY.to_string(), serde_json::json!({"count": 1, "weekStart": 0}));
        store.kv().set(usage).await.unwrap();

        assert_eq!(store.urls().await.unwrap(), vec![URL.to_string()]);
    }
}
