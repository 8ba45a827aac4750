//! Process-local [`KvStore`], used by tests and short-lived hosts.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::RwLock;

use super::{Entries, KvStore};

#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<Entries>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, keys: &[&str]) -> Result<Entries> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        let mut found = Entries::new();
        for key in keys {
            if let Some(value) = entries.get(*key) {
                found.insert(key.to_string(), value.clone());
            }
        }
        Ok(found)
    }

    async fn set(&self, new_entries: Entries) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        for (key, value) in new_entries {
            entries.insert(key, value);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.keys().cloned().collect())
    }
}
