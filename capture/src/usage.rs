use anyhow::{Context, Result};
use chrono::Utc;
use crossai_types::{UsageRecord, UsageVerdict};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::store::{Entries, KvStore, USAGE_KEY};

/// Weekly summarization quota kept under the global `usage` key.
///
/// The window starts at the first hit and restarts once a full week has
/// passed since its start. Check and consume happen under one lock.
pub struct UsageLimiter {
    kv: Arc<dyn KvStore>,
    quota: u32,
    gate: Mutex<()>,
}

impl UsageLimiter {
    pub fn new(kv: Arc<dyn KvStore>, quota: u32) -> Self {
        Self {
            kv,
            quota,
            gate: Mutex::new(()),
        }
    }

    pub async fn check_and_consume_hit(&self) -> Result<UsageVerdict> {
        self.check_and_consume_hit_at(Utc::now().timestamp_millis())
            .await
    }

    pub async fn check_and_consume_hit_at(&self, now_ms: i64) -> Result<UsageVerdict> {
        let _guard = self.gate.lock().await;
        let mut usage = self.load(now_ms).await?;

        if usage.count >= self.quota {
            return Ok(UsageVerdict {
                allowed: false,
                remaining: 0,
                reset_at: usage.reset_at(),
            });
        }

        usage.count += 1;
        let mut entries = Entries::new();
        entries.insert(USAGE_KEY.to_string(), serde_json::to_value(usage)?);
        self.kv
            .set(entries)
            .await
            .context("save usage counter")?;

        Ok(UsageVerdict {
            allowed: true,
            remaining: self.quota - usage.count,
            reset_at: usage.reset_at(),
        })
    }

    /// Current standing without consuming a hit.
    pub async fn peek(&self) -> Result<UsageVerdict> {
        self.peek_at(Utc::now().timestamp_millis()).await
    }

    pub async fn peek_at(&self, now_ms: i64) -> Result<UsageVerdict> {
        let usage = self.load(now_ms).await?;
        let remaining = self.quota.saturating_sub(usage.count);
        Ok(UsageVerdict {
            allowed: remaining > 0,
            remaining,
            reset_at: usage.reset_at(),
        })
    }

    /// Stored record, restarted when missing, malformed or expired.
    async fn load(&self, now_ms: i64) -> Result<UsageRecord> {
        let mut entries = self
            .kv
            .get(&[USAGE_KEY])
            .await
            .context("read usage counter")?;
        let stored = match entries.remove(USAGE_KEY) {
            Some(value @ Value::Object(_)) => serde_json::from_value::<UsageRecord>(value).ok(),
            _ => None,
        };
        Ok(match stored {
            Some(record) if !record.window_expired(now_ms) => record,
            _ => UsageRecord::fresh(now_ms),
        })
    }
}
