use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Length of the summarization quota window, in milliseconds.
pub const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Stored under the global `usage` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub count: u32,
    /// Window start, epoch milliseconds.
    pub week_start: i64,
}

impl UsageRecord {
    pub fn fresh(now_ms: i64) -> Self {
        Self {
            count: 0,
            week_start: now_ms,
        }
    }

    pub fn window_expired(&self, now_ms: i64) -> bool {
        now_ms - self.week_start >= WEEK_MS
    }

    pub fn reset_at(&self) -> i64 {
        self.week_start + WEEK_MS
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageVerdict {
    pub allowed: bool,
    pub remaining: u32,
    /// Epoch milliseconds at which the window restarts.
    pub reset_at: i64,
}

impl UsageVerdict {
    pub fn reset_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.reset_at).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_expires_exactly_after_a_week() {
        let record = UsageRecord {
            count: 3,
            week_start: 1_000,
        };
        assert!(!record.window_expired(1_000 + WEEK_MS - 1));
        assert!(record.window_expired(1_000 + WEEK_MS));
        assert_eq!(record.reset_at(), 1_000 + WEEK_MS);
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let record = UsageRecord {
            count: 2,
            week_start: 42,
        };
        assert_eq!(
            serde_json::to_value(record).unwrap(),
            serde_json::json!({"count": 2, "weekStart": 42})
        );
    }
}
