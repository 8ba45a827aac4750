use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::platform::PlatformId;

const TITLE_MAX_CHARS: usize = 35;

/// One captured prompt/response pair.
///
/// The assistant side is a single-entry map from platform id to response
/// text so the provenance survives once turns from several platforms sit
/// in the same store. Fields are private: a turn is never mutated after it
/// is built, and equality/hashing are purely structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    user: String,
    assistant: BTreeMap<String, String>,
}

impl Turn {
    pub fn new(user: impl Into<String>, platform: PlatformId, response: impl Into<String>) -> Self {
        let mut assistant = BTreeMap::new();
        assistant.insert(platform.as_str().to_string(), response.into());
        Self {
            user: user.into(),
            assistant,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The `(platform key, response text)` entry.
    pub fn response(&self) -> Option<(&str, &str)> {
        self.assistant
            .iter()
            .next()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn platform(&self) -> Option<PlatformId> {
        self.response().and_then(|(k, _)| k.parse().ok())
    }

    /// Short list title: the user prompt cut to 35 characters.
    pub fn title(&self) -> String {
        if self.user.chars().count() > TITLE_MAX_CHARS {
            let head: String = self.user.chars().take(TITLE_MAX_CHARS).collect();
            format!("{head}...")
        } else {
            self.user.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.assistant.len() == 1,
            "turn must carry exactly one assistant response, found {}",
            self.assistant.len()
        );
        Ok(())
    }

    /// Decode a stored JSON record, rejecting shapes `validate` refuses.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let turn: Turn = serde_json::from_value(value).context("turn record has wrong shape")?;
        turn.validate()?;
        Ok(turn)
    }
}
