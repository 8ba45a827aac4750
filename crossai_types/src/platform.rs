use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat UI a turn was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    ChatGpt,
    Claude,
    Gemini,
}

impl PlatformId {
    pub const ALL: [PlatformId; 3] = [PlatformId::ChatGpt, PlatformId::Claude, PlatformId::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::ChatGpt => "chatgpt",
            PlatformId::Claude => "claude",
            PlatformId::Gemini => "gemini",
        }
    }

    /// Human-facing name, used in the injected "{label}'s Response" line.
    pub fn label(&self) -> &'static str {
        match self {
            PlatformId::ChatGpt => "ChatGPT",
            PlatformId::Claude => "Claude",
            PlatformId::Gemini => "Gemini",
        }
    }

    /// Label for a raw assistant key; unknown keys are shown as-is.
    pub fn label_for(key: &str) -> &str {
        match key.parse::<PlatformId>() {
            Ok(id) => id.label(),
            Err(_) => key,
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chatgpt" => Ok(PlatformId::ChatGpt),
            "claude" => Ok(PlatformId::Claude),
            "gemini" => Ok(PlatformId::Gemini),
            other => bail!("unknown platform id: {other}"),
        }
    }
}
