//! Messages exchanged between the control surface and the capture core,
//! plus the summarizer's HTTP body shapes.

use serde::{Deserialize, Serialize};

/// Whether the sender waits for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Command,
    Request,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// Format every stored turn for `url` and inject it.
    InjectRaw { url: String },
    /// Summarize stored turns remotely, store and inject the summary.
    PrepareSummary { url: String },
    /// Inject the stored summary for `url`, if any.
    InjectLastSummary { url: String },
    /// Drop every stored turn for `url`.
    Clear { url: String },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::PrepareSummary { .. } => MessageKind::Request,
            Message::InjectRaw { .. } | Message::InjectLastSummary { .. } | Message::Clear { .. } => {
                MessageKind::Command
            }
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Message::InjectRaw { url }
            | Message::PrepareSummary { url }
            | Message::InjectLastSummary { url }
            | Message::Clear { url } => url,
        }
    }
}

/// Reply to `prepareSummary`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reset_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl SummaryReply {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Body of `POST /generate_echo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub text: String,
}

/// Response of `POST /generate_echo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub result: String,
}
