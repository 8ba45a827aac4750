use async_trait::async_trait;
use crossai_types::{SummaryRequest, SummaryResponse};
use reqwest::Client;

use crate::error::SummarizeError;

/// Turns conversation text into a handoff summary. Called once per
/// request; callers do not retry.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Client for the summarization backend's `POST {text} -> {result}` endpoint.
#[derive(Clone)]
pub struct HttpSummarizer {
    http: Client,
    endpoint: String,
}

impl HttpSummarizer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let res = self
            .http
            .post(&self.endpoint)
            .json(&SummaryRequest {
                text: text.to_string(),
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(SummarizeError::Status { status, body });
        }

        let body: SummaryResponse = res.json().await?;
        if body.result.trim().is_empty() {
            return Err(SummarizeError::EmptyResult);
        }
        Ok(body.result)
    }
}
