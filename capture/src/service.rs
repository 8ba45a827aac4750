//! Handling of control-surface messages: raw injection, summaries, clearing.

use anyhow::Result;
use crossai_types::{Message, MessageKind, SummaryReply};
use std::sync::Arc;

use crate::dom::Document;
use crate::error::SummarizeError;
use crate::inject::{format_for_injection, inject_into_field};
use crate::platform::Platform;
use crate::store::TurnStore;
use crate::summarize::Summarizer;
use crate::usage::UsageLimiter;

pub struct ContextService {
    store: TurnStore,
    limiter: UsageLimiter,
    summarizer: Arc<dyn Summarizer>,
}

impl ContextService {
    pub fn new(store: TurnStore, limiter: UsageLimiter, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            store,
            limiter,
            summarizer,
        }
    }

    pub fn store(&self) -> &TurnStore {
        &self.store
    }

    /// Handle one message. Commands never produce a reply; their failures
    /// are logged here. `prepareSummary` always replies.
    pub async fn dispatch<D: Document>(
        &self,
        doc: &D,
        platform: &Platform,
        message: Message,
    ) -> Option<SummaryReply> {
        match message.kind() {
            MessageKind::Request => Some(self.prepare_summary(doc, platform, message.url()).await),
            MessageKind::Command => {
                let outcome = match &message {
                    Message::InjectRaw { url } => self.inject_raw(doc, platform, url).await.map(|_| ()),
                    Message::InjectLastSummary { url } => {
                        self.inject_last_summary(doc, platform, url).await.map(|_| ())
                    }
                    Message::Clear { url } => self.clear(url).await,
                    Message::PrepareSummary { .. } => Ok(()),
                };
                if let Err(e) = outcome {
                    tracing::error!(err = ?e, url = message.url(), "command failed");
                }
                None
            }
        }
    }

    /// Inject every stored turn for `url`. Returns whether a field was written.
    pub async fn inject_raw<D: Document>(
        &self,
        doc: &D,
        platform: &Platform,
        url: &str,
    ) -> Result<bool> {
        let turns = self.store.turns(url).await?;
        let context = format_for_injection(&turns);
        let field = platform.input_field(doc);
        Ok(inject_into_field(field.as_ref(), &context))
    }

    /// Inject the stored summary for `url`, if one exists.
    pub async fn inject_last_summary<D: Document>(
        &self,
        doc: &D,
        platform: &Platform,
        url: &str,
    ) -> Result<bool> {
        let Some(summary) = self.store.last_summary(url).await? else {
            tracing::info!(url, "no stored summary to inject");
            return Ok(false);
        };
        let field = platform.input_field(doc);
        Ok(inject_into_field(field.as_ref(), &summary))
    }

    pub async fn clear(&self, url: &str) -> Result<()> {
        self.store.clear(url).await
    }

    /// Summarize the stored turns for `url`, keep the summary and inject it.
    pub async fn prepare_summary<D: Document>(
        &self,
        doc: &D,
        platform: &Platform,
        url: &str,
    ) -> SummaryReply {
        let (reply, summary) = self.refresh_summary(url).await;
        if let Some(summary) = summary {
            let field = platform.input_field(doc);
            inject_into_field(field.as_ref(), &summary);
        }
        reply
    }

    /// Summarize and store without touching the page. The new summary is
    /// returned alongside the reply when one was produced.
    ///
    /// The quota is checked before any network call; a blocked request
    /// reports when the window restarts. A failed summarization leaves the
    /// previous summary in place.
    pub async fn refresh_summary(&self, url: &str) -> (SummaryReply, Option<String>) {
        let turns = match self.store.turns(url).await {
            Ok(turns) if !turns.is_empty() => turns,
            Ok(_) => {
                let err = SummarizeError::NothingToSummarize {
                    url: url.to_string(),
                };
                tracing::warn!(url, "nothing stored to summarize");
                return (SummaryReply::failed(err.to_string()), None);
            }
            Err(e) => {
                tracing::error!(err = ?e, url, "could not read stored turns");
                return (SummaryReply::failed(format!("{e:#}")), None);
            }
        };

        let verdict = match self.limiter.check_and_consume_hit().await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::error!(err = ?e, "usage check failed");
                return (SummaryReply::failed(format!("{e:#}")), None);
            }
        };
        if !verdict.allowed {
            tracing::info!(reset_at = verdict.reset_at, "weekly summary quota reached");
            let reply = SummaryReply {
                success: false,
                remaining: Some(0),
                reset_at: Some(verdict.reset_at),
                error: Some("weekly summary quota reached".to_string()),
            };
            return (reply, None);
        }

        let merged = format_for_injection(&turns);
        let started = std::time::Instant::now();
        let summary = match self.summarizer.summarize(&merged).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(err = %e, url, "summarization failed");
                let reply = SummaryReply {
                    remaining: Some(verdict.remaining),
                    reset_at: Some(verdict.reset_at),
                    ..SummaryReply::failed(e.to_string())
                };
                return (reply, None);
            }
        };
        tracing::info!(
            url,
            turns = turns.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "summary ready"
        );

        if let Err(e) = self.store.set_last_summary(url, &summary).await {
            tracing::error!(err = ?e, url, "could not store summary");
            return (SummaryReply::failed(format!("{e:#}")), None);
        }

        let reply = SummaryReply {
            success: true,
            remaining: Some(verdict.remaining),
            reset_at: Some(verdict.reset_at),
            error: None,
        };
        (reply, Some(summary))
    }
}
