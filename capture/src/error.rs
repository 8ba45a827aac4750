use thiserror::Error;

/// Why a summarization attempt produced nothing.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("no stored turns for {url}")]
    NothingToSummarize { url: String },

    #[error("summarizer returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("summarizer returned an empty result")]
    EmptyResult,

    #[error("summarizer request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
