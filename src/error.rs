//! # Error Types
//!
//! Each external call has its own typed error. The workflow folds them into
//! [`ResearchError`], one variant per stage, so the caller can tell which
//! stage aborted the run.

use std::time::Duration;
use thiserror::Error;

use crate::models::WorkflowStage;

// =============================================================================
// FETCH ERRORS
// =============================================================================
/// Errors from the arXiv export API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by arXiv, please wait")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse Atom feed: {0}")]
    Parse(String),
}

impl FetchError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout
                | FetchError::Connection(_)
                | FetchError::RateLimited
                | FetchError::ServerError(_, _)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connection(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

// =============================================================================
// LANGUAGE MODEL ERRORS
// =============================================================================
/// Errors from a delegated language-model call.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model returned invalid output: {0}")]
    InvalidOutput(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model output still invalid after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

// =============================================================================
// WORKFLOW ERRORS
// =============================================================================
/// A failure that aborts a research run.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Query refinement failed: {0}")]
    QueryRefinement(String),

    #[error("Paper fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("Stage {stage} timed out after {after:?}")]
    Timeout { stage: WorkflowStage, after: Duration },
}
