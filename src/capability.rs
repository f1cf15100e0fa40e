//! # Research Capability
//!
//! The two steps of the workflow that can be delegated to a model:
//! refining the topic and summarizing an abstract.
//!
//! - [`HeuristicCapability`] is deterministic, needs no network and is
//!   the default.
//! - [`ModelCapability`] asks a [`LanguageModel`] instead, under the same
//!   output contracts, and gives up after a bounded number of attempts.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::error::ResearchError;
use crate::llm::{extract_structured, LanguageModel};
use crate::models::{PaperSummary, RefinedQuery};
use crate::refiner::refine_topic;
use crate::summarizer::{summarize_abstract, within_limit, MAX_SUMMARY_CHARS};

/// Attempts per delegated call when nothing else is configured.
pub const DEFAULT_MODEL_ATTEMPTS: u32 = 3;

const REFINE_SYSTEM_PROMPT: &str = "You are an expert prompt processor for academic research. \
Given a research topic, generate a refined arXiv search query string that enhances search relevance. \
Consider using arXiv's advanced search syntax and appropriate filters. \
Return a structured query that will yield the most relevant academic papers based on the provided input. \
Do not add date filters.";

const SUMMARIZE_SYSTEM_PROMPT: &str = "You are an expert summarizer. \
Provide a concise summary of the given paper abstract. \
Your summary should be completely derived from the abstract and should not include any additional information. \
It should not be longer than 150 characters.";

// =============================================================================
// CAPABILITY TRAIT
// =============================================================================
/// Refine and summarize, however it is done.
#[async_trait]
pub trait ResearchCapability: Send + Sync {
    async fn refine(&self, topic: &str) -> Result<RefinedQuery, ResearchError>;

    async fn summarize(&self, abstract_text: Option<&str>) -> Result<PaperSummary, ResearchError>;
}

// =============================================================================
// HEURISTIC CAPABILITY
// =============================================================================
/// String heuristics only. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCapability;

#[async_trait]
impl ResearchCapability for HeuristicCapability {
    async fn refine(&self, topic: &str) -> Result<RefinedQuery, ResearchError> {
        Ok(refine_topic(topic))
    }

    async fn summarize(&self, abstract_text: Option<&str>) -> Result<PaperSummary, ResearchError> {
        Ok(summarize_abstract(abstract_text))
    }
}

// =============================================================================
// MODEL CAPABILITY
// =============================================================================
/// Delegates both steps to a language model.
pub struct ModelCapability<M> {
    model: M,
    max_attempts: u32,
    call_timeout: Option<Duration>,
}

impl<M: LanguageModel> ModelCapability<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            max_attempts: DEFAULT_MODEL_ATTEMPTS,
            call_timeout: None,
        }
    }

    /// Set the number of model calls allowed per step
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Bound each individual model call; a call that overruns is retried
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

fn validate_query(refined: &RefinedQuery) -> Result<(), String> {
    let query = refined.query.trim();
    if query.is_empty() {
        return Err("query is empty".to_string());
    }
    if query.lines().count() > 1 {
        return Err("query must be a single line".to_string());
    }
    if query.contains("submittedDate") || query.contains("lastUpdatedDate") {
        return Err("query must not contain date filters".to_string());
    }
    Ok(())
}

fn validate_summary(summary: &PaperSummary) -> Result<(), String> {
    if summary.summary.trim().is_empty() {
        return Err("summary is empty".to_string());
    }
    if !within_limit(&summary.summary) {
        return Err(format!(
            "summary is {} characters, the limit is {MAX_SUMMARY_CHARS}",
            summary.summary.chars().count()
        ));
    }
    Ok(())
}

#[async_trait]
impl<M: LanguageModel> ResearchCapability for ModelCapability<M> {
    async fn refine(&self, topic: &str) -> Result<RefinedQuery, ResearchError> {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Refined arXiv search query" }
            },
            "required": ["query"]
        });

        let refined: RefinedQuery = extract_structured(
            &self.model,
            REFINE_SYSTEM_PROMPT,
            &schema,
            topic,
            self.max_attempts,
            self.call_timeout,
            validate_query,
        )
        .await
        .map_err(|e| ResearchError::QueryRefinement(e.to_string()))?;

        let refined = RefinedQuery {
            query: refined.query.trim().to_string(),
        };
        info!(query = %refined.query, "Refined query generated by model");
        Ok(refined)
    }

    async fn summarize(&self, abstract_text: Option<&str>) -> Result<PaperSummary, ResearchError> {
        // Nothing to send; the fixed answer is the same in both modes.
        let abstract_text = match abstract_text {
            None | Some("") => return Ok(summarize_abstract(None)),
            Some(text) => text,
        };

        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Concise summary of the paper",
                    "maxLength": MAX_SUMMARY_CHARS
                }
            },
            "required": ["summary"]
        });

        extract_structured(
            &self.model,
            SUMMARIZE_SYSTEM_PROMPT,
            &schema,
            abstract_text,
            self.max_attempts,
            self.call_timeout,
            validate_summary,
        )
        .await
        .map_err(|e| ResearchError::Summarization(e.to_string()))
    }
}
