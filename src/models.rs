//! # Models Module
//!
//! The records that flow through the research workflow.
//!
//! The workflow never mutates a state in place. Each stage takes the
//! previous [`WorkflowState`] by value and hands back a new one with its
//! own output field filled in. This is Rust's ownership model doing the
//! bookkeeping: once a stage has consumed a state, nobody can observe the
//! old value anymore.

use serde::{Deserialize, Serialize};

/// Default bound on structured-output retries carried by a context.
pub const DEFAULT_MAX_RESULT_RETRIES: u32 = 5;

// =============================================================================
// RESEARCH CONTEXT
// =============================================================================
/// Per-run input. Built once and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchContext {
    /// Who asked (the CLI always uses "1")
    pub user_id: Option<String>,

    /// The raw research topic
    pub query: String,

    /// Upper bound on retries for structured model output
    pub max_result_retries: u32,
}

impl ResearchContext {
    /// Create a context for `query` with the default retry bound.
    pub fn new(user_id: Option<String>, query: impl Into<String>) -> Self {
        Self {
            user_id,
            query: query.into(),
            max_result_retries: DEFAULT_MAX_RESULT_RETRIES,
        }
    }

    pub fn with_max_result_retries(mut self, retries: u32) -> Self {
        self.max_result_retries = retries;
        self
    }
}

// =============================================================================
// STAGE OUTPUTS
// =============================================================================
/// A search-engine-syntax query derived from a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedQuery {
    /// Refined arXiv search query
    pub query: String,
}

/// Metadata for one paper, normalized from the search API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Author names in the order the API listed them
    pub authors: Vec<String>,

    /// `YYYY-MM-DD`, or `"Unknown"` when the API had no date
    pub publication_date: String,
}

/// A short summary of one paper's abstract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSummary {
    /// Concise summary of the paper
    pub summary: String,
}

// =============================================================================
// WORKFLOW STATE
// =============================================================================
/// Where a [`WorkflowState`] sits in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Start,
    QueryRefined,
    PapersFetched,
    Summarized,
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowStage::Start => "start",
            WorkflowStage::QueryRefined => "query_refined",
            WorkflowStage::PapersFetched => "papers_fetched",
            WorkflowStage::Summarized => "summarized",
        };
        f.write_str(name)
    }
}

/// The state threaded through the three stages.
///
/// # Rust Concept: Consuming Builders
///
/// `with_query`, `with_papers` and `with_summaries` take `self` by value
/// and return a new state. The struct update syntax (`..self`) moves the
/// untouched fields across without cloning them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub context: ResearchContext,
    pub query: Option<String>,
    pub papers: Option<Vec<PaperMetadata>>,
    pub summaries: Option<Vec<PaperSummary>>,
    pub error: Option<String>,
}

impl WorkflowState {
    /// A fresh state at [`WorkflowStage::Start`].
    pub fn new(context: ResearchContext) -> Self {
        Self {
            context,
            query: None,
            papers: None,
            summaries: None,
            error: None,
        }
    }

    pub fn with_query(self, query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..self
        }
    }

    pub fn with_papers(self, papers: Vec<PaperMetadata>) -> Self {
        Self {
            papers: Some(papers),
            ..self
        }
    }

    pub fn with_summaries(self, summaries: Vec<PaperSummary>) -> Self {
        Self {
            summaries: Some(summaries),
            ..self
        }
    }

    /// Derive the stage from which outputs are present.
    pub fn stage(&self) -> WorkflowStage {
        match (&self.query, &self.papers, &self.summaries) {
            (_, _, Some(_)) => WorkflowStage::Summarized,
            (_, Some(_), None) => WorkflowStage::PapersFetched,
            (Some(_), None, None) => WorkflowStage::QueryRefined,
            (None, None, None) => WorkflowStage::Start,
        }
    }

    /// Papers paired with their summaries, in order.
    ///
    /// Yields nothing until the run has reached [`WorkflowStage::Summarized`].
    pub fn results(&self) -> impl Iterator<Item = (&PaperMetadata, &PaperSummary)> {
        let papers = self.papers.as_deref().unwrap_or_default();
        let summaries = self.summaries.as_deref().unwrap_or_default();
        papers.iter().zip(summaries.iter())
    }
}
