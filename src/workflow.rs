//! # Research Workflow
//!
//! Runs the three stages in order and threads the state through them.
//!
//! ```text
//! START ──refine──▶ QUERY_REFINED ──fetch──▶ PAPERS_FETCHED ──summarize──▶ SUMMARIZED
//! ```
//!
//! There are no backward edges. The only branch is the empty-paper
//! short-circuit in the last stage. Any stage error aborts the run and the
//! partially built state is dropped with it.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::arxiv::{ArxivClient, PaperSource, DEFAULT_MAX_RESULTS, MAX_ATTEMPTS};
use crate::capability::{HeuristicCapability, ModelCapability, ResearchCapability};
use crate::config::{Config, Mode};
use crate::error::ResearchError;
use crate::llm::OllamaModel;
use crate::models::{PaperMetadata, PaperSummary, ResearchContext, WorkflowStage, WorkflowState};

/// Knobs the runner needs once it has been built.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Papers requested from the source
    pub max_results: usize,

    /// Upper bound on each single external call
    pub call_timeout: Duration,

    /// Calls a delegated step may make before it gives up
    pub call_attempts: u32,

    /// Summaries allowed in flight at once; output order never changes
    pub summary_concurrency: usize,

    /// Copied into every [`ResearchContext`] this runner creates
    pub max_result_retries: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            call_timeout: Duration::from_secs(30),
            call_attempts: MAX_ATTEMPTS,
            summary_concurrency: 1,
            max_result_retries: crate::models::DEFAULT_MAX_RESULT_RETRIES,
        }
    }
}

// =============================================================================
// WORKFLOW RUNNER
// =============================================================================
/// Sequences refine → fetch → summarize.
///
/// # Rust Concept: Trait Objects
///
/// The runner holds its collaborators as `Arc<dyn Trait>`. It does not
/// know, or care, whether it is talking to arXiv or to a test double, or
/// whether summaries come from a model or from a string cut.
pub struct WorkflowRunner {
    capability: Arc<dyn ResearchCapability>,
    source: Arc<dyn PaperSource>,
    settings: RunSettings,
}

impl WorkflowRunner {
    pub fn new(
        capability: Arc<dyn ResearchCapability>,
        source: Arc<dyn PaperSource>,
        settings: RunSettings,
    ) -> Self {
        Self {
            capability,
            source,
            settings,
        }
    }

    /// Wire up the real collaborators described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let source = ArxivClient::new(config.arxiv_base_url.clone())
            .with_timeout(config.request_timeout())
            .with_max_attempts(config.max_retries);

        let capability: Arc<dyn ResearchCapability> = match config.mode {
            Mode::Heuristic => Arc::new(HeuristicCapability),
            Mode::Model => {
                let model = OllamaModel::new(&config.ollama_host, &config.model, config.temperature);
                Arc::new(
                    ModelCapability::new(model)
                        .with_max_attempts(config.max_retries)
                        .with_call_timeout(config.request_timeout()),
                )
            }
        };

        let settings = RunSettings {
            max_results: config.max_results,
            call_timeout: config.request_timeout(),
            call_attempts: config.max_retries,
            summary_concurrency: config.summary_concurrency,
            ..RunSettings::default()
        };

        Self::new(capability, Arc::new(source), settings)
    }

    /// Run the whole workflow for `topic`.
    pub async fn run(&self, topic: &str) -> Result<WorkflowState, ResearchError> {
        let context = ResearchContext::new(None, topic)
            .with_max_result_retries(self.settings.max_result_retries);
        self.run_with_context(context).await
    }

    /// Run the whole workflow for a caller-built context.
    #[instrument(skip_all, fields(topic = %context.query))]
    pub async fn run_with_context(
        &self,
        context: ResearchContext,
    ) -> Result<WorkflowState, ResearchError> {
        info!(user_id = ?context.user_id, "Starting research workflow");

        let state = WorkflowState::new(context);
        let state = self.refine_query(state).await?;
        let state = self.fetch_papers(state).await?;
        let state = self.summarize_papers(state).await?;

        info!(stage = %state.stage(), "Research workflow finished");
        Ok(state)
    }

    /// START → QUERY_REFINED
    async fn refine_query(&self, state: WorkflowState) -> Result<WorkflowState, ResearchError> {
        info!(topic = %state.context.query, "Stage refine: start");

        let refined = self
            .bounded(
                WorkflowStage::QueryRefined,
                self.capability.refine(&state.context.query),
            )
            .await?;

        info!(query = %refined.query, "Stage refine: done");
        Ok(state.with_query(refined.query))
    }

    /// QUERY_REFINED → PAPERS_FETCHED
    ///
    /// No extra timeout here: the fetcher bounds each HTTP attempt itself
    /// and wrapping the whole thing would cut its retries short.
    async fn fetch_papers(&self, state: WorkflowState) -> Result<WorkflowState, ResearchError> {
        let query = state.query.clone().unwrap_or_default();
        info!(query = %query, max_results = self.settings.max_results, "Stage fetch: start");

        let papers = self.source.fetch(&query, self.settings.max_results).await?;

        info!(count = papers.len(), "Stage fetch: done");
        Ok(state.with_papers(papers))
    }

    /// PAPERS_FETCHED → SUMMARIZED
    async fn summarize_papers(&self, state: WorkflowState) -> Result<WorkflowState, ResearchError> {
        let papers = state.papers.as_deref().unwrap_or_default();

        if papers.is_empty() {
            info!("Stage summarize: no papers, skipping");
            return Ok(state.with_summaries(Vec::new()));
        }

        info!(count = papers.len(), "Stage summarize: start");

        // `buffered` yields results in input order whatever order they finish in
        let summaries: Vec<PaperSummary> = stream::iter(papers)
            .map(|paper| self.summarize_one(paper))
            .buffered(self.settings.summary_concurrency.max(1))
            .try_collect()
            .await?;

        info!(count = summaries.len(), "Stage summarize: done");
        Ok(state.with_summaries(summaries))
    }

    async fn summarize_one(&self, paper: &PaperMetadata) -> Result<PaperSummary, ResearchError> {
        self.bounded(
            WorkflowStage::Summarized,
            self.capability.summarize(Some(&paper.abstract_text)),
        )
        .await
    }

    /// Deadline for one delegated step.
    ///
    /// A step may make `call_attempts` calls of up to `call_timeout` each,
    /// plus one spare slice, so the deadline never fires before the
    /// capability's own retries have run out.
    fn step_deadline(&self) -> Duration {
        self.settings
            .call_timeout
            .saturating_mul(self.settings.call_attempts.max(1).saturating_add(1))
    }

    /// Put the step deadline on a delegated refine/summarize step.
    async fn bounded<T, F>(&self, stage: WorkflowStage, call: F) -> Result<T, ResearchError>
    where
        F: Future<Output = Result<T, ResearchError>>,
    {
        let deadline = self.step_deadline();
        tokio::time::timeout(deadline, call)
            .await
            .map_err(|_| ResearchError::Timeout {
                stage,
                after: deadline,
            })?
    }
}
