//! # Academic Researcher
//!
//! Turns a research topic into an arXiv query, fetches the most recent
//! matching papers and summarizes each abstract.
//!
//! ```text
//! topic ──▶ refine ──▶ fetch (arXiv) ──▶ summarize each ──▶ WorkflowState
//! ```
//!
//! Refinement and summaries come from string heuristics by default, or
//! from a local Ollama model in `model` mode.
//!
//! ## Quick Start
//! ```no_run
//! use academic_researcher::{Config, WorkflowRunner};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let runner = WorkflowRunner::from_config(&config);
//! let state = runner.run("transformers in nlp").await?;
//! for (paper, summary) in state.results() {
//!     println!("{}: {}", paper.title, summary.summary);
//! }
//! # Ok(())
//! # }
//! ```

/// arXiv export API client
pub mod arxiv;

/// Heuristic and model-backed refine/summarize
pub mod capability;

/// Configuration management
pub mod config;

/// Error types
pub mod error;

/// Delegated language-model calls
pub mod llm;

/// Tracing subscriber setup
pub mod logging;

/// Workflow records
pub mod models;

/// Topic → arXiv query heuristic
pub mod refiner;

/// Terminal output
pub mod report;

/// Abstract truncation heuristic
pub mod summarizer;

/// The three-stage runner
pub mod workflow;

pub use arxiv::{ArxivClient, PaperSource};
pub use capability::{HeuristicCapability, ModelCapability, ResearchCapability};
pub use config::{Config, Mode};
pub use error::{FetchError, LlmError, ResearchError};
pub use models::{
    PaperMetadata, PaperSummary, RefinedQuery, ResearchContext, WorkflowStage, WorkflowState,
};
pub use workflow::{RunSettings, WorkflowRunner};
