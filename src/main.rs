//! # Academic Researcher CLI
//!
//! Finds recent arXiv papers on a topic and prints a short summary of each.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "transformers in nlp"
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use academic_researcher::config::{Config, Mode};
use academic_researcher::logging::init_logging;
use academic_researcher::models::ResearchContext;
use academic_researcher::report::render_report;
use academic_researcher::workflow::WorkflowRunner;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "academic-researcher",
    version,
    about = "Find recent arXiv papers on a topic and summarize their abstracts",
    long_about = r#"
Academic Researcher - recent papers on any topic, summarized.

It will:
  1. Refine your topic into an arXiv search query
  2. Fetch the most recently submitted matching papers
  3. Summarize each abstract

By default steps 1 and 3 use fast string heuristics. Pass --mode model to
let a local Ollama model do them instead (requires `ollama serve`).

EXAMPLES:
  # Subject within a field becomes all:<subject> AND cat:<field>
  academic-researcher "transformers in nlp"

  # Anything else is matched against titles and abstracts
  academic-researcher "quantum computing" --max-results 10

  # Let a local model refine and summarize
  academic-researcher --mode model --model qwen:14b "graph neural networks"
"#
)]
struct Args {
    /// The research topic to investigate
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// The Ollama model to use (overrides OLLAMA_MODEL)
    #[arg(short = 'm', long = "model", env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Ollama host URL (overrides OLLAMA_API_BASE_URL)
    #[arg(long = "host", env = "OLLAMA_API_BASE_URL")]
    host: Option<String>,

    /// Maximum number of papers to fetch
    #[arg(short = 'n', long = "max-results")]
    max_results: Option<usize>,

    /// How queries and summaries are produced
    #[arg(long = "mode", value_enum)]
    mode: Option<Mode>,

    /// Logging level (overrides RUST_LOG, which also takes filter directives)
    #[arg(
        long = "log-level",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print the final workflow state as JSON instead of the report
    #[arg(long = "json", default_value = "false")]
    json: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(host) = &self.host {
            config.ollama_host = host.clone();
        }
        if let Some(max_results) = self.max_results {
            config.max_results = max_results;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    args.apply_to(&mut config);

    init_logging(&config.log_level, args.log_file.as_deref())?;
    info!(log_level = %config.log_level, "Starting academic researcher CLI");

    config.validate()?;

    info!(
        mode = ?config.mode,
        model = %config.model,
        host = %config.ollama_host,
        max_results = config.max_results,
        "Configuration loaded"
    );

    let runner = WorkflowRunner::from_config(&config);
    let context = ResearchContext::new(Some("1".to_string()), args.topic.clone());

    info!(topic = %args.topic, "Starting research on topic");

    match runner.run_with_context(context).await {
        Ok(state) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print!("{}", render_report(&state));
            }
        }
        Err(e) => {
            error!(error = ?e, topic = %args.topic, "Research workflow failed");
            eprintln!("\nError: {}", e);

            if config.mode == Mode::Model && e.to_string().contains("connection refused") {
                eprintln!("\nTip: Make sure Ollama is running:");
                eprintln!("   ollama serve");
            }

            // Return the error to set non-zero exit code
            return Err(e.into());
        }
    }

    info!("Research completed successfully");
    Ok(())
}
