//! # Configuration Module
//!
//! Loads settings from environment variables (and a `.env` file, if one
//! exists). Command-line flags are applied on top in `main`, then the whole
//! thing is validated once before the workflow is built.
//!
//! Nothing in the library reads the environment on its own: the finished
//! [`Config`] is passed to whoever needs it.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::arxiv::{DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS, MAX_ATTEMPTS};

// =============================================================================
// RESEARCH MODE
// =============================================================================
/// How the refine and summarize steps are carried out.
///
/// # Rust Concept: Enums Instead of Flags
///
/// A two-variant enum says more than a `bool` called `use_model`, and
/// `clap::ValueEnum` turns it straight into `--mode heuristic|model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Deterministic string heuristics, no model needed
    #[default]
    Heuristic,
    /// Delegate refinement and summaries to the Ollama model
    Model,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" => Ok(Mode::Heuristic),
            "model" => Ok(Mode::Model),
            other => anyhow::bail!("unknown research mode '{other}' (expected 'heuristic' or 'model')"),
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the research workflow.
#[derive(Debug, Clone)]
pub struct Config {
    /// The Ollama model to use (e.g., "llama3.2", "qwen:14b")
    pub model: String,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    /// Temperature for model responses (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum number of papers to fetch
    pub max_results: usize,

    /// Attempts per external call (fetch, model) before giving up
    pub max_retries: u32,

    /// Timeout applied to each external call, in seconds
    pub request_timeout_secs: u64,

    /// How many summaries may be in flight at once (1 = strictly sequential)
    pub summary_concurrency: usize,

    /// arXiv export API endpoint
    pub arxiv_base_url: String,

    /// Heuristic or model-backed refinement and summaries
    pub mode: Mode,

    /// Log level or filter directive (`RUST_LOG`); `--log-level` wins
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            // Summaries should stick to the abstract, keep it focused
            temperature: 0.2,
            max_results: DEFAULT_MAX_RESULTS,
            max_retries: MAX_ATTEMPTS,
            request_timeout_secs: 30,
            summary_concurrency: 1,
            arxiv_base_url: DEFAULT_BASE_URL.to_string(),
            mode: Mode::Heuristic,
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Example
    /// ```no_run
    /// use academic_researcher::config::Config;
    ///
    /// let config = Config::from_env()?;
    /// println!("Using model: {}", config.model);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup, starting from the defaults.
    ///
    /// `from_env` passes `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("OLLAMA_MODEL") {
            config.model = val;
        }

        if let Some(val) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Some(val) = lookup("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.2)")?;
        }

        if let Some(val) = lookup("MAX_RESULTS") {
            config.max_results = val
                .parse()
                .context("MAX_RESULTS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("MAX_RETRIES") {
            config.max_retries = val
                .parse()
                .context("MAX_RETRIES must be a valid positive integer")?;
        }

        if let Some(val) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = val
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
        }

        if let Some(val) = lookup("SUMMARY_CONCURRENCY") {
            config.summary_concurrency = val
                .parse()
                .context("SUMMARY_CONCURRENCY must be a valid positive integer")?;
        }

        if let Some(val) = lookup("ARXIV_API_URL") {
            config.arxiv_base_url = val;
        }

        if let Some(val) = lookup("RESEARCH_MODE") {
            config.mode = val.parse().context("RESEARCH_MODE is invalid")?;
        }

        if let Some(val) = lookup("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Fails fast with a clear message instead of letting a zero or an
    /// empty string surface later as a confusing network error.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_results == 0 {
            anyhow::bail!("MAX_RESULTS must be at least 1");
        }

        if self.max_retries == 0 {
            anyhow::bail!("MAX_RETRIES must be at least 1");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be at least 1");
        }

        if self.summary_concurrency == 0 {
            anyhow::bail!("SUMMARY_CONCURRENCY must be at least 1");
        }

        if self.model.trim().is_empty() {
            anyhow::bail!("OLLAMA_MODEL cannot be empty");
        }

        if self.ollama_host.trim().is_empty() {
            anyhow::bail!("OLLAMA_API_BASE_URL cannot be empty");
        }

        if self.arxiv_base_url.trim().is_empty() {
            anyhow::bail!("ARXIV_API_URL cannot be empty");
        }

        Ok(())
    }

    /// The per-call timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.ollama_host, "http://localhost:11434");
        assert_eq!(config.max_results, 5);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.summary_concurrency, 1);
        assert_eq!(config.mode, Mode::Heuristic);
        assert_eq!(config.arxiv_base_url, "https://export.arxiv.org/api/query");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_rust_log_sets_log_level() {
        let config =
            Config::from_lookup(lookup_from(&[("RUST_LOG", "academic_researcher=trace")])).unwrap();
        assert_eq!(config.log_level, "academic_researcher=trace");
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("OLLAMA_MODEL", "qwen:14b"),
            ("MAX_RESULTS", "10"),
            ("RESEARCH_MODE", "Model"),
            ("REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.model, "qwen:14b");
        assert_eq!(config.max_results, 10);
        assert_eq!(config.mode, Mode::Model);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        // Untouched keys keep their defaults
        assert_eq!(config.ollama_host, "http://localhost:11434");
    }

    #[test]
    fn test_lookup_rejects_garbage_numbers() {
        let err = Config::from_lookup(lookup_from(&[("MAX_RESULTS", "five")])).unwrap_err();
        assert!(err.to_string().contains("MAX_RESULTS"));
    }

    #[test]
    fn test_lookup_rejects_unknown_mode() {
        assert!(Config::from_lookup(lookup_from(&[("RESEARCH_MODE", "magic")])).is_err());
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_temperature() {
        let mut config = Config::default();
        config.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_values() {
        let mut config = Config::default();
        config.max_results = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.summary_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_model() {
        let mut config = Config::default();
        config.model = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
