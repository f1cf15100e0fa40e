//! # Language Model Module
//!
//! The delegated model call behind the `model` research mode.
//!
//! It demonstrates:
//! - A small trait seam over Rig's agent API, so the workflow can run
//!   against a scripted model in tests
//! - Structured output: the model is told the JSON shape it must answer
//!   with, and its reply is parsed with serde
//! - Bounded retries, feeding the rejection reason back to the model
//! - A timeout on each model call, so one slow reply costs one attempt
//!   rather than the whole budget

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::LlmError;

// =============================================================================
// LANGUAGE MODEL TRAIT
// =============================================================================
/// A single prompt/response exchange with a model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, LlmError>;
}

// =============================================================================
// OLLAMA MODEL
// =============================================================================
/// A model served by a local Ollama instance, driven through Rig.
#[derive(Debug, Clone)]
pub struct OllamaModel {
    model: String,
    temperature: f64,
}

impl OllamaModel {
    /// Point Rig at `host` and use `model` for every completion.
    ///
    /// Rig's Ollama client reads its base URL from `OLLAMA_API_BASE_URL`,
    /// so the host is exported once here rather than on every call.
    pub fn new(host: &str, model: impl Into<String>, temperature: f32) -> Self {
        std::env::set_var("OLLAMA_API_BASE_URL", host);
        Self {
            model: model.into(),
            temperature: f64::from(temperature),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, LlmError> {
        let client = ollama::Client::from_env();

        let agent = client
            .agent(&self.model)
            .preamble(system_prompt)
            .temperature(self.temperature)
            .build();

        debug!(model = %self.model, "Sending prompt to Ollama");

        agent
            .prompt(prompt)
            .await
            .map_err(|e| LlmError::Request(e.to_string()))
    }
}

// =============================================================================
// STRUCTURED EXTRACTION
// =============================================================================
/// Ask `model` for a JSON value of type `T`, retrying on bad output.
///
/// `schema` is shown to the model verbatim. Each reply must contain a JSON
/// object that deserializes into `T` and passes `validate`; otherwise the
/// reason is appended to the prompt and the model is asked again, up to
/// `max_attempts` calls in total. With a `call_timeout`, a call that does
/// not answer in time counts as one failed attempt.
pub async fn extract_structured<T, F>(
    model: &dyn LanguageModel,
    system_prompt: &str,
    schema: &serde_json::Value,
    prompt: &str,
    max_attempts: u32,
    call_timeout: Option<Duration>,
    validate: F,
) -> Result<T, LlmError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<(), String>,
{
    let preamble = format!(
        "{system_prompt}\n\nRespond with a single JSON object matching this schema and nothing else:\n{schema}"
    );

    let max_attempts = max_attempts.max(1);
    let mut request = prompt.to_string();
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=max_attempts {
        let outcome = match complete_within(model, &preamble, &request, call_timeout).await {
            Ok(reply) => parse_reply::<T>(&reply).and_then(|value| {
                validate(&value).map_err(LlmError::InvalidOutput)?;
                Ok(value)
            }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "Model output rejected");
                last_error = e.to_string();
                request = format!(
                    "{prompt}\n\nYour previous answer was rejected: {last_error}\n\
                     Reply again with only the JSON object."
                );
            }
        }
    }

    Err(LlmError::RetriesExhausted {
        attempts: max_attempts,
        last: last_error,
    })
}

/// One model call, bounded by `call_timeout` when one is set.
async fn complete_within(
    model: &dyn LanguageModel,
    system_prompt: &str,
    prompt: &str,
    call_timeout: Option<Duration>,
) -> Result<String, LlmError> {
    match call_timeout {
        Some(limit) => tokio::time::timeout(limit, model.complete(system_prompt, prompt))
            .await
            .map_err(|_| LlmError::Timeout(limit))?,
        None => model.complete(system_prompt, prompt).await,
    }
}

/// Deserialize the first JSON object found in a model reply.
fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, LlmError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| LlmError::InvalidOutput("no JSON object in reply".to_string()))?;
    serde_json::from_str(json).map_err(|e| LlmError::InvalidOutput(e.to_string()))
}

/// Models like to wrap JSON in prose or code fences; keep the outer braces.
fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order and records every prompt it saw.
    pub(crate) struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub(crate) prompts: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl ScriptedModel {
        pub(crate) fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                prompts: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        pub(crate) fn failing(message: &str, times: usize) -> Self {
            Self {
                replies: Mutex::new((0..times).map(|_| Err(message.to_string())).collect()),
                prompts: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        /// Sleep this long before every reply.
        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _system_prompt: &str, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(LlmError::Request(message)),
                None => Err(LlmError::Request("script exhausted".to_string())),
            }
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        value: String,
    }

    fn schema() -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {"value": {"type": "string"}}})
    }

    fn accept_all(_: &Answer) -> Result<(), String> {
        Ok(())
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
        assert_eq!(
            extract_json_object("Sure!\n```json\n{\"a\": {\"b\": 2}}\n```"),
            Some("{\"a\": {\"b\": 2}}")
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[tokio::test]
    async fn test_first_reply_accepted() {
        let model = ScriptedModel::new([r#"{"value": "ok"}"#]);
        let answer: Answer = extract_structured(&model, "sys", &schema(), "go", 3, None, accept_all)
            .await
            .unwrap();

        assert_eq!(answer.value, "ok");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_malformed_reply_with_feedback() {
        let model = ScriptedModel::new(["not json at all", r#"{"value": "second"}"#]);
        let answer: Answer = extract_structured(&model, "sys", &schema(), "go", 3, None, accept_all)
            .await
            .unwrap();

        assert_eq!(answer.value, "second");
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("previous answer was rejected"));
    }

    #[tokio::test]
    async fn test_validation_failures_exhaust_attempts() {
        let model = ScriptedModel::new([
            r#"{"value": ""}"#,
            r#"{"value": ""}"#,
            r#"{"value": ""}"#,
            r#"{"value": "too late"}"#,
        ]);
        let result: Result<Answer, _> =
            extract_structured(&model, "sys", &schema(), "go", 3, None, |a: &Answer| {
                if a.value.is_empty() {
                    Err("value is empty".to_string())
                } else {
                    Ok(())
                }
            })
            .await;

        match result {
            Err(LlmError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(last.contains("value is empty"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_request_errors_are_retried() {
        let model = ScriptedModel::failing("connection refused", 5);
        let result: Result<Answer, _> =
            extract_structured(&model, "sys", &schema(), "go", 2, None, accept_all).await;

        assert!(matches!(result, Err(LlmError::RetriesExhausted { attempts: 2, .. })));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_applies_to_each_call_not_the_whole_loop() {
        // Two calls together overrun the limit, each one alone fits
        let model = ScriptedModel::new(["not json", r#"{"value": "late but valid"}"#])
            .with_delay(Duration::from_millis(120));
        let answer: Answer = extract_structured(
            &model,
            "sys",
            &schema(),
            "go",
            3,
            Some(Duration::from_millis(200)),
            accept_all,
        )
        .await
        .unwrap();

        assert_eq!(answer.value, "late but valid");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_slow_calls_count_as_failed_attempts() {
        let model = ScriptedModel::new([r#"{"value": "never seen"}"#; 3])
            .with_delay(Duration::from_millis(200));
        let result: Result<Answer, _> = extract_structured(
            &model,
            "sys",
            &schema(),
            "go",
            2,
            Some(Duration::from_millis(20)),
            accept_all,
        )
        .await;

        match result {
            Err(LlmError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert!(last.contains("timed out after 20ms"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(model.calls(), 2);
    }
}
