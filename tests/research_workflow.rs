//! Integration Tests for the Research Workflow
//!
//! These tests drive the public API end to end:
//! - Heuristic refinement feeding the paper source
//! - Summary/paper alignment and ordering
//! - The empty-result short-circuit
//! - Abort on fetch failure
//! - The real arXiv client against a mock server

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use academic_researcher::{
    ArxivClient, FetchError, HeuristicCapability, PaperMetadata, PaperSource, ResearchError,
    RunSettings, WorkflowRunner, WorkflowStage,
};

/// In-memory paper source that remembers the queries it was given.
struct StaticSource {
    result: Result<Vec<PaperMetadata>, u16>,
    queries: Mutex<Vec<String>>,
}

impl StaticSource {
    fn papers(papers: Vec<PaperMetadata>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(papers),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            result: Err(status),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn last_query(&self) -> Option<String> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaperSource for StaticSource {
    async fn fetch(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperMetadata>, FetchError> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.result {
            Ok(papers) => Ok(papers.iter().take(max_results).cloned().collect()),
            Err(status) => Err(FetchError::ServerError(*status, "unavailable".to_string())),
        }
    }
}

fn paper(title: &str, abstract_text: &str) -> PaperMetadata {
    PaperMetadata {
        title: title.to_string(),
        abstract_text: abstract_text.to_string(),
        authors: vec!["Jane Doe".to_string()],
        publication_date: "2025-01-15".to_string(),
    }
}

fn heuristic_runner(source: Arc<StaticSource>) -> WorkflowRunner {
    WorkflowRunner::new(Arc::new(HeuristicCapability), source, RunSettings::default())
}

#[tokio::test]
async fn test_transformers_in_nlp_end_to_end() {
    let long_abstract = "a".repeat(300);
    let source = StaticSource::papers(vec![paper("Transformers", &long_abstract)]);
    let runner = heuristic_runner(source.clone());

    let state = runner.run("transformers in nlp").await.unwrap();

    assert_eq!(state.query.as_deref(), Some("all:transformers AND cat:nlp"));
    assert_eq!(source.last_query().as_deref(), Some("all:transformers AND cat:nlp"));

    let summaries = state.summaries.as_ref().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].summary, format!("{}...", "a".repeat(150)));
    assert_eq!(state.stage(), WorkflowStage::Summarized);
}

#[tokio::test]
async fn test_quantum_computing_query() {
    let source = StaticSource::papers(vec![]);
    let runner = heuristic_runner(source.clone());

    let state = runner.run("quantum computing").await.unwrap();

    assert_eq!(
        state.query.as_deref(),
        Some("ti:\"quantum computing\" OR abs:\"quantum computing\"")
    );
}

#[tokio::test]
async fn test_summaries_align_with_papers() {
    let papers = vec![
        paper("First", "A short abstract."),
        paper("Second", ""),
        paper("Third", &"b".repeat(151)),
    ];
    let runner = heuristic_runner(StaticSource::papers(papers.clone()));

    let state = runner.run("graph neural networks").await.unwrap();

    let summaries = state.summaries.clone().unwrap();
    assert_eq!(summaries.len(), papers.len());
    assert_eq!(summaries[0].summary, "A short abstract.");
    assert_eq!(summaries[1].summary, "No abstract available.");
    assert_eq!(summaries[2].summary, format!("{}...", "b".repeat(150)));

    let titles: Vec<_> = state.results().map(|(p, _)| p.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);
}

#[tokio::test]
async fn test_empty_fetch_yields_empty_summaries() {
    let runner = heuristic_runner(StaticSource::papers(vec![]));

    let state = runner.run("an obscure topic").await.unwrap();

    assert_eq!(state.papers, Some(vec![]));
    assert_eq!(state.summaries, Some(vec![]));
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_fetch_failure_aborts_run() {
    let runner = heuristic_runner(StaticSource::failing(503));

    let err = runner.run("transformers in nlp").await.unwrap_err();

    assert!(matches!(
        err,
        ResearchError::Fetch(FetchError::ServerError(503, _))
    ));
}

#[tokio::test]
async fn test_run_against_mock_arxiv() {
    let server = MockServer::start().await;
    let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2502.00042v1</id>
    <published>2025-02-03T18:00:00Z</published>
    <title>Efficient Transformers for Low-Resource Languages</title>
    <summary>We adapt transformer models to languages with little data.</summary>
    <author><name>Jane Doe</name></author>
  </entry>
</feed>"#;

    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "all:transformers AND cat:cs.cl"))
        .and(query_param("max_results", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .expect(1)
        .mount(&server)
        .await;

    let source = ArxivClient::new(format!("{}/api/query", server.uri()))
        .with_timeout(Duration::from_secs(5))
        .with_retry_delay(Duration::from_millis(10));
    let runner = WorkflowRunner::new(
        Arc::new(HeuristicCapability),
        Arc::new(source),
        RunSettings {
            max_results: 3,
            ..RunSettings::default()
        },
    );

    let state = runner.run("Transformers in cs.CL").await.unwrap();

    let (paper, summary) = state.results().next().unwrap();
    assert_eq!(paper.title, "Efficient Transformers for Low-Resource Languages");
    assert_eq!(paper.publication_date, "2025-02-03");
    assert_eq!(
        summary.summary,
        "We adapt transformer models to languages with little data."
    );
}
