//! # arXiv Paper Fetcher
//!
//! Fetches the most recent papers matching a refined query from the arXiv
//! export API and normalizes them into [`PaperMetadata`].
//!
//! # Production Features
//!
//! - HTTP timeout on every request
//! - Retry with exponential backoff on transient failures (timeouts,
//!   connection errors, 429, 5xx), three attempts in total
//! - Streaming Atom parsing with quick-xml
//! - arXiv's in-band error entries surface as [`FetchError::BadRequest`]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::models::PaperMetadata;

/// Public arXiv export endpoint
pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";

/// Papers requested when the caller has no preference
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Total attempts per fetch, first try included
pub const MAX_ATTEMPTS: u32 = 3;

/// Placeholder for entries without a usable publication date
pub const UNKNOWN_DATE: &str = "Unknown";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Longest single wait between attempts
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

// =============================================================================
// PAPER SOURCE TRAIT
// =============================================================================
/// Anything that can turn a refined query into papers.
///
/// The workflow only depends on this trait, so tests can hand it an
/// in-memory source instead of the network.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn fetch(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperMetadata>, FetchError>;
}

/// Wait before retry number `attempt`: `base`, then doubling, capped.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

// =============================================================================
// ARXIV CLIENT
// =============================================================================
/// Client for the arXiv export API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ArxivClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the total number of attempts (at least one is always made)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the first backoff delay; later ones double
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Build the request URL, newest submissions first.
    fn search_url(&self, query: &str, max_results: usize) -> String {
        format!(
            "{}?search_query={}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
            self.base_url,
            urlencoding::encode(query),
            max_results
        )
    }

    /// Fetch with retry and backoff.
    async fn fetch_with_retry(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperMetadata>, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(query, max_results).await {
                Ok(papers) => return Ok(papers),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = backoff_delay(self.retry_base_delay, attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "arXiv request failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Execute a single HTTP request
    async fn fetch_once(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperMetadata>, FetchError> {
        let url = self.search_url(query, max_results);
        debug!(url = %url, "Fetching arXiv feed");

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => FetchError::RateLimited,
                400 => FetchError::BadRequest(body),
                code @ 500..=599 => FetchError::ServerError(code, body),
                code => FetchError::HttpError(code, body),
            });
        }

        let body = response.text().await?;
        let mut papers = parse_atom_feed(&body)?;
        papers.truncate(max_results);
        Ok(papers)
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn fetch(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperMetadata>, FetchError> {
        info!(query = %query, max_results, "Fetching papers");
        let papers = self.fetch_with_retry(query, max_results).await?;
        info!(count = papers.len(), "Fetched papers");
        Ok(papers)
    }
}

// =============================================================================
// ATOM PARSING
// =============================================================================
/// Which entry field the next text event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

/// An `<entry>` while it is being read.
#[derive(Debug, Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    author_name: String,
}

impl EntryBuilder {
    fn push_text(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Id => &mut self.id,
            Field::Title => &mut self.title,
            Field::Summary => &mut self.summary,
            Field::Published => &mut self.published,
            Field::AuthorName => &mut self.author_name,
        };
        target.push_str(text);
    }

    /// arXiv reports query errors as a regular entry with an errors id.
    fn is_api_error(&self) -> bool {
        self.id.contains("/api/errors")
    }

    fn finish(self) -> PaperMetadata {
        PaperMetadata {
            title: collapse_whitespace(&self.title),
            abstract_text: collapse_whitespace(&self.summary),
            authors: self.authors,
            publication_date: format_publication_date(&self.published),
        }
    }
}

/// Parse an arXiv Atom feed into papers, in feed order.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<PaperMetadata>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match (e.local_name().as_ref(), entry.is_some()) {
                (b"entry", _) => entry = Some(EntryBuilder::default()),
                (b"id", true) => field = Some(Field::Id),
                (b"title", true) => field = Some(Field::Title),
                (b"summary", true) => field = Some(Field::Summary),
                (b"published", true) => field = Some(Field::Published),
                (b"name", true) => field = Some(Field::AuthorName),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    let text = t.unescape().map_err(|e| FetchError::Parse(e.to_string()))?;
                    current.push_text(f, &text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    current.push_text(f, &String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(done) = entry.take() {
                        if done.is_api_error() {
                            return Err(FetchError::BadRequest(collapse_whitespace(&done.summary)));
                        }
                        papers.push(done.finish());
                    }
                    field = None;
                }
                b"name" => {
                    if let Some(current) = entry.as_mut() {
                        let name = std::mem::take(&mut current.author_name);
                        let name = name.trim();
                        if !name.is_empty() {
                            current.authors.push(name.to_string());
                        }
                    }
                    field = None;
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(papers)
}

/// Format an RFC 3339 timestamp as `YYYY-MM-DD`, or [`UNKNOWN_DATE`].
fn format_publication_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format("%Y-%m-%d").to_string();
    }
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map(|day| day.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

/// arXiv hard-wraps titles and abstracts; join the lines back up.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
