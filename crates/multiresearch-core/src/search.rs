//! Web search adapter with per-agent result windowing.
//!
//! Concurrently running agents each receive a disjoint window of the
//! underlying provider's results: agent `i` sees results
//! `[5*(i-1), 5*(i-1)+max_results)`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ResearcherError;

/// One search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Raw search provider, unaware of agent windowing.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, count: usize)
    -> Result<Vec<SearchResult>, ResearcherError>;
}

/// The slice of provider results assigned to one agent index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    offset: usize,
    len: usize,
}

impl SearchWindow {
    /// Window for agent `agent_index` with `max_results` hits.
    ///
    /// Indices are expected to start at 1 and be contiguous; anything below
    /// 1 saturates to a zero offset.
    pub fn for_agent(agent_index: u32, max_results: usize) -> Self {
        let offset = 5 * agent_index.saturating_sub(1) as usize;
        Self {
            offset,
            len: max_results,
        }
    }

    /// How many results must be requested from the provider to fill the window.
    pub fn fetch_count(&self) -> usize {
        self.offset + self.len
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.offset, self.offset + self.len)
    }

    pub fn slice(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        results.into_iter().skip(self.offset).take(self.len).collect()
    }
}

/// Windowed search facade handed to agents as their tool capability.
#[derive(Clone)]
pub struct SearchClient {
    backend: std::sync::Arc<dyn SearchBackend>,
    max_results: usize,
}

impl SearchClient {
    pub fn new(backend: std::sync::Arc<dyn SearchBackend>, max_results: usize) -> Self {
        Self {
            backend,
            max_results,
        }
    }

    /// Fetch the window of results assigned to `agent_index`.
    pub async fn search(
        &self,
        query: &str,
        agent_index: u32,
        max_results: Option<usize>,
    ) -> Result<Vec<SearchResult>, ResearcherError> {
        let window = SearchWindow::for_agent(agent_index, max_results.unwrap_or(self.max_results));
        let fetched = self.backend.search(query, window.fetch_count()).await?;
        let hits = window.slice(fetched);
        debug!(
            query,
            agent_index,
            hits = hits.len(),
            window = ?window.bounds(),
            "search window resolved"
        );
        Ok(hits)
    }
}

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

static RESULT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.result").expect("invalid result selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__a").expect("invalid title selector"));
static SNIPPET_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__snippet").expect("invalid snippet selector"));

/// DuckDuckGo HTML endpoint backend.
pub struct DuckDuckGoBackend {
    http: reqwest::Client,
    html_url: String,
}

impl DuckDuckGoBackend {
    pub fn new() -> Self {
        Self::with_endpoint(DDG_HTML_URL)
    }

    pub fn with_endpoint(html_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            html_url: html_url.into(),
        }
    }
}

impl Default for DuckDuckGoBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    async fn search(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchResult>, ResearcherError> {
        let form = [("q", query), ("b", "")];
        let response = self
            .http
            .post(&self.html_url)
            .form(&form)
            .send()
            .await
            .map_err(|err| ResearcherError::Search(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearcherError::Search(format!("HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|err| ResearcherError::Search(err.to_string()))?;
        Ok(parse_results(&html, count))
    }
}

/// Extract organic results from a DuckDuckGo HTML results page.
fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let mut results = Vec::new();

    for element in document.select(&RESULT_SELECTOR) {
        let Some(title_elem) = element.select(&TITLE_SELECTOR).next() else {
            continue;
        };

        let title = title_elem.text().collect::<String>();
        let url = title_elem
            .value()
            .attr("href")
            .map(str::to_string)
            .unwrap_or_default();
        if title.is_empty() || url.is_empty() || url.contains("duckduckgo.com") {
            continue;
        }

        let snippet = element
            .select(&SNIPPET_SELECTOR)
            .next()
            .map(|s| s.text().collect::<String>())
            .filter(|s| !s.is_empty());

        results.push(SearchResult {
            title,
            url,
            snippet,
        });
        if results.len() >= limit {
            break;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct NumberedBackend;

    #[async_trait]
    impl SearchBackend for NumberedBackend {
        async fn search(
            &self,
            _query: &str,
            count: usize,
        ) -> Result<Vec<SearchResult>, ResearcherError> {
            Ok((0..count)
                .map(|i| SearchResult {
                    title: format!("result {i}"),
                    url: format!("https://example.com/{i}"),
                    snippet: None,
                })
                .collect())
        }
    }

    #[test]
    fn window_formula_matches_offset_contract() {
        let window = SearchWindow::for_agent(1, 5);
        assert_eq!(window.bounds(), (0, 5));
        assert_eq!(window.fetch_count(), 5);

        let window = SearchWindow::for_agent(2, 5);
        assert_eq!(window.bounds(), (5, 10));
        assert_eq!(window.fetch_count(), 10);

        let window = SearchWindow::for_agent(3, 7);
        assert_eq!(window.bounds(), (10, 17));
    }

    #[test]
    fn index_below_one_saturates_to_zero_offset() {
        assert_eq!(SearchWindow::for_agent(0, 5).bounds(), (0, 5));
    }

    #[test]
    fn windows_for_distinct_agents_never_overlap() {
        for a in 1u32..=4 {
            for b in 1u32..=4 {
                if a == b {
                    continue;
                }
                let (a_start, a_end) = SearchWindow::for_agent(a, 5).bounds();
                let (b_start, b_end) = SearchWindow::for_agent(b, 5).bounds();
                assert!(a_end <= b_start || b_end <= a_start, "{a} and {b} overlap");
            }
        }
    }

    #[tokio::test]
    async fn client_returns_the_agent_slice() {
        let client = SearchClient::new(Arc::new(NumberedBackend), 5);

        let hits = client.search("anything", 2, None).await.unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].title, "result 5");
        assert_eq!(hits[4].title, "result 9");
    }

    #[tokio::test]
    async fn client_honors_max_results_override() {
        let client = SearchClient::new(Arc::new(NumberedBackend), 5);
        let hits = client.search("anything", 1, Some(3)).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[2].title, "result 2");
    }

    #[test]
    fn parses_duckduckgo_result_blocks() {
        let html = r#"
            <html><body>
              <div class="result">
                <a class="result__a" href="https://langchain.com/langgraph">LangGraph</a>
                <a class="result__snippet" href="https://langchain.com/langgraph">Agent graphs.</a>
              </div>
              <div class="result">
                <a class="result__a" href="https://duckduckgo.com/internal">skip me</a>
              </div>
              <div class="result">
                <a class="result__a" href="https://example.org/post">Second hit</a>
              </div>
            </body></html>
        "#;

        let results = parse_results(html, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "LangGraph");
        assert_eq!(results[0].snippet.as_deref(), Some("Agent graphs."));
        assert_eq!(results[1].url, "https://example.org/post");
    }

    #[test]
    fn parse_respects_limit() {
        let block = |i: u32| {
            format!(
                r#"<div class="result"><a class="result__a" href="https://e.com/{i}">t{i}</a></div>"#
            )
        };
        let html = (0..8).map(block).collect::<String>();
        assert_eq!(parse_results(&html, 3).len(), 3);
    }
}
