// src/search/types.rs
use anyhow::Result;

/// One raw web search hit. Immutable once produced; only derived structures
/// are ever persisted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub body: String,
    pub url: String,
}

/// Recency window requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencyWindow {
    Day,
    Week,
    Month,
    Year,
}

impl RecencyWindow {
    /// Wire code used by DuckDuckGo-compatible backends.
    pub fn code(self) -> &'static str {
        match self {
            RecencyWindow::Day => "d",
            RecencyWindow::Week => "w",
            RecencyWindow::Month => "m",
            RecencyWindow::Year => "y",
        }
    }
}

/// Per-query provider options.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub region: String,
    pub max_results: usize,
    pub recency: RecencyWindow,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            region: "br-pt".to_string(),
            max_results: 10,
            recency: RecencyWindow::Year,
        }
    }
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchResult>>;
    fn name(&self) -> &'static str;
}
