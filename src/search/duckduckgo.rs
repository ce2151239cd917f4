//! DuckDuckGo search provider over the HTML endpoint.
//!
//! The backend has no official API; this client posts to the HTML frontend
//! (the same backend the original tooling used) and extracts result blocks
//! with regexes. Markup drift degrades to fewer results, not errors: only
//! transport failures surface as `Err`, per the executor's contract.

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use crate::search::types::{SearchOptions, SearchProvider, SearchResult};

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

static RE_RESULT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="(?P<href>[^"]+)"[^>]*>(?P<title>.*?)</a>"#)
        .expect("result link regex")
});
static RE_SNIPPET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(?P<body>.*?)</a>"#)
        .expect("snippet regex")
});
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));

pub struct DuckDuckGoProvider {
    http: reqwest::Client,
}

impl DuckDuckGoProvider {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; diligencia/0.1)")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self { http }
    }

    /// Parse the HTML response into results. Kept separate from transport
    /// so fixtures exercise it directly.
    pub fn parse_html(html: &str, max_results: usize) -> Vec<SearchResult> {
        let mut snippets = RE_SNIPPET
            .captures_iter(html)
            .map(|c| clean_fragment(&c["body"]));

        let mut out = Vec::new();
        for caps in RE_RESULT_LINK.captures_iter(html) {
            if out.len() >= max_results {
                break;
            }
            let url = resolve_redirect(&caps["href"]);
            let title = clean_fragment(&caps["title"]);
            if url.is_empty() || title.is_empty() {
                continue;
            }
            let body = snippets.next().unwrap_or_default();
            out.push(SearchResult { title, body, url });
        }
        out
    }
}

impl Default for DuckDuckGoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        let form = [
            ("q", query),
            ("kl", opts.region.as_str()),
            ("df", opts.recency.code()),
        ];
        let resp = self
            .http
            .post(ENDPOINT)
            .form(&form)
            .send()
            .await
            .context("duckduckgo http post")?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("duckduckgo responded with status {status}");
        }
        let html = resp.text().await.context("duckduckgo body .text()")?;
        Ok(Self::parse_html(&html, opts.max_results))
    }

    fn name(&self) -> &'static str {
        "DuckDuckGo"
    }
}

/// Strip tags, decode entities, collapse whitespace.
fn clean_fragment(raw: &str) -> String {
    let no_tags = RE_TAGS.replace_all(raw, "");
    let decoded = html_escape::decode_html_entities(&no_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// DuckDuckGo wraps outbound links in a redirect with the target in the
/// `uddg` query parameter. Unwrap it; pass plain URLs through.
fn resolve_redirect(href: &str) -> String {
    let href = html_escape::decode_html_entities(href).to_string();
    if let Some(pos) = href.find("uddg=") {
        let tail = &href[pos + 5..];
        let encoded = tail.split('&').next().unwrap_or(tail);
        percent_decode(encoded)
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href
    }
}

/// Minimal percent-decoding for redirect targets. Invalid escapes are kept
/// verbatim rather than dropped.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((h * 16 + l) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r##"
    <div class="result results_links results_links_deep web-result">
      <h2 class="result__title">
        <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fg1.globo.com%2Fpr%2Fnoticia%2Finvestigacao.html&amp;rut=abc">Secret&aacute;rio alvo de investiga&ccedil;&atilde;o</a>
      </h2>
      <a class="result__snippet" href="#">MPF apura <b>den&uacute;ncia</b> de fraude em contratos</a>
    </div>
    <div class="result">
      <a rel="nofollow" class="result__a" href="https://tribunal.jus.br/processo/1">Processo no tribunal</a>
      <a class="result__snippet" href="#">A&ccedil;&atilde;o judicial em andamento</a>
    </div>
    "##;

    #[test]
    fn parses_results_with_redirect_unwrapping() {
        let results = DuckDuckGoProvider::parse_html(FIXTURE, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].url,
            "https://g1.globo.com/pr/noticia/investigacao.html"
        );
        assert_eq!(results[0].title, "Secretário alvo de investigação");
        assert_eq!(results[0].body, "MPF apura denúncia de fraude em contratos");
        assert_eq!(results[1].url, "https://tribunal.jus.br/processo/1");
    }

    #[test]
    fn respects_max_results() {
        let results = DuckDuckGoProvider::parse_html(FIXTURE, 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_page_yields_no_results() {
        assert!(DuckDuckGoProvider::parse_html("<html></html>", 10).is_empty());
    }

    #[test]
    fn percent_decode_handles_escapes_and_passthrough() {
        assert_eq!(percent_decode("https%3A%2F%2Fa.br%2Fx"), "https://a.br/x");
        assert_eq!(percent_decode("plain-url"), "plain-url");
        assert_eq!(percent_decode("bad%zz"), "bad%zz");
    }
}
