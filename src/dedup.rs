//! Deduplication and trust ranking of validated search results.
//!
//! Pass order: duplicate URL, subject-name presence, near-duplicate title
//! (content hash of the first 100 chars of the lowercased title). Survivors
//! are ranked by a source-trust weight; ties keep insertion order (stable
//! sort), which is the order of first acceptance.

use metrics::counter;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

use crate::scoring::ScoredResult;
use crate::search::SearchResult;

/// Domain fragments that mark an official source (max ranking weight).
const OFFICIAL_DOMAINS: &[&str] = &[".gov", ".jus", ".mp", "tcu", "tse"];

/// Top-tier news outlets (mid ranking weight).
const TOP_NEWS_DOMAINS: &[&str] = &["g1.globo.com", "oglobo.globo.com", "folha.com.br"];

/// Legal-process markers that bump any source's weight.
const LEGAL_PROCESS_TERMS: &[&str] = &["processo", "tribunal", "ministério público"];

/// Ranking weight for one result: officials dominate, then major outlets,
/// with a flat bonus for legal-process content.
pub fn trust_weight(result: &SearchResult) -> i32 {
    let url = result.url.to_lowercase();
    let mut weight = 0;

    if OFFICIAL_DOMAINS.iter().any(|d| url.contains(d)) {
        weight += 100;
    } else if TOP_NEWS_DOMAINS.iter().any(|d| url.contains(d)) {
        weight += 50;
    }

    let text = format!("{} {}", result.title, result.body).to_lowercase();
    if LEGAL_PROCESS_TERMS.iter().any(|t| text.contains(t)) {
        weight += 30;
    }

    weight
}

/// Hash of the truncated lowercased title, used for near-duplicate
/// suppression (the same story syndicated under slightly different URLs).
fn title_fingerprint(title: &str) -> String {
    let key: String = title.to_lowercase().chars().take(100).collect();
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Deduplicate and rank. Output is strictly <= input; every survivor
/// mentions the subject name in its title+body (case-insensitive).
pub fn dedup_and_rank(results: Vec<ScoredResult>, subject_name: &str) -> Vec<ScoredResult> {
    let name_pattern = Regex::new(&format!("(?i){}", regex::escape(subject_name)))
        .expect("escaped name is a valid pattern");

    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut unique: Vec<ScoredResult> = Vec::with_capacity(results.len());
    let mut removed = 0usize;

    for scored in results {
        let r = &scored.result;

        if seen_urls.contains(&r.url) {
            removed += 1;
            continue;
        }

        let text = format!("{} {}", r.title, r.body);
        if !name_pattern.is_match(&text) {
            removed += 1;
            continue;
        }

        let fp = title_fingerprint(&r.title);
        if seen_titles.contains(&fp) {
            removed += 1;
            continue;
        }

        seen_urls.insert(r.url.clone());
        seen_titles.insert(fp);
        unique.push(scored);
    }

    counter!("dedup_removed_total").increment(removed as u64);
    debug!(kept = unique.len(), removed, "dedup done");

    // Stable: equal weights keep first-acceptance order.
    unique.sort_by_key(|s| std::cmp::Reverse(trust_weight(&s.result)));
    unique
}
