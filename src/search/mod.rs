// src/search/mod.rs
//! Search execution: runs the planned queries against a provider with
//! per-query failure isolation and adaptive pacing.
//!
//! Primary queries always run. Secondary (backup) queries only run when the
//! primary phase accumulated fewer validated results than the phase-two
//! threshold. A failed query is logged, counted, and contributes zero
//! results; total provider unavailability therefore surfaces downstream as
//! an empty sequence, never as an error.

pub mod duckduckgo;
pub mod types;

use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::plan::QueryPlan;
use crate::scoring::{RelevanceScorer, ScoredResult};

pub use types::{RecencyWindow, SearchOptions, SearchProvider, SearchResult};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_queries_total", "Queries issued to the search provider.");
        describe_counter!(
            "search_provider_errors_total",
            "Queries that failed at the provider and were skipped."
        );
        describe_counter!(
            "search_results_valid_total",
            "Results accepted by the relevance gate."
        );
    });
}

/// Executor pacing and phase control.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub options: SearchOptions,
    /// Run secondary queries only below this many validated results.
    pub phase_two_threshold: usize,
    /// Pause after a query that returned more than `rich_results` hits.
    pub pause_rich: Duration,
    pub pause_sparse: Duration,
    pub pause_error: Duration,
    /// Boundary between the sparse and rich pauses.
    pub rich_results: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            options: SearchOptions::default(),
            phase_two_threshold: 15,
            pause_rich: Duration::from_secs(2),
            pause_sparse: Duration::from_secs(1),
            pause_error: Duration::from_secs(3),
            rich_results: 5,
        }
    }
}

impl ExecutorConfig {
    /// Zero pauses, for tests and offline replays.
    pub fn without_pacing() -> Self {
        Self {
            pause_rich: Duration::ZERO,
            pause_sparse: Duration::ZERO,
            pause_error: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Run the full plan. Returns every result that passed the relevance gate,
/// in query order, duplicates included (deduplication is a later stage).
pub async fn execute_plan(
    provider: &dyn SearchProvider,
    scorer: &RelevanceScorer,
    plan: &QueryPlan,
    cfg: &ExecutorConfig,
) -> Vec<ScoredResult> {
    ensure_metrics_described();

    let mut accepted: Vec<ScoredResult> = Vec::new();

    debug!(queries = plan.primary.len(), "search phase 1: specific queries");
    run_phase(provider, scorer, &plan.primary, cfg, &mut accepted).await;

    if accepted.len() < cfg.phase_two_threshold {
        debug!(
            accumulated = accepted.len(),
            threshold = cfg.phase_two_threshold,
            queries = plan.secondary.len(),
            "search phase 2: backup queries"
        );
        run_phase(provider, scorer, &plan.secondary, cfg, &mut accepted).await;
    }

    accepted
}

async fn run_phase(
    provider: &dyn SearchProvider,
    scorer: &RelevanceScorer,
    queries: &[String],
    cfg: &ExecutorConfig,
    accepted: &mut Vec<ScoredResult>,
) {
    for query in queries {
        counter!("search_queries_total").increment(1);

        let pause = match provider.search(query, &cfg.options).await {
            Ok(results) => {
                let valid: Vec<ScoredResult> =
                    results.iter().filter_map(|r| scorer.score(r)).collect();
                counter!("search_results_valid_total").increment(valid.len() as u64);
                debug!(query = %query, raw = results.len(), valid = valid.len(), "query done");

                // More hits means the backend is warm; back off longer.
                let pause = if valid.len() > cfg.rich_results {
                    cfg.pause_rich
                } else {
                    cfg.pause_sparse
                };
                accepted.extend(valid);
                pause
            }
            Err(e) => {
                warn!(query = %query, error = ?e, provider = provider.name(), "query failed, skipping");
                counter!("search_provider_errors_total").increment(1);
                cfg.pause_error
            }
        };

        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::RoleContext;
    use anyhow::{anyhow, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that returns a fixed batch per query and counts calls.
    struct FixtureProvider {
        batch: Vec<SearchResult>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl SearchProvider for FixtureProvider {
        async fn search(&self, _query: &str, _opts: &SearchOptions) -> Result<Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(anyhow!("backend unavailable"))
            } else {
                Ok(self.batch.clone())
            }
        }
        fn name(&self) -> &'static str {
            "fixture"
        }
    }

    fn relevant_result(i: usize) -> SearchResult {
        SearchResult {
            title: format!("Maria Teste alvo de investigação {i}"),
            body: "denúncia encaminhada ao tribunal".to_string(),
            url: format!("https://g1.globo.com/noticia/{i}"),
        }
    }

    #[tokio::test]
    async fn all_queries_failing_yields_empty_not_error() {
        let provider = FixtureProvider {
            batch: vec![],
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let plan = QueryPlan::build("Maria Teste", &RoleContext::default());
        let out = execute_plan(
            &provider,
            &RelevanceScorer::default(),
            &plan,
            &ExecutorConfig::without_pacing(),
        )
        .await;
        assert!(out.is_empty());
        // Both phases ran: failures never abort the batch.
        assert_eq!(
            provider.calls.load(Ordering::SeqCst),
            plan.primary.len() + plan.secondary.len()
        );
    }

    #[tokio::test]
    async fn secondary_phase_skipped_when_primary_is_rich() {
        let provider = FixtureProvider {
            batch: (0..10).map(relevant_result).collect(),
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let plan = QueryPlan::build("Maria Teste", &RoleContext::default());
        let out = execute_plan(
            &provider,
            &RelevanceScorer::default(),
            &plan,
            &ExecutorConfig::without_pacing(),
        )
        .await;
        // 12 primary queries x 10 valid results each, well past the threshold
        assert!(out.len() >= 15);
        assert_eq!(provider.calls.load(Ordering::SeqCst), plan.primary.len());
    }

    #[tokio::test]
    async fn sparse_primary_triggers_secondary_phase() {
        let provider = FixtureProvider {
            batch: vec![relevant_result(0)],
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let mut plan = QueryPlan::build("Maria Teste", &RoleContext::default());
        plan.primary.truncate(2);
        plan.secondary.truncate(3);
        let out = execute_plan(
            &provider,
            &RelevanceScorer::default(),
            &plan,
            &ExecutorConfig::without_pacing(),
        )
        .await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
        assert_eq!(out.len(), 5);
    }
}
