// src/analyze/mod.rs
//! End-to-end analysis pipeline: plan, search, rank, analyze, consolidate.
//!
//! `Pipeline::run` is the one entry point the API layer calls. It always
//! produces a complete [`Report`]: when the language-model analyzer is
//! unavailable or returns garbage, findings are derived per ranked result by
//! the keyword classifier instead.

pub mod adapter;

use std::sync::Arc;

use anyhow::{bail, Result};
use metrics::counter;
use tracing::{info, warn};

use crate::classify;
use crate::dedup::dedup_and_rank;
use crate::plan::{QueryPlan, RoleContext};
use crate::report::{Finding, Report, ReportBuilder, RiskLevel, SourceKind};
use crate::scoring::{RelevanceScorer, ScoredResult};
use crate::search::{execute_plan, ExecutorConfig, SearchProvider};

pub use adapter::{
    build_analyzer, load_analyzer_config, Analyzer, AnalyzerConfig, CachingAnalyzer,
    DisabledAnalyzer, DraftAnalysis, DraftCompany, DraftFinding, DynAnalyzer, MockProvider,
    XaiProvider,
};

const SEARCH_ENGINE_TAG: &str = "Busca na web (DuckDuckGo)";

/// Everything `run` needs, wired once at startup and shared across requests.
#[derive(Clone)]
pub struct Pipeline {
    pub provider: Arc<dyn SearchProvider>,
    pub scorer: Arc<RelevanceScorer>,
    pub analyzer: DynAnalyzer,
    pub executor: ExecutorConfig,
}

impl Pipeline {
    /// Full analysis for one subject. `role` and `state` are optional
    /// context that widens the query plan.
    pub async fn run(
        &self,
        subject_name: &str,
        role: Option<&str>,
        state: Option<&str>,
    ) -> Result<Report> {
        let subject = subject_name.trim();
        if subject.is_empty() {
            bail!("subject name must not be empty");
        }

        let context = RoleContext::extract(role, state);
        let plan = QueryPlan::build(subject, &context);
        info!(
            subject,
            primary = plan.primary.len(),
            secondary = plan.secondary.len(),
            "analysis started"
        );

        let accepted = execute_plan(&*self.provider, &self.scorer, &plan, &self.executor).await;
        let ranked = dedup_and_rank(accepted, subject);

        if ranked.is_empty() {
            info!(subject, "no validated results; issuing empty report");
            return Ok(empty_report(subject, role));
        }

        let report = match self.analyzer.analyze(subject, &ranked).await {
            Some(draft) => consolidate_draft(subject, role, &ranked, draft),
            None => {
                counter!("analyzer_fallback_total").increment(1);
                warn!(subject, "analyzer unavailable; using keyword fallback");
                consolidate_fallback(subject, role, &ranked)
            }
        };

        info!(
            subject,
            findings = report.total_findings,
            risk = ?report.overall_risk,
            "analysis finished"
        );
        Ok(report)
    }
}

/// Canonical report for a subject with no validated results.
fn empty_report(subject: &str, role: Option<&str>) -> Report {
    ReportBuilder::new(subject)
        .public_role(role.map(str::to_string))
        .overall_risk(RiskLevel::Low)
        .summary(format!(
            "Nenhuma polêmica encontrada nas buscas realizadas para {subject}."
        ))
        .recommendations(Some(
            "Monitoramento periódico recomendado; ausência de resultados não \
             é atestado de idoneidade."
                .to_string(),
        ))
        .add_source(SEARCH_ENGINE_TAG.to_string())
        .build()
}

/// Merge an analyzer draft into the final report. The draft wins on prose;
/// deterministic structures (risk aggregation, source tagging) backfill
/// whatever it left out.
fn consolidate_draft(
    subject: &str,
    role: Option<&str>,
    ranked: &[ScoredResult],
    draft: DraftAnalysis,
) -> Report {
    let mut findings = Vec::with_capacity(draft.findings.len());
    for df in &draft.findings {
        let severity = df.severity();
        let text = format!("{} {}", df.title, df.description);
        let categories = if df.category.trim().is_empty() {
            classify::categories_of(&text)
        } else {
            vec![df.category.clone()]
        };
        findings.push(Finding::new(
            &df.title,
            &df.description,
            severity,
            categories,
            df.source_url.clone(),
            "Avaliado pela análise automatizada".to_string(),
        ));
    }

    let mut builder = ReportBuilder::new(subject)
        .public_role(role.map(str::to_string))
        .findings(findings)
        .companies(draft.companies.iter().map(Into::into).collect());

    if !draft.summary.trim().is_empty() {
        builder = builder.summary(draft.summary.clone());
    }
    if !draft.recommendations.trim().is_empty() {
        builder = builder.recommendations(Some(draft.recommendations.clone()));
    }
    // Free-text risk labels only count when they parse; otherwise the
    // builder re-aggregates from finding severities.
    if let Some(risk) = RiskLevel::parse_label(&draft.risk_label) {
        builder = builder.overall_risk(risk);
    }

    let social = if draft.social_posts.is_empty() {
        social_posts_from(ranked)
    } else {
        draft.social_posts.clone()
    };
    builder = builder.social_posts(social);

    builder = builder.add_source(SEARCH_ENGINE_TAG.to_string());
    for src in &draft.sources {
        builder = builder.add_source(src.clone());
    }
    for s in ranked {
        builder = builder.add_source(source_tag(&s.result.url));
    }

    builder.build()
}

/// Deterministic consolidation: one finding per ranked result, classified
/// by keyword lexicons.
fn consolidate_fallback(subject: &str, role: Option<&str>, ranked: &[ScoredResult]) -> Report {
    let mut findings = Vec::with_capacity(ranked.len());
    for s in ranked {
        let r = &s.result;
        let text = format!("{} {}", r.title, r.body);
        findings.push(
            Finding::new(
                &r.title,
                &r.body,
                classify::severity_of(&text),
                classify::categories_of(&text),
                r.url.clone(),
                "A ser avaliado".to_string(),
            )
            .with_evidence(vec![crate::report::take_chars(&r.body, 150)]),
        );
    }
    let risk = classify::overall_risk(&findings.iter().map(|f| f.severity).collect::<Vec<_>>());

    let mut builder = ReportBuilder::new(subject)
        .public_role(role.map(str::to_string))
        .findings(findings)
        .overall_risk(risk)
        .summary(format!(
            "Foram encontrados {} resultados relevantes nas buscas para {}. \
             Classificação automática por palavras-chave; revisão humana recomendada.",
            ranked.len(),
            subject
        ))
        .recommendations(Some(
            "Verificar cada fonte listada e confirmar o andamento dos casos citados.".to_string(),
        ))
        .social_posts(social_posts_from(ranked))
        .add_source(SEARCH_ENGINE_TAG.to_string());

    for s in ranked {
        builder = builder.add_source(source_tag(&s.result.url));
    }
    builder.build()
}

/// URLs from social platforms double as "relevant posts".
fn social_posts_from(ranked: &[ScoredResult]) -> Vec<String> {
    ranked
        .iter()
        .filter(|s| SourceKind::from_url(&s.result.url) == SourceKind::Twitter)
        .map(|s| s.result.url.clone())
        .collect()
}

fn source_tag(url: &str) -> String {
    format!("{} ({url})", SourceKind::from_url(url).label())
}

impl From<&DraftCompany> for crate::report::AssociatedCompany {
    fn from(c: &DraftCompany) -> Self {
        Self {
            name: c.name.clone(),
            cnpj: c.cnpj.clone(),
            relation: c.relation.clone(),
            source_url: c.source_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use crate::search::SearchResult;

    fn scored(title: &str, body: &str, url: &str) -> ScoredResult {
        ScoredResult {
            result: SearchResult {
                title: title.to_string(),
                body: body.to_string(),
                url: url.to_string(),
            },
            relevance: 3,
        }
    }

    #[test]
    fn empty_report_shape() {
        let r = empty_report("Maria Teste", Some("Secretária"));
        assert_eq!(r.total_findings, 0);
        assert_eq!(r.overall_risk, RiskLevel::Low);
        assert!(r.summary.contains("Maria Teste"));
        assert_eq!(r.sources_consulted, vec![SEARCH_ENGINE_TAG.to_string()]);
    }

    #[test]
    fn fallback_builds_one_finding_per_result() {
        let ranked = vec![
            scored(
                "Maria Teste condenada por corrupção",
                "desvio de verbas apontado",
                "https://tribunal.jus.br/1",
            ),
            scored(
                "Maria Teste alvo de investigação",
                "inquérito aberto",
                "https://g1.globo.com/2",
            ),
        ];
        let r = consolidate_fallback("Maria Teste", None, &ranked);
        assert_eq!(r.total_findings, 2);
        assert_eq!(r.findings[0].severity, Severity::High);
        assert!(r.findings[0].categories.contains(&"Corrupção".to_string()));
        // One High + one Medium finding aggregates to Medium.
        assert_eq!(r.overall_risk, RiskLevel::Medium);
        assert!(r
            .sources_consulted
            .iter()
            .any(|s| s.contains("tribunal.jus.br")));
    }

    #[test]
    fn draft_risk_label_wins_when_parseable() {
        let ranked = vec![scored("Maria Teste", "texto", "https://a.com/1")];
        let draft = DraftAnalysis {
            summary: "resumo do modelo".into(),
            risk_label: "CRITICO".into(),
            ..Default::default()
        };
        let r = consolidate_draft("Maria Teste", None, &ranked, draft);
        assert_eq!(r.overall_risk, RiskLevel::Critical);
        assert_eq!(r.summary, "resumo do modelo");
    }

    #[test]
    fn unparseable_risk_label_falls_back_to_aggregation() {
        let ranked = vec![scored("Maria Teste", "texto", "https://a.com/1")];
        let draft = DraftAnalysis {
            risk_label: "indeterminado".into(),
            findings: vec![DraftFinding {
                title: "Fraude em licitação municipal".into(),
                description: "Superfaturamento apontado pelo tribunal de contas".into(),
                severity_label: "alta".into(),
                category: "Licitações".into(),
                source_url: "https://tce.gov.br/1".into(),
            }],
            ..Default::default()
        };
        let r = consolidate_draft("Maria Teste", None, &ranked, draft);
        // A single high finding aggregates to Medium.
        assert_eq!(r.overall_risk, RiskLevel::Medium);
        assert_eq!(r.total_findings, 1);
    }

    #[test]
    fn social_posts_taken_from_ranked_when_draft_has_none() {
        let ranked = vec![
            scored("Maria Teste no X", "post", "https://x.com/mt/status/1"),
            scored("Maria Teste na mídia", "texto", "https://g1.globo.com/2"),
        ];
        let r = consolidate_draft("Maria Teste", None, &ranked, DraftAnalysis::default());
        assert_eq!(r.social_posts, vec!["https://x.com/mt/status/1".to_string()]);
    }

    #[tokio::test]
    async fn pipeline_rejects_empty_subject() {
        struct NoProvider;
        #[async_trait::async_trait]
        impl SearchProvider for NoProvider {
            async fn search(
                &self,
                _q: &str,
                _o: &crate::search::SearchOptions,
            ) -> anyhow::Result<Vec<SearchResult>> {
                Ok(vec![])
            }
            fn name(&self) -> &'static str {
                "none"
            }
        }
        let pipeline = Pipeline {
            provider: Arc::new(NoProvider),
            scorer: Arc::new(RelevanceScorer::default()),
            analyzer: Arc::new(DisabledAnalyzer),
            executor: ExecutorConfig::without_pacing(),
        };
        assert!(pipeline.run("   ", None, None).await.is_err());
    }
}
