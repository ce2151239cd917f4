//! Report data model: findings, severities, risk levels, and the builder
//! that turns analyzer output (or fallback output) into a complete report.
//!
//! Wire vocabulary stays Portuguese (`baixa`/`media`/`alta`/`critica`,
//! `BAIXO`/`MEDIO`/`ALTO`/`CRITICO`) so stored and exported documents remain
//! compatible with the existing analysis corpus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "baixa")]
    Low,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "critica")]
    Critical,
}

/// Aggregate risk classification for a whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "BAIXO")]
    Low,
    #[serde(rename = "MEDIO")]
    Medium,
    #[serde(rename = "ALTO")]
    High,
    #[serde(rename = "CRITICO")]
    Critical,
}

impl RiskLevel {
    /// Normalize a free-text risk label into the four-value vocabulary.
    ///
    /// External analyzers return labels in whatever casing/accenting the
    /// model produced ("CRÍTICO", "High risk", "médio"). Matching is by
    /// substring on an accent-folded uppercase copy. Returns `None` for
    /// anything unrecognized so the caller can route to the deterministic
    /// aggregation instead of silently defaulting.
    pub fn parse_label(raw: &str) -> Option<RiskLevel> {
        let s = fold_accents(&raw.to_uppercase());
        if s.contains("CRIT") {
            Some(RiskLevel::Critical)
        } else if s.contains("ALTO") || s.contains("ALTA") || s.contains("HIGH") {
            Some(RiskLevel::High)
        } else if s.contains("MEDIO") || s.contains("MEDIA") || s.contains("MEDIUM") {
            Some(RiskLevel::Medium)
        } else if s.contains("BAIX") || s.contains("LOW") {
            Some(RiskLevel::Low)
        } else {
            None
        }
    }
}

/// Replace the accented characters that occur in risk labels with their
/// ASCII base letter. Input is expected to be uppercased already.
fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' => 'A',
            'É' | 'Ê' => 'E',
            'Í' => 'I',
            'Ó' | 'Ô' | 'Õ' => 'O',
            'Ú' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Origin class of a finding's source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Twitter,
    #[serde(rename = "noticia")]
    News,
    Forum,
    Blog,
    #[serde(rename = "site_oficial")]
    Official,
}

impl SourceKind {
    /// Classify a URL into its source class. Same precedence as the
    /// original pipeline: social first, then official, then generic news.
    pub fn from_url(url: &str) -> SourceKind {
        let u = url.to_lowercase();
        if u.contains("twitter.com") || u.contains("x.com") {
            SourceKind::Twitter
        } else if [".gov", ".jus", ".mp"].iter().any(|d| u.contains(d)) {
            SourceKind::Official
        } else if u.contains(".com.br") || u.contains(".com") {
            SourceKind::News
        } else {
            SourceKind::Blog
        }
    }

    /// Human-readable label used in the consulted-sources list.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Twitter => "Twitter/X",
            SourceKind::News => "Notícia",
            SourceKind::Forum => "Fórum",
            SourceKind::Blog => "Blog",
            SourceKind::Official => "Site oficial",
        }
    }
}

/// One discrete controversy/allegation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Short headline, capped at 100 chars.
    pub title: String,
    /// Capped at 200 chars.
    pub description: String,
    pub source_url: String,
    pub source_kind: SourceKind,
    pub severity: Severity,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub public_impact: String,
}

impl Finding {
    /// Construct with the source class derived from the URL and the length
    /// caps applied.
    pub fn new(
        title: &str,
        description: &str,
        severity: Severity,
        categories: Vec<String>,
        source_url: String,
        public_impact: String,
    ) -> Finding {
        let source_kind = SourceKind::from_url(&source_url);
        Finding {
            title: title.to_string(),
            description: description.to_string(),
            source_url,
            source_kind,
            severity,
            categories,
            evidence: Vec::new(),
            public_impact,
        }
        .truncated()
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Finding {
        self.evidence = evidence;
        self
    }

    /// Enforce the title/description length caps (char counts, not bytes —
    /// the corpus is Portuguese and multibyte).
    pub fn truncated(mut self) -> Finding {
        self.title = take_chars(&self.title, 100);
        self.description = take_chars(&self.description, 200);
        self
    }
}

pub(crate) fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Company linked to the subject by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedCompany {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Final structured report for one analysis run. Immutable once built;
/// construct through [`ReportBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub subject_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_role: Option<String>,
    /// Always equals `findings.len()`; kept explicit so persisted rows and
    /// exported documents carry the counter without recomputation.
    pub total_findings: usize,
    pub findings: Vec<Finding>,
    pub overall_risk: RiskLevel,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    #[serde(default)]
    pub sources_consulted: Vec<String>,
    #[serde(default)]
    pub social_posts: Vec<String>,
    #[serde(default)]
    pub companies: Vec<AssociatedCompany>,
}

/// Builder that starts from safe defaults and applies overrides, so a report
/// is never observable half-initialized.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    subject_name: String,
    public_role: Option<String>,
    findings: Vec<Finding>,
    overall_risk: Option<RiskLevel>,
    summary: Option<String>,
    recommendations: Option<String>,
    analyzed_at: Option<DateTime<Utc>>,
    sources_consulted: Vec<String>,
    social_posts: Vec<String>,
    companies: Vec<AssociatedCompany>,
}

impl ReportBuilder {
    pub fn new(subject_name: impl Into<String>) -> Self {
        Self {
            subject_name: subject_name.into(),
            public_role: None,
            findings: Vec::new(),
            overall_risk: None,
            summary: None,
            recommendations: None,
            analyzed_at: None,
            sources_consulted: Vec::new(),
            social_posts: Vec::new(),
            companies: Vec::new(),
        }
    }

    pub fn public_role(mut self, role: Option<String>) -> Self {
        self.public_role = role.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings.into_iter().map(Finding::truncated).collect();
        self
    }

    pub fn overall_risk(mut self, risk: RiskLevel) -> Self {
        self.overall_risk = Some(risk);
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        let s = summary.into();
        if !s.trim().is_empty() {
            self.summary = Some(s);
        }
        self
    }

    pub fn recommendations(mut self, rec: Option<String>) -> Self {
        self.recommendations = rec.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn analyzed_at(mut self, ts: DateTime<Utc>) -> Self {
        self.analyzed_at = Some(ts);
        self
    }

    /// Append a source tag if not already present (e.g. the search engine).
    pub fn add_source(mut self, source: impl Into<String>) -> Self {
        let s = source.into();
        if !self.sources_consulted.iter().any(|x| x == &s) {
            self.sources_consulted.push(s);
        }
        self
    }

    pub fn sources(mut self, sources: Vec<String>) -> Self {
        self.sources_consulted = sources;
        self
    }

    pub fn social_posts(mut self, posts: Vec<String>) -> Self {
        self.social_posts = posts;
        self
    }

    pub fn companies(mut self, companies: Vec<AssociatedCompany>) -> Self {
        self.companies = companies;
        self
    }

    /// Finalize. Missing summary/risk/timestamp are backfilled from
    /// defaults; the findings counter is derived, never supplied.
    pub fn build(self) -> Report {
        let overall_risk = self
            .overall_risk
            .unwrap_or_else(|| crate::classify::overall_risk(&severities(&self.findings)));
        let summary = self.summary.unwrap_or_else(|| {
            if self.findings.is_empty() {
                format!(
                    "Nenhuma polêmica encontrada nas buscas realizadas para {}.",
                    self.subject_name
                )
            } else {
                format!(
                    "{} polêmica(s) identificada(s) para {}.",
                    self.findings.len(),
                    self.subject_name
                )
            }
        });
        Report {
            total_findings: self.findings.len(),
            subject_name: self.subject_name,
            public_role: self.public_role,
            findings: self.findings,
            overall_risk,
            summary,
            recommendations: self.recommendations,
            analyzed_at: self.analyzed_at.unwrap_or_else(Utc::now),
            sources_consulted: self.sources_consulted,
            social_posts: self.social_posts,
            companies: self.companies,
        }
    }
}

fn severities(findings: &[Finding]) -> Vec<Severity> {
    findings.iter().map(|f| f.severity).collect()
}
