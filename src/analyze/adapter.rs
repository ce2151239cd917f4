//! Language-model analyzer: provider abstraction + file cache + daily limit.
//!
//! The analyzer is a collaborator, never a dependency: every call site must
//! tolerate `None` and fall back to the deterministic classifier. Providers
//! return a [`DraftAnalysis`] parsed from model JSON output; anything that
//! does not parse (or fails validation) is treated as analyzer failure.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::report::{Severity, take_chars};
use crate::scoring::ScoredResult;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Report-shaped structure returned by a provider. Wire field names match
/// the persisted analysis corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DraftAnalysis {
    #[serde(rename = "resumo_analise", default)]
    pub summary: String,
    #[serde(rename = "polemicas", default)]
    pub findings: Vec<DraftFinding>,
    #[serde(rename = "empresas_associadas", default)]
    pub companies: Vec<DraftCompany>,
    /// Free-text risk label; normalized downstream, never trusted blindly.
    #[serde(rename = "risco_reputacao", default)]
    pub risk_label: String,
    #[serde(rename = "recomendacoes", default)]
    pub recommendations: String,
    #[serde(rename = "tweets_relevantes", default)]
    pub social_posts: Vec<String>,
    #[serde(rename = "fontes_consultadas", default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DraftFinding {
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    /// Free-text severity label from the model.
    #[serde(rename = "gravidade", default)]
    pub severity_label: String,
    #[serde(rename = "categoria", default)]
    pub category: String,
    #[serde(rename = "fonte_url", default)]
    pub source_url: String,
}

impl DraftFinding {
    /// Map the model's severity label onto the taxonomy; unparseable labels
    /// are re-derived from the finding text by the deterministic classifier.
    pub fn severity(&self) -> Severity {
        let s = self.severity_label.to_lowercase();
        if s.contains("crit") {
            Severity::Critical
        } else if s.contains("alta") || s.contains("high") {
            Severity::High
        } else if s.contains("medi") {
            Severity::Medium
        } else if s.contains("baixa") || s.contains("low") {
            Severity::Low
        } else {
            crate::classify::severity_of(&format!("{} {}", self.title, self.description))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DraftCompany {
    #[serde(rename = "nome_empresa", default)]
    pub name: String,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(rename = "relacao", default)]
    pub relation: String,
    #[serde(rename = "fonte_url", default)]
    pub source_url: Option<String>,
}

/// Analyzer collaborator contract. `None` means "unavailable or unusable";
/// the caller owns the fallback.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, subject: &str, ranked: &[ScoredResult]) -> Option<DraftAnalysis>;
    /// Provider name for diagnostics/headers.
    fn provider_name(&self) -> &'static str;
}

pub type DynAnalyzer = Arc<dyn Analyzer>;

/// Config loaded from `config/analyzer.json`. Defaults keep the analyzer
/// off, so a fresh checkout runs pure-fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub enabled: bool,
    /// "xai" is the only real provider today.
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Per-day real-call budget; defaults to 50 if absent.
    pub daily_limit: Option<u32>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            model: None,
            daily_limit: Some(50),
        }
    }
}

pub fn load_analyzer_config() -> AnalyzerConfig {
    match fs::read_to_string("config/analyzer.json") {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => AnalyzerConfig::default(),
    }
}

/// Factory: build an analyzer according to config and environment.
///
/// * `DILIGENCIA_AI_MODE=mock` returns a deterministic mock.
/// * Disabled config returns the disabled analyzer.
/// * Otherwise the real provider wrapped with caching + daily limit.
pub fn build_analyzer(config: &AnalyzerConfig) -> DynAnalyzer {
    if std::env::var("DILIGENCIA_AI_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider {
            fixed: DraftAnalysis {
                summary: "Análise simulada".to_string(),
                risk_label: "BAIXO".to_string(),
                ..Default::default()
            },
        };
        return Arc::new(CachingAnalyzer::new(
            mock,
            default_cache_dir(),
            config.daily_limit.unwrap_or(50),
        ));
    }

    if !config.enabled {
        return Arc::new(DisabledAnalyzer);
    }

    match config.provider.as_deref() {
        Some("xai") => {
            let provider = XaiProvider::new(config.model.as_deref());
            Arc::new(CachingAnalyzer::new(
                provider,
                default_cache_dir(),
                config.daily_limit.unwrap_or(50),
            ))
        }
        _ => Arc::new(DisabledAnalyzer),
    }
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

/// Low-level provider: does the real remote call. Separated so the caching
/// wrapper is shared between production and tests.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn fetch(&self, subject: &str, ranked: &[ScoredResult]) -> Option<DraftAnalysis>;
    fn name(&self) -> &'static str;
}

/// Grok provider (xAI chat completions, JSON mode). Requires `XAI_API_KEY`.
pub struct XaiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl XaiProvider {
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("XAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("diligencia/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("grok-2-1212").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Provider for XaiProvider {
    async fn fetch(&self, subject: &str, ranked: &[ScoredResult]) -> Option<DraftAnalysis> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Format<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: Format<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let sys = "Você é um analista especializado em due diligence e análise de \
                   reputação pública com expertise jurídica e política. Responda \
                   somente com JSON no formato pedido.";
        let prompt = build_prompt(subject, ranked);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.1,
            response_format: Format { kind: "json_object" },
        };

        let resp = self
            .http
            .post("https://api.x.ai/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "analyzer provider returned error status");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body.choices.first().map(|c| c.message.content.as_str())?;
        parse_draft(content)
    }

    fn name(&self) -> &'static str {
        "xai"
    }
}

/// Returns `None` always; used when the analyzer is disabled.
pub struct DisabledAnalyzer;

#[async_trait]
impl Analyzer for DisabledAnalyzer {
    async fn analyze(&self, _subject: &str, _ranked: &[ScoredResult]) -> Option<DraftAnalysis> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-response provider for tests and local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: DraftAnalysis,
}

#[async_trait]
impl Provider for MockProvider {
    async fn fetch(&self, _subject: &str, _ranked: &[ScoredResult]) -> Option<DraftAnalysis> {
        Some(self.fixed.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Prompt + response handling
// ------------------------------------------------------------

/// Compact context payload: `{"n": name, "r": [{"t","b","u"}]}` plus the
/// selection guidelines. Short keys keep the token bill down.
pub fn build_prompt(subject: &str, ranked: &[ScoredResult]) -> String {
    #[derive(Serialize)]
    struct Ctx<'a> {
        n: &'a str,
        r: Vec<Item<'a>>,
    }
    #[derive(Serialize)]
    struct Item<'a> {
        t: &'a str,
        b: &'a str,
        u: &'a str,
    }

    let ctx = Ctx {
        n: subject,
        r: ranked
            .iter()
            .map(|s| Item {
                t: &s.result.title,
                b: &s.result.body,
                u: &s.result.url,
            })
            .collect(),
    };
    let payload = serde_json::to_string(&ctx).unwrap_or_else(|_| "{}".to_string());

    format!(
        "ANÁLISE DE REPUTAÇÃO PÚBLICA - {}\n\n\
         DADOS DA BUSCA (t=título, b=resumo, u=url):\n{}\n\n\
         Identifique polêmicas com evidências concretas e fontes confiáveis; \
         descarte menções neutras ou sem acusação. Responda com JSON contendo: \
         resumo_analise, polemicas (titulo, descricao, gravidade \
         [baixa|media|alta|critica], categoria, fonte_url), \
         empresas_associadas (nome_empresa, cnpj, relacao, fonte_url), \
         risco_reputacao [BAIXO|MEDIO|ALTO|CRITICO], recomendacoes, \
         tweets_relevantes, fontes_consultadas. Se não houver polêmicas \
         reais, retorne polemicas vazio e risco_reputacao BAIXO.",
        subject.to_uppercase(),
        payload
    )
}

/// Parse model output into a draft. Tolerates Markdown code fences; rejects
/// anything that fails JSON parsing or post-parse validation.
pub fn parse_draft(content: &str) -> Option<DraftAnalysis> {
    let trimmed = strip_code_fences(content);
    let draft: DraftAnalysis = serde_json::from_str(trimmed).ok()?;
    Some(validate_draft(draft))
}

/// Drop under-specified findings and normalize field lengths, mirroring the
/// post-processing the original response validator applied.
fn validate_draft(mut draft: DraftAnalysis) -> DraftAnalysis {
    draft.findings.retain(|f| {
        f.title.trim().chars().count() > 10 && f.description.trim().chars().count() > 20
    });
    for f in &mut draft.findings {
        f.title = take_chars(&f.title, 100);
        f.description = take_chars(&f.description, 200);
    }
    draft.companies.retain(|c| !c.name.trim().is_empty());
    draft
}

fn strip_code_fences(s: &str) -> &str {
    let t = s.trim();
    let t = t
        .strip_prefix("```json")
        .or_else(|| t.strip_prefix("```"))
        .unwrap_or(t);
    t.strip_suffix("```").unwrap_or(t).trim()
}

// ------------------------------------------------------------
// Caching wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// Wraps a provider with a file cache and a per-day real-call budget.
/// Cache hits do not consume the budget.
pub struct CachingAnalyzer<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CachingAnalyzer<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir);
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    async fn analyze_impl(&self, subject: &str, ranked: &[ScoredResult]) -> Option<DraftAnalysis> {
        // 1) Cache lookup. Hits never touch the daily budget.
        let key = cache_key(subject, ranked);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            return Some(hit);
        }

        // 2) Daily budget check (only real calls increment).
        {
            let mut g = self.counter.lock().expect("poisoned counter");
            if g.is_expired() {
                g.reset_to_today();
                let _ = save_daily_counter(&self.cache_dir, &g);
            }
            if g.count >= self.daily_limit_max {
                warn!(limit = self.daily_limit_max, "analyzer daily limit reached");
                return None;
            }
        }

        // 3) Real call.
        let fresh = self.inner.fetch(subject, ranked).await?;
        let _ = write_cache_file(&self.cache_dir, &key, &fresh);
        let mut g = self.counter.lock().expect("poisoned counter");
        g.count = g.count.saturating_add(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
        Some(fresh)
    }
}

#[async_trait]
impl<P: Provider> Analyzer for CachingAnalyzer<P> {
    async fn analyze(&self, subject: &str, ranked: &[ScoredResult]) -> Option<DraftAnalysis> {
        self.analyze_impl(subject, ranked).await
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/analyzer")
}

fn cache_key(subject: &str, ranked: &[ScoredResult]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    for s in ranked {
        hasher.update(s.result.url.as_bytes());
        hasher.update(s.result.title.as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<DraftAnalysis> {
    let buf = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &DraftAnalysis) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}
