//! Report persistence: trait + in-memory store + file export.
//!
//! The store assigns ids; reports are immutable once saved. Persistence
//! failure never loses a report: callers fall back to [`export_report`],
//! which writes the document to disk as a standalone JSON artifact.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::report::{Report, RiskLevel};

/// Row summary for listings (full findings are only in the detail view).
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub id: u64,
    pub subject_name: String,
    pub overall_risk: RiskLevel,
    pub total_findings: usize,
    pub analyzed_at: chrono::DateTime<chrono::Utc>,
}

fn summarize(id: u64, r: &Report) -> ReportSummary {
    ReportSummary {
        id,
        subject_name: r.subject_name.clone(),
        overall_risk: r.overall_risk,
        total_findings: r.total_findings,
        analyzed_at: r.analyzed_at,
    }
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist and return the assigned id.
    async fn save(&self, report: &Report) -> Result<u64>;
    async fn get(&self, id: u64) -> Result<Option<Report>>;
    /// Most recent report for a subject, matched case-insensitively.
    async fn find_by_subject(&self, subject_name: &str) -> Result<Option<(u64, Report)>>;
    /// All saved reports, newest first.
    async fn list(&self) -> Result<Vec<ReportSummary>>;
}

/// In-process store. Ids are monotonic; a restart starts over at 1, which
/// is fine for the single-node deployments this serves.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<u64, Report>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn save(&self, report: &Report) -> Result<u64> {
        let mut g = self.inner.write().expect("store lock poisoned");
        let id = g.keys().next_back().copied().unwrap_or(0) + 1;
        g.insert(id, report.clone());
        Ok(id)
    }

    async fn get(&self, id: u64) -> Result<Option<Report>> {
        let g = self.inner.read().expect("store lock poisoned");
        Ok(g.get(&id).cloned())
    }

    async fn find_by_subject(&self, subject_name: &str) -> Result<Option<(u64, Report)>> {
        let needle = subject_name.trim().to_lowercase();
        let g = self.inner.read().expect("store lock poisoned");
        Ok(g.iter()
            .rev()
            .find(|(_, r)| r.subject_name.to_lowercase() == needle)
            .map(|(id, r)| (*id, r.clone())))
    }

    async fn list(&self) -> Result<Vec<ReportSummary>> {
        let g = self.inner.read().expect("store lock poisoned");
        Ok(g.iter().rev().map(|(id, r)| summarize(*id, r)).collect())
    }
}

/// Export a report as `analise_<slug>_<timestamp>.json` under `dir`.
/// Written via tmp-then-rename so a crash never leaves a torn file.
pub fn export_report(report: &Report, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating export dir {}", dir.display()))?;
    let slug = slugify(&report.subject_name);
    let stamp = report.analyzed_at.format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("analise_{slug}_{stamp}.json"));
    let tmp = path.with_extension("json.tmp");

    let json = serde_json::to_string_pretty(report).context("serializing report")?;
    let mut f = fs::File::create(&tmp).context("creating export tmp file")?;
    f.write_all(json.as_bytes()).context("writing export")?;
    fs::rename(&tmp, &path).context("publishing export file")?;

    info!(path = %path.display(), "report exported to file");
    Ok(path)
}

/// Lowercase ASCII slug for filenames; anything else becomes `_`.
fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBuilder;

    fn report(name: &str) -> Report {
        ReportBuilder::new(name).build()
    }

    #[tokio::test]
    async fn save_assigns_monotonic_ids() {
        let store = MemoryStore::new();
        let a = store.save(&report("Maria Teste")).await.unwrap();
        let b = store.save(&report("João Teste")).await.unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(store.get(1).await.unwrap().unwrap().subject_name, "Maria Teste");
        assert!(store.get(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_subject_is_case_insensitive_and_newest() {
        let store = MemoryStore::new();
        store.save(&report("Maria Teste")).await.unwrap();
        let second = store.save(&report("maria teste")).await.unwrap();
        let (id, _) = store.find_by_subject("MARIA TESTE").await.unwrap().unwrap();
        assert_eq!(id, second);
        assert!(store.find_by_subject("ninguém").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryStore::new();
        store.save(&report("Primeira Pessoa")).await.unwrap();
        store.save(&report("Segunda Pessoa")).await.unwrap();
        let rows = store.list().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject_name, "Segunda Pessoa");
    }

    #[test]
    fn export_writes_named_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = report("Maria José d'Ávila");
        let path = export_report(&r, dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("analise_maria_jos"));
        assert!(name.ends_with(".json"));
        let back: Report = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.subject_name, r.subject_name);
    }

    #[test]
    fn slugify_collapses_non_ascii() {
        assert_eq!(slugify("Maria Teste"), "maria_teste");
        assert_eq!(slugify("  João -- Ávila  "), "jo_o_vila");
        assert_eq!(slugify("___"), "");
    }
}
