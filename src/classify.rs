//! Deterministic fallback classifier: keyword-based severity and category
//! assignment used whenever the language-model analyzer is unavailable or
//! returns something unusable.
//!
//! Matching is case-insensitive substring over the lowercased text, first
//! match wins in strict priority order. Exculpatory language wins over
//! everything else so an acquittal is never escalated by the words around it.

use crate::report::{RiskLevel, Severity};

/// Positive/exculpatory terms. Priority 1: force `Low` regardless of any
/// other match in the text.
const EXCULPATORY_TERMS: &[&str] = &[
    "absolvido",
    "absolvida",
    "absolvição",
    "inocentado",
    "inocentada",
    "arquivado",
    "arquivamento",
    "improcedente",
    "reconhecimento",
    "homenagem",
];

/// Priority 2: convictions with custody, violent crime, organized crime.
const CRITICAL_TERMS: &[&str] = &[
    "prisão",
    "preso",
    "presa",
    "lavagem de dinheiro",
    "tráfico",
    "organização criminosa",
    "homicídio",
    "crime violento",
];

/// Priority 3: corruption, embezzlement, fraud, bid-rigging, tax evasion.
const HIGH_TERMS: &[&str] = &[
    "corrupção",
    "desvio",
    "propina",
    "peculato",
    "fraude",
    "superfaturamento",
    "improbidade",
    "sonegação",
    "condenado",
    "condenada",
];

/// Priority 4: open investigations and formal proceedings.
const MEDIUM_TERMS: &[&str] = &[
    "investigação",
    "inquérito",
    "processo",
    "denúncia",
    "apuração",
    "tribunal de contas",
];

/// Priority 5: reputational noise short of formal proceedings.
const LOW_TERMS: &[&str] = &[
    "polêmica",
    "controvérsia",
    "crítica",
    "questionamento",
    "recomendação",
];

/// Category keyword sets. Disjoint by construction; a text can still match
/// several categories.
const PROCUREMENT_TERMS: &[&str] = &["licitação", "contrato", "pregão"];
const ELECTORAL_TERMS: &[&str] = &["eleição", "campanha", "doação"];
const CORRUPTION_TERMS: &[&str] = &["corrupção", "desvio", "propina"];
const JUDICIAL_TERMS: &[&str] = &["processo", "judicial", "tribunal"];

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Classify free text into a per-finding severity.
///
/// Absence of signal is `Low` by design: an unmatched text is not escalated.
pub fn severity_of(text: &str) -> Severity {
    let t = text.to_lowercase();
    if contains_any(&t, EXCULPATORY_TERMS) {
        Severity::Low
    } else if contains_any(&t, CRITICAL_TERMS) {
        Severity::Critical
    } else if contains_any(&t, HIGH_TERMS) {
        Severity::High
    } else if contains_any(&t, MEDIUM_TERMS) {
        Severity::Medium
    } else if contains_any(&t, LOW_TERMS) {
        Severity::Low
    } else {
        Severity::Low
    }
}

/// Tag a text with zero or more fixed categories; `Outros` when nothing hits.
pub fn categories_of(text: &str) -> Vec<String> {
    let t = text.to_lowercase();
    let mut out = Vec::new();
    if contains_any(&t, PROCUREMENT_TERMS) {
        out.push("Licitações".to_string());
    }
    if contains_any(&t, ELECTORAL_TERMS) {
        out.push("Eleitoral".to_string());
    }
    if contains_any(&t, CORRUPTION_TERMS) {
        out.push("Corrupção".to_string());
    }
    if contains_any(&t, JUDICIAL_TERMS) {
        out.push("Judicial".to_string());
    }
    if out.is_empty() {
        out.push("Outros".to_string());
    }
    out
}

/// Aggregate per-finding severities into one overall risk level.
///
/// Rule, evaluated top-down:
/// 1. any Critical            -> CRITICO
/// 2. >=2 High, or >=1 High with >=2 Medium -> ALTO
/// 3. >=1 High, or >=2 Medium -> MEDIO
/// 4. >=1 Medium              -> BAIXO
/// 5. otherwise               -> BAIXO
///
/// Step 4 mapping medium-only reports to BAIXO is inherited behavior from
/// the system this replaces and is preserved on purpose; callers relying on
/// escalation must look at the per-finding severities.
pub fn overall_risk(severities: &[Severity]) -> RiskLevel {
    let critical = severities.iter().filter(|s| **s == Severity::Critical).count();
    let high = severities.iter().filter(|s| **s == Severity::High).count();
    let medium = severities.iter().filter(|s| **s == Severity::Medium).count();

    if critical >= 1 {
        RiskLevel::Critical
    } else if high >= 2 || (high >= 1 && medium >= 2) {
        RiskLevel::High
    } else if high >= 1 || medium >= 2 {
        RiskLevel::Medium
    } else if medium >= 1 {
        RiskLevel::Low
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exculpatory_overrides_critical_language() {
        let text = "Ex-prefeito condenado em primeira instância é absolvido pelo TJ";
        assert_eq!(severity_of(text), Severity::Low);
    }

    #[test]
    fn critical_terms_classify_critical() {
        assert_eq!(severity_of("Réu teve prisão preventiva decretada"), Severity::Critical);
        assert_eq!(
            severity_of("Esquema de lavagem de dinheiro em obras públicas"),
            Severity::Critical
        );
    }

    #[test]
    fn corruption_conviction_classifies_high() {
        assert_eq!(
            severity_of("Secretário condenado por corrupção em licitações"),
            Severity::High
        );
    }

    #[test]
    fn investigation_classifies_medium() {
        assert_eq!(
            severity_of("MPF abre investigação sobre contratos da secretaria"),
            Severity::Medium
        );
    }

    #[test]
    fn mild_controversy_classifies_low() {
        assert_eq!(severity_of("Vereador envolvido em polêmica nas redes"), Severity::Low);
    }

    #[test]
    fn unmatched_text_defaults_to_low() {
        assert_eq!(severity_of("Prefeitura inaugura nova praça no centro"), Severity::Low);
    }

    #[test]
    fn classification_is_idempotent() {
        let text = "Denúncia de fraude em pregão eleitoral";
        assert_eq!(severity_of(text), severity_of(text));
        assert_eq!(categories_of(text), categories_of(text));
    }

    #[test]
    fn categories_match_disjoint_sets() {
        let cats = categories_of("Fraude em licitação investigada por tribunal");
        assert!(cats.contains(&"Licitações".to_string()));
        assert!(cats.contains(&"Judicial".to_string()));
        assert!(!cats.contains(&"Outros".to_string()));
    }

    #[test]
    fn categories_default_to_outros() {
        assert_eq!(categories_of("texto sem nenhum sinal"), vec!["Outros".to_string()]);
    }

    #[test]
    fn any_critical_dominates_aggregation() {
        let sev = [
            Severity::Critical,
            Severity::Low,
            Severity::Low,
            Severity::Low,
        ];
        assert_eq!(overall_risk(&sev), RiskLevel::Critical);
    }

    #[test]
    fn two_highs_aggregate_to_alto() {
        assert_eq!(overall_risk(&[Severity::High, Severity::High]), RiskLevel::High);
    }

    #[test]
    fn one_high_two_mediums_aggregate_to_alto() {
        assert_eq!(
            overall_risk(&[Severity::High, Severity::Medium, Severity::Medium]),
            RiskLevel::High
        );
    }

    #[test]
    fn one_high_alone_aggregates_to_medio() {
        assert_eq!(overall_risk(&[Severity::High]), RiskLevel::Medium);
    }

    #[test]
    fn single_medium_aggregates_to_baixo() {
        // Inherited asymmetry: a lone medium finding yields BAIXO.
        assert_eq!(overall_risk(&[Severity::Medium]), RiskLevel::Low);
    }

    #[test]
    fn empty_and_low_only_aggregate_to_baixo() {
        assert_eq!(overall_risk(&[]), RiskLevel::Low);
        assert_eq!(overall_risk(&[Severity::Low, Severity::Low]), RiskLevel::Low);
    }
}
