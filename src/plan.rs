//! Query planner: expands a subject name plus optional role/jurisdiction
//! context into an ordered list of primary (high-specificity) and secondary
//! (broad, backup) search queries.
//!
//! Pure string work, no I/O. Never fails for a non-empty name.

/// Government tier detected from the role text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernmentTier {
    Federal,
    State,
    Municipal,
}

impl GovernmentTier {
    fn as_query_term(self) -> &'static str {
        match self {
            GovernmentTier::Federal => "federal",
            GovernmentTier::State => "estadual",
            GovernmentTier::Municipal => "municipal",
        }
    }
}

/// Topical domain of the role, used for area-specific queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArea {
    Health,
    Education,
    Infrastructure,
    Security,
    Finance,
}

impl PolicyArea {
    fn as_query_term(self) -> &'static str {
        match self {
            PolicyArea::Health => "saúde",
            PolicyArea::Education => "educação",
            PolicyArea::Infrastructure => "obras",
            PolicyArea::Security => "segurança",
            PolicyArea::Finance => "fazenda",
        }
    }
}

const FEDERAL_TIER_TERMS: &[&str] = &[
    "federal",
    "ministro",
    "ministra",
    "presidente",
    "senador",
    "senadora",
    "deputado federal",
    "deputada federal",
];
const STATE_TIER_TERMS: &[&str] = &[
    "estadual",
    "governador",
    "governadora",
    "deputado estadual",
    "deputada estadual",
    "secretário estadual",
    "secretária estadual",
];
const MUNICIPAL_TIER_TERMS: &[&str] = &[
    "municipal",
    "prefeito",
    "prefeita",
    "vereador",
    "vereadora",
    "secretário municipal",
    "secretária municipal",
];

const AREA_TERMS: &[(PolicyArea, &[&str])] = &[
    (PolicyArea::Health, &["saúde", "hospital", "sus"]),
    (PolicyArea::Education, &["educação", "escola", "universidade"]),
    (
        PolicyArea::Infrastructure,
        &["obras", "infraestrutura", "construção"],
    ),
    (PolicyArea::Security, &["segurança", "polícia"]),
    (
        PolicyArea::Finance,
        &["fazenda", "finanças", "economia"],
    ),
];

/// Fixed legal/oversight query suffixes appended to every primary plan.
const LEGAL_QUERY_TERMS: &[&str] = &[
    "processo judicial",
    "ação judicial",
    "tribunal de contas",
    "TCU",
    "MPF",
    "PF",
    "investigação",
];

/// Fixed procurement/contract query suffixes.
const PROCUREMENT_QUERY_TERMS: &[&str] = &[
    "licitação",
    "contrato governo",
    "pregão",
    "diário oficial",
];

/// Fixed negative/controversy suffixes for the secondary (backup) phase.
const CONTROVERSY_QUERY_TERMS: &[&str] = &[
    "polêmica",
    "escândalo",
    "denúncia",
    "corrupção",
    "fraude",
    "condenado",
    "investigação",
    "irregularidade",
    "improbidade",
    "desvio",
    "superfaturamento",
    "lavagem",
    "tribunal",
];

/// Structured context extracted from the free-text public role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleContext {
    pub tier: Option<GovernmentTier>,
    pub area: Option<PolicyArea>,
    /// Jurisdiction (state name/UF) for state-tier subjects.
    pub state: Option<String>,
}

impl RoleContext {
    /// Extract tier and topical area from the role text via keyword sets.
    /// The jurisdiction code is only attached for state-tier roles, matching
    /// how state queries are phrased.
    pub fn extract(role: Option<&str>, state: Option<&str>) -> RoleContext {
        let mut ctx = RoleContext::default();
        let Some(role) = role else { return ctx };
        let lower = role.to_lowercase();

        if FEDERAL_TIER_TERMS.iter().any(|t| lower.contains(t)) {
            ctx.tier = Some(GovernmentTier::Federal);
        } else if STATE_TIER_TERMS.iter().any(|t| lower.contains(t)) {
            ctx.tier = Some(GovernmentTier::State);
            ctx.state = state.map(str::to_string).filter(|s| !s.trim().is_empty());
        } else if MUNICIPAL_TIER_TERMS.iter().any(|t| lower.contains(t)) {
            ctx.tier = Some(GovernmentTier::Municipal);
        }

        for (area, terms) in AREA_TERMS {
            if terms.iter().any(|t| lower.contains(t)) {
                ctx.area = Some(*area);
                break;
            }
        }

        ctx
    }
}

/// The ordered query sequences for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

impl QueryPlan {
    /// Build the plan for a subject. The name is double-quoted in every
    /// query for exact-match search semantics.
    pub fn build(name: &str, ctx: &RoleContext) -> QueryPlan {
        QueryPlan {
            primary: primary_queries(name, ctx),
            secondary: secondary_queries(name, ctx),
        }
    }
}

fn primary_queries(name: &str, ctx: &RoleContext) -> Vec<String> {
    let quoted = format!("\"{name}\"");
    let mut queries = vec![quoted.clone()];

    match ctx.tier {
        Some(GovernmentTier::Federal) => {
            queries.push(format!("{quoted} ministério"));
            queries.push(format!("{quoted} governo federal"));
            queries.push(format!("{quoted} brasília"));
        }
        Some(GovernmentTier::State) => {
            let state = ctx.state.as_deref().unwrap_or("");
            queries.push(format!("{quoted} {state}").trim_end().to_string());
            queries.push(format!("{quoted} governo {state}").trim_end().to_string());
            queries.push(format!("{quoted} secretaria {state}").trim_end().to_string());
        }
        Some(GovernmentTier::Municipal) => {
            queries.push(format!("{quoted} prefeitura"));
            queries.push(format!("{quoted} câmara municipal"));
        }
        None => {}
    }

    if let Some(area) = ctx.area {
        let term = area.as_query_term();
        queries.push(format!("{quoted} {term}"));
        queries.push(format!("{quoted} secretário {term}"));
    }

    for term in LEGAL_QUERY_TERMS {
        queries.push(format!("{quoted} {term}"));
    }
    for term in PROCUREMENT_QUERY_TERMS {
        queries.push(format!("{quoted} {term}"));
    }

    queries
}

fn secondary_queries(name: &str, ctx: &RoleContext) -> Vec<String> {
    let quoted = format!("\"{name}\"");
    let mut queries = Vec::new();

    // First+last name fallback catches coverage that drops middle names.
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() >= 2 {
        queries.push(format!("\"{} {}\"", parts[0], parts[parts.len() - 1]));
    }

    for term in CONTROVERSY_QUERY_TERMS {
        queries.push(format!("{quoted} {term}"));
    }

    if let Some(tier) = ctx.tier {
        queries.push(format!("{quoted} {}", tier.as_query_term()));
    }

    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_always_contains_exact_quoted_name() {
        for name in ["X", "Maria Teste", "José da Silva Sauro"] {
            let plan = QueryPlan::build(name, &RoleContext::default());
            assert!(!plan.primary.is_empty());
            assert_eq!(plan.primary[0], format!("\"{name}\""));
        }
    }

    #[test]
    fn state_tier_role_yields_state_queries() {
        let ctx = RoleContext::extract(Some("secretária de saúde estadual"), Some("Paraná"));
        assert_eq!(ctx.tier, Some(GovernmentTier::State));
        assert_eq!(ctx.area, Some(PolicyArea::Health));
        assert_eq!(ctx.state.as_deref(), Some("Paraná"));

        let plan = QueryPlan::build("Maria Teste", &ctx);
        assert!(plan
            .primary
            .iter()
            .any(|q| q == "\"Maria Teste\" governo Paraná"));
        assert!(plan.primary.iter().any(|q| q == "\"Maria Teste\" saúde"));
    }

    #[test]
    fn federal_tier_role_yields_federal_queries() {
        let ctx = RoleContext::extract(Some("Ministro da Fazenda"), None);
        assert_eq!(ctx.tier, Some(GovernmentTier::Federal));
        let plan = QueryPlan::build("João Exemplo", &ctx);
        assert!(plan
            .primary
            .iter()
            .any(|q| q == "\"João Exemplo\" governo federal"));
    }

    #[test]
    fn legal_and_procurement_queries_always_present() {
        let plan = QueryPlan::build("Maria Teste", &RoleContext::default());
        for term in ["tribunal de contas", "MPF", "licitação", "diário oficial"] {
            assert!(
                plan.primary.iter().any(|q| q.ends_with(term)),
                "missing primary query for {term}"
            );
        }
    }

    #[test]
    fn secondary_has_first_last_fallback_and_controversy_terms() {
        let ctx = RoleContext::extract(Some("vereador"), None);
        let plan = QueryPlan::build("Maria dos Santos Teste", &ctx);
        assert_eq!(plan.secondary[0], "\"Maria Teste\"");
        assert!(plan
            .secondary
            .iter()
            .any(|q| q == "\"Maria dos Santos Teste\" escândalo"));
        assert!(plan
            .secondary
            .iter()
            .any(|q| q == "\"Maria dos Santos Teste\" municipal"));
    }

    #[test]
    fn single_word_name_skips_first_last_fallback() {
        let plan = QueryPlan::build("Madona", &RoleContext::default());
        assert!(plan.secondary.iter().all(|q| q != "\"Madona Madona\""));
        assert!(!plan.secondary.is_empty());
    }

    #[test]
    fn no_role_means_no_tier_or_area_queries() {
        let ctx = RoleContext::extract(None, Some("SP"));
        assert_eq!(ctx, RoleContext::default());
        let plan = QueryPlan::build("Maria Teste", &ctx);
        // 1 exact + 7 legal + 4 procurement
        assert_eq!(plan.primary.len(), 12);
    }
}
