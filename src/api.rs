use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::analyze::Pipeline;
use crate::dedup::trust_weight;
use crate::report::Report;
use crate::search::SearchResult;
use crate::store::{export_report, ReportStore, ReportSummary};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub store: Arc<dyn ReportStore>,
    /// Destination for fallback JSON exports when persistence fails.
    pub export_dir: PathBuf,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/analyses", post(run_analysis).get(list_analyses))
        .route("/api/analyses/{id}", get(get_analysis))
        .route("/debug/trust-weight", get(debug_trust_weight))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct AnalysisReq {
    nome: String,
    #[serde(default)]
    cargo: Option<String>,
    #[serde(default)]
    estado: Option<String>,
}

#[derive(serde::Serialize)]
struct AnalysisResp {
    status: &'static str,
    saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exported_to: Option<String>,
    analise: Report,
}

#[derive(serde::Serialize)]
struct ErrorResp {
    status: &'static str,
    message: String,
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResp>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResp {
            status: "error",
            message: message.to_string(),
        }),
    )
}

async fn run_analysis(
    State(state): State<AppState>,
    Json(body): Json<AnalysisReq>,
) -> Result<(StatusCode, Json<AnalysisResp>), (StatusCode, Json<ErrorResp>)> {
    if body.nome.trim().is_empty() {
        return Err(bad_request("campo 'nome' é obrigatório"));
    }

    let report = state
        .pipeline
        .run(&body.nome, body.cargo.as_deref(), body.estado.as_deref())
        .await
        .map_err(|e| {
            error!(error = ?e, "analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResp {
                    status: "error",
                    message: "falha na análise".to_string(),
                }),
            )
        })?;

    // Persistence failure degrades to a file export, never to report loss.
    match state.store.save(&report).await {
        Ok(id) => {
            metrics::counter!("reports_saved_total").increment(1);
            Ok((
                StatusCode::CREATED,
                Json(AnalysisResp {
                    status: "success",
                    saved: true,
                    id: Some(id),
                    reason: None,
                    exported_to: None,
                    analise: report,
                }),
            ))
        }
        Err(e) => {
            warn!(error = ?e, "persistence failed; exporting to file");
            let exported_to = export_report(&report, &state.export_dir)
                .map(|p| p.display().to_string())
                .map_err(|e| {
                    error!(error = ?e, "export fallback also failed");
                    e
                })
                .ok();
            Ok((
                StatusCode::OK,
                Json(AnalysisResp {
                    status: "success",
                    saved: false,
                    id: None,
                    reason: Some(format!("persistência indisponível: {e}")),
                    exported_to,
                    analise: report,
                }),
            ))
        }
    }
}

async fn list_analyses(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ReportSummary>>, (StatusCode, Json<ErrorResp>)> {
    let listing_error = |e: anyhow::Error| {
        error!(error = ?e, "listing failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResp {
                status: "error",
                message: "falha ao listar análises".to_string(),
            }),
        )
    };

    // `?nome=` narrows to the newest analysis for that subject.
    if let Some(nome) = q.get("nome").filter(|n| !n.trim().is_empty()) {
        let hit = state
            .store
            .find_by_subject(nome)
            .await
            .map_err(listing_error)?;
        let rows = hit
            .map(|(id, r)| {
                vec![ReportSummary {
                    id,
                    subject_name: r.subject_name,
                    overall_risk: r.overall_risk,
                    total_findings: r.total_findings,
                    analyzed_at: r.analyzed_at,
                }]
            })
            .unwrap_or_default();
        return Ok(Json(rows));
    }

    state.store.list().await.map(Json).map_err(listing_error)
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Report>, (StatusCode, Json<ErrorResp>)> {
    match state.store.get(id).await {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResp {
                status: "error",
                message: format!("análise {id} não encontrada"),
            }),
        )),
        Err(e) => {
            error!(error = ?e, id, "lookup failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResp {
                    status: "error",
                    message: "falha na consulta".to_string(),
                }),
            ))
        }
    }
}

async fn debug_trust_weight(Query(q): Query<HashMap<String, String>>) -> String {
    let result = SearchResult {
        title: q.get("title").cloned().unwrap_or_default(),
        body: q.get("body").cloned().unwrap_or_default(),
        url: q.get("url").cloned().unwrap_or_default(),
    };
    let w = trust_weight(&result);
    format!("url='{}' -> weight={}", result.url, w)
}
