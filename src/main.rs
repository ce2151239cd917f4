//! Due-diligence service — binary entrypoint.
//! Boots the Axum HTTP server, wiring the search pipeline, analyzer, store,
//! and metrics endpoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diligencia::analyze::{build_analyzer, load_analyzer_config, Pipeline};
use diligencia::api::{create_router, AppState};
use diligencia::metrics::Metrics;
use diligencia::scoring::RelevanceScorer;
use diligencia::search::{duckduckgo::DuckDuckGoProvider, ExecutorConfig};
use diligencia::store::MemoryStore;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("diligencia=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let analyzer_config = load_analyzer_config();
    let metrics = Metrics::init(analyzer_config.daily_limit.unwrap_or(50));

    let pipeline = Pipeline {
        provider: Arc::new(DuckDuckGoProvider::new()),
        scorer: Arc::new(RelevanceScorer::load()),
        analyzer: build_analyzer(&analyzer_config),
        executor: ExecutorConfig::default(),
    };

    let state = AppState {
        pipeline,
        store: Arc::new(MemoryStore::new()),
        export_dir: PathBuf::from("exports"),
    };

    let app = create_router(state).merge(metrics.router());

    let port: u16 = std::env::var("DILIGENCIA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
