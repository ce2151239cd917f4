// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analyze;
pub mod api;
pub mod classify;
pub mod dedup;
pub mod metrics;
pub mod plan;
pub mod report;
pub mod scoring;
pub mod search;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::analyze::Pipeline;
pub use crate::api::{create_router, AppState};
pub use crate::report::{Finding, Report, ReportBuilder, RiskLevel, Severity, SourceKind};
