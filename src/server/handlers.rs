//! HTTP request handlers for API endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::report::{build_group_report, GroupReport};
use crate::store::MarketStore;

/// Health check endpoint
///
/// Returns a simple status response to verify the server is running
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}

/// Response for the industry listing
#[derive(Debug, Serialize)]
pub struct IndustriesResponse {
    pub industries: Vec<String>,
}

/// GET /api/industries - List all industry names
pub async fn list_industries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IndustriesResponse>, ApiError> {
    let conn = state.store.acquire().await?;
    let industries = conn.list_industries()?;
    Ok(Json(IndustriesResponse { industries }))
}

/// GET /api/industry/{name} - Build the industry report
///
/// Resolves the name exactly first, then case-insensitively. An existing
/// group with no members or no price coverage still returns 200 with a
/// zero-valued report; only an unresolvable name is 404.
pub async fn get_industry_report(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<GroupReport>, ApiError> {
    tracing::debug!(industry = %name, "building industry report");

    // Acquired for the whole request; returned to the pool on every exit
    // path when the guard drops.
    let conn = state.store.acquire().await?;
    let report = build_group_report(&conn, &name, &state.options)?;

    tracing::debug!(
        industry = %report.industry,
        tickers = report.ticker_count,
        "report assembled"
    );
    Ok(Json(report))
}
