//! Cost reporting handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use cine_ledger::{BudgetStatus, CostReport};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Current cost report.
pub async fn get_costs(State(state): State<AppState>) -> Json<CostReport> {
    Json(state.ledger.report().await)
}

/// Zero the cost ledger.
pub async fn reset_costs(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    state.ledger.reset().await?;
    Ok(Json(StatusResponse { status: "reset" }))
}

/// Spend versus the configured budget ceiling.
pub async fn get_budget_status(State(state): State<AppState>) -> Json<BudgetStatus> {
    Json(state.ledger.budget_status(state.config.budget).await)
}
