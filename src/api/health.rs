// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use crate::{error::ApiError, models::HealthResponse, state::AppState};

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200))
)]
pub async fn live() -> StatusCode {
    StatusCode::OK
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Data directory writable and ledger reachable", body = HealthResponse),
        (status = 503, description = "A dependency is unavailable")
    )
)]
pub async fn ready(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if !state.data_dir.is_dir() {
        warn!(data_dir = %state.data_dir.display(), "readiness failed: data directory missing");
        return Err(ApiError::service_unavailable("data directory unavailable"));
    }
    if let Err(e) = state.ledger.latest_blockhash().await {
        warn!(error = %e, "readiness failed: ledger unreachable");
        return Err(ApiError::service_unavailable("ledger rpc unreachable"));
    }
    Ok(Json(HealthResponse {
        status: "ready".to_string(),
    }))
}
