// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

use axum::{
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    fee::FeeRule,
    models::{
        BalanceResponse, HealthResponse, SubmitTransferRequest, TransferReceiptResponse,
    },
    state::AppState,
    storage::records::{RecordStatus, TransactionRecord},
};

pub mod balance;
pub mod fee_rule;
pub mod health;
pub mod transfer;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/transfers",
            get(transfer::list_transfers).post(transfer::submit_transfer),
        )
        .route("/transfers/{tx_id}", get(transfer::transfer_status))
        .route("/balance", get(balance::get_balance))
        .route("/config/fee-rule", get(fee_rule::get_fee_rule))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        transfer::submit_transfer,
        transfer::list_transfers,
        transfer::transfer_status,
        balance::get_balance,
        fee_rule::get_fee_rule,
        health::health,
        health::live,
        health::ready
    ),
    components(
        schemas(
            SubmitTransferRequest,
            TransferReceiptResponse,
            TransactionRecord,
            RecordStatus,
            BalanceResponse,
            FeeRule,
            HealthResponse
        )
    ),
    tags(
        (name = "Transfers", description = "Fee-sponsored transfer submission and history"),
        (name = "Balance", description = "Token balance queries"),
        (name = "Config", description = "Client-visible service configuration"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
