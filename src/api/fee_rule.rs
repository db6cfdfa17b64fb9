// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

use axum::{extract::State, Json};

use crate::{fee::FeeRule, state::AppState};

#[utoipa::path(
    get,
    path = "/v1/config/fee-rule",
    tag = "Config",
    responses((status = 200, description = "The fee rule applied to transfers", body = FeeRule))
)]
pub async fn get_fee_rule(State(state): State<AppState>) -> Json<FeeRule> {
    Json(state.fee_rule)
}
