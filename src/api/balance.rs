// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    address::{self, Address},
    error::{ApiError, TransferError},
    models::BalanceResponse,
    state::AppState,
    transaction,
};

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub address: String,
}

#[utoipa::path(
    get,
    path = "/v1/balance",
    params(("address" = String, Query, description = "Wallet address, base58")),
    tag = "Balance",
    responses(
        (status = 200, description = "Balance of the wallet's token sub-account", body = BalanceResponse),
        (status = 400, description = "Malformed address"),
        (status = 503, description = "Ledger unreachable")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let wallet = Address::parse(&query.address).map_err(ApiError::from)?;
    let token_account = address::derive_token_account(&wallet, &state.mint)?;

    // A sub-account that does not exist yet simply holds zero.
    let minor_units = state
        .ledger
        .token_account_balance(&token_account)
        .await
        .map_err(|e| ApiError::from(TransferError::from(e)))?
        .unwrap_or(0);

    Ok(Json(BalanceResponse {
        address: wallet.to_base58(),
        token_account: token_account.to_base58(),
        minor_units,
        amount: transaction::format_minor_units(minor_units, state.decimals),
    }))
}
