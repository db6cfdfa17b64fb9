// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{
    address::Address,
    error::{ApiError, TransferError},
    models::{SubmitTransferRequest, TransferReceiptResponse},
    relay::{RelayOutcome, TransferDeclaration},
    state::AppState,
    storage::records::{RecordStatus, TransactionRecord},
    storage::StorageError,
    transaction::PartiallySignedTransaction,
};

#[utoipa::path(
    post,
    path = "/v1/transfers",
    request_body = SubmitTransferRequest,
    tag = "Transfers",
    responses(
        (status = 200, description = "Transfer reached a terminal state", body = TransferReceiptResponse),
        (status = 202, description = "Submitted; status unresolved within the poll budget", body = TransferReceiptResponse),
        (status = 400, description = "Malformed transaction, address or amount"),
        (status = 403, description = "Transaction failed relay validation"),
        (status = 422, description = "Freshness window elapsed")
    )
)]
pub async fn submit_transfer(
    State(state): State<AppState>,
    Json(request): Json<SubmitTransferRequest>,
) -> Result<(StatusCode, Json<TransferReceiptResponse>), ApiError> {
    let partial = PartiallySignedTransaction::from_base64(&request.transaction)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let declared = TransferDeclaration {
        to_address: Address::parse(&request.to_address).map_err(ApiError::from)?,
        amount: request.amount,
        fee: request.fee,
    };

    let receipt = state.relay.process(partial, &declared).await?;
    info!(tx_id = %receipt.tx_id, outcome = ?receipt.outcome, "transfer processed");

    let (status_code, status) = match receipt.outcome {
        RelayOutcome::Confirmed => (StatusCode::OK, RecordStatus::Success),
        RelayOutcome::Failed(_) => (StatusCode::OK, RecordStatus::Failed),
        RelayOutcome::Expired => (StatusCode::UNPROCESSABLE_ENTITY, RecordStatus::Failed),
        RelayOutcome::Unresolved => (StatusCode::ACCEPTED, RecordStatus::Pending),
    };
    Ok((
        status_code,
        Json(TransferReceiptResponse {
            tx_id: receipt.tx_id,
            status,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/transfers",
    tag = "Transfers",
    responses((status = 200, description = "All transfer records, newest first", body = [TransactionRecord]))
)]
pub async fn list_transfers(
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionRecord>>, ApiError> {
    let records = state
        .records
        .list()
        .map_err(|e| ApiError::from(TransferError::from(e)))?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/v1/transfers/{tx_id}",
    params(("tx_id" = String, Path, description = "Transaction id")),
    tag = "Transfers",
    responses(
        (status = 200, description = "The persisted record", body = TransactionRecord),
        (status = 404, description = "No record for this id")
    )
)]
pub async fn transfer_status(
    State(state): State<AppState>,
    Path(tx_id): Path<String>,
) -> Result<Json<TransactionRecord>, ApiError> {
    let record = state.records.get(&tx_id).map_err(|e| match e {
        StorageError::NotFound(_) => ApiError::not_found(format!("transaction {tx_id}")),
        other => ApiError::from(TransferError::from(other)),
    })?;
    Ok(Json(record))
}
