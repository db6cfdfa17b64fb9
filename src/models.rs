// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Request and response bodies for the HTTP API.
//!
//! Addresses cross the boundary as base58 strings and are parsed into
//! domain types inside the handlers, so schema types stay plain.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::records::RecordStatus;

/// Body of `POST /v1/transfers`.
///
/// `transaction` is the base64 partially-signed transaction; the remaining
/// fields declare what it claims to do. The relay checks the declaration
/// against the instructions before co-signing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitTransferRequest {
    pub transaction: String,
    pub to_address: String,
    pub amount: f64,
    pub fee: f64,
}

/// Outcome of a relayed transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferReceiptResponse {
    pub tx_id: String,
    pub status: RecordStatus,
}

/// Token balance of a wallet's derived sub-account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// The wallet address queried.
    pub address: String,
    /// The derived token sub-account holding the balance.
    pub token_account: String,
    /// Balance in minor units.
    pub minor_units: u64,
    /// Balance formatted in whole-token units.
    pub amount: String,
}

/// Service health probe body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
