// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Error types for the transfer pipeline and the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::storage::StorageError;

/// Failures in the build → sign → relay pipeline.
///
/// `AuthenticationFailure` deliberately carries no detail: a wrong password
/// and a corrupted blob must be indistinguishable to the caller.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("authentication failure: wrong password or corrupted key blob")]
    AuthenticationFailure,

    #[error("untrusted instruction: {0}")]
    UntrustedInstruction(String),

    #[error("transaction freshness window elapsed; rebuild and re-sign")]
    Expired,

    #[error("submission failure: {0}")]
    SubmissionFailure(String),

    #[error("transaction status unresolved after poll budget; query again later")]
    Unresolved,

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// HTTP error with a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        let message = err.to_string();
        match err {
            TransferError::InvalidAddress(_)
            | TransferError::InvalidAmount(_)
            | TransferError::Encoding(_) => ApiError::bad_request(message),
            TransferError::AuthenticationFailure => {
                ApiError::new(StatusCode::UNAUTHORIZED, message)
            }
            TransferError::UntrustedInstruction(_) => ApiError::forbidden(message),
            TransferError::Expired => ApiError::unprocessable(message),
            TransferError::Unresolved => ApiError::new(StatusCode::ACCEPTED, message),
            TransferError::SubmissionFailure(_) | TransferError::Ledger(_) => {
                ApiError::service_unavailable(message)
            }
            TransferError::Storage(StorageError::NotFound(_)) => ApiError::not_found(message),
            TransferError::Storage(_) => ApiError::internal(message),
        }
    }
}
