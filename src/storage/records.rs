// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Append-only transaction record store.
//!
//! One JSON file per transfer, named by tx id. Records are created once the
//! relay has validated a transaction and updated exactly once when a
//! terminal outcome is known; they are never deleted.

use std::fs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::{atomic_write, DataPaths, StorageError};

/// Lifecycle status of a persisted transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Submitted (or validated) but not yet finalized.
    Pending,
    /// Finalized on ledger.
    Success,
    /// Rejected by the relay or finalized with an error.
    Failed,
}

/// Persisted record of one fee-sponsored transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    /// Transaction id: the fee payer's signature, base58.
    pub tx_id: String,
    pub from_address: String,
    pub to_address: String,
    /// Principal amount in whole-token units.
    pub amount: f64,
    /// Platform fee in whole-token units.
    pub platform_fee: f64,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        tx_id: String,
        from_address: String,
        to_address: String,
        amount: f64,
        platform_fee: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            tx_id,
            from_address,
            to_address,
            amount,
            platform_fee,
            status: RecordStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// File-per-record repository under the data directory.
pub struct TransactionRepository {
    paths: DataPaths,
}

impl TransactionRepository {
    pub fn new(paths: DataPaths) -> Result<Self, StorageError> {
        paths.ensure()?;
        Ok(Self { paths })
    }

    fn path_for(&self, tx_id: &str) -> std::path::PathBuf {
        self.paths.transfers_dir().join(format!("{tx_id}.json"))
    }

    /// Persist a new record. Pending status, atomic write.
    pub fn create(&self, record: &TransactionRecord) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        atomic_write(&self.path_for(&record.tx_id), &json)?;
        info!(tx_id = %record.tx_id, "transaction record created");
        Ok(())
    }

    pub fn get(&self, tx_id: &str) -> Result<TransactionRecord, StorageError> {
        let bytes = fs::read(self.path_for(tx_id)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("transaction {tx_id}"))
            } else {
                StorageError::Io(e)
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Move a record to its terminal status.
    pub fn update_status(
        &self,
        tx_id: &str,
        status: RecordStatus,
    ) -> Result<TransactionRecord, StorageError> {
        let mut record = self.get(tx_id)?;
        record.status = status;
        record.updated_at = Utc::now();
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        atomic_write(&self.path_for(tx_id), &json)?;
        info!(tx_id, ?status, "transaction record updated");
        Ok(record)
    }

    /// All records, newest first.
    pub fn list(&self) -> Result<Vec<TransactionRecord>, StorageError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(self.paths.transfers_dir())? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            let record: TransactionRecord = serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            records.push(record);
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
