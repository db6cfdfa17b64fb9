// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Transaction types shared by the builder, signer and relay.
//!
//! A transfer moves through three representations:
//!
//! 1. [`UnsignedTransaction`] — built locally, carries the two transfer
//!    instructions, the freshness token and the fee payer.
//! 2. [`PartiallySignedTransaction`] — the owner has signed the canonical
//!    message bytes; serialized to base64 for transport to the relay.
//! 3. [`FullySignedTransaction`] — the relay has co-signed as fee payer;
//!    ready for submission.
//!
//! Canonical message bytes are the bincode encoding of the unsigned
//! transaction. Both sides sign and verify the same encoding, so the bytes
//! the relay checks are exactly the bytes the owner committed to.

pub mod builder;

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::TransferError;

/// A recent-blockhash freshness token with its validity deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessToken {
    pub blockhash: String,
    pub expires_at: DateTime<Utc>,
}

impl FreshnessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A single token-transfer instruction.
///
/// `source` and `destination` are derived token sub-accounts, not wallet
/// addresses; `authority` is the wallet that owns `source` and must sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub program_id: Address,
    pub source: Address,
    pub destination: Address,
    pub authority: Address,
    pub amount_minor_units: u64,
}

/// An unsigned transfer transaction: instructions plus freshness and payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub instructions: Vec<Instruction>,
    pub blockhash: String,
    pub expires_at: DateTime<Utc>,
    pub fee_payer: Address,
}

impl UnsignedTransaction {
    /// The canonical byte encoding that signatures commit to.
    pub fn message_bytes(&self) -> Result<Vec<u8>, TransferError> {
        bincode::serialize(self).map_err(|e| TransferError::Encoding(e.to_string()))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A transaction signed by the owner but not yet by the fee payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartiallySignedTransaction {
    pub transaction: UnsignedTransaction,
    pub owner: Address,
    pub owner_signature: Vec<u8>,
}

impl PartiallySignedTransaction {
    /// Serialize for transport to the relay.
    pub fn to_base64(&self) -> Result<String, TransferError> {
        use base64ct::{Base64, Encoding};
        let bytes =
            bincode::serialize(self).map_err(|e| TransferError::Encoding(e.to_string()))?;
        Ok(Base64::encode_string(&bytes))
    }

    /// Parse the transport encoding produced by [`to_base64`].
    ///
    /// [`to_base64`]: Self::to_base64
    pub fn from_base64(encoded: &str) -> Result<Self, TransferError> {
        use base64ct::{Base64, Encoding};
        let bytes = Base64::decode_vec(encoded)
            .map_err(|e| TransferError::Encoding(format!("not base64: {e}")))?;
        bincode::deserialize(&bytes).map_err(|e| TransferError::Encoding(e.to_string()))
    }

    /// Check the owner's signature over the canonical message bytes.
    pub fn verify_owner_signature(&self) -> Result<(), TransferError> {
        let key = VerifyingKey::from_bytes(self.owner.as_bytes()).map_err(|_| {
            TransferError::UntrustedInstruction("owner key is not a valid public key".to_string())
        })?;
        let signature = Signature::from_slice(&self.owner_signature).map_err(|_| {
            TransferError::UntrustedInstruction("owner signature is malformed".to_string())
        })?;
        let message = self.transaction.message_bytes()?;
        key.verify(&message, &signature).map_err(|_| {
            TransferError::UntrustedInstruction(
                "owner signature does not verify over the transaction".to_string(),
            )
        })
    }
}

/// A transaction carrying both required signatures, ready for submission.
///
/// The fee payer's signature comes first in the encoding; its base58 form is
/// the transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullySignedTransaction {
    pub transaction: UnsignedTransaction,
    pub fee_payer_signature: Vec<u8>,
    pub owner: Address,
    pub owner_signature: Vec<u8>,
}

impl FullySignedTransaction {
    /// Wire bytes for ledger submission.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransferError> {
        bincode::serialize(self).map_err(|e| TransferError::Encoding(e.to_string()))
    }

    /// The transaction id: the fee payer's signature in base58.
    pub fn tx_id(&self) -> String {
        bs58::encode(&self.fee_payer_signature).into_string()
    }
}

/// Convert a whole-token amount to minor units, flooring fractional dust
/// below the mint's precision.
pub fn to_minor_units(amount: f64, decimals: u8) -> Result<u64, TransferError> {
    crate::fee::validate_amount(amount)?;
    let scaled = amount * 10f64.powi(decimals as i32);
    if scaled >= u64::MAX as f64 {
        return Err(TransferError::InvalidAmount(format!(
            "amount {amount} overflows minor units at {decimals} decimals"
        )));
    }
    let floored = scaled.floor() as u64;
    if floored == 0 {
        return Err(TransferError::InvalidAmount(format!(
            "amount {amount} is below the smallest representable unit"
        )));
    }
    Ok(floored)
}

/// Render minor units as a whole-token decimal string, trimming trailing
/// zeros but always keeping at least one fractional digit.
pub fn format_minor_units(minor: u64, decimals: u8) -> String {
    let scale = 10u64.pow(decimals as u32);
    let whole = minor / scale;
    let frac = minor % scale;
    let mut frac_str = format!("{frac:0width$}", width = decimals as usize);
    while frac_str.len() > 1 && frac_str.ends_with('0') {
        frac_str.pop();
    }
    format!("{whole}.{frac_str}")
}
