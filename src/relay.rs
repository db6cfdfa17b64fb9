// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Fee relay: validation, co-signing and submission.
//!
//! The relay holds the service keypair that pays network fees. Co-signing is
//! consent, so the relay validates a transaction against a strict
//! instruction allow-list before its signature touches anything:
//!
//! - exactly two instructions, both executed by the token program,
//! - the second instruction pays the configured platform-fee sub-account,
//! - the fee payer is the relay itself,
//! - the declared recipient, amount and fee match what the instructions
//!   actually do,
//! - the owner's signature verifies over the canonical message bytes,
//! - the freshness window has not elapsed.
//!
//! Any mismatch is [`TransferError::UntrustedInstruction`] and the relay
//! refuses to sign. A transaction moves Received → Validated → Submitted →
//! terminal; the record is written at Validated and updated exactly once
//! when the terminal outcome is known. Expired transactions are rejected,
//! never silently rebuilt with a fresh blockhash.

use std::sync::Arc;

use chrono::Utc;
use ed25519_dalek::{Signer as _, SigningKey};
use tracing::{info, warn};

use crate::address::{self, Address};
use crate::error::TransferError;
use crate::fee::{self, FeeRule};
use crate::ledger::{LedgerClient, LedgerTxStatus};
use crate::storage::records::{RecordStatus, TransactionRecord, TransactionRepository};
use crate::transaction::{self, FullySignedTransaction, PartiallySignedTransaction};

/// Relay validation and polling parameters.
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    /// The token mint transfers must move.
    pub mint: Address,
    /// Wallet that collects platform fees; the allow-list checks against its
    /// derived token sub-account.
    pub platform_fee_wallet: Address,
    pub fee_rule: FeeRule,
    pub decimals: u8,
    /// Maximum status poll attempts after submission.
    pub poll_attempts: u32,
    /// Delay between poll attempts.
    pub poll_interval: std::time::Duration,
    /// Wall-clock budget for the whole polling phase.
    pub poll_timeout: std::time::Duration,
}

/// What the caller claims the transaction does. Checked against the
/// instructions; a mismatch means the client is lying or buggy, and either
/// way the relay must not sign.
#[derive(Debug, Clone)]
pub struct TransferDeclaration {
    pub to_address: Address,
    pub amount: f64,
    pub fee: f64,
}

/// Terminal outcome of a relayed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Finalized on ledger.
    Confirmed,
    /// The ledger finalized the transaction with an error.
    Failed(String),
    /// The freshness window elapsed without finality. Terminal; the caller
    /// restarts from the builder with a fresh blockhash.
    Expired,
    /// Poll budget exhausted with the transaction still in flight. The
    /// record stays Pending; callers query the status endpoint later.
    Unresolved,
}

/// Result of a relayed transfer: the tx id plus how it ended.
#[derive(Debug, Clone)]
pub struct RelayReceipt {
    pub tx_id: String,
    pub outcome: RelayOutcome,
}

/// The fee-paying co-signer.
pub struct FeeRelay {
    keypair: SigningKey,
    address: Address,
    fee_destination: Address,
    policy: RelayPolicy,
    ledger: Arc<dyn LedgerClient>,
    records: Arc<TransactionRepository>,
}

impl FeeRelay {
    /// Build a relay around an injected service keypair. The keypair is a
    /// deployment secret and is never derived from a user password.
    pub fn new(
        keypair: SigningKey,
        policy: RelayPolicy,
        ledger: Arc<dyn LedgerClient>,
        records: Arc<TransactionRepository>,
    ) -> Result<Self, TransferError> {
        let address = Address::from_bytes(keypair.verifying_key().to_bytes());
        let fee_destination =
            address::derive_token_account(&policy.platform_fee_wallet, &policy.mint)?;
        Ok(Self {
            keypair,
            address,
            fee_destination,
            policy,
            ledger,
            records,
        })
    }

    /// The relay's own address; clients set it as fee payer when building.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Run the allow-list over a partially-signed transaction.
    pub fn validate(
        &self,
        partial: &PartiallySignedTransaction,
        declared: &TransferDeclaration,
    ) -> Result<(), TransferError> {
        let tx = &partial.transaction;
        if tx.is_expired(Utc::now()) {
            return Err(TransferError::Expired);
        }
        if tx.instructions.len() != 2 {
            return Err(TransferError::UntrustedInstruction(format!(
                "expected exactly 2 instructions, got {}",
                tx.instructions.len()
            )));
        }

        let token_program = Address::parse(address::TOKEN_PROGRAM_ID)?;
        for (i, instruction) in tx.instructions.iter().enumerate() {
            if instruction.program_id != token_program {
                return Err(TransferError::UntrustedInstruction(format!(
                    "instruction {i} targets program {}, not the token program",
                    instruction.program_id
                )));
            }
            if instruction.authority != partial.owner {
                return Err(TransferError::UntrustedInstruction(format!(
                    "instruction {i} authority is not the signing owner"
                )));
            }
        }

        if tx.fee_payer != self.address {
            return Err(TransferError::UntrustedInstruction(
                "fee payer is not this relay".to_string(),
            ));
        }
        if tx.instructions[1].destination != self.fee_destination {
            return Err(TransferError::UntrustedInstruction(
                "second instruction does not pay the platform fee account".to_string(),
            ));
        }

        let expected_destination =
            address::derive_token_account(&declared.to_address, &self.policy.mint)?;
        if tx.instructions[0].destination != expected_destination {
            return Err(TransferError::UntrustedInstruction(
                "first instruction does not pay the declared recipient".to_string(),
            ));
        }
        // The declared fee must be what the relay's own rule computes, not
        // just what the client chose to pay.
        let expected_fee = fee::compute_fee(declared.amount, &self.policy.fee_rule)?;
        let expected_fee_minor = transaction::to_minor_units(expected_fee, self.policy.decimals)?;
        let declared_amount = transaction::to_minor_units(declared.amount, self.policy.decimals)?;
        let declared_fee = transaction::to_minor_units(declared.fee, self.policy.decimals)?;
        if tx.instructions[0].amount_minor_units != declared_amount {
            return Err(TransferError::UntrustedInstruction(
                "principal amount does not match the declaration".to_string(),
            ));
        }
        if tx.instructions[1].amount_minor_units != declared_fee {
            return Err(TransferError::UntrustedInstruction(
                "fee amount does not match the declaration".to_string(),
            ));
        }
        if declared_fee != expected_fee_minor {
            return Err(TransferError::UntrustedInstruction(
                "declared fee does not match the configured fee rule".to_string(),
            ));
        }

        partial.verify_owner_signature()
    }

    /// Validate, co-sign, persist, submit and poll to a terminal outcome.
    pub async fn process(
        &self,
        partial: PartiallySignedTransaction,
        declared: &TransferDeclaration,
    ) -> Result<RelayReceipt, TransferError> {
        self.validate(&partial, declared)?;

        let message = partial.transaction.message_bytes()?;
        let fee_payer_signature = self.keypair.sign(&message).to_bytes().to_vec();
        let full = FullySignedTransaction {
            transaction: partial.transaction,
            fee_payer_signature,
            owner: partial.owner,
            owner_signature: partial.owner_signature,
        };
        let tx_id = full.tx_id();
        info!(%tx_id, owner = %full.owner, "transaction validated and co-signed");

        let record = TransactionRecord::new(
            tx_id.clone(),
            full.owner.to_base58(),
            declared.to_address.to_base58(),
            declared.amount,
            declared.fee,
        );
        self.records.create(&record)?;

        let bytes = full.to_bytes()?;
        if let Err(e) = self.ledger.submit_transaction(&bytes).await {
            warn!(%tx_id, error = %e, "submission failed");
            self.records.update_status(&tx_id, RecordStatus::Failed)?;
            return Err(TransferError::SubmissionFailure(e.to_string()));
        }

        let outcome = match self.poll_until_final(&tx_id).await {
            Ok(LedgerTxStatus::Success) => {
                self.records.update_status(&tx_id, RecordStatus::Success)?;
                info!(%tx_id, "transaction confirmed");
                RelayOutcome::Confirmed
            }
            Ok(LedgerTxStatus::Failed(payload)) => {
                self.records.update_status(&tx_id, RecordStatus::Failed)?;
                warn!(%tx_id, %payload, "transaction failed on ledger");
                RelayOutcome::Failed(payload)
            }
            Ok(LedgerTxStatus::Pending) | Err(TransferError::Unresolved) => {
                if full.transaction.is_expired(Utc::now()) {
                    // The blockhash can no longer land; the transaction is
                    // dead. Never rebuild with a fresh blockhash here: that
                    // would be a transaction the owner did not sign.
                    self.records.update_status(&tx_id, RecordStatus::Failed)?;
                    warn!(%tx_id, "freshness window elapsed without finality");
                    RelayOutcome::Expired
                } else {
                    // Still in flight: leave the record Pending.
                    // Resubmission reuses the same signed bytes, the ledger
                    // deduplicates.
                    info!(%tx_id, "poll budget exhausted, status unresolved");
                    RelayOutcome::Unresolved
                }
            }
            Err(e) => return Err(e),
        };

        Ok(RelayReceipt { tx_id, outcome })
    }

    /// Poll transaction status bounded by both attempt count and wall clock.
    async fn poll_until_final(&self, tx_id: &str) -> Result<LedgerTxStatus, TransferError> {
        let deadline = tokio::time::Instant::now() + self.policy.poll_timeout;
        for attempt in 0..self.policy.poll_attempts {
            match self.ledger.transaction_status(tx_id).await? {
                LedgerTxStatus::Pending => {}
                terminal => return Ok(terminal),
            }
            if attempt + 1 < self.policy.poll_attempts {
                if tokio::time::Instant::now() + self.policy.poll_interval > deadline {
                    break;
                }
                tokio::time::sleep(self.policy.poll_interval).await;
            }
        }
        Err(TransferError::Unresolved)
    }
}
