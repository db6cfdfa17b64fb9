// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Transfer transaction assembly.
//!
//! The builder validates everything it can locally — addresses, amount, fee
//! arithmetic — before touching the network, then checks the sender's
//! balance and fetches a freshness token. Invalid input must never cost a
//! ledger round trip.

use std::sync::Arc;

use tracing::debug;

use crate::address::{self, Address};
use crate::error::TransferError;
use crate::fee::{self, FeeRule};
use crate::ledger::LedgerClient;
use crate::transaction::{self, Instruction, UnsignedTransaction};

/// A built transfer: the unsigned transaction and the fee it includes.
#[derive(Debug, Clone)]
pub struct BuiltTransfer {
    pub transaction: UnsignedTransaction,
    /// Platform fee in whole-token units.
    pub fee: f64,
}

/// Assembles unsigned two-instruction transfer transactions.
pub struct TransactionBuilder {
    ledger: Arc<dyn LedgerClient>,
    mint: Address,
    relay_address: Address,
    platform_fee_wallet: Address,
    fee_rule: FeeRule,
    decimals: u8,
}

impl TransactionBuilder {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        mint: Address,
        relay_address: Address,
        platform_fee_wallet: Address,
        fee_rule: FeeRule,
        decimals: u8,
    ) -> Self {
        Self {
            ledger,
            mint,
            relay_address,
            platform_fee_wallet,
            fee_rule,
            decimals,
        }
    }

    /// Build an unsigned transfer of `amount` whole tokens from `from` to
    /// `to`, with the platform fee appended as a second instruction.
    ///
    /// Ordering is part of the contract: local validation first (no ledger
    /// call on bad input), then the balance check, then the freshness token
    /// fetch last so the validity window starts as late as possible.
    pub async fn build_transfer(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<BuiltTransfer, TransferError> {
        let from = Address::parse(from)?;
        let to = Address::parse(to)?;
        let fee = fee::compute_fee(amount, &self.fee_rule)?;
        let amount_minor = transaction::to_minor_units(amount, self.decimals)?;
        let fee_minor = transaction::to_minor_units(fee, self.decimals)?;

        let source = address::derive_token_account(&from, &self.mint)?;
        let destination = address::derive_token_account(&to, &self.mint)?;
        let fee_destination =
            address::derive_token_account(&self.platform_fee_wallet, &self.mint)?;

        let total = amount_minor
            .checked_add(fee_minor)
            .ok_or_else(|| TransferError::InvalidAmount("amount plus fee overflows".to_string()))?;
        let balance = self
            .ledger
            .token_account_balance(&source)
            .await?
            .unwrap_or(0);
        if total > balance {
            return Err(TransferError::InvalidAmount(format!(
                "insufficient balance: need {} (amount plus fee), have {}",
                transaction::format_minor_units(total, self.decimals),
                transaction::format_minor_units(balance, self.decimals),
            )));
        }

        let freshness = self.ledger.latest_blockhash().await?;
        debug!(
            %from, %to, amount, fee,
            blockhash = %freshness.blockhash,
            "built transfer transaction"
        );

        let program_id = Address::parse(address::TOKEN_PROGRAM_ID)?;
        let transaction = UnsignedTransaction {
            instructions: vec![
                Instruction {
                    program_id,
                    source,
                    destination,
                    authority: from,
                    amount_minor_units: amount_minor,
                },
                Instruction {
                    program_id,
                    source,
                    destination: fee_destination,
                    authority: from,
                    amount_minor_units: fee_minor,
                },
            ],
            blockhash: freshness.blockhash,
            expires_at: freshness.expires_at,
            fee_payer: self.relay_address,
        };

        Ok(BuiltTransfer { transaction, fee })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerError, LedgerTxStatus};
    use crate::transaction::FreshnessToken;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockLedger {
        balance: Option<u64>,
        calls: AtomicUsize,
    }

    impl MockLedger {
        fn with_balance(balance: Option<u64>) -> Self {
            Self {
                balance,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LedgerClient for MockLedger {
        async fn latest_blockhash(&self) -> Result<FreshnessToken, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FreshnessToken {
                blockhash: "9sHcv6xwn9YkB8nxTUGKDwPwNnmqVp5oux4r1Hwg1ypU".to_string(),
                expires_at: Utc::now() + Duration::seconds(60),
            })
        }

        async fn submit_transaction(&self, _tx_bytes: &[u8]) -> Result<String, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("tx".to_string())
        }

        async fn transaction_status(&self, _tx_id: &str) -> Result<LedgerTxStatus, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LedgerTxStatus::Success)
        }

        async fn token_account_balance(
            &self,
            _account: &Address,
        ) -> Result<Option<u64>, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.balance)
        }
    }

    const MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

    fn test_builder(ledger: Arc<MockLedger>) -> TransactionBuilder {
        TransactionBuilder::new(
            ledger,
            Address::parse(MINT).unwrap(),
            Address::from_bytes([9u8; 32]),
            Address::from_bytes([8u8; 32]),
            FeeRule::Fixed { value: 0.5 },
            6,
        )
    }

    fn from_addr() -> String {
        Address::from_bytes([1u8; 32]).to_base58()
    }

    fn to_addr() -> String {
        Address::from_bytes([2u8; 32]).to_base58()
    }

    #[tokio::test]
    async fn builds_two_instructions_principal_then_fee() {
        let ledger = Arc::new(MockLedger::with_balance(Some(100_000_000)));
        let builder = test_builder(ledger.clone());

        let built = builder
            .build_transfer(&from_addr(), &to_addr(), 10.0)
            .await
            .unwrap();

        let tx = &built.transaction;
        assert_eq!(tx.instructions.len(), 2);
        assert_eq!(tx.instructions[0].amount_minor_units, 10_000_000);
        assert_eq!(tx.instructions[1].amount_minor_units, 500_000);
        assert_eq!(built.fee, 0.5);

        // Both instructions spend from the same source sub-account under the
        // same authority.
        assert_eq!(tx.instructions[0].source, tx.instructions[1].source);
        assert_eq!(tx.instructions[0].authority, tx.instructions[1].authority);
        assert_ne!(
            tx.instructions[0].destination,
            tx.instructions[1].destination
        );
        assert_eq!(tx.fee_payer, Address::from_bytes([9u8; 32]));
    }

    #[tokio::test]
    async fn fee_destination_is_platform_sub_account() {
        let ledger = Arc::new(MockLedger::with_balance(Some(100_000_000)));
        let builder = test_builder(ledger);

        let built = builder
            .build_transfer(&from_addr(), &to_addr(), 10.0)
            .await
            .unwrap();

        let expected = address::derive_token_account(
            &Address::from_bytes([8u8; 32]),
            &Address::parse(MINT).unwrap(),
        )
        .unwrap();
        assert_eq!(built.transaction.instructions[1].destination, expected);
    }

    #[tokio::test]
    async fn invalid_amount_makes_no_ledger_calls() {
        let ledger = Arc::new(MockLedger::with_balance(Some(100_000_000)));
        let builder = test_builder(ledger.clone());

        for amount in [0.0, -5.0, f64::NAN] {
            let err = builder
                .build_transfer(&from_addr(), &to_addr(), amount)
                .await
                .unwrap_err();
            assert!(matches!(err, TransferError::InvalidAmount(_)));
        }
        assert_eq!(ledger.call_count(), 0);
    }

    #[tokio::test]
    async fn invalid_address_makes_no_ledger_calls() {
        let ledger = Arc::new(MockLedger::with_balance(Some(100_000_000)));
        let builder = test_builder(ledger.clone());

        let err = builder
            .build_transfer("not-an-address", &to_addr(), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidAddress(_)));
        assert_eq!(ledger.call_count(), 0);
    }

    #[tokio::test]
    async fn rejects_amount_plus_fee_above_balance() {
        // 10.0 + 0.5 fee = 10.5, but only 10.2 available.
        let ledger = Arc::new(MockLedger::with_balance(Some(10_200_000)));
        let builder = test_builder(ledger);

        let err = builder
            .build_transfer(&from_addr(), &to_addr(), 10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn missing_source_account_counts_as_zero_balance() {
        let ledger = Arc::new(MockLedger::with_balance(None));
        let builder = test_builder(ledger);

        let err = builder
            .build_transfer(&from_addr(), &to_addr(), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn exact_balance_is_accepted() {
        let ledger = Arc::new(MockLedger::with_balance(Some(10_500_000)));
        let builder = test_builder(ledger);

        assert!(builder
            .build_transfer(&from_addr(), &to_addr(), 10.0)
            .await
            .is_ok());
    }
}
