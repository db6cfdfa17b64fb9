// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Owner-side transaction signing.
//!
//! Decrypts the key blob, signs the canonical message bytes, and returns a
//! transport-ready partially-signed transaction. The decrypt-derive-sign
//! sequence runs on a blocking worker because PBKDF2 at 100k iterations
//! stalls an async dispatch thread for tens of milliseconds.
//!
//! Key material exists only inside the blocking closure and is zeroized on
//! every exit path, including the failure ones.

use ed25519_dalek::Signer as _;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::TransferError;
use crate::transaction::{PartiallySignedTransaction, UnsignedTransaction};
use crate::vault::{self, EncryptedBlob};

/// Sign `transaction` with the key held in `blob`, unlocked by `password`.
///
/// Refuses to sign a transaction whose freshness window has already elapsed;
/// a signature over a stale blockhash is worthless and the caller should
/// rebuild instead.
pub async fn sign_transfer(
    transaction: UnsignedTransaction,
    blob: EncryptedBlob,
    password: String,
) -> Result<PartiallySignedTransaction, TransferError> {
    if transaction.is_expired(chrono::Utc::now()) {
        return Err(TransferError::Expired);
    }
    let message = transaction.message_bytes()?;
    let password = Zeroizing::new(password);

    let (owner, signature) = tokio::task::spawn_blocking(move || {
        let key = vault::decrypt(&blob, &password)?;
        let signing_key = key.signing_key()?;
        let owner = key.address()?;
        let signature = signing_key.sign(&message).to_bytes().to_vec();
        vault::destroy(key);
        Ok::<_, TransferError>((owner, signature))
    })
    .await
    .map_err(|e| TransferError::Encoding(format!("signing task failed: {e}")))??;

    debug!(%owner, "transaction signed by owner");
    Ok(PartiallySignedTransaction {
        transaction,
        owner,
        owner_signature: signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{self, Address};
    use crate::transaction::Instruction;
    use chrono::{Duration, Utc};

    fn test_transaction(owner: Address, expires_at: chrono::DateTime<Utc>) -> UnsignedTransaction {
        let program = Address::parse(address::TOKEN_PROGRAM_ID).unwrap();
        UnsignedTransaction {
            instructions: vec![Instruction {
                program_id: program,
                source: Address::from_bytes([1u8; 32]),
                destination: Address::from_bytes([2u8; 32]),
                authority: owner,
                amount_minor_units: 1_000_000,
            }],
            blockhash: "9sHcv6xwn9YkB8nxTUGKDwPwNnmqVp5oux4r1Hwg1ypU".to_string(),
            expires_at,
            fee_payer: Address::from_bytes([3u8; 32]),
        }
    }

    #[tokio::test]
    async fn signs_and_produces_verifiable_signature() {
        let (owner, key) = vault::generate();
        let blob = vault::encrypt(&key, "pw").unwrap();
        let tx = test_transaction(owner, Utc::now() + Duration::seconds(60));

        let partial = sign_transfer(tx, blob, "pw".to_string()).await.unwrap();
        assert_eq!(partial.owner, owner);
        partial.verify_owner_signature().unwrap();
    }

    #[tokio::test]
    async fn wrong_password_is_auth_failure() {
        let (owner, key) = vault::generate();
        let blob = vault::encrypt(&key, "pw").unwrap();
        let tx = test_transaction(owner, Utc::now() + Duration::seconds(60));

        let err = sign_transfer(tx, blob, "wrong".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::AuthenticationFailure));
    }

    #[tokio::test]
    async fn refuses_expired_transaction() {
        let (owner, key) = vault::generate();
        let blob = vault::encrypt(&key, "pw").unwrap();
        let tx = test_transaction(owner, Utc::now() - Duration::seconds(1));

        let err = sign_transfer(tx, blob, "pw".to_string()).await.unwrap_err();
        assert!(matches!(err, TransferError::Expired));
    }
}
