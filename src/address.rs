// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Account address parsing, validation and token sub-account derivation.
//!
//! Addresses are base58-encoded 32-byte Ed25519 public keys. A string of the
//! right alphabet but the wrong decoded length is *not* a valid address, so
//! [`Address::parse`] checks the decoded byte count, not just the encoding.
//!
//! Token balances live in per-owner sub-accounts (associated token accounts)
//! derived deterministically from the owner and the token mint. The
//! derivation is pure: same inputs always yield the same sub-account, so no
//! ledger lookup is needed to locate a holder's balance account.

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::TransferError;

/// Length of a decoded account address (an Ed25519 public key).
pub const ADDRESS_LENGTH: usize = 32;

/// The on-ledger token program that executes transfer instructions.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// The program that owns derived token sub-accounts.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

/// Domain separator appended when hashing program-derived address seeds.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// A validated 32-byte account address.
///
/// Construction goes through [`Address::parse`] or [`Address::from_bytes`],
/// so holding an `Address` means the textual form decoded to exactly 32
/// bytes. Displays and serializes as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Parse a base58 address string, rejecting anything that does not
    /// decode to exactly [`ADDRESS_LENGTH`] bytes.
    pub fn parse(s: &str) -> Result<Self, TransferError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| TransferError::InvalidAddress(format!("not base58: {s}")))?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(TransferError::InvalidAddress(format!(
                "decoded to {} bytes, expected {ADDRESS_LENGTH}: {s}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Whether a string is a well-formed address.
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    /// Wrap raw public-key bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Base58 representation.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(de::Error::custom)
    }
}

/// Derive the token sub-account (associated token account) that holds
/// `mint` balances for `owner`.
///
/// Follows the ledger's program-derived-address rule: hash the seeds
/// `[owner, token program, mint]` together with a bump byte and the deriving
/// program id, taking the first candidate that is *not* a valid curve point.
/// Derived accounts must be off-curve so no private key can ever exist for
/// them.
pub fn derive_token_account(owner: &Address, mint: &Address) -> Result<Address, TransferError> {
    let token_program = Address::parse(TOKEN_PROGRAM_ID)?;
    let ata_program = Address::parse(ASSOCIATED_TOKEN_PROGRAM_ID)?;
    let seeds: [&[u8]; 3] = [
        owner.as_bytes(),
        token_program.as_bytes(),
        mint.as_bytes(),
    ];
    find_program_address(&seeds, &ata_program)
}

/// Search bump seeds from 255 downward for the first off-curve candidate.
fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, TransferError> {
    for bump in (0u8..=255).rev() {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update([bump]);
        hasher.update(program_id.as_bytes());
        hasher.update(PDA_MARKER);
        let digest: [u8; 32] = hasher.finalize().into();

        if !is_on_curve(&digest) {
            return Ok(Address::from_bytes(digest));
        }
    }
    // Statistically unreachable: each bump candidate is off-curve with
    // probability ~1/2.
    Err(TransferError::InvalidAddress(
        "no viable bump seed for derived account".to_string(),
    ))
}

/// Whether 32 bytes decompress to a valid Edwards curve point.
fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_DEVNET_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

    #[test]
    fn parse_accepts_known_program_ids() {
        assert!(Address::is_valid(TOKEN_PROGRAM_ID));
        assert!(Address::is_valid(ASSOCIATED_TOKEN_PROGRAM_ID));
        assert!(Address::is_valid(USDC_DEVNET_MINT));
    }

    #[test]
    fn parse_rejects_non_base58() {
        // '0', 'I', 'O' and 'l' are outside the base58 alphabet.
        assert!(Address::parse("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl").is_err());
        assert!(Address::parse("").is_err());
    }

    #[test]
    fn parse_rejects_wrong_decoded_length() {
        // Valid base58 alphabet, but decodes to fewer than 32 bytes.
        let short = bs58::encode([1u8; 16]).into_string();
        let err = Address::parse(&short).unwrap_err();
        assert!(matches!(err, TransferError::InvalidAddress(_)));

        let long = bs58::encode([1u8; 40]).into_string();
        assert!(Address::parse(&long).is_err());
    }

    #[test]
    fn display_round_trips() {
        let addr = Address::parse(TOKEN_PROGRAM_ID).unwrap();
        assert_eq!(addr.to_string(), TOKEN_PROGRAM_ID);
        assert_eq!(Address::parse(&addr.to_string()).unwrap(), addr);
    }

    #[test]
    fn serde_uses_base58_strings() {
        let addr = Address::parse(USDC_DEVNET_MINT).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{USDC_DEVNET_MINT}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn derived_sub_account_is_deterministic() {
        let owner = Address::from_bytes([7u8; 32]);
        let mint = Address::parse(USDC_DEVNET_MINT).unwrap();

        let a = derive_token_account(&owner, &mint).unwrap();
        let b = derive_token_account(&owner, &mint).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derived_sub_account_differs_per_owner_and_mint() {
        let mint = Address::parse(USDC_DEVNET_MINT).unwrap();
        let owner1 = Address::from_bytes([1u8; 32]);
        let owner2 = Address::from_bytes([2u8; 32]);

        let ata1 = derive_token_account(&owner1, &mint).unwrap();
        let ata2 = derive_token_account(&owner2, &mint).unwrap();
        assert_ne!(ata1, ata2);

        let other_mint = Address::from_bytes([9u8; 32]);
        let ata3 = derive_token_account(&owner1, &other_mint).unwrap();
        assert_ne!(ata1, ata3);
    }

    #[test]
    fn derived_sub_account_is_off_curve() {
        let owner = Address::from_bytes([42u8; 32]);
        let mint = Address::parse(USDC_DEVNET_MINT).unwrap();
        let ata = derive_token_account(&owner, &mint).unwrap();
        assert!(!is_on_curve(ata.as_bytes()));
    }
}
