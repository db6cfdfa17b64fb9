// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Password-protected key vault.
//!
//! Turns raw Ed25519 signing-key material into a tamper-evident blob for
//! at-rest storage, and reverses the transform only long enough to sign.
//!
//! ## Scheme
//!
//! - Key derivation: PBKDF2-HMAC-SHA256, fresh random 16-byte salt per
//!   encryption, 100k iterations by default. The iteration count is stored
//!   in the blob so it can be raised later without breaking old blobs.
//! - Encryption: AES-256-GCM with a fresh random 96-bit nonce per call and
//!   the 16-byte authentication tag stored detached. Nonce or salt reuse is
//!   a correctness violation, not a style issue: nonce reuse under one key
//!   breaks confidentiality outright.
//!
//! Decryption failures are a single undifferentiated
//! [`TransferError::AuthenticationFailure`] — a wrong password and a
//! tampered blob must be indistinguishable to the caller.
//!
//! The KDF takes tens of milliseconds on purpose. Async callers must run
//! [`encrypt`]/[`decrypt`] on a blocking worker (see `signer`), never on an
//! I/O dispatch thread.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64ct::{Base64, Encoding};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::address::Address;
use crate::error::TransferError;

/// Current blob format version.
pub const BLOB_VERSION: u8 = 1;

/// Default PBKDF2 iteration count for newly created blobs.
pub const KDF_ITERATIONS: u32 = 100_000;

/// Length of the random KDF salt.
pub const SALT_LENGTH: usize = 16;

/// AES-GCM nonce length (96 bits, the standard GCM nonce size).
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_LENGTH: usize = 16;

/// Length of raw key material: an Ed25519 keypair encoding (seed ‖ public).
pub const KEY_MATERIAL_LENGTH: usize = 64;

const DERIVED_KEY_LENGTH: usize = 32;

/// Decrypted signing-key bytes.
///
/// Exists only inside the scope of a decrypt-then-use operation. The
/// backing buffer is zeroized when the value drops, on every exit path.
/// Never clone it into longer-lived structures and never log it.
pub struct RawKeyMaterial(Zeroizing<[u8; KEY_MATERIAL_LENGTH]>);

impl RawKeyMaterial {
    /// Wrap raw keypair bytes (seed ‖ public key).
    pub fn from_bytes(bytes: [u8; KEY_MATERIAL_LENGTH]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// The raw 64 bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_MATERIAL_LENGTH] {
        &self.0
    }

    /// Reconstruct the signing key, verifying that the public half matches
    /// the seed. Mismatched halves mean the blob decrypted to garbage.
    pub fn signing_key(&self) -> Result<SigningKey, TransferError> {
        SigningKey::from_keypair_bytes(&self.0).map_err(|_| TransferError::AuthenticationFailure)
    }

    /// The public address for this key material.
    pub fn address(&self) -> Result<Address, TransferError> {
        Ok(Address::from_bytes(
            self.signing_key()?.verifying_key().to_bytes(),
        ))
    }
}

impl std::fmt::Debug for RawKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key bytes, not even partially.
        write!(f, "RawKeyMaterial(64 bytes, redacted)")
    }
}

impl PartialEq for RawKeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

/// Password-encrypted key blob, safe for at-rest storage.
///
/// Replaced wholesale on re-encryption, never partially mutated. All byte
/// fields are base64 strings so the blob serializes cleanly to JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Blob format version.
    pub version: u8,
    /// PBKDF2 iteration count used when this blob was created.
    pub iterations: u32,
    /// Random KDF salt, base64.
    pub salt: String,
    /// Random AES-GCM nonce, base64.
    pub nonce: String,
    /// Detached 16-byte authentication tag, base64.
    pub tag: String,
    /// Encrypted key material, base64.
    pub ciphertext: String,
}

/// Generate a fresh keypair from the OS cryptographic RNG.
///
/// Returns the public address and the raw key material for immediate
/// encryption via [`encrypt`].
pub fn generate() -> (Address, RawKeyMaterial) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let address = Address::from_bytes(signing_key.verifying_key().to_bytes());
    (
        address,
        RawKeyMaterial(Zeroizing::new(signing_key.to_keypair_bytes())),
    )
}

/// Encrypt key material under a password.
///
/// Every call draws a fresh salt and nonce; encrypting the same material
/// twice yields different blobs.
pub fn encrypt(key: &RawKeyMaterial, password: &str) -> Result<EncryptedBlob, TransferError> {
    let mut salt = [0u8; SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);

    let aes_key = derive_key(password, &salt, KDF_ITERATIONS);

    let cipher = Aes256Gcm::new_from_slice(aes_key.as_ref())
        .map_err(|_| TransferError::Encoding("cipher init failed".to_string()))?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), key.as_bytes().as_slice())
        .map_err(|_| TransferError::Encoding("encryption failed".to_string()))?;

    // aes-gcm appends the tag to the ciphertext; store it detached.
    let split = sealed.len() - TAG_LENGTH;
    let (ciphertext, tag) = sealed.split_at(split);

    Ok(EncryptedBlob {
        version: BLOB_VERSION,
        iterations: KDF_ITERATIONS,
        salt: Base64::encode_string(&salt),
        nonce: Base64::encode_string(&nonce),
        tag: Base64::encode_string(tag),
        ciphertext: Base64::encode_string(ciphertext),
    })
}

/// Decrypt a blob back into raw key material.
///
/// Fails with [`TransferError::AuthenticationFailure`] for a wrong password,
/// a tampered blob, or a malformed blob — the cases are intentionally not
/// distinguished.
pub fn decrypt(blob: &EncryptedBlob, password: &str) -> Result<RawKeyMaterial, TransferError> {
    if blob.version != BLOB_VERSION || blob.iterations == 0 {
        return Err(TransferError::AuthenticationFailure);
    }

    let salt = decode_field(&blob.salt)?;
    let nonce = decode_field(&blob.nonce)?;
    let tag = decode_field(&blob.tag)?;
    let ciphertext = decode_field(&blob.ciphertext)?;

    if salt.len() < SALT_LENGTH || nonce.len() != NONCE_LENGTH || tag.len() != TAG_LENGTH {
        return Err(TransferError::AuthenticationFailure);
    }

    let aes_key = derive_key(password, &salt, blob.iterations);
    let cipher = Aes256Gcm::new_from_slice(aes_key.as_ref())
        .map_err(|_| TransferError::AuthenticationFailure)?;

    // Reattach the detached tag for the aead API.
    let mut sealed = Vec::with_capacity(ciphertext.len() + tag.len());
    sealed.extend_from_slice(&ciphertext);
    sealed.extend_from_slice(&tag);

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
            .map_err(|_| TransferError::AuthenticationFailure)?,
    );

    let bytes: [u8; KEY_MATERIAL_LENGTH] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| TransferError::AuthenticationFailure)?;
    Ok(RawKeyMaterial(Zeroizing::new(bytes)))
}

/// Overwrite key material before the binding goes out of scope.
///
/// Dropping a [`RawKeyMaterial`] zeroizes it anyway; this function exists so
/// call sites can make the destruction point explicit.
pub fn destroy(key: RawKeyMaterial) {
    drop(key);
}

fn derive_key(
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> Zeroizing<[u8; DERIVED_KEY_LENGTH]> {
    let mut key = Zeroizing::new([0u8; DERIVED_KEY_LENGTH]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, key.as_mut());
    key
}

fn decode_field(value: &str) -> Result<Vec<u8>, TransferError> {
    Base64::decode_vec(value).map_err(|_| TransferError::AuthenticationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trips() {
        let (address, key) = generate();
        let blob = encrypt(&key, "correct horse battery staple").unwrap();

        let recovered = decrypt(&blob, "correct horse battery staple").unwrap();
        assert_eq!(recovered, key);
        assert_eq!(recovered.address().unwrap(), address);
    }

    #[test]
    fn wrong_password_fails_with_auth_failure() {
        let (_, key) = generate();
        let blob = encrypt(&key, "password-one").unwrap();

        let err = decrypt(&blob, "password-two").unwrap_err();
        assert!(matches!(err, TransferError::AuthenticationFailure));
    }

    #[test]
    fn repeated_encryption_randomizes_salt_nonce_and_ciphertext() {
        let (_, key) = generate();
        let blob1 = encrypt(&key, "same password").unwrap();
        let blob2 = encrypt(&key, "same password").unwrap();

        assert_ne!(blob1.salt, blob2.salt);
        assert_ne!(blob1.nonce, blob2.nonce);
        assert_ne!(blob1.ciphertext, blob2.ciphertext);
    }

    #[test]
    fn tampered_ciphertext_always_fails() {
        let (_, key) = generate();
        let blob = encrypt(&key, "pw").unwrap();

        let mut ct = Base64::decode_vec(&blob.ciphertext).unwrap();
        for i in 0..ct.len() {
            ct[i] ^= 0x01;
            let tampered = EncryptedBlob {
                ciphertext: Base64::encode_string(&ct),
                ..blob.clone()
            };
            assert!(
                decrypt(&tampered, "pw").is_err(),
                "flipping ciphertext byte {i} must fail authentication"
            );
            ct[i] ^= 0x01;
        }
    }

    #[test]
    fn tampered_tag_always_fails() {
        let (_, key) = generate();
        let blob = encrypt(&key, "pw").unwrap();

        let mut tag = Base64::decode_vec(&blob.tag).unwrap();
        for i in 0..tag.len() {
            tag[i] ^= 0xFF;
            let tampered = EncryptedBlob {
                tag: Base64::encode_string(&tag),
                ..blob.clone()
            };
            assert!(decrypt(&tampered, "pw").is_err());
            tag[i] ^= 0xFF;
        }
    }

    #[test]
    fn malformed_blob_fields_fail_closed() {
        let (_, key) = generate();
        let blob = encrypt(&key, "pw").unwrap();

        let bad_salt = EncryptedBlob {
            salt: "!!not-base64!!".to_string(),
            ..blob.clone()
        };
        assert!(matches!(
            decrypt(&bad_salt, "pw"),
            Err(TransferError::AuthenticationFailure)
        ));

        let bad_version = EncryptedBlob {
            version: 99,
            ..blob.clone()
        };
        assert!(decrypt(&bad_version, "pw").is_err());

        let zero_iterations = EncryptedBlob {
            iterations: 0,
            ..blob
        };
        assert!(decrypt(&zero_iterations, "pw").is_err());
    }

    #[test]
    fn stored_iteration_count_is_honored() {
        // A blob created with a different iteration count must still decrypt
        // using the count it carries, not the current default.
        let (_, key) = generate();
        let mut blob = encrypt(&key, "pw").unwrap();

        let salt = Base64::decode_vec(&blob.salt).unwrap();
        let nonce = Base64::decode_vec(&blob.nonce).unwrap();
        let aes_key = derive_key("pw", &salt, 50_000);
        let cipher = Aes256Gcm::new_from_slice(aes_key.as_ref()).unwrap();
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), key.as_bytes().as_slice())
            .unwrap();
        let (ct, tag) = sealed.split_at(sealed.len() - TAG_LENGTH);
        blob.iterations = 50_000;
        blob.ciphertext = Base64::encode_string(ct);
        blob.tag = Base64::encode_string(tag);

        let recovered = decrypt(&blob, "pw").unwrap();
        assert_eq!(recovered, key);
    }

    #[test]
    fn generated_keypairs_are_distinct() {
        let (addr1, _) = generate();
        let (addr2, _) = generate();
        assert_ne!(addr1, addr2);
    }

    #[test]
    fn debug_never_prints_key_bytes() {
        let (_, key) = generate();
        let debug = format!("{key:?}");
        assert_eq!(debug, "RawKeyMaterial(64 bytes, redacted)");
    }

    #[test]
    fn blob_serde_round_trips() {
        let (_, key) = generate();
        let blob = encrypt(&key, "pw").unwrap();
        let json = serde_json::to_string(&blob).unwrap();
        let back: EncryptedBlob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blob);
    }
}
