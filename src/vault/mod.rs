// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Vault
//!
//! Sole owner of the wallet's key material. The vault bridges between the
//! persisted ciphertext blob and the ephemeral plaintext signing key.
//!
//! ## Blob Format
//!
//! ```text
//! salt (16 bytes) || nonce (12 bytes) || AES-256-GCM ciphertext + tag
//! ```
//!
//! The encryption key is derived from the vault passphrase with
//! PBKDF2-HMAC-SHA256 and the blob's salt, so the blob is self-contained
//! and round-trips exactly through encrypt/decrypt. GCM's authentication
//! tag makes any ciphertext tampering a decryption failure rather than
//! corrupted plaintext.
//!
//! ## Contract
//!
//! Decrypted key bytes leave this module only through [`DecryptedSigner`],
//! which is scoped to a single signing operation. Nothing here logs,
//! serializes, or caches plaintext.

mod signer;

pub use signer::DecryptedSigner;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit},
    Aes256Gcm, Nonce,
};
use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

/// PBKDF2 iteration count for passphrase-derived keys.
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length prepended to each encrypted blob.
const SALT_LENGTH: usize = 16;

/// AES-GCM nonce length.
const NONCE_LENGTH: usize = 12;

/// Derived key length (AES-256).
const KEY_LENGTH: usize = 32;

/// Ed25519 secret seed length.
const SEED_LENGTH: usize = 32;

/// Errors from key generation and decryption.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Key generation failed: {0}")]
    KeyGen(String),

    #[error("Encrypted secret is malformed or failed integrity verification")]
    Decryption,
}

/// The wallet record: public address plus the encrypted secret key.
///
/// The secret is never stored or exposed in decrypted form; the address is
/// derived deterministically from the key material (base58 of the Ed25519
/// verifying key). Created once by [`KeyVault::generate`] and immutable
/// thereafter.
#[derive(Debug, Clone)]
pub struct Wallet {
    /// Base58-encoded public address.
    pub public_address: String,
    /// Opaque ciphertext blob (salt || nonce || ciphertext+tag).
    pub encrypted_secret: Vec<u8>,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
}

/// Key vault holding the passphrase that protects the wallet secret.
pub struct KeyVault {
    passphrase: Zeroizing<String>,
}

impl KeyVault {
    /// Create a vault for the given passphrase.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }

    /// Generate a fresh keypair and return the wallet record.
    ///
    /// The Ed25519 secret seed is encrypted under a key derived from the
    /// vault passphrase with a fresh random salt. On any failure no partial
    /// wallet escapes.
    pub fn generate(&self) -> Result<Wallet, VaultError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();

        let seed = Zeroizing::new(signing_key.to_bytes());
        let encrypted_secret = self.encrypt(seed.as_ref())?;

        Ok(Wallet {
            public_address,
            encrypted_secret,
            created_at: Utc::now(),
        })
    }

    /// Decrypt the wallet secret into an ephemeral signer.
    ///
    /// Callers must have passed the authentication gate for the operation
    /// that needs the signer, must not retain the signer past that single
    /// operation, and must let it drop on every exit path. Tag verification
    /// failure and malformed blobs are both reported as
    /// [`VaultError::Decryption`].
    pub fn decrypt(&self, encrypted_secret: &[u8]) -> Result<DecryptedSigner, VaultError> {
        if encrypted_secret.len() < SALT_LENGTH + NONCE_LENGTH {
            return Err(VaultError::Decryption);
        }

        let (salt, rest) = encrypted_secret.split_at(SALT_LENGTH);
        let (nonce, ciphertext) = rest.split_at(NONCE_LENGTH);

        let key = self.derive_key(salt);
        let cipher = Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| VaultError::Decryption)?;

        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| VaultError::Decryption)?,
        );

        let mut seed: [u8; SEED_LENGTH] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::Decryption)?;

        let signer = DecryptedSigner::new(SigningKey::from_bytes(&seed));
        seed.zeroize();
        Ok(signer)
    }

    /// Encrypt a secret seed into a self-contained blob.
    fn encrypt(&self, seed: &[u8]) -> Result<Vec<u8>, VaultError> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| VaultError::KeyGen(format!("random source failed: {e}")))?;

        let key = self.derive_key(&salt);
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| VaultError::KeyGen(format!("cipher init failed: {e}")))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, seed)
            .map_err(|e| VaultError::KeyGen(format!("encryption failed: {e}")))?;

        let mut blob = Vec::with_capacity(SALT_LENGTH + NONCE_LENGTH + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Derive the AES key from the vault passphrase and a salt.
    fn derive_key(&self, salt: &[u8]) -> Zeroizing<[u8; KEY_LENGTH]> {
        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        pbkdf2::<Hmac<Sha256>>(
            self.passphrase.as_bytes(),
            salt,
            PBKDF2_ITERATIONS,
            key.as_mut(),
        )
        .expect("HMAC-SHA256 accepts keys of any length");
        key
    }
}
