// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ephemeral handle to decrypted key material.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};

/// Decrypted signing key, scoped to a single signing operation.
///
/// The handle is not `Clone` and is owned exclusively by the call that
/// requested it. Key material is zeroized when the handle drops, so the
/// owner must let it go out of scope before doing anything else —
/// in particular before any network I/O.
pub struct DecryptedSigner {
    signing_key: SigningKey,
}

impl DecryptedSigner {
    pub(crate) fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Base58-encoded public address of this key.
    pub fn public_address(&self) -> String {
        bs58::encode(self.signing_key.verifying_key().as_bytes()).into_string()
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message, returning the detached Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

// Never print key material, even accidentally via error context.
impl fmt::Debug for DecryptedSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedSigner")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use rand::rngs::OsRng;

    #[test]
    fn signatures_verify_against_public_key() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let signer = DecryptedSigner::new(signing_key);

        let message = b"transfer of 0.5 units";
        let signature = signer.sign(message);

        let verifying_key = VerifyingKey::from_bytes(&signer.public_key_bytes()).unwrap();
        assert!(verifying_key
            .verify(message, &Signature::from_bytes(&signature))
            .is_ok());
    }

    #[test]
    fn address_matches_public_key_bytes() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let signer = DecryptedSigner::new(signing_key);

        let decoded = bs58::decode(signer.public_address()).into_vec().unwrap();
        assert_eq!(decoded, signer.public_key_bytes().to_vec());
    }
}
