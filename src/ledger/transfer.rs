// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer transaction building and wire encoding.
//!
//! A transfer is a bincode-encoded message plus a detached Ed25519
//! signature over those message bytes. The `reference` field carries a
//! fresh UUID per transfer, so a user-confirmed retry produces a distinct
//! transaction rather than a byte-identical resubmission.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vault::DecryptedSigner;

/// Errors from transfer construction and decoding.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Transfer encoding failed: {0}")]
    Encoding(String),
}

/// The signed portion of a transfer transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMessage {
    /// Sender public key.
    pub from: [u8; 32],
    /// Recipient public key.
    pub to: [u8; 32],
    /// Amount in base units.
    pub amount_base: u64,
    /// Client-generated idempotency reference (UUID bytes).
    pub reference: [u8; 16],
}

/// A transfer message with its Ed25519 signature, as submitted on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransfer {
    pub message: TransferMessage,
    pub signature: Vec<u8>,
}

/// Validate a recipient address and decode it to raw public key bytes.
pub fn validate_address(address: &str) -> Result<[u8; 32], TransferError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|_| TransferError::InvalidAddress("not valid base58".to_string()))?;

    decoded.try_into().map_err(|_| {
        TransferError::InvalidAddress("address must decode to 32 bytes".to_string())
    })
}

/// Build and sign a transfer, returning the wire bytes to submit.
pub fn build_transfer(
    signer: &DecryptedSigner,
    recipient_address: &str,
    amount_base: u64,
    reference: Uuid,
) -> Result<Vec<u8>, TransferError> {
    let message = TransferMessage {
        from: signer.public_key_bytes(),
        to: validate_address(recipient_address)?,
        amount_base,
        reference: *reference.as_bytes(),
    };

    let message_bytes =
        bincode::serialize(&message).map_err(|e| TransferError::Encoding(e.to_string()))?;
    let signature = signer.sign(&message_bytes).to_vec();

    bincode::serialize(&SignedTransfer { message, signature })
        .map_err(|e| TransferError::Encoding(e.to_string()))
}

/// Decode wire bytes back into a signed transfer.
pub fn decode_transfer(bytes: &[u8]) -> Result<SignedTransfer, TransferError> {
    bincode::deserialize(bytes).map_err(|e| TransferError::Encoding(e.to_string()))
}

/// Verify a signed transfer's signature against its embedded sender key.
pub fn verify_transfer(transfer: &SignedTransfer) -> bool {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    let Ok(verifying_key) = VerifyingKey::from_bytes(&transfer.message.from) else {
        return false;
    };
    let Ok(signature_bytes) = <[u8; 64]>::try_from(transfer.signature.as_slice()) else {
        return false;
    };
    let Ok(message_bytes) = bincode::serialize(&transfer.message) else {
        return false;
    };

    verifying_key
        .verify(&message_bytes, &Signature::from_bytes(&signature_bytes))
        .is_ok()
}
