// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger network integration.
//!
//! This module provides:
//! - The [`LedgerClient`] collaborator trait and its JSON-RPC implementation
//! - Transfer building, signing, and wire encoding
//! - Decimal ↔ base-unit amount conversion

pub mod client;
pub mod transfer;
pub mod units;

pub use client::{HttpLedgerClient, LedgerClient, LedgerError, TxStatus};
pub use transfer::{
    build_transfer, decode_transfer, validate_address, verify_transfer, SignedTransfer,
    TransferError, TransferMessage,
};
pub use units::{format_amount, parse_amount, AmountError, NATIVE_DECIMALS};
