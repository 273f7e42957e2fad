// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account balance tracking.
//!
//! One request per refresh, no polling. A fetch failure never silently
//! substitutes zero for an authoritative balance: the caller gets
//! [`BalanceError::Unavailable`] carrying the last-known value (or the
//! zero sentinel when nothing was ever observed).

use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::ledger::{format_amount, LedgerClient, NATIVE_DECIMALS};

/// Account balance in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub base_units: u64,
}

impl Balance {
    /// Zero-state sentinel used before any successful refresh.
    pub const ZERO: Balance = Balance { base_units: 0 };

    /// Human-readable decimal amount.
    pub fn display(&self) -> String {
        format_amount(self.base_units, NATIVE_DECIMALS)
    }
}

/// Errors from balance refresh.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Balance unavailable ({reason}); last known: {}", .last_known.display())]
    Unavailable { last_known: Balance, reason: String },
}

/// Reads the wallet's on-chain balance through the ledger client.
pub struct BalanceTracker {
    ledger: Arc<dyn LedgerClient>,
    last_known: RwLock<Option<Balance>>,
}

impl BalanceTracker {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            last_known: RwLock::new(None),
        }
    }

    /// Fetch the current balance for the address.
    ///
    /// On network failure the error carries the prior known balance so the
    /// caller can keep displaying it while knowing it is not fresh.
    pub async fn refresh(&self, public_address: &str) -> Result<Balance, BalanceError> {
        match self.ledger.balance_base_units(public_address).await {
            Ok(base_units) => {
                let balance = Balance { base_units };
                *self.last_known.write().expect("balance lock poisoned") = Some(balance);
                Ok(balance)
            }
            Err(e) => {
                warn!(error = %e, address = %public_address, "Balance refresh failed");
                Err(BalanceError::Unavailable {
                    last_known: self.last_known().unwrap_or(Balance::ZERO),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Last successfully observed balance, if any.
    pub fn last_known(&self) -> Option<Balance> {
        *self.last_known.read().expect("balance lock poisoned")
    }
}
