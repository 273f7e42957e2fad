// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Engine
//!
//! Orchestrates a single transfer: validate, authenticate, decrypt, sign,
//! submit once, then poll for confirmation.
//!
//! ## Ordering guarantees
//!
//! - Validation happens before any collaborator is touched; a malformed
//!   request causes zero network calls.
//! - The vault is only consulted after the authentication gate approved
//!   *this* invocation; gate results are never reused across operations.
//! - The decrypted signer lives only for the build-and-sign step and is
//!   dropped before any network I/O, on every exit path.
//! - Submission is a single attempt. Resubmitting an already-accepted
//!   transfer risks a double-spend, so a failed submission is surfaced to
//!   the caller, who decides whether to send a fresh transaction (which
//!   carries a new reference by construction).
//!
//! Concurrent `send` calls on the same engine are serialized by an internal
//! lock so they cannot race sequence assignment at the ledger. Dropping the
//! returned future stops confirmation polling; an already-submitted
//! transaction is never retracted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthGate;
use crate::ledger::{
    build_transfer, parse_amount, validate_address, AmountError, LedgerClient, TransferError,
    TxStatus, NATIVE_DECIMALS,
};
use crate::vault::{KeyVault, VaultError, Wallet};

/// Default ceiling on confirmation polling.
const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between confirmation polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Message shown by the platform authentication prompt.
const AUTH_PROMPT: &str = "Authorize transfer";

/// A request to move funds out of the wallet.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Base58 recipient address.
    pub recipient_address: String,
    /// Decimal amount in native units (e.g. "0.5").
    pub amount: String,
    /// The wallet whose funds move.
    pub source_wallet: Wallet,
}

/// Reason a submitted transaction did not confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The engine's confirmation timeout elapsed while still pending.
    ConfirmationTimeout,
    /// The ledger reported the transaction as failed.
    Rejected(String),
}

/// Outcome of a transfer that reached the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Pending,
    Confirmed { tx_id: String },
    Failed(FailureReason),
}

/// Errors before the transfer reached the ledger (no side effect occurred),
/// plus submission rejection (the one case the caller must treat as
/// "unknown, decide manually").
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Invalid transfer request: {0}")]
    Validation(String),

    #[error("Amount rounds to zero base units")]
    AmountTooSmall,

    #[error("Authentication declined or unavailable")]
    Auth,

    #[error("Failed to decrypt signing key")]
    Decryption(#[source] VaultError),

    #[error("Submission failed: {0}")]
    Submission(String),
}

/// Sign-and-submit orchestrator for a single wallet.
pub struct TransactionEngine {
    ledger: Arc<dyn LedgerClient>,
    gate: AuthGate,
    vault: Arc<KeyVault>,
    confirm_timeout: Duration,
    poll_interval: Duration,
    submission_lock: Mutex<()>,
}

impl TransactionEngine {
    /// Create an engine with default confirmation polling parameters.
    pub fn new(ledger: Arc<dyn LedgerClient>, gate: AuthGate, vault: Arc<KeyVault>) -> Self {
        Self {
            ledger,
            gate,
            vault,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            submission_lock: Mutex::new(()),
        }
    }

    /// Override confirmation polling parameters.
    pub fn with_polling(mut self, poll_interval: Duration, confirm_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.confirm_timeout = confirm_timeout;
        self
    }

    /// Execute a transfer end to end.
    ///
    /// Returns `Err` for failures where nothing reached the ledger
    /// (validation, authentication, decryption) or where submission itself
    /// failed; returns `Ok(ConfirmationStatus)` once the transaction was
    /// accepted, including the timeout and ledger-rejected outcomes.
    pub async fn send(&self, request: TransferRequest) -> Result<ConfirmationStatus, SendError> {
        // 1. Validate before any collaborator call.
        validate_address(&request.recipient_address).map_err(|e| match e {
            TransferError::InvalidAddress(msg) => SendError::Validation(msg),
            other => SendError::Validation(other.to_string()),
        })?;

        let amount_base = parse_amount(&request.amount, NATIVE_DECIMALS).map_err(|e| match e {
            AmountError::TooSmall => SendError::AmountTooSmall,
            other => SendError::Validation(other.to_string()),
        })?;

        // 2. Gate this invocation; no cached result is acceptable.
        if !self.gate.authenticate(AUTH_PROMPT).await {
            return Err(SendError::Auth);
        }

        // Serialize submissions from this wallet.
        let _guard = self.submission_lock.lock().await;

        // 3–4. Decrypt, build, and sign. The signer is confined to this
        // block and dropped before anything touches the network.
        let reference = Uuid::new_v4();
        let signed_tx = {
            let signer = self
                .vault
                .decrypt(&request.source_wallet.encrypted_secret)
                .map_err(SendError::Decryption)?;

            build_transfer(&signer, &request.recipient_address, amount_base, reference)
                .map_err(|e| SendError::Validation(e.to_string()))?
        };

        // 5. Single submission attempt.
        let tx_id = self
            .ledger
            .submit_transaction(&signed_tx)
            .await
            .map_err(|e| SendError::Submission(e.to_string()))?;

        info!(tx_id = %tx_id, reference = %reference, "Transfer submitted");

        // 6. Poll until finality or timeout.
        Ok(self.await_confirmation(&tx_id).await)
    }

    /// Poll the ledger until the transaction is final or the timeout
    /// elapses. Transient poll errors are tolerated; the transaction may
    /// still confirm.
    async fn await_confirmation(&self, tx_id: &str) -> ConfirmationStatus {
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            match self.ledger.confirmation_status(tx_id).await {
                Ok(TxStatus::Confirmed) => {
                    info!(tx_id = %tx_id, "Transfer confirmed");
                    return ConfirmationStatus::Confirmed {
                        tx_id: tx_id.to_string(),
                    };
                }
                Ok(TxStatus::Failed(reason)) => {
                    warn!(tx_id = %tx_id, reason = %reason, "Transfer failed on ledger");
                    return ConfirmationStatus::Failed(FailureReason::Rejected(reason));
                }
                Ok(TxStatus::Pending) => {}
                Err(e) => {
                    warn!(tx_id = %tx_id, error = %e, "Confirmation poll failed, will retry");
                }
            }

            if Instant::now() >= deadline {
                warn!(tx_id = %tx_id, "Confirmation timed out");
                return ConfirmationStatus::Failed(FailureReason::ConfirmationTimeout);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PlatformAuthError, PlatformAuthenticator};
    use crate::balance::BalanceTracker;
    use crate::ledger::{decode_transfer, verify_transfer, LedgerError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Shared log of collaborator calls, for asserting ordering.
    type CallLog = Arc<StdMutex<Vec<&'static str>>>;

    struct FakeAuthenticator {
        approve: bool,
        log: CallLog,
    }

    #[async_trait]
    impl PlatformAuthenticator for FakeAuthenticator {
        async fn has_capability(&self) -> bool {
            true
        }

        async fn prompt(&self, _message: &str) -> Result<bool, PlatformAuthError> {
            self.log.lock().unwrap().push("authenticate");
            Ok(self.approve)
        }
    }

    /// In-memory ledger: accepts one submission, confirms it after a
    /// configurable number of status polls, and debits the balance.
    struct FakeLedger {
        log: CallLog,
        confirm_after: usize,
        reject_submission: bool,
        never_confirm: bool,
        polls: AtomicUsize,
        submissions: StdMutex<Vec<Vec<u8>>>,
        balance: AtomicU64,
    }

    impl FakeLedger {
        fn new(log: CallLog, confirm_after: usize) -> Self {
            Self {
                log,
                confirm_after,
                reject_submission: false,
                never_confirm: false,
                polls: AtomicUsize::new(0),
                submissions: StdMutex::new(Vec::new()),
                balance: AtomicU64::new(2_000_000_000),
            }
        }

        fn submission_count(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<String, LedgerError> {
            self.log.lock().unwrap().push("submit");
            if self.reject_submission {
                return Err(LedgerError::Rejected("mempool full".to_string()));
            }

            let transfer = decode_transfer(signed_tx)
                .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
            self.balance
                .fetch_sub(transfer.message.amount_base, Ordering::SeqCst);
            self.submissions.lock().unwrap().push(signed_tx.to_vec());
            Ok("tx-1".to_string())
        }

        async fn confirmation_status(&self, _tx_id: &str) -> Result<TxStatus, LedgerError> {
            self.log.lock().unwrap().push("status");
            if self.never_confirm {
                return Ok(TxStatus::Pending);
            }

            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if polls >= self.confirm_after {
                Ok(TxStatus::Confirmed)
            } else {
                Ok(TxStatus::Pending)
            }
        }

        async fn balance_base_units(&self, _public_address: &str) -> Result<u64, LedgerError> {
            Ok(self.balance.load(Ordering::SeqCst))
        }
    }

    struct Harness {
        engine: TransactionEngine,
        ledger: Arc<FakeLedger>,
        wallet: Wallet,
        log: CallLog,
    }

    fn harness(approve_auth: bool, ledger_setup: impl FnOnce(&mut FakeLedger)) -> Harness {
        let log: CallLog = Arc::new(StdMutex::new(Vec::new()));
        let vault = Arc::new(KeyVault::new("test-passphrase"));
        let wallet = vault.generate().unwrap();

        let mut fake = FakeLedger::new(Arc::clone(&log), 2);
        ledger_setup(&mut fake);
        let ledger = Arc::new(fake);

        let gate = AuthGate::new(Arc::new(FakeAuthenticator {
            approve: approve_auth,
            log: Arc::clone(&log),
        }));

        let engine = TransactionEngine::new(
            Arc::clone(&ledger) as Arc<dyn LedgerClient>,
            gate,
            Arc::clone(&vault),
        )
        .with_polling(Duration::from_millis(5), Duration::from_millis(200));

        Harness {
            engine,
            ledger,
            wallet,
            log,
        }
    }

    fn recipient_address() -> String {
        KeyVault::new("other")
            .generate()
            .unwrap()
            .public_address
    }

    fn request(wallet: &Wallet, amount: &str) -> TransferRequest {
        TransferRequest {
            recipient_address: recipient_address(),
            amount: amount.to_string(),
            source_wallet: wallet.clone(),
        }
    }

    #[tokio::test]
    async fn send_confirms_after_polling_and_debits_balance() {
        let h = harness(true, |_| {});

        let status = h.engine.send(request(&h.wallet, "0.5")).await.unwrap();
        assert_eq!(
            status,
            ConfirmationStatus::Confirmed {
                tx_id: "tx-1".to_string()
            }
        );

        // Exactly one submission, carrying a valid signature over 0.5 units.
        let submissions = h.ledger.submissions.lock().unwrap().clone();
        assert_eq!(submissions.len(), 1);
        let transfer = decode_transfer(&submissions[0]).unwrap();
        assert!(verify_transfer(&transfer));
        assert_eq!(transfer.message.amount_base, 500_000_000);

        // Authentication strictly precedes submission.
        let log = h.log.lock().unwrap().clone();
        let auth_pos = log.iter().position(|&c| c == "authenticate").unwrap();
        let submit_pos = log.iter().position(|&c| c == "submit").unwrap();
        assert!(auth_pos < submit_pos);

        // Confirmation took two polls.
        assert_eq!(log.iter().filter(|&&c| c == "status").count(), 2);

        // Balance reflects the transfer.
        let tracker = BalanceTracker::new(Arc::clone(&h.ledger) as Arc<dyn LedgerClient>);
        let balance = tracker.refresh(&h.wallet.public_address).await.unwrap();
        assert_eq!(balance.base_units, 1_500_000_000);
    }

    #[tokio::test]
    async fn declined_authentication_stops_before_any_ledger_call() {
        let h = harness(false, |_| {});

        let err = h.engine.send(request(&h.wallet, "0.5")).await.unwrap_err();
        assert!(matches!(err, SendError::Auth));

        assert_eq!(h.ledger.submission_count(), 0);
        let log = h.log.lock().unwrap().clone();
        assert_eq!(log, vec!["authenticate"]);
    }

    #[tokio::test]
    async fn non_positive_amounts_fail_validation_with_zero_network_calls() {
        for amount in ["0", "-1"] {
            let h = harness(true, |_| {});

            let err = h.engine.send(request(&h.wallet, amount)).await.unwrap_err();
            assert!(matches!(err, SendError::Validation(_)), "amount {amount}");

            // Not even the authenticator ran.
            assert!(h.log.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn sub_base_unit_amount_is_rejected() {
        let h = harness(true, |_| {});

        let err = h
            .engine
            .send(request(&h.wallet, "0.0000000001"))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::AmountTooSmall));
        assert!(h.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_recipient_fails_validation() {
        let h = harness(true, |_| {});

        let mut req = request(&h.wallet, "0.5");
        req.recipient_address = "0x00".to_string();

        let err = h.engine.send(req).await.unwrap_err();
        assert!(matches!(err, SendError::Validation(_)));
        assert!(h.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tampered_secret_fails_decryption_without_submission() {
        let h = harness(true, |_| {});

        let mut req = request(&h.wallet, "0.5");
        let last = req.source_wallet.encrypted_secret.len() - 1;
        req.source_wallet.encrypted_secret[last] ^= 0x01;

        let err = h.engine.send(req).await.unwrap_err();
        assert!(matches!(err, SendError::Decryption(_)));
        assert_eq!(h.ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn submission_rejection_is_terminal_with_single_attempt() {
        let h = harness(true, |l| l.reject_submission = true);

        let err = h.engine.send(request(&h.wallet, "0.5")).await.unwrap_err();
        assert!(matches!(err, SendError::Submission(_)));

        let log = h.log.lock().unwrap().clone();
        // One submission attempt, no resubmission, no status polls.
        assert_eq!(log.iter().filter(|&&c| c == "submit").count(), 1);
        assert_eq!(log.iter().filter(|&&c| c == "status").count(), 0);
    }

    #[tokio::test]
    async fn unconfirmed_transaction_times_out() {
        let h = harness(true, |l| l.never_confirm = true);

        let status = h.engine.send(request(&h.wallet, "0.5")).await.unwrap();
        assert_eq!(
            status,
            ConfirmationStatus::Failed(FailureReason::ConfirmationTimeout)
        );
    }

    #[tokio::test]
    async fn ledger_reported_failure_is_surfaced() {
        struct RejectingLedger;

        #[async_trait]
        impl LedgerClient for RejectingLedger {
            async fn submit_transaction(&self, _signed_tx: &[u8]) -> Result<String, LedgerError> {
                Ok("tx-2".to_string())
            }

            async fn confirmation_status(&self, _tx_id: &str) -> Result<TxStatus, LedgerError> {
                Ok(TxStatus::Failed("insufficient funds".to_string()))
            }

            async fn balance_base_units(&self, _public_address: &str) -> Result<u64, LedgerError> {
                Ok(0)
            }
        }

        let vault = Arc::new(KeyVault::new("test-passphrase"));
        let wallet = vault.generate().unwrap();
        let gate = AuthGate::new(Arc::new(FakeAuthenticator {
            approve: true,
            log: Arc::new(StdMutex::new(Vec::new())),
        }));
        let engine = TransactionEngine::new(Arc::new(RejectingLedger), gate, vault)
            .with_polling(Duration::from_millis(5), Duration::from_millis(200));

        let status = engine.send(request(&wallet, "0.5")).await.unwrap();
        assert_eq!(
            status,
            ConfirmationStatus::Failed(FailureReason::Rejected(
                "insufficient funds".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn decrypted_signer_matches_wallet_address() {
        // The wallet's address is derivable from the decrypted key alone.
        let vault = KeyVault::new("test-passphrase");
        let wallet = vault.generate().unwrap();
        let signer = vault.decrypt(&wallet.encrypted_secret).unwrap();
        assert_eq!(signer.public_address(), wallet.public_address);
    }
}
