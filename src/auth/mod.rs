// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Gate
//!
//! Stateless capability check wrapping the platform's local authentication
//! (biometric or passcode). Every operation that reaches the key vault must
//! pass the gate first, and a result is never carried over from a previous
//! operation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

/// Unrecoverable platform authentication failure.
///
/// "User declined" is not an error; collaborators report it as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
#[error("Platform authentication failure: {0}")]
pub struct PlatformAuthError(pub String);

/// Platform authentication collaborator.
///
/// Implementations wrap the OS biometric/passcode prompt. Injected so tests
/// can substitute an instrumented fake.
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Whether authentication hardware is available on this device.
    async fn has_capability(&self) -> bool;

    /// Show the platform authentication UI and wait for it to resolve.
    ///
    /// Returns `Ok(false)` when the user declines or cancels; `Err` only
    /// for unrecoverable platform errors.
    async fn prompt(&self, message: &str) -> Result<bool, PlatformAuthError>;
}

/// Binary capability gate over the platform authenticator.
#[derive(Clone)]
pub struct AuthGate {
    platform: Arc<dyn PlatformAuthenticator>,
}

impl AuthGate {
    /// Create a gate over the given platform authenticator.
    pub fn new(platform: Arc<dyn PlatformAuthenticator>) -> Self {
        Self { platform }
    }

    /// Whether authentication hardware is present.
    pub async fn hardware_present(&self) -> bool {
        self.platform.has_capability().await
    }

    /// Run the platform authentication prompt.
    ///
    /// Returns `false` on decline, cancellation, or absent hardware.
    /// Unrecoverable platform errors also resolve to `false`, with a logged
    /// diagnostic; the caller only ever sees a yes/no answer.
    pub async fn authenticate(&self, prompt: &str) -> bool {
        if !self.platform.has_capability().await {
            warn!("Authentication hardware not present");
            return false;
        }

        match self.platform.prompt(prompt).await {
            Ok(granted) => granted,
            Err(e) => {
                warn!(error = %e, "Platform authentication failed");
                false
            }
        }
    }
}
