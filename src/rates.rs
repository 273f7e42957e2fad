// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Rate Oracle
//!
//! Background task that periodically fetches the fiat conversion rate for
//! the native asset and keeps the latest-known value available to the rest
//! of the system. The rate is display-only and non-authoritative; it
//! degrades gracefully instead of failing callers.
//!
//! ## Strategy
//!
//! Every `interval` the oracle fetches the external rate with a bounded
//! timeout. On success the stored [`ConversionRate`] is replaced; on
//! failure the previous value is kept and flagged stale. Until the first
//! success the rate reads as `0.0`, signaling "conversion unavailable"
//! rather than a misleading number.
//!
//! Polls never overlap: the fetch runs inline in the timer loop and missed
//! ticks are skipped, not queued, so at most one feed request is
//! outstanding at any time.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; [`RateOracle::stop`] is
//! idempotent and safe to call even if the oracle was never started.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default interval between rate polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Bounded timeout for a single feed request, kept short so dependents
/// never wait long on a dead feed.
const FEED_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors from the external price feed.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("Rate feed configuration invalid: {0}")]
    InvalidFeedUrl(String),

    #[error("Rate feed request failed: {0}")]
    Request(String),

    #[error("Rate feed response was invalid: {0}")]
    InvalidResponse(String),
}

/// Latest-known fiat conversion rate for one native unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRate {
    /// Fiat value of one native unit; `0.0` means "never observed".
    pub value_per_unit: f64,
    /// When the value was last successfully observed.
    pub observed_at: DateTime<Utc>,
    /// True when the most recent poll failed and the value is carried over.
    pub is_stale: bool,
}

impl ConversionRate {
    /// Sentinel for "no rate has ever been observed".
    fn unavailable() -> Self {
        Self {
            value_per_unit: 0.0,
            observed_at: DateTime::<Utc>::UNIX_EPOCH,
            is_stale: true,
        }
    }

    /// Whether the rate can be used for conversion.
    pub fn is_available(&self) -> bool {
        self.value_per_unit > 0.0
    }
}

/// Price feed collaborator.
#[async_trait]
pub trait RateFeed: Send + Sync {
    /// Fetch the current fiat price of one native unit.
    async fn fetch_rate(&self) -> Result<f64, RateError>;
}

/// Expected price feed payload.
#[derive(Debug, Deserialize)]
struct RateBody {
    asset_price_in_fiat: f64,
}

/// HTTP price feed with a bounded request timeout.
///
/// `fiat_multiplier` rescales the quoted price into the display currency
/// (e.g. a USD quote multiplied into the local currency); use `1.0` when
/// the feed already quotes the display currency.
#[derive(Debug, Clone)]
pub struct HttpRateFeed {
    feed_url: url::Url,
    fiat_multiplier: f64,
    http: Client,
}

impl HttpRateFeed {
    pub fn new(feed_url: &str, fiat_multiplier: f64) -> Result<Self, RateError> {
        let feed_url: url::Url = feed_url
            .parse()
            .map_err(|e: url::ParseError| RateError::InvalidFeedUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(FEED_TIMEOUT)
            .build()
            .map_err(|e| RateError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            feed_url,
            fiat_multiplier,
            http,
        })
    }
}

#[async_trait]
impl RateFeed for HttpRateFeed {
    async fn fetch_rate(&self) -> Result<f64, RateError> {
        let response = self
            .http
            .get(self.feed_url.clone())
            .send()
            .await
            .map_err(|e| RateError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| RateError::Request(e.to_string()))?;

        let body: RateBody = response
            .json()
            .await
            .map_err(|e| RateError::InvalidResponse(e.to_string()))?;

        validate_quote(body.asset_price_in_fiat).map(|price| price * self.fiat_multiplier)
    }
}

/// Reject quotes that would poison the stored rate.
fn validate_quote(price: f64) -> Result<f64, RateError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(RateError::InvalidResponse(format!(
            "non-positive or non-finite price: {price}"
        )));
    }
    Ok(price)
}

/// Best-effort conversion rate poller.
pub struct RateOracle {
    feed: Arc<dyn RateFeed>,
    rate: Arc<RwLock<ConversionRate>>,
    shutdown: Mutex<Option<CancellationToken>>,
}

impl RateOracle {
    /// Create an oracle over the given feed. No polling starts until
    /// [`RateOracle::start`] is called.
    pub fn new(feed: Arc<dyn RateFeed>) -> Self {
        Self {
            feed,
            rate: Arc::new(RwLock::new(ConversionRate::unavailable())),
            shutdown: Mutex::new(None),
        }
    }

    /// Begin the recurring poll on a background task. The first poll fires
    /// immediately. Calling `start` on a running oracle restarts it.
    pub fn start(&self, interval: Duration) {
        self.stop();

        let token = CancellationToken::new();
        *self.shutdown.lock().expect("shutdown lock poisoned") = Some(token.clone());

        let feed = Arc::clone(&self.feed);
        let rate = Arc::clone(&self.rate);

        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs_f64(), "Rate oracle starting");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Rate oracle shutting down");
                        return;
                    }
                    _ = ticker.tick() => {
                        poll_once(feed.as_ref(), &rate).await;
                    }
                }
            }
        });
    }

    /// Cancel the recurring poll. Idempotent; safe if never started.
    pub fn stop(&self) {
        if let Some(token) = self.shutdown.lock().expect("shutdown lock poisoned").take() {
            token.cancel();
        }
    }

    /// Latest-known conversion rate.
    pub fn current_rate(&self) -> ConversionRate {
        self.rate.read().expect("rate lock poisoned").clone()
    }

    /// Convert a fiat amount into native units at the current rate.
    ///
    /// Returns `None` while no rate has ever been observed.
    pub fn fiat_to_asset(&self, fiat_amount: f64) -> Option<f64> {
        let rate = self.current_rate();
        rate.is_available().then(|| fiat_amount / rate.value_per_unit)
    }
}

impl Drop for RateOracle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Execute one poll: replace the rate on success, mark it stale on failure.
async fn poll_once(feed: &dyn RateFeed, rate: &RwLock<ConversionRate>) {
    match feed.fetch_rate().await {
        Ok(value) => {
            let mut guard = rate.write().expect("rate lock poisoned");
            *guard = ConversionRate {
                value_per_unit: value,
                observed_at: Utc::now(),
                is_stale: false,
            };
        }
        Err(e) => {
            warn!(error = %e, "Rate poll failed, keeping last known value");
            let mut guard = rate.write().expect("rate lock poisoned");
            guard.is_stale = true;
        }
    }
}
