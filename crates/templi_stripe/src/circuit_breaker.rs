// --- File: crates/templi_stripe/src/circuit_breaker.rs ---
//! Consecutive-failure circuit breaker around Stripe calls.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use templi_config::CircuitBreakerSettings;
use tracing::{info, warn};

use crate::error::StripeError;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast without reaching Stripe.
    Open,
    /// The open period elapsed; one trial call may go through.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    /// Unix millis when the circuit opened, 0 while closed.
    opened_at_ms: AtomicI64,
    trial_in_flight: AtomicBool,
    settings: CircuitBreakerSettings,
}

impl CircuitBreaker {
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            opened_at_ms: AtomicI64::new(0),
            trial_in_flight: AtomicBool::new(false),
            settings,
        }
    }

    pub fn state(&self) -> CircuitState {
        if !self.settings.enabled {
            return CircuitState::Closed;
        }

        let opened_at = self.opened_at_ms.load(Ordering::Acquire);
        if opened_at == 0 {
            return CircuitState::Closed;
        }

        let elapsed_ms = Utc::now().timestamp_millis().saturating_sub(opened_at);
        let open_ms = i64::try_from(self.settings.open_duration_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        if elapsed_ms >= open_ms {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    /// Returns `Err(StripeError::CircuitOpen)` when the call must not go out.
    ///
    /// In the half-open state only one caller gets a permit; it holds the
    /// trial slot until the permit is settled or dropped.
    pub fn check(&self) -> Result<CallPermit<'_>, StripeError> {
        let trial = match self.state() {
            CircuitState::Closed => false,
            CircuitState::Open => return Err(StripeError::CircuitOpen),
            CircuitState::HalfOpen => {
                self.trial_in_flight
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .map_err(|_| StripeError::CircuitOpen)?;
                true
            }
        };
        Ok(CallPermit {
            breaker: self,
            trial,
            settled: false,
        })
    }

    fn record_success(&self) {
        if !self.settings.enabled {
            return;
        }
        if self.opened_at_ms.swap(0, Ordering::AcqRel) != 0 {
            info!("[Stripe Circuit] Provider call succeeded, closing circuit");
        }
        self.failure_count.store(0, Ordering::Release);
        self.trial_in_flight.store(false, Ordering::Release);
    }

    fn record_failure(&self) {
        if !self.settings.enabled {
            return;
        }

        let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.settings.failure_threshold {
            self.opened_at_ms
                .store(Utc::now().timestamp_millis(), Ordering::Release);
            self.trial_in_flight.store(false, Ordering::Release);
            warn!(
                failures = failures,
                threshold = self.settings.failure_threshold,
                "[Stripe Circuit] Circuit opened after consecutive provider failures"
            );
        }
    }

    /// A trial ended without an outcome: stay open for another period, then allow a new trial.
    fn abandon_trial(&self) {
        self.opened_at_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
        self.trial_in_flight.store(false, Ordering::Release);
        warn!("[Stripe Circuit] Half-open trial call was abandoned, circuit stays open");
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Acquire)
    }
}

/// Permission for one provider call, returned by [`CircuitBreaker::check`].
///
/// Settle it with [`CallPermit::success`] or [`CallPermit::failure`]. Dropping
/// it unsettled (the call future was cancelled) gives the trial slot back.
#[must_use = "settle the permit with success() or failure()"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl CallPermit<'_> {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.abandon_trial();
        }
    }
}
