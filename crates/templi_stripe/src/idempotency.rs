// --- File: crates/templi_stripe/src/idempotency.rs ---
//! Bounded memory of webhook event ids that were already dispatched.
//!
//! Stripe delivers at least once. Without this, a redelivery after a slow
//! acknowledgment would run the event handlers a second time.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use templi_config::WebhookConfig;

#[derive(Debug)]
pub struct ProcessedEvents {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<Seen>,
}

#[derive(Debug, Default)]
struct Seen {
    by_id: HashMap<String, Instant>,
    // Insertion order; with a fixed TTL this is also expiry order.
    order: VecDeque<(String, Instant)>,
}

impl ProcessedEvents {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(Seen::default()),
        }
    }

    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(
            Duration::from_secs(config.dedup_ttl_secs),
            config.dedup_capacity,
        )
    }

    /// Records `event_id` and returns `true` if it had not been seen within the TTL.
    ///
    /// Check and insert happen under one lock, so two concurrent deliveries of the
    /// same event cannot both get `true`.
    pub fn check_and_record(&self, event_id: &str) -> bool {
        self.check_and_record_at(event_id, Instant::now())
    }

    fn check_and_record_at(&self, event_id: &str, now: Instant) -> bool {
        let mut seen = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.purge_expired(now, self.ttl);

        if seen.by_id.contains_key(event_id) {
            return false;
        }

        while seen.by_id.len() >= self.capacity {
            match seen.order.pop_front() {
                Some((oldest, _)) => {
                    seen.by_id.remove(&oldest);
                }
                None => break,
            }
        }

        seen.by_id.insert(event_id.to_string(), now);
        seen.order.push_back((event_id.to_string(), now));
        true
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Seen {
    fn purge_expired(&mut self, now: Instant, ttl: Duration) {
        while let Some((id, recorded_at)) = self.order.front() {
            if now.saturating_duration_since(*recorded_at) < ttl {
                break;
            }
            self.by_id.remove(id);
            self.order.pop_front();
        }
    }
}
