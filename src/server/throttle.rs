// Outbound call throttle: token bucket per destination number
//
// Every placed call costs money on the platform, so repeated requests for the
// same number are capped regardless of which client sends them.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Shared throttle state; clone freely (it's an Arc inside)
#[derive(Clone)]
pub struct CallThrottle {
    inner: Arc<CallThrottleInner>,
}

struct CallThrottleInner {
    /// Buckets keyed by destination number
    buckets: DashMap<String, Bucket>,
    /// Calls allowed back-to-back
    capacity: f64,
    /// Calls earned back per second
    refill_rate: f64,
}

impl CallThrottle {
    /// `burst` calls immediately, then one more every `refill_every`
    pub fn new(burst: u32, refill_every: Duration) -> Self {
        let refill_rate = if refill_every.is_zero() {
            f64::INFINITY
        } else {
            1.0 / refill_every.as_secs_f64()
        };
        Self {
            inner: Arc::new(CallThrottleInner {
                buckets: DashMap::new(),
                capacity: f64::from(burst),
                refill_rate,
            }),
        }
    }

    /// Returns true and consumes one token if a call to `number` is allowed
    pub fn check(&self, number: &str) -> bool {
        self.check_at(number, Instant::now())
    }

    fn check_at(&self, number: &str, now: Instant) -> bool {
        let mut bucket = self
            .inner
            .buckets
            .entry(number.to_string())
            .or_insert_with(|| Bucket {
                tokens: self.inner.capacity,
                last_refill: now,
            });

        bucket.tokens = if self.inner.refill_rate.is_infinite() {
            self.inner.capacity
        } else {
            let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
            (bucket.tokens + elapsed * self.inner.refill_rate).min(self.inner.capacity)
        };
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets idle for longer than `idle`
    pub fn purge_idle(&self, idle: Duration) {
        let now = Instant::now();
        self.inner
            .buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < idle);
    }

    /// Number of destinations currently tracked
    pub fn tracked_numbers(&self) -> usize {
        self.inner.buckets.len()
    }
}
