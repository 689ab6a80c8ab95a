//! Per-backend admission control.
//!
//! Each backend gets a gate bounding concurrent in-flight calls (semaphore)
//! and requests per interval (GCRA token bucket via `governor`). Both are
//! updated atomically, so gates are shared freely across concurrent calls.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use crate::domain::models::{BackendId, BackendProfile};
use crate::domain::ports::ProviderError;

/// Concurrency and throughput gate for one backend.
pub struct AdmissionGate {
    backend: BackendId,
    permits: Semaphore,
    limiter: DefaultDirectRateLimiter,
    in_flight: AtomicUsize,
    max_concurrent: usize,
}

impl AdmissionGate {
    /// Create a gate admitting at most `max_concurrent` calls at once and
    /// `requests_per_interval` calls per `interval` (with that many as burst).
    pub fn new(
        backend: BackendId,
        max_concurrent: usize,
        requests_per_interval: u32,
        interval: Duration,
    ) -> Self {
        let burst = NonZeroU32::new(requests_per_interval).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(interval / burst.get())
            .map_or_else(|| Quota::per_second(burst), |quota| quota.allow_burst(burst));
        let max_concurrent = max_concurrent.max(1);

        Self {
            backend,
            permits: Semaphore::new(max_concurrent),
            limiter: RateLimiter::direct(quota),
            in_flight: AtomicUsize::new(0),
            max_concurrent,
        }
    }

    /// Gate sized from a catalog profile.
    pub fn from_profile(profile: &BackendProfile) -> Self {
        Self::new(
            profile.id.clone(),
            profile.max_concurrent,
            profile.requests_per_interval,
            Duration::from_secs(profile.interval_secs),
        )
    }

    /// Wait for a concurrency slot, then for rate-limit capacity.
    ///
    /// The slot is held until the returned permit is dropped.
    pub async fn admit(&self) -> Result<AdmissionPermit<'_>, ProviderError> {
        let permit = self.permits.acquire().await.map_err(|_| {
            ProviderError::Transport(format!("admission gate for {} is closed", self.backend))
        })?;

        self.limiter.until_ready().await;

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(backend = %self.backend, in_flight, "call admitted");

        Ok(AdmissionPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Concurrency limit.
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Backend this gate guards.
    pub const fn backend(&self) -> &BackendId {
        &self.backend
    }
}

/// Slot held for the duration of one call.
pub struct AdmissionPermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
