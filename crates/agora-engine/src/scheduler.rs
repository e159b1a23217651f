use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use agora_types::Clock;

/// Concurrency guard for the tick body: an in-process mutex plus a
/// minimum-interval check. A trigger that arrives while the mutex is held
/// or before the interval has elapsed gets `None` (reported as a skipped
/// tick) instead of blocking.
///
/// Process-local by construction; running multiple service instances
/// would require promoting this to a distributed lock.
pub struct TickScheduler {
    inner: Arc<Mutex<()>>,
    last_run: RwLock<Option<DateTime<Utc>>>,
    min_interval: Duration,
    clock: Arc<dyn Clock>,
}

/// Held for the duration of one tick body; releases the mutex on drop.
pub struct TickPermit {
    _guard: OwnedMutexGuard<()>,
}

impl TickScheduler {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(())),
            last_run: RwLock::new(None),
            min_interval,
            clock,
        }
    }

    /// Try to begin a tick. `None` means another tick body is running or
    /// the rate limit has not elapsed.
    pub fn try_begin(&self) -> Option<TickPermit> {
        let guard = self.inner.clone().try_lock_owned().ok()?;

        let now = self.clock.now();
        let mut last_run = self.last_run.write().expect("scheduler lock poisoned");
        if let Some(last) = *last_run {
            if now - last < self.min_interval {
                return None;
            }
        }
        *last_run = Some(now);
        Some(TickPermit { _guard: guard })
    }
}
