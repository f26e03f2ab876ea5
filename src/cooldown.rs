// cooldown.rs - Global Request Cooldown
// A single shared timestamp gating how often the search command may hit the API.
// Best-effort throttling only: concurrent callers race, last writer wins.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Cooldown {
    period: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_request: Mutex::new(None),
        }
    }

    /// Accept the request and stamp `now`, or return the time left to wait.
    /// The timestamp is updated before the request runs so bursts are rejected early.
    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = *last {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < self.period {
                return Err(self.period - elapsed);
            }
        }

        *last = Some(now);
        Ok(())
    }

    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }
}
