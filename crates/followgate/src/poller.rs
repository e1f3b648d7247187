use crate::popup::PopupHandle;
use std::time::{Duration, Instant};

/// Samples one popup handle on a fixed interval until it reads as closed.
///
/// The owner drops the poller on the first closed sample, or when the
/// generation it belongs to ends; dropping it is what stops sampling.
pub struct ClosurePoller {
    generation: u64,
    handle: Box<dyn PopupHandle>,
    interval: Duration,
    next_sample: Instant,
}

impl ClosurePoller {
    pub fn start(
        generation: u64,
        handle: Box<dyn PopupHandle>,
        interval: Duration,
        now: Instant,
    ) -> Self {
        Self {
            generation,
            handle,
            interval,
            next_sample: now + interval,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_sample
    }

    /// Sample if the interval has elapsed. Returns true once the popup is closed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_sample {
            return false;
        }
        self.sample(now)
    }

    /// Sample immediately, regardless of schedule.
    pub fn sample(&mut self, now: Instant) -> bool {
        let closed = self.handle.is_closed();
        if !closed {
            self.next_sample = now + self.interval;
        }
        closed
    }
}
