use std::time::{Duration, Instant};

// Debounces particle count changes. A request only takes effect once no
// further request has arrived for the quiet period; each new request replaces
// the pending count and restarts the wait.
#[derive(Debug)]
pub struct ResizeController {
    pending: Option<(usize, Instant)>,
    quiet_period: Duration,
    // Count of the last request seen, or of the last applied resize.
    requested: usize,
}

impl ResizeController {
    pub fn new(quiet_period: Duration, initial_count: usize) -> Self {
        ResizeController {
            pending: None,
            quiet_period,
            requested: initial_count,
        }
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    // Polled once per frame with the configured count. Only a change since
    // the last request or applied resize becomes a new request.
    pub fn sync(&mut self, requested: usize, current_count: usize, now: Instant) {
        if requested != self.requested {
            self.requested = requested;
            self.request(requested, current_count, now);
        }
    }

    // Records a resize applied outside the debounce, dropping anything pending.
    pub fn applied(&mut self, count: usize) {
        self.requested = count;
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_quiet_period(&mut self, quiet_period: Duration) {
        self.quiet_period = quiet_period;
    }

    // Requests for the current count are dropped while nothing is pending.
    pub fn request(&mut self, count: usize, current_count: usize, now: Instant) {
        if self.pending.is_none() && count == current_count {
            return;
        }
        log::debug!("Resize to {} particles requested", count);
        self.pending = Some((count, now));
    }

    // Returns the count to apply once the quiet period has passed, and goes
    // back to stable.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        match self.pending {
            Some((count, requested_at))
                if now.saturating_duration_since(requested_at) >= self.quiet_period =>
            {
                self.pending = None;
                Some(count)
            }
            _ => None,
        }
    }
}
