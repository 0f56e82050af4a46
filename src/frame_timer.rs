use std::time::{Duration, Instant};

// Paces a frame loop to a target rate and keeps a running average of the
// measured frame time.
#[derive(Debug)]
pub struct FrameTimer {
    iteration_start: Instant,
    pub iteration_duration: Duration,
    frames: u32,
    total: Duration,
}

static NATIVE_SLEEP_ACCURACY: Duration = Duration::from_micros(500);

impl FrameTimer {
    // A non-positive rate disables pacing.
    pub fn new(fps: f64) -> FrameTimer {
        let iteration_duration = if fps > 0.0 {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::ZERO
        };
        FrameTimer {
            iteration_start: Instant::now(),
            iteration_duration,
            frames: 0,
            total: Duration::ZERO,
        }
    }

    fn sleep_until(done: Instant) {
        let now = Instant::now();
        let system_sleep_until = done.checked_sub(NATIVE_SLEEP_ACCURACY).unwrap_or(now);
        if now < system_sleep_until {
            std::thread::sleep(system_sleep_until.duration_since(now));
        }
    }

    // Ends the current frame and returns its duration.
    pub fn tick(&mut self) -> Duration {
        let deadline = self.iteration_start + self.iteration_duration;
        FrameTimer::sleep_until(deadline);
        let now = Instant::now();
        if self.iteration_duration > Duration::ZERO && now > deadline {
            log::debug!("Over frame budget by: {:?}", now - deadline);
        }
        let delta_t = now - self.iteration_start;
        self.record(delta_t);
        self.iteration_start = now;
        delta_t
    }

    fn record(&mut self, delta_t: Duration) {
        self.frames += 1;
        self.total += delta_t;
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn average(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total / self.frames
        }
    }
}
