/// Repeating send timer driven by frame deltas.
///
/// Fires at most once per frame; a long frame does not produce a burst of
/// catch-up samples.
#[derive(Debug, Clone)]
pub struct SendTimer {
    interval: f32,
    accumulator: f32,
    running: bool,
}

impl SendTimer {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulator: 0.0,
            running: true,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
        self.accumulator = 0.0;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator = 0.0;
    }

    /// Advances the timer and reports whether a sample is due this frame.
    pub fn advance(&mut self, delta: f32) -> bool {
        if !self.running || self.interval <= 0.0 {
            return false;
        }

        self.accumulator += delta.max(0.0);
        if self.accumulator < self.interval {
            return false;
        }

        self.accumulator = (self.accumulator - self.interval) % self.interval;
        true
    }
}
