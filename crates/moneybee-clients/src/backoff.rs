//! Exponential backoff between retry attempts

use std::time::Duration;
use tokio::time;

/// A simple back-off strategy for retrying an operation a bounded number
/// of times with an increasing delay between attempts.
pub struct BackOff {
    max_attempts: u32,
    current_attempts: u32,
    delay: Duration,
    factor: f64,
}

impl BackOff {
    /// # Parameters
    /// * `max_attempts`: total number of attempts to allow
    /// * `delay`: wait after the first attempt
    /// * `factor`: multiplier applied to the delay after each wait
    pub fn new(max_attempts: u32, delay: Duration, factor: f64) -> Self {
        Self {
            max_attempts,
            current_attempts: 0,
            delay,
            factor,
        }
    }

    /// Whether the attempt budget is spent
    pub fn is_finished(&self) -> bool {
        self.current_attempts >= self.max_attempts
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        self.current_attempts
    }

    /// Sleep for the current delay and advance the schedule
    pub async fn wait(&mut self) {
        time::sleep(self.delay).await;
        self.current_attempts += 1;
        self.delay = self.delay.mul_f64(self.factor);
    }
}
