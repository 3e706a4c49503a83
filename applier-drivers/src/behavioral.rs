use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
/// Produces randomized pauses and per-keystroke typing delays.
pub struct BehavioralEngine {
    typing_delay_ms: (u64, u64),
}

impl Default for BehavioralEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BehavioralEngine {
    pub fn new() -> Self {
        Self {
            typing_delay_ms: (30, 150),
        }
    }

    /// Bounds of the per-character delay; reversed bounds are swapped.
    pub fn with_typing_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.typing_delay_ms = (min_ms.min(max_ms), min_ms.max(max_ms));
        self
    }

    pub fn typing_delay(&self) -> (u64, u64) {
        self.typing_delay_ms
    }

    /// A duration drawn uniformly from `[min, max]` milliseconds.
    ///
    /// ```
    /// use applier_drivers::behavioral::BehavioralEngine;
    ///
    /// let d = BehavioralEngine::new().jitter(20, 40);
    /// assert!((20..=40).contains(&(d.as_millis() as u64)));
    /// ```
    pub fn jitter(&self, min: u64, max: u64) -> Duration {
        let (lo, hi) = (min.min(max), min.max(max));
        Duration::from_millis(OsRng.gen_range(lo..=hi))
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        sleep(self.jitter(min, max)).await;
    }

    pub async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            sleep(duration).await;
        }
    }

    /// One delay per character of `text`, in typing order.
    pub fn keystroke_delays(&self, text: &str) -> Vec<Duration> {
        let (lo, hi) = self.typing_delay_ms;
        text.chars().map(|_| self.jitter(lo, hi)).collect()
    }
}
