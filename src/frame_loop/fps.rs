//! Rolling FPS estimate
//!
//! Diagnostics only: nothing in the loop's timing reads this value.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct FpsCounter {
    samples: VecDeque<f64>,
    window: usize,
    refresh_interval: f64,
    last_refresh: Option<f64>,
    current: f64,
}

impl FpsCounter {
    pub fn new(window: usize, refresh_interval: f64) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            refresh_interval,
            last_refresh: None,
            current: 0.0,
        }
    }

    /// Add one frame's delta (ms); republish the average at most once per
    /// refresh interval
    pub fn record(&mut self, delta: f64, now: f64) {
        if delta > 0.0 {
            if self.samples.len() == self.window {
                self.samples.pop_front();
            }
            self.samples.push_back(1000.0 / delta);
        }

        let since = *self.last_refresh.get_or_insert(now);
        if now - since >= self.refresh_interval {
            self.current = self.average();
            self.last_refresh = Some(now);
        }
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        }
    }

    /// Last published estimate (0 until the first refresh)
    pub fn fps(&self) -> f64 {
        self.current
    }

    /// Instantaneous FPS samples in the window, oldest first
    pub fn history(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_refresh = None;
        self.current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refreshes_on_interval_only() {
        let mut fps = FpsCounter::new(60, 500.0);
        let mut now = 0.0;
        for _ in 0..30 {
            now += 16.0;
            fps.record(16.0, now);
        }
        // 464ms since the first sample
        assert_eq!(fps.fps(), 0.0);
        for _ in 0..3 {
            now += 16.0;
            fps.record(16.0, now);
        }
        assert!((fps.fps() - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut fps = FpsCounter::new(4, 1.0);
        for i in 0..10 {
            fps.record(10.0 + i as f64, i as f64 * 10.0);
        }
        let history = fps.history();
        assert_eq!(history.len(), 4);
        assert!((history[0] - 1000.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_delta_is_not_sampled() {
        let mut fps = FpsCounter::new(4, 1.0);
        fps.record(0.0, 0.0);
        assert!(fps.history().is_empty());
        fps.reset();
        assert_eq!(fps.fps(), 0.0);
    }
}
