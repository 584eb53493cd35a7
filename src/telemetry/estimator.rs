//! FPS and latency estimation from render timestamps

use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::window::{DEFAULT_WINDOW_CAPACITY, TelemetryWindow};

/// Point-in-time telemetry values, already rounded for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Mean of recent instantaneous frame rates
    pub fps: f64,

    /// Mean decode+draw time in milliseconds
    pub latency_ms: f64,

    /// Frames rendered since the last reset
    pub frame_count: u64,
}

/// Sliding-window FPS and latency estimator.
///
/// FPS uses the interval method: every rendered frame after the first yields
/// `1000 / (started - previous_started)` in milliseconds, and the reported value
/// is the mean over the window. This is smoother than counting frames inside a
/// fixed time span, at the cost of reacting more slowly to rate changes.
///
/// Latency is `finished - started` for each render. It measures client-side
/// decode and draw cost only, not network round-trip time.
#[derive(Debug, Clone)]
pub struct TelemetryEstimator {
    fps: TelemetryWindow,
    latency: TelemetryWindow,
    last_started: Option<Instant>,
    frame_count: u64,
}

impl Default for TelemetryEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl TelemetryEstimator {
    pub fn new(window_capacity: usize) -> Self {
        Self {
            fps: TelemetryWindow::new(window_capacity),
            latency: TelemetryWindow::new(window_capacity),
            last_started: None,
            frame_count: 0,
        }
    }

    /// Record one completed render.
    pub fn record_render(&mut self, started: Instant, finished: Instant) {
        self.frame_count += 1;

        // Overlapping decodes can complete out of order; only a later start
        // yields a sample and moves the reference point
        match self.last_started {
            Some(previous) if started <= previous => {}
            Some(previous) => {
                let interval_ms = (started - previous).as_secs_f64() * 1000.0;
                self.fps.push(1000.0 / interval_ms);
                self.last_started = Some(started);
            }
            None => self.last_started = Some(started),
        }

        let latency_ms = finished.saturating_duration_since(started).as_secs_f64() * 1000.0;
        self.latency.push(latency_ms);
    }

    pub fn fps(&self) -> f64 {
        self.fps.rounded_mean()
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.rounded_mean()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fps_window(&self) -> &TelemetryWindow {
        &self.fps
    }

    pub fn latency_window(&self) -> &TelemetryWindow {
        &self.latency
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            fps: self.fps(),
            latency_ms: self.latency_ms(),
            frame_count: self.frame_count,
        }
    }

    /// Drop all samples and forget the previous frame time.
    pub fn reset(&mut self) {
        self.fps.clear();
        self.latency.clear();
        self.last_started = None;
        self.frame_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_frame_contributes_latency_but_no_fps() {
        let mut estimator = TelemetryEstimator::default();
        let start = Instant::now();

        estimator.record_render(start, start + Duration::from_millis(4));

        assert!(estimator.fps_window().is_empty());
        assert_eq!(estimator.latency_window().len(), 1);
        assert_eq!(estimator.fps(), 0.0);
        assert_eq!(estimator.latency_ms(), 4.0);
        assert_eq!(estimator.frame_count(), 1);
    }

    #[test]
    fn steady_twenty_ms_cadence_reads_fifty_fps() {
        let mut estimator = TelemetryEstimator::default();
        let base = Instant::now();

        for i in 0..10u64 {
            let started = base + Duration::from_millis(20 * i);
            estimator.record_render(started, started + Duration::from_millis(2));
        }

        assert_eq!(estimator.fps_window().len(), 9);
        assert_eq!(estimator.fps(), 50.0);
        assert_eq!(estimator.latency_ms(), 2.0);
    }

    #[test]
    fn identical_start_times_are_not_sampled() {
        let mut estimator = TelemetryEstimator::default();
        let start = Instant::now();

        estimator.record_render(start, start);
        estimator.record_render(start, start);

        assert!(estimator.fps_window().is_empty());
        assert_eq!(estimator.latency_window().len(), 2);
    }

    #[test]
    fn out_of_order_completion_keeps_the_cadence() {
        let mut estimator = TelemetryEstimator::default();
        let base = Instant::now();

        // 16 ms cadence; the third frame finishes after the fourth
        for ms in [0u64, 32, 16, 48] {
            let started = base + Duration::from_millis(ms);
            estimator.record_render(started, started + Duration::from_millis(1));
        }

        let samples: Vec<f64> = estimator.fps_window().samples().collect();
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 31.25).abs() < 1e-6);
        assert!((samples[1] - 62.5).abs() < 1e-6);
        assert_eq!(estimator.frame_count(), 4);
        assert_eq!(estimator.latency_window().len(), 4);
    }

    #[test]
    fn reset_forgets_previous_frame() {
        let mut estimator = TelemetryEstimator::default();
        let base = Instant::now();
        estimator.record_render(base, base);
        estimator.record_render(base + Duration::from_millis(10), base + Duration::from_millis(10));
        assert_eq!(estimator.fps_window().len(), 1);

        estimator.reset();
        assert_eq!(estimator.snapshot(), TelemetrySnapshot::default());

        // First frame after reset is again skipped for FPS
        estimator.record_render(base + Duration::from_secs(5), base + Duration::from_secs(5));
        assert!(estimator.fps_window().is_empty());
    }
}
