//! Fixed-capacity sample window

use std::collections::VecDeque;

/// Default number of samples kept per window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 30;

/// FIFO of the most recent numeric samples, used for averaging.
///
/// Pushing into a full window evicts the oldest sample, so `len() <= capacity()`
/// always holds.
#[derive(Debug, Clone)]
pub struct TelemetryWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl Default for TelemetryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl TelemetryWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    /// Push a sample, evicting the oldest once at capacity.
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Arithmetic mean of the retained samples.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Mean rounded to one decimal place, 0.0 when empty.
    pub fn rounded_mean(&self) -> f64 {
        self.mean().map(round_tenths).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

pub(crate) fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keeps_the_most_recent_thirty_of_one_hundred() {
        let mut window = TelemetryWindow::new(30);
        for i in 0..100 {
            window.push(i as f64);
        }

        assert_eq!(window.len(), 30);
        let retained: Vec<f64> = window.samples().collect();
        let expected: Vec<f64> = (70..100).map(|i| i as f64).collect();
        assert_eq!(retained, expected);

        let expected_mean = expected.iter().sum::<f64>() / 30.0;
        assert_eq!(window.mean(), Some(expected_mean));
    }

    #[test]
    fn empty_window_reports_zero() {
        let window = TelemetryWindow::default();
        assert_eq!(window.mean(), None);
        assert_eq!(window.rounded_mean(), 0.0);
        assert_eq!(window.capacity(), DEFAULT_WINDOW_CAPACITY);
    }

    #[test]
    fn rounds_to_one_decimal() {
        let mut window = TelemetryWindow::new(3);
        window.push(16.66);
        window.push(16.68);
        assert_eq!(window.rounded_mean(), 16.7);
    }

    proptest! {
        #[test]
        fn window_never_exceeds_capacity(
            capacity in 1usize..64,
            samples in prop::collection::vec(0.0f64..1000.0, 0..200)
        ) {
            let mut window = TelemetryWindow::new(capacity);
            for sample in &samples {
                window.push(*sample);
                prop_assert!(window.len() <= capacity);
            }

            let tail: Vec<f64> = samples.iter().rev().take(capacity).rev().copied().collect();
            prop_assert_eq!(window.samples().collect::<Vec<_>>(), tail);
        }
    }
}
