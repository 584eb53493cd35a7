//! Adaptive jitter buffer

use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::Frame;

/// Time-ordered queue of pending frames with fill/drain hysteresis.
///
/// Frames are released one per [`drain_tick`](Self::drain_tick) while more than
/// `target` worth of frames (measured by arrival time) is queued. Playback starts
/// once the buffered span reaches `target` and re-buffers when it falls below
/// `target / 2` with more than one frame queued.
///
/// A `target` of zero selects immediate mode: [`push`](Self::push) hands every
/// frame straight back for rendering and only the latest frame is retained.
#[derive(Debug)]
pub struct JitterBuffer {
    queue: VecDeque<Frame>,
    target: Duration,
    is_buffering: bool,
    max_buffered: Option<Duration>,
    evicted: u64,
}

impl JitterBuffer {
    /// Create an empty buffer in the buffering state
    pub fn new(target: Duration) -> Self {
        Self { queue: VecDeque::new(), target, is_buffering: true, max_buffered: None, evicted: 0 }
    }

    /// Cap the buffered span; oldest frames are evicted once it is exceeded.
    ///
    /// `None` keeps the queue unbounded. A ceiling that would prevent playback
    /// from ever starting (at or below `target`) is raised to twice the target.
    pub fn with_max_buffered(mut self, max_buffered: Option<Duration>) -> Self {
        self.max_buffered = max_buffered.map(|ceiling| {
            if !self.is_immediate() && ceiling <= self.target {
                let raised = self.target.saturating_mul(2);
                warn!(
                    "Buffer ceiling {:?} is not above target {:?}; using {:?}",
                    ceiling, self.target, raised
                );
                raised
            } else {
                ceiling
            }
        });
        self
    }

    /// Accept a newly arrived frame.
    ///
    /// Returns the frame to render right away in immediate mode, `None` otherwise.
    /// A frame stamped earlier than the queue tail is restamped with the tail's
    /// arrival time so the queue stays ordered.
    pub fn push(&mut self, mut frame: Frame) -> Option<Frame> {
        if self.is_immediate() {
            self.queue.clear();
            self.queue.push_back(frame.clone());
            return Some(frame);
        }

        if let Some(tail) = self.queue.back().map(|newest| newest.arrived_at) {
            if frame.arrived_at < tail {
                debug!("Frame arrived with an earlier timestamp than the queue tail; clamping");
                frame.arrived_at = tail;
            }
        }
        self.queue.push_back(frame);
        self.enforce_ceiling();
        None
    }

    /// One drain step; returns at most one frame to render.
    pub fn drain_tick(&mut self) -> Option<Frame> {
        if self.is_immediate() || self.queue.is_empty() {
            return None;
        }

        let buffered = self.buffered_duration();

        if self.is_buffering {
            if buffered >= self.target {
                info!(
                    "Buffer filled with {} frames ({:.1}s). Starting playback.",
                    self.queue.len(),
                    buffered.as_secs_f64()
                );
                self.is_buffering = false;
            } else {
                return None;
            }
        }

        let released = if buffered > self.target { self.queue.pop_front() } else { None };

        if buffered < self.target / 2 && self.queue.len() > 1 {
            info!(
                "Buffer too small: {:.1}s < {:.1}s. Rebuffering...",
                buffered.as_secs_f64(),
                (self.target / 2).as_secs_f64()
            );
            self.is_buffering = true;
        }

        released
    }

    /// Span between the oldest and newest queued frame
    pub fn buffered_duration(&self) -> Duration {
        match (self.queue.front(), self.queue.back()) {
            (Some(oldest), Some(newest)) => {
                newest.arrived_at.saturating_duration_since(oldest.arrived_at)
            }
            _ => Duration::ZERO,
        }
    }

    /// Drop every queued frame and return to the buffering state
    pub fn reset(&mut self) {
        if !self.queue.is_empty() {
            debug!("Clearing {} buffered frames", self.queue.len());
        }
        self.queue.clear();
        self.is_buffering = true;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_buffering(&self) -> bool {
        self.is_buffering
    }

    pub fn is_immediate(&self) -> bool {
        self.target.is_zero()
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    pub fn max_buffered(&self) -> Option<Duration> {
        self.max_buffered
    }

    /// Frames discarded by the ceiling since creation
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    fn enforce_ceiling(&mut self) {
        let Some(ceiling) = self.max_buffered else {
            return;
        };
        while self.queue.len() > 1 && self.buffered_duration() > ceiling {
            self.queue.pop_front();
            self.evicted += 1;
            warn!(
                "Buffered span exceeded {:.1}s, evicted oldest frame ({} total)",
                ceiling.as_secs_f64(),
                self.evicted
            );
        }
    }
}
