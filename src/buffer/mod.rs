//! Playout buffering between frame arrival and display.
//!
//! The [`JitterBuffer`] trades a bounded amount of latency for steady display:
//! frames are queued on arrival and released by a fixed-cadence drain tick
//! (16 ms by default), independent of how bursty the network delivery is.
//!
//! ```rust
//! use simview::buffer::JitterBuffer;
//! use simview::types::Frame;
//! use std::time::{Duration, Instant};
//!
//! let base = Instant::now();
//! let mut buffer = JitterBuffer::new(Duration::from_millis(100));
//! for i in 0..20u64 {
//!     buffer.push(Frame::new("payload", None, base + Duration::from_millis(i * 10)));
//! }
//!
//! // 190ms buffered: playback starts and the oldest frame is released
//! assert!(buffer.drain_tick().is_some());
//! assert!(!buffer.is_buffering());
//! ```

mod jitter;

pub use jitter::JitterBuffer;

/// Default drain cadence (~60 Hz)
pub const DEFAULT_DRAIN_INTERVAL: std::time::Duration = std::time::Duration::from_millis(16);
