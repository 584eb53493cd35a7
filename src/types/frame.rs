//! Frame types flowing through the delivery pipeline

use std::sync::Arc;
use std::time::Instant;

/// One pair of encoded views received in a `streaming_view` message.
///
/// Payloads are kept as the base64 text they arrived in; decoding happens only
/// when the frame is handed to the renderer. Cloning is cheap (the payloads are
/// shared), which lets the immediate mode keep a copy for inspection while the
/// renderer owns the original.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Base64-encoded image for the main view
    pub main_payload: Arc<str>,

    /// Base64-encoded image for the secondary ("god") view, when sent
    pub secondary_payload: Option<Arc<str>>,

    /// Monotonic arrival time, used for buffering decisions
    pub arrived_at: Instant,
}

impl Frame {
    /// Create a new frame stamped with the given arrival time
    pub fn new(
        main_payload: impl Into<Arc<str>>,
        secondary_payload: Option<Arc<str>>,
        arrived_at: Instant,
    ) -> Self {
        Self { main_payload: main_payload.into(), secondary_payload, arrived_at }
    }

    /// Approximate size of the encoded payloads in bytes
    pub fn encoded_len(&self) -> usize {
        self.main_payload.len() + self.secondary_payload.as_ref().map_or(0, |p| p.len())
    }
}
