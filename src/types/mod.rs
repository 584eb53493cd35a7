//! Core types shared across the pipeline.
//!
//! - [`Frame`] is one received pair of encoded views with its arrival time
//! - [`ConnectionStatus`] is the socket lifecycle state
//! - [`ViewTarget`] and [`ZoomDirection`] parameterize control messages
//! - [`UpdateRate`] controls how often observer streams emit
//!
//! ## Usage Example
//!
//! ```rust
//! use simview::types::{Frame, ConnectionStatus};
//! use std::time::Instant;
//!
//! let frame = Frame::new("/9j/4AAQ", None, Instant::now());
//! assert_eq!(frame.encoded_len(), 8);
//! assert!(!ConnectionStatus::Connecting.is_connected());
//! ```

mod frame;
mod status;
mod update_rate;
mod view;

pub use frame::Frame;
pub use status::ConnectionStatus;
pub use update_rate::UpdateRate;
pub use view::{ViewTarget, ZoomDirection};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn frame_clones_share_payloads() {
        let frame = Frame::new("abcd", Some(Arc::from("efgh")), Instant::now());
        let copy = frame.clone();

        assert!(Arc::ptr_eq(&frame.main_payload, &copy.main_payload));
        assert_eq!(copy.encoded_len(), 8);
    }

    #[test]
    fn only_connected_counts_as_connected() {
        assert!(ConnectionStatus::Connected.is_connected());
        for status in
            [ConnectionStatus::Disconnected, ConnectionStatus::Connecting, ConnectionStatus::Errored]
        {
            assert!(!status.is_connected());
        }
        assert_eq!(ConnectionStatus::Errored.to_string(), "Error");
    }

    #[test]
    fn view_and_zoom_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ViewTarget::Secondary).unwrap(), "\"secondary\"");
        assert_eq!(serde_json::to_string(&ZoomDirection::In).unwrap(), "\"in\"");
        assert_eq!(ZoomDirection::from_wheel_delta(-3.0), ZoomDirection::In);
        assert_eq!(ZoomDirection::from_wheel_delta(3.0), ZoomDirection::Out);
    }
}
