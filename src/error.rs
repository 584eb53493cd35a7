//! Error types for the viewer pipeline.
//!
//! All errors implement `std::error::Error` and carry enough context to log a
//! useful line without a backtrace. Nothing in the pipeline escalates an error to
//! a fatal condition: malformed messages and corrupt frames are logged and skipped,
//! outbound calls made while disconnected return `false`.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: the socket could not be opened
//! - **Transport Errors**: the socket failed after it was open
//! - **Protocol Errors**: an inbound message was not valid JSON or lacked a field
//! - **Decode Errors**: an image payload was not valid base64 or not a known image
//! - **Surface Errors**: a display surface rejected a draw
//! - **Config Errors**: a configuration file could not be read or parsed
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use simview::ViewerError;
//!
//! let error = ViewerError::connection_failed("backend not listening");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for viewer operations.
pub type Result<T, E = ViewerError> = std::result::Result<T, E>;

/// Main error type for viewer operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ViewerError {
    #[error("Failed to connect to simulation backend: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Protocol error in {context}: {details}")]
    Protocol { context: String, details: String },

    #[error("Failed to decode frame for {surface}: {details}")]
    Decode { surface: String, details: String },

    #[error("Surface '{name}' rejected draw: {details}")]
    Surface { name: String, details: String },

    #[error("{operation} requires an open connection")]
    NotConnected { operation: String },

    #[error("Configuration error in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl ViewerError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// The pipeline itself never retries; this is guidance for the embedding
    /// application's reconnect policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            ViewerError::Connection { .. } => true,
            ViewerError::Transport { .. } => true,
            ViewerError::Timeout { .. } => true,
            ViewerError::NotConnected { .. } => true,
            ViewerError::Protocol { .. } => false,
            ViewerError::Decode { .. } => false,
            ViewerError::Surface { .. } => false,
            ViewerError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ViewerError::Connection { .. } => vec![
                "Ensure the simulation backend is running",
                "Check the configured host and port",
                "Use a secure connection if the backend requires TLS",
            ],
            ViewerError::Transport { .. } => vec![
                "Reconnect to the backend",
                "Check network stability between viewer and backend",
            ],
            ViewerError::Protocol { .. } => vec![
                "Verify backend and viewer protocol versions match",
                "Inspect the offending message in debug logs",
            ],
            ViewerError::Decode { .. } => vec![
                "Check the backend encodes frames as base64 JPEG",
                "Lower the stream resolution if payloads are truncated",
            ],
            ViewerError::Surface { .. } => vec![
                "Verify the surface has non-zero dimensions",
                "Recreate the display surface",
            ],
            ViewerError::NotConnected { .. } => vec![
                "Connect before sending control messages",
                "Wait for the connection handshake to complete",
            ],
            ViewerError::Config { .. } => vec![
                "Check the configuration file exists and is readable",
                "Validate the YAML syntax and field names",
            ],
            ViewerError::Timeout { .. } => vec![
                "Increase the connect timeout",
                "Verify the backend is responding",
            ],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        ViewerError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ViewerError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ViewerError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for malformed inbound messages.
    pub fn protocol(context: impl Into<String>, details: impl Into<String>) -> Self {
        ViewerError::Protocol { context: context.into(), details: details.into() }
    }

    /// Helper constructor for decode failures.
    pub fn decode(surface: impl Into<String>, details: impl Into<String>) -> Self {
        ViewerError::Decode { surface: surface.into(), details: details.into() }
    }

    /// Helper constructor for surface draw failures.
    pub fn surface(name: impl Into<String>, details: impl Into<String>) -> Self {
        ViewerError::Surface { name: name.into(), details: details.into() }
    }

    /// Helper constructor for operations attempted without an open socket.
    pub fn not_connected(operation: impl Into<String>) -> Self {
        ViewerError::NotConnected { operation: operation.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        ViewerError::Config { path: path.into(), details: details.into() }
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::Protocol { context: "JSON message".to_string(), details: err.to_string() }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ViewerError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ViewerError::Transport { reason: "WebSocket error".to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_format_correctly_with_arbitrary_context(
            reason in ".*",
            context in "\\w+",
            details in ".*",
            surface in "main|secondary",
            duration_ms in 1u64..60000u64
          ) {
            let connection_error = ViewerError::connection_failed(reason.clone());
            let protocol_error = ViewerError::protocol(context.clone(), details.clone());
            let decode_error = ViewerError::decode(surface.clone(), details.clone());
            let timeout_error = ViewerError::Timeout { duration: Duration::from_millis(duration_ms) };

            prop_assert!(connection_error.to_string().contains(&reason));
            prop_assert!(protocol_error.to_string().contains(&context));
            prop_assert!(protocol_error.to_string().contains(&details));
            prop_assert!(decode_error.to_string().contains(&surface));
            prop_assert!(!timeout_error.to_string().is_empty());
          }

          #[test]
          fn error_source_chaining_preserves_information(
            base_message in ".*",
            reasons in prop::collection::vec(".*", 1..5)
          ) {
            let mut current: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            for reason in &reasons {
              current = Box::new(ViewerError::transport(reason.clone(), current));
            }
            let top = ViewerError::connection_failed_with_source("Top level", current);

            let mut depth = 0;
            let mut found_base = false;
            let mut cursor = std::error::Error::source(&top);
            while let Some(source) = cursor {
              depth += 1;
              if source.to_string().contains(&base_message) {
                found_base = true;
              }
              cursor = std::error::Error::source(source);
              if depth > 10 {
                break;
              }
            }

            prop_assert_eq!(depth, reasons.len() + 1);
            prop_assert!(found_base);
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<ViewerError>();

        let error = ViewerError::not_connected("send_command");
        let _: &dyn std::error::Error = &error;
        assert!(error.to_string().contains("send_command"));
    }

    #[test]
    fn retry_classification() {
        assert!(ViewerError::connection_failed("refused").is_retryable());
        assert!(ViewerError::not_connected("zoom").is_retryable());
        assert!(!ViewerError::decode("main", "bad base64").is_retryable());
        assert!(!ViewerError::protocol("inbound", "missing type").is_retryable());

        for suggestion in ViewerError::decode("main", "x").recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn json_errors_become_protocol_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let converted: ViewerError = err.into();
        assert!(matches!(converted, ViewerError::Protocol { .. }));
    }
}
