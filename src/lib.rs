//! Frame delivery pipeline for remote robot-simulation viewers.
//!
//! simview connects to a simulation backend over a single WebSocket, receives
//! base64 JPEG frames alongside control and reasoning messages, smooths playback
//! through an adaptive jitter buffer and draws frames onto host-provided
//! surfaces while tracking render FPS and latency.
//!
//! # Features
//!
//! - **Jitter buffering**: fill/drain hysteresis around a target buffered span,
//!   or immediate mode with no added latency
//! - **Off-thread decoding**: both views decode concurrently on the blocking pool
//! - **Observable state**: session and telemetry snapshots as watch-backed streams
//! - **Sans-io core**: the session state machine is testable without a socket
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use simview::{FrameSurface, SurfaceSet, UpdateRate, ViewerConfig, ViewerConnection};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> simview::Result<()> {
//!     let config = ViewerConfig::default().with_env_overrides();
//!     let surfaces = SurfaceSet::headless()
//!         .with_main(FrameSurface::new("main", 1280, 720).shared())
//!         .with_secondary(FrameSurface::new("secondary", 640, 360).shared());
//!
//!     let mut connection = ViewerConnection::connect(config, surfaces).await?;
//!     connection.toggle_running(None).await;
//!
//!     let mut telemetry = connection.telemetry_updates(UpdateRate::Max(2));
//!     while let Some(sample) = telemetry.next().await {
//!         println!("{:.1} fps, {:.1} ms", sample.fps, sample.latency_ms);
//!     }
//!
//!     connection.disconnect().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Pipeline stages
pub mod buffer;
pub mod protocol;
pub mod render;
pub mod telemetry;

// Connection architecture
pub mod connection;
pub mod session;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use buffer::JitterBuffer;
pub use config::{HandshakeMode, JitterConfig, ViewerConfig};
pub use connection::ViewerConnection;
pub use protocol::{InboundMessage, ObjectPosition, OutboundMessage, SceneInfo};
pub use render::{FrameSurface, Renderer, SharedSurface, Surface, SurfaceSet};
pub use session::{Session, SessionSnapshot};
pub use telemetry::{TelemetryEstimator, TelemetrySnapshot};
