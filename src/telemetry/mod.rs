//! Render telemetry: frames per second and decode latency.
//!
//! Two independent [`TelemetryWindow`]s feed a [`TelemetryEstimator`]; both are
//! reset whenever a connection starts or ends.

mod estimator;
mod window;

pub use estimator::{TelemetryEstimator, TelemetrySnapshot};
pub use window::{DEFAULT_WINDOW_CAPACITY, TelemetryWindow};
