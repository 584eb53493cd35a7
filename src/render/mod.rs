//! Frame decoding and drawing.
//!
//! A [`Renderer`] owns a [`SurfaceSet`] (main view plus optional secondary view)
//! and the render [`TelemetryEstimator`](crate::telemetry::TelemetryEstimator).
//! Hosts supply their own [`Surface`] implementations or use the in-memory
//! [`FrameSurface`].

mod decoder;
mod renderer;
mod surface;

pub use decoder::decode_payload;
pub use renderer::{RenderReport, Renderer};
pub use surface::{FrameSurface, IDLE_BACKGROUND, SharedSurface, Surface, SurfaceSet};
