//! Frame renderer: decode, draw, record telemetry

use image::RgbaImage;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, trace, warn};

use super::decoder::decode_payload;
use super::surface::SurfaceSet;
use crate::telemetry::{TelemetryEstimator, TelemetrySnapshot};
use crate::types::{Frame, ViewTarget};
use crate::{Result, ViewerError};

/// Outcome of one render call
#[derive(Debug, Clone, Copy)]
pub struct RenderReport {
    /// Every supplied payload decoded and drew cleanly
    pub success: bool,

    /// Taken before decoding began
    pub started: Instant,

    /// Taken after the last draw finished
    pub finished: Instant,
}

/// Turns encoded payloads into pixels on the main and secondary surfaces.
///
/// Payloads decode on the blocking pool, both views concurrently. The draw step
/// runs only if the surfaces were not invalidated while decoding. Failures are
/// logged and reported through [`RenderReport::success`]; they never propagate.
#[derive(Debug)]
pub struct Renderer {
    surfaces: SurfaceSet,
    telemetry: Mutex<TelemetryEstimator>,
}

impl Renderer {
    pub fn new(surfaces: SurfaceSet, telemetry_window: usize) -> Self {
        Self { surfaces, telemetry: Mutex::new(TelemetryEstimator::new(telemetry_window)) }
    }

    pub fn surfaces(&self) -> &SurfaceSet {
        &self.surfaces
    }

    /// Render a buffered frame
    pub async fn render_frame(&self, frame: Frame) -> RenderReport {
        self.render(Some(frame.main_payload), frame.secondary_payload).await
    }

    /// Decode and draw the supplied payloads.
    pub async fn render(
        &self,
        main: Option<Arc<str>>,
        secondary: Option<Arc<str>>,
    ) -> RenderReport {
        let started = Instant::now();
        let epoch = self.surfaces.epoch();

        let (main_image, secondary_image) = futures::join!(
            decode_view(ViewTarget::Main, main),
            decode_view(ViewTarget::Secondary, secondary)
        );

        if self.surfaces.epoch() != epoch {
            debug!("Surfaces invalidated during decode, discarding frame");
            return RenderReport { success: false, started, finished: Instant::now() };
        }

        let mut success = true;
        for (target, decoded) in
            [(ViewTarget::Main, main_image), (ViewTarget::Secondary, secondary_image)]
        {
            match decoded {
                Some(Ok(image)) => {
                    if let Err(e) = self.draw(target, &image) {
                        warn!("Dropping frame: {}", e);
                        success = false;
                    }
                }
                Some(Err(e)) => {
                    warn!("Dropping frame: {}", e);
                    success = false;
                }
                None => {}
            }
        }

        let finished = Instant::now();
        if success {
            self.telemetry_guard().record_render(started, finished);
            trace!("Rendered frame in {:?}", finished.duration_since(started));
        }

        RenderReport { success, started, finished }
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry_guard().snapshot()
    }

    pub fn reset_telemetry(&self) {
        self.telemetry_guard().reset();
    }

    fn draw(&self, target: ViewTarget, image: &RgbaImage) -> Result<()> {
        let Some(surface) = self.surfaces.get(target) else {
            return Ok(());
        };
        surface.lock().unwrap_or_else(PoisonError::into_inner).draw(image)
    }

    fn telemetry_guard(&self) -> std::sync::MutexGuard<'_, TelemetryEstimator> {
        self.telemetry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn decode_view(target: ViewTarget, payload: Option<Arc<str>>) -> Option<Result<RgbaImage>> {
    let payload = payload?;
    let decoded = tokio::task::spawn_blocking(move || decode_payload(target.as_str(), &payload))
        .await
        .unwrap_or_else(|e| Err(ViewerError::decode(target.as_str(), e.to_string())));
    Some(decoded)
}
