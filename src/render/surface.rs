//! Display surfaces the renderer draws onto

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::types::ViewTarget;
use crate::{Result, ViewerError};

/// Background painted onto surfaces when a session ends
pub const IDLE_BACKGROUND: Rgba<u8> = Rgba([0x1f, 0x29, 0x37, 0xff]);

/// A named pixel target.
///
/// Implementations wrap whatever the host displays: a window texture, a shared
/// memory buffer, or the in-memory [`FrameSurface`].
pub trait Surface: Send {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Width and height in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Draw a decoded image stretched over the whole surface
    fn draw(&mut self, image: &RgbaImage) -> Result<()>;

    /// Fill the surface with a solid color
    fn clear(&mut self, color: Rgba<u8>);
}

/// Shared handle to a surface. Only the renderer draws through it.
pub type SharedSurface = Arc<Mutex<dyn Surface>>;

/// In-memory RGBA surface
#[derive(Debug, Clone)]
pub struct FrameSurface {
    name: String,
    canvas: RgbaImage,
    frames_drawn: u64,
}

impl FrameSurface {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            canvas: RgbaImage::from_pixel(width, height, IDLE_BACKGROUND),
            frames_drawn: 0,
        }
    }

    /// Wrap into a [`SharedSurface`] handle
    pub fn shared(self) -> SharedSurface {
        Arc::new(Mutex::new(self))
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl Surface for FrameSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn draw(&mut self, image: &RgbaImage) -> Result<()> {
        let (width, height) = self.canvas.dimensions();
        if width == 0 || height == 0 {
            return Err(ViewerError::surface(&self.name, "surface has zero area"));
        }

        if image.dimensions() == (width, height) {
            self.canvas.copy_from_slice(image.as_raw());
        } else {
            self.canvas = imageops::resize(image, width, height, FilterType::Triangle);
        }
        self.frames_drawn += 1;
        Ok(())
    }

    fn clear(&mut self, color: Rgba<u8>) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = color;
        }
    }
}

/// The main and optional secondary surfaces, plus a validity epoch.
///
/// The epoch advances whenever the surfaces are invalidated (session end). A
/// render that started under an older epoch must not draw.
#[derive(Clone, Default)]
pub struct SurfaceSet {
    main: Option<SharedSurface>,
    secondary: Option<SharedSurface>,
    epoch: Arc<AtomicU64>,
}

impl std::fmt::Debug for SurfaceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceSet")
            .field("main", &self.main.is_some())
            .field("secondary", &self.secondary.is_some())
            .field("epoch", &self.epoch())
            .finish()
    }
}

impl SurfaceSet {
    /// A set with no surfaces; frames are decoded but not drawn
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn with_main(mut self, surface: SharedSurface) -> Self {
        self.main = Some(surface);
        self
    }

    pub fn with_secondary(mut self, surface: SharedSurface) -> Self {
        self.secondary = Some(surface);
        self
    }

    pub fn get(&self, target: ViewTarget) -> Option<&SharedSurface> {
        match target {
            ViewTarget::Main => self.main.as_ref(),
            ViewTarget::Secondary => self.secondary.as_ref(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Advance the epoch and paint every surface with the idle background
    pub fn invalidate_and_clear(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Surfaces invalidated (epoch {})", epoch);
        for surface in [&self.main, &self.secondary].into_iter().flatten() {
            surface.lock().unwrap_or_else(PoisonError::into_inner).clear(IDLE_BACKGROUND);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_scales_to_surface() {
        let mut surface = FrameSurface::new("main", 4, 4);
        let image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));

        surface.draw(&image).unwrap();

        assert_eq!(surface.dimensions(), (4, 4));
        assert_eq!(surface.pixels().get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(surface.frames_drawn(), 1);
    }

    #[test]
    fn zero_area_surface_rejects_draw() {
        let mut surface = FrameSurface::new("empty", 0, 0);
        let image = RgbaImage::new(1, 1);
        assert!(matches!(surface.draw(&image), Err(ViewerError::Surface { .. })));
    }

    #[test]
    fn invalidate_bumps_epoch_and_clears() {
        let typed = Arc::new(Mutex::new(FrameSurface::new("main", 2, 2)));
        typed.lock().unwrap().draw(&RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]))).unwrap();
        let shared: SharedSurface = typed.clone();
        let surfaces = SurfaceSet::headless().with_main(shared);

        let before = surfaces.epoch();
        surfaces.invalidate_and_clear();

        assert_eq!(surfaces.epoch(), before + 1);
        assert!(surfaces.get(ViewTarget::Secondary).is_none());
        assert!(typed.lock().unwrap().pixels().pixels().all(|p| *p == IDLE_BACKGROUND));
    }
}
