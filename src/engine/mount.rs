//! Mount points: the host area a renderer surface is attached to.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use winit::window::Window;

use crate::engine::{EngineError, EngineResult};

/// Measured output size in physical pixels. Never zero in either dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> EngineResult<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::DegenerateViewport { width, height });
        }
        Ok(Self { width, height })
    }

    /// Measure a mount, failing fast on a missing or zero-sized client area.
    pub fn measure(mount: &dyn Mount) -> EngineResult<Self> {
        let (w, h) = mount.client_size().ok_or(EngineError::MissingMount)?;
        Self::new(w, h)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Identity of a renderer output surface while attached to a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Anything a renderer can be bound to.
pub trait Mount {
    /// Current client size in physical pixels, or `None` if there is nothing to measure.
    fn client_size(&self) -> Option<(u32, u32)>;

    fn pixel_ratio(&self) -> f64 {
        1.0
    }

    fn append_surface(&mut self, surface: SurfaceId);

    /// Returns `false` if `surface` was not attached.
    fn remove_surface(&mut self, surface: SurfaceId) -> bool;

    fn surfaces(&self) -> &[SurfaceId];

    /// Native window backing this mount, if any.
    fn window(&self) -> Option<&Arc<Window>> {
        None
    }
}

/// Mount backed by a winit window's client area.
pub struct WindowMount {
    window: Arc<Window>,
    surfaces: Vec<SurfaceId>,
}

impl WindowMount {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            surfaces: Vec::new(),
        }
    }
}

impl Mount for WindowMount {
    fn client_size(&self) -> Option<(u32, u32)> {
        let size = self.window.inner_size();
        Some((size.width, size.height))
    }

    fn pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn append_surface(&mut self, surface: SurfaceId) {
        self.surfaces.push(surface);
    }

    fn remove_surface(&mut self, surface: SurfaceId) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|s| *s != surface);
        self.surfaces.len() != before
    }

    fn surfaces(&self) -> &[SurfaceId] {
        &self.surfaces
    }

    fn window(&self) -> Option<&Arc<Window>> {
        Some(&self.window)
    }
}

/// Window-less mount with a settable size.
#[derive(Debug, Clone, Default)]
pub struct HeadlessMount {
    size: Option<(u32, u32)>,
    surfaces: Vec<SurfaceId>,
}

impl HeadlessMount {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Some((width, height)),
            surfaces: Vec::new(),
        }
    }

    /// A mount with no client area at all.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
    }
}

impl Mount for HeadlessMount {
    fn client_size(&self) -> Option<(u32, u32)> {
        self.size
    }

    fn append_surface(&mut self, surface: SurfaceId) {
        self.surfaces.push(surface);
    }

    fn remove_surface(&mut self, surface: SurfaceId) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|s| *s != surface);
        self.surfaces.len() != before
    }

    fn surfaces(&self) -> &[SurfaceId] {
        &self.surfaces
    }
}
