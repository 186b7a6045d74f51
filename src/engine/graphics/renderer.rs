use crate::engine::graphics::mesh::CpuMesh;
use crate::engine::graphics::primitives::{MeshHandle, TextureHandle};
use crate::engine::graphics::visual_world::VisualWorld;
use crate::engine::mount::{Mount, SurfaceId, Viewport};
use crate::engine::{EngineError, EngineResult};

pub type BackendResult<T> = Result<T, Box<dyn std::error::Error>>;

/// What the stage needs from a GPU (or fake GPU) backend.
pub trait RenderBackend {
    fn upload_mesh(&mut self, mesh: &CpuMesh) -> BackendResult<MeshHandle>;

    fn release_mesh(&mut self, mesh: MeshHandle);

    fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
        srgb: bool,
    ) -> BackendResult<TextureHandle>;

    fn upload_texture_bc7(
        &mut self,
        bc7_blocks: &[u8],
        width: u32,
        height: u32,
        srgb: bool,
    ) -> BackendResult<TextureHandle>;

    fn release_texture(&mut self, texture: TextureHandle);

    /// Output size changed (physical pixels).
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, visuals: &VisualWorld) -> BackendResult<()>;

    /// Free everything still held. The backend is unusable afterwards.
    fn dispose(&mut self);
}

/// Creates one backend per viewer activation.
pub trait BackendFactory {
    fn create_backend(&mut self, mount: &dyn Mount) -> EngineResult<Box<dyn RenderBackend>>;
}

/// A backend bound to one surface on one mount.
pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    surface: SurfaceId,
    size: Viewport,
    pixel_ratio: f64,
    frames: u64,
    disposed: bool,
}

impl Renderer {
    /// Size the backend to `size` and attach a fresh surface to `mount`.
    pub fn attach(
        mut backend: Box<dyn RenderBackend>,
        mount: &mut dyn Mount,
        size: Viewport,
    ) -> Self {
        let surface = SurfaceId::next();
        backend.resize(size.width(), size.height());
        mount.append_surface(surface);
        tracing::debug!(?surface, width = size.width(), height = size.height(), "renderer attached");

        Self {
            backend,
            surface,
            size,
            pixel_ratio: mount.pixel_ratio(),
            frames: 0,
            disposed: false,
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn size(&self) -> Viewport {
        self.size
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn set_size(&mut self, size: Viewport) {
        if size == self.size {
            return;
        }
        self.size = size;
        self.backend.resize(size.width(), size.height());
    }

    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    pub fn render(&mut self, visuals: &VisualWorld) -> EngineResult<()> {
        if self.disposed {
            return Err(EngineError::Backend("render after dispose".into()));
        }
        self.backend.render(visuals)?;
        self.frames += 1;
        Ok(())
    }

    /// Detach the surface from `mount` and release the backend.
    pub fn dispose(&mut self, mount: &mut dyn Mount) {
        if self.disposed {
            return;
        }
        if !mount.remove_surface(self.surface) {
            tracing::warn!(surface = ?self.surface, "surface was not attached to its mount");
        }
        self.backend.dispose();
        self.disposed = true;
        tracing::debug!(surface = ?self.surface, frames = self.frames, "renderer disposed");
    }
}
